//! Point phase: pull the coordinates of every point of the received faces.

use super::faces::MovedFaces;
use super::pull;
use crate::algs::communicator::Communicator;
use crate::algs::wire::WireCoord;
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::global_table::{EntityKind, GlobalIndexTable};
use crate::topology::shard::MeshShard;

pub(crate) struct MovedPoints {
    pub table: GlobalIndexTable,
    pub coords: Vec<[f64; 3]>,
}

pub(crate) fn migrate_points<C: Communicator>(
    shard: &MeshShard,
    faces: &MovedFaces,
    comm: &C,
) -> Result<MovedPoints, MeshError> {
    let mut table = GlobalIndexTable::new(EntityKind::Point);
    let mut requests: Vec<Vec<GlobalId>> = vec![Vec::new(); comm.size()];
    // providers are non-decreasing over new face slots, so point slots follow
    // the reply order as well
    for (k, &r) in faces.providers.iter().enumerate() {
        for &gp in faces.ngon_row(k) {
            if table.register(gp).1 {
                requests[r].push(gp);
            }
        }
    }

    let pull = pull(&requests, &shard.point_table, comm)?;
    let send: Vec<WireCoord> = pull
        .served
        .iter()
        .map(|&p| WireCoord::new(shard.coords[p]))
        .collect();
    let coords: Vec<[f64; 3]> = pull
        .reply
        .exchange(&send, comm)?
        .iter()
        .map(WireCoord::get)
        .collect();
    if coords.len() != table.len() {
        return Err(MeshError::BufferMismatch {
            context: "point replies",
            expected: table.len(),
            actual: coords.len(),
        });
    }
    log::debug!(
        "rank {}: received {} points, served {}",
        comm.rank(),
        table.len(),
        pull.served.len()
    );
    Ok(MovedPoints {
        table,
        coords,
    })
}
