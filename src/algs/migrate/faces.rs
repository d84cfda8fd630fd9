//! Face phase: pull every face referenced by the received cells.

use super::cells::MovedCells;
use super::{Pull, pull};
use crate::algs::communicator::Communicator;
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::global_table::{EntityKind, GlobalIndexTable};
use crate::topology::shard::MeshShard;

/// Faces received by this rank.
///
/// New face slot `k` is the `k`-th face received in the reply of the pull.
pub(crate) struct MovedFaces {
    pub pull: Pull,
    pub table: GlobalIndexTable,
    /// Rank that provided each new face.
    pub providers: Vec<usize>,
    pub strides: Vec<usize>,
    /// Point global ids of every new face, concatenated.
    pub ngon: Vec<GlobalId>,
    offsets: Vec<usize>,
}

impl MovedFaces {
    /// Point global ids of new face `k`.
    pub fn ngon_row(&self, k: usize) -> &[GlobalId] {
        &self.ngon[self.offsets[k]..self.offsets[k + 1]]
    }
}

pub(crate) fn migrate_faces<C: Communicator>(
    shard: &MeshShard,
    cells: &MovedCells,
    comm: &C,
) -> Result<MovedFaces, MeshError> {
    let n = comm.size();
    let mut table = GlobalIndexTable::new(EntityKind::Face);
    let mut requests: Vec<Vec<GlobalId>> = vec![Vec::new(); n];
    // the rank a cell came from holds all of its faces
    for (r, wanted) in requests.iter_mut().enumerate() {
        for j in cells.plan.recv_range(r) {
            for &gf in cells.nface_row(j) {
                if table.register(gf).1 {
                    wanted.push(gf);
                }
            }
        }
    }

    let pull = pull(&requests, &shard.face_table, comm)?;
    let send_strides: Vec<usize> = pull.served.iter().map(|&f| shard.faces.stride(f)).collect();
    let strides = pull.reply.exchange_counts(&send_strides, comm)?;
    if strides.len() != table.len() {
        return Err(MeshError::BufferMismatch {
            context: "face replies",
            expected: table.len(),
            actual: strides.len(),
        });
    }
    let ngon_send: Vec<GlobalId> = pull
        .served
        .iter()
        .flat_map(|&f| shard.faces.row(f).iter().map(|&p| shard.gpoints()[p]))
        .collect();
    let ngon = pull
        .reply
        .with_strides(&send_strides, &strides)?
        .exchange_ids(&ngon_send, comm)?;

    let mut offsets = Vec::with_capacity(strides.len() + 1);
    offsets.push(0);
    for &s in &strides {
        offsets.push(offsets[offsets.len() - 1] + s);
    }
    log::debug!(
        "rank {}: received {} faces, served {}",
        comm.rank(),
        table.len(),
        pull.served.len()
    );
    Ok(MovedFaces {
        providers: pull.reply.recv_sources(),
        pull,
        table,
        strides,
        ngon,
        offsets,
    })
}
