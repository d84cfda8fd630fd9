//! Edge-center entries travel with the faces that contain their edge.

use super::Pull;
use crate::algs::communicator::Communicator;
use crate::algs::exchange::ExchangePlan;
use crate::algs::wire::WireEdgeCenter;
use crate::mesh_error::MeshError;
use crate::topology::global_table::GlobalIndexTable;
use crate::topology::shard::{EdgeCenters, MeshShard};

/// Ship, for every face served in the face pull, the edge centers on its
/// edges. The receiver keeps an entry only if all three points are local.
pub(crate) fn migrate_edge_centers<C: Communicator>(
    shard: &MeshShard,
    face_pull: &Pull,
    new_points: &GlobalIndexTable,
    comm: &C,
) -> Result<EdgeCenters, MeshError> {
    let gp = shard.gpoints();
    let n = comm.size();
    let mut send_counts = vec![0usize; n];
    let mut send = Vec::new();
    for (r, count) in send_counts.iter_mut().enumerate() {
        let before = send.len();
        for &f in &face_pull.served[face_pull.reply.send_range(r)] {
            send.extend(
                shard
                    .edge_centers
                    .on_polygon(shard.faces.row(f))
                    .map(|(p, q, c)| WireEdgeCenter::new(gp[p], gp[q], gp[c])),
            );
        }
        *count = send.len() - before;
    }
    let plan = ExchangePlan::from_send_counts(send_counts, comm)?;
    let recv = plan.exchange(&send, comm)?;

    let mut out = EdgeCenters::new();
    let mut dropped = 0usize;
    for e in &recv {
        match (
            new_points.get(e.p()),
            new_points.get(e.q()),
            new_points.get(e.center()),
        ) {
            (Some(p), Some(q), Some(c)) => {
                out.insert(p, q, c);
            }
            _ => {
                dropped += 1;
                log::trace!(
                    "edge ({}, {}) center {} dropped: point not local",
                    e.p(),
                    e.q(),
                    e.center()
                );
            }
        }
    }
    log::debug!(
        "rank {}: {} edge centers kept, {} dropped",
        comm.rank(),
        out.len(),
        dropped
    );
    Ok(out)
}
