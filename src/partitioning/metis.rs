//! METIS k-way partitioner.
//!
//! The distributed graph is gathered onto rank 0, partitioned there and the
//! assignment is sent back in each rank's vertex order.

use super::{GraphPartitioner, PartitionError, PartitionId};
use crate::algs::communicator::Communicator;
use crate::algs::dual_graph::DualGraph;
use crate::algs::exchange::ExchangePlan;
use crate::mesh_error::MeshError;
use hashbrown::HashMap;
use metis::Idx;

#[derive(Clone, Copy, Debug, Default)]
pub struct MetisPartitioner;

fn comm_err(e: MeshError) -> PartitionError {
    PartitionError::Comm(e.to_string())
}

fn to_idx(what: &str, v: usize) -> Result<Idx, PartitionError> {
    Idx::try_from(v).map_err(|_| PartitionError::InvalidGraph(format!("{what} {v} overflows METIS index")))
}

/// METIS vertex weights whose total stays well inside `Idx`.
///
/// Weights are scaled down proportionally when their sum is too large for
/// METIS's internal accumulators; every vertex keeps a weight of at least 1.
fn fit_weights(vwgt: &[usize]) -> Vec<Idx> {
    let limit = (Idx::MAX / 2) as u128;
    let total: u128 = vwgt.iter().map(|&w| w as u128).sum();
    vwgt.iter()
        .map(|&w| {
            let w = w as u128;
            let scaled = if total > limit { w * limit / total } else { w };
            scaled.max(1) as Idx
        })
        .collect()
}

/// Partition a gathered graph. Adjacency is given as global ids.
fn part_gathered(
    gids: &[u64],
    degrees: &[usize],
    adjncy: &[u64],
    vwgt: &[usize],
    n_parts: usize,
) -> Result<Vec<PartitionId>, PartitionError> {
    let n = gids.len();
    if n_parts <= 1 || n == 0 {
        return Ok(vec![0; n]);
    }
    let index: HashMap<u64, usize> = gids.iter().enumerate().map(|(i, &g)| (g, i)).collect();
    let mut xadj: Vec<Idx> = Vec::with_capacity(n + 1);
    xadj.push(0);
    let mut acc = 0;
    for &d in degrees {
        acc += d;
        xadj.push(to_idx("arc offset", acc)?);
    }
    let adj: Vec<Idx> = adjncy
        .iter()
        .map(|g| {
            let v = index.get(g).copied().ok_or_else(|| {
                PartitionError::InvalidGraph(format!("arc to unknown vertex {g}"))
            })?;
            to_idx("vertex", v)
        })
        .collect::<Result<_, _>>()?;
    let w = fit_weights(vwgt);

    let mut part = vec![0 as Idx; n];
    let graph = metis::Graph::new(1, to_idx("part count", n_parts)?, &xadj, &adj)
        .map_err(|e| PartitionError::InvalidGraph(format!("{e:?}")))?;
    graph
        .set_vwgt(&w)
        .part_kway(&mut part)
        .map_err(|e| PartitionError::Other(format!("METIS partitioning failed: {e:?}")))?;
    Ok(part.into_iter().map(|p| p as usize).collect())
}

impl GraphPartitioner for MetisPartitioner {
    fn partition<C: Communicator>(
        &self,
        graph: &DualGraph,
        n_parts: usize,
        comm: &C,
    ) -> Result<Vec<PartitionId>, PartitionError> {
        graph.validate()?;
        let mut to_root = vec![0usize; comm.size()];
        to_root[0] = graph.n_vertices();
        let plan = ExchangePlan::from_send_counts(to_root, comm).map_err(comm_err)?;

        let degrees: Vec<usize> = (0..graph.n_vertices())
            .map(|v| graph.neighbors(v).len())
            .collect();
        let weights: Vec<usize> = graph.vwgt.iter().map(|&w| w as usize).collect();
        let gids = plan.exchange_ids(&graph.vertex_gids, comm).map_err(comm_err)?;
        let all_degrees = plan.exchange_counts(&degrees, comm).map_err(comm_err)?;
        let all_weights = plan.exchange_counts(&weights, comm).map_err(comm_err)?;
        let arcs = plan.with_strides(&degrees, &all_degrees).map_err(comm_err)?;
        let adjncy = arcs.exchange_ids(&graph.adjncy, comm).map_err(comm_err)?;

        let parts = if comm.rank() == 0 {
            part_gathered(&gids, &all_degrees, &adjncy, &all_weights, n_parts)?
        } else {
            Vec::new()
        };
        plan.reversed().exchange_counts(&parts, comm).map_err(comm_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;

    #[test]
    fn two_parts_of_a_path() {
        // 0 - 1 - 2 - 3
        let g = DualGraph {
            vertex_gids: vec![0, 1, 2, 3],
            xadj: vec![0, 1, 3, 5, 6],
            adjncy: vec![1, 0, 2, 1, 3, 2],
            vwgt: vec![1; 4],
        };
        let parts = MetisPartitioner.partition(&g, 2, &NoComm).unwrap();
        assert_eq!(parts.len(), 4);
        assert!(parts.iter().all(|&p| p < 2));
    }

    #[test]
    fn huge_weights_are_rescaled() {
        let w = fit_weights(&[1 << 30, 1 << 30, 1 << 30, 1]);
        let total: i64 = w.iter().map(|&x| x as i64).sum();
        assert!(total <= (Idx::MAX / 2) as i64 + 4);
        assert_eq!(w[0], w[2]);
        assert_eq!(w[3], 1);
        assert_eq!(fit_weights(&[3, 5]), vec![3, 5]);
    }

    #[test]
    fn single_part_needs_no_metis() {
        assert_eq!(part_gathered(&[5, 6], &[0, 0], &[], &[1, 1], 1).unwrap(), vec![0, 0]);
    }
}
