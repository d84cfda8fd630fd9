//! Weighted block partitioner.
//!
//! Vertices keep their current global order (rank-major, then local order)
//! and are cut into `n_parts` contiguous blocks of about equal total weight.
//! Adjacency is ignored; this is the native fallback when no graph
//! partitioning library is linked.

use super::{GraphPartitioner, PartitionError, PartitionId};
use crate::algs::communicator::Communicator;
use crate::algs::dual_graph::DualGraph;
use crate::algs::exchange::all_gatherv;

#[derive(Clone, Copy, Debug, Default)]
pub struct WeightedBlockPartitioner;

impl GraphPartitioner for WeightedBlockPartitioner {
    fn partition<C: Communicator>(
        &self,
        graph: &DualGraph,
        n_parts: usize,
        comm: &C,
    ) -> Result<Vec<PartitionId>, PartitionError> {
        if n_parts == 0 {
            return Err(PartitionError::Other("zero parts requested".into()));
        }
        // exact rank loads; 2^62-weighted roots overflow a u64 sum
        let (_, loads) = all_gatherv(&[graph.local_weight_wide()], comm)
            .map_err(|e| PartitionError::Comm(e.to_string()))?;
        let total: u128 = loads.iter().sum();
        let mut acc: u128 = loads[..comm.rank()].iter().sum();
        if total == 0 {
            return Ok(vec![0; graph.n_vertices()]);
        }
        Ok(graph
            .vwgt
            .iter()
            .map(|&w| {
                // midpoint of the vertex on the global weight axis
                let mid = 2 * acc + w as u128;
                acc += w as u128;
                let part = mid * n_parts as u128 / (2 * total);
                (part as usize).min(n_parts - 1)
            })
            .collect())
    }
}
