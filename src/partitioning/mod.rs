//! Graph partitioners consumed by the partition mapper.
//!
//! A partitioner receives this rank's slice of the distributed [`DualGraph`]
//! and returns one target rank per local vertex. Any failure aborts the
//! repartition.

pub mod block;
pub mod error;
#[cfg(feature = "metis-support")]
pub mod metis;
pub mod metrics;

pub use self::block::WeightedBlockPartitioner;
pub use self::error::PartitionError;
#[cfg(feature = "metis-support")]
pub use self::metis::MetisPartitioner;
pub use self::metrics::{global_imbalance, imbalance_of, part_loads};

use crate::algs::communicator::Communicator;
use crate::algs::dual_graph::DualGraph;
use crate::topology::GlobalId;

pub type PartitionId = usize;

/// A distributed graph partitioner.
///
/// Collective: every rank calls `partition` with its own slice of the graph.
pub trait GraphPartitioner {
    fn partition<C: Communicator>(
        &self,
        graph: &DualGraph,
        n_parts: usize,
        comm: &C,
    ) -> Result<Vec<PartitionId>, PartitionError>;
}

/// Destination chosen by the caller from the root cell's global id.
#[derive(Clone, Debug)]
pub struct ProvidedPartition<F> {
    assign: F,
}

impl<F> ProvidedPartition<F>
where
    F: Fn(GlobalId) -> PartitionId,
{
    pub fn new(assign: F) -> Self {
        Self { assign }
    }
}

impl<F> GraphPartitioner for ProvidedPartition<F>
where
    F: Fn(GlobalId) -> PartitionId,
{
    fn partition<C: Communicator>(
        &self,
        graph: &DualGraph,
        _n_parts: usize,
        _comm: &C,
    ) -> Result<Vec<PartitionId>, PartitionError> {
        Ok(graph.vertex_gids.iter().map(|&g| (self.assign)(g)).collect())
    }
}

/// Reject maps of the wrong length or naming a nonexistent rank.
pub fn check_parts(parts: &[PartitionId], n_vertices: usize, n_parts: usize) -> Result<(), PartitionError> {
    if parts.len() != n_vertices {
        return Err(PartitionError::WrongLength {
            expected: n_vertices,
            actual: parts.len(),
        });
    }
    if let Some((vertex, &rank)) = parts.iter().enumerate().find(|&(_, &p)| p >= n_parts) {
        return Err(PartitionError::InvalidRank {
            vertex,
            rank,
            n_parts,
        });
    }
    Ok(())
}
