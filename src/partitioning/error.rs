//! Partitioning errors for mesh-rebalance

use thiserror::Error;

/// Errors from graph construction and partitioning routines.
///
/// Any of these aborts the repartition: the adjacency graph is deterministic,
/// so running the same partitioner again on the same input cannot succeed.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// The CSR graph handed to the partitioner is malformed.
    #[error("invalid dual graph: {0}")]
    InvalidGraph(String),
    /// The partitioner returned a map of the wrong length.
    #[error("partition map has {actual} entries for {expected} vertices")]
    WrongLength { expected: usize, actual: usize },
    /// The partitioner assigned a vertex to a rank that does not exist.
    #[error("vertex {vertex} assigned to rank {rank}, but only {n_parts} parts exist")]
    InvalidRank {
        vertex: usize,
        rank: usize,
        n_parts: usize,
    },
    /// Communication failed while the partitioner gathered or scattered the graph.
    #[error("partitioner communication failed: {0}")]
    Comm(String),
    /// Other errors (e.g. METIS wrapper failures)
    #[error("Partitioner error: {0}")]
    Other(String),
}
