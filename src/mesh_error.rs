//! MeshError: unified error type for mesh-rebalance public APIs.
//!
//! Repartitioning has no user-recoverable failure path. Every variant below is
//! either a protocol invariant violation (a bug in the planning phase), a failed
//! partitioner, or a broken communication channel. The orchestrator returns the
//! first one it meets and the caller abandons the adaptation step.

use crate::partitioning::error::PartitionError;
use crate::topology::global_table::EntityKind;
use crate::topology::GlobalId;
use thiserror::Error;

/// Unified error type for mesh-rebalance operations.
#[derive(Debug, Error)]
pub enum MeshError {
    /// A global id was used but never registered in the table of its kind.
    #[error("{kind} with global id {gid} was referenced but never registered")]
    NotFound { kind: EntityKind, gid: GlobalId },
    /// A global id that must arrive exactly once arrived twice.
    #[error("{kind} with global id {gid} registered twice")]
    DuplicateGlobalId { kind: EntityKind, gid: GlobalId },
    /// A message from a neighbor could not be received or had the wrong size.
    #[error("communication with rank {neighbor} failed: {source}")]
    CommError {
        neighbor: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// Buffer lengths disagree with the exchange plan.
    #[error("buffer mismatch in {context}: expected {expected}, got {actual}")]
    BufferMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },
    /// A face is referenced by more cells than a manifold decomposition allows.
    #[error("face {face} is shared by more than two cells ({context})")]
    UnexpectedSharing { face: GlobalId, context: &'static str },
    /// A face would belong to more than one interface patch.
    #[error("interface face {face} answered by ranks {first} and {second}")]
    NonManifoldInterface {
        face: GlobalId,
        first: usize,
        second: usize,
    },
    /// A tree or generation record cannot be decoded.
    #[error("malformed {kind} record: {reason}")]
    MalformedRecord { kind: EntityKind, reason: String },
    /// Local connectivity is out of range or internally inconsistent.
    #[error("invalid connectivity: {0}")]
    InvalidConnectivity(String),
    /// The external graph partitioner failed.
    #[error(transparent)]
    Partition(#[from] PartitionError),
}

impl MeshError {
    pub(crate) fn comm(neighbor: usize, msg: impl Into<String>) -> Self {
        let msg: String = msg.into();
        MeshError::CommError {
            neighbor,
            source: msg.into(),
        }
    }
}
