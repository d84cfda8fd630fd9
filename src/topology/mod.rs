//! Mesh topology of one rank: the shard, its global index tables, patches and
//! refinement trees.
//!
//! Everything here is rank-local. Cross-rank movement lives in [`crate::algs`].

pub mod cell_type;
pub mod csr;
pub mod global_table;
pub mod orientation;
pub mod patch;
pub mod shard;
pub mod tree;
pub mod validation;

/// Permanent, rank-independent identifier of a mesh entity.
pub type GlobalId = u64;

pub use cell_type::ElementType;
pub use csr::Csr;
pub use global_table::{EntityKind, GlobalIndexTable};
pub use orientation::{OwnerNeighbor, OwnerNeighborDeriver, TopologicalOrientation};
pub use patch::Patch;
pub use shard::{BoundaryGroup, EdgeCenters, MeshShard, ShardCounts};
pub use tree::{EntityState, Generation, RefinementTree};
