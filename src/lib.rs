#![cfg_attr(docsrs, feature(doc_cfg))]
//! # mesh-rebalance
//!
//! mesh-rebalance repartitions an adaptively refined, face-based polyhedral mesh
//! that is distributed over a set of ranks. Each rank owns a [`MeshShard`]:
//! cells, faces, points, named boundary groups, refinement trees and the
//! interface patches shared with neighbor ranks.
//!
//! Given a destination rank per local cell, the engine migrates every entity to
//! its new owner, rebuilds all global-to-local index tables from scratch and
//! recomputes the interface patches, without ever assembling the whole mesh on
//! one rank.
//!
//! ## Pipeline
//! [`load_balance_mesh`] weighs tree roots by their pending refinement, hands
//! the distributed dual graph to a [`GraphPartitioner`], and then runs
//! [`reconstruct_mesh`]: cells, faces and points move in ownership order,
//! followed by boundary groups, refinement flags, edge centers and both
//! refinement trees. Owner/neighbor arrays come from an
//! [`OwnerNeighborDeriver`](topology::OwnerNeighborDeriver).
//!
//! ## Communication
//! Every algorithm takes an explicit [`Communicator`]. [`NoComm`] is a single
//! rank, [`ThreadComm`](algs::communicator::ThreadComm) simulates ranks as
//! threads of one process, and `MpiComm` (feature `mpi-support`) runs on MPI.
//! All exchanges are collective: every rank must make the same calls in the
//! same order.
//!
//! ## Features
//! - `mpi-support`: MPI backend.
//! - `metis-support`: k-way METIS partitioner.
//! - `strict-invariants`: shard and plan invariant checks in release builds.
//!
//! [`NoComm`]: algs::communicator::NoComm
//! [`GraphPartitioner`]: partitioning::GraphPartitioner

pub mod algs;
pub mod config;
pub mod debug_invariants;
pub mod mesh_error;
pub mod mesh_generation;
pub mod partitioning;
pub mod topology;

pub use algs::{load_balance_mesh, reconstruct_mesh};
pub use config::{AdaptParams, RebalanceConfig};
pub use debug_invariants::DebugInvariants;
pub use mesh_error::MeshError;
pub use topology::MeshShard;

/// A convenient prelude to import the most-used traits & types:
pub mod prelude {
    pub use crate::algs::communicator::{Communicator, NoComm, ThreadComm, run_local};
    #[cfg(feature = "mpi-support")]
    pub use crate::algs::communicator::MpiComm;
    pub use crate::algs::exchange::ExchangePlan;
    pub use crate::algs::load_balance::{load_balance_mesh, load_balance_mesh_with};
    pub use crate::algs::migrate::reconstruct_mesh;
    pub use crate::config::{AdaptParams, RebalanceConfig};
    pub use crate::debug_invariants::DebugInvariants;
    pub use crate::mesh_error::MeshError;
    #[cfg(feature = "metis-support")]
    pub use crate::partitioning::MetisPartitioner;
    pub use crate::partitioning::{
        GraphPartitioner, ProvidedPartition, WeightedBlockPartitioner,
    };
    pub use crate::topology::{
        BoundaryGroup, EntityKind, GlobalId, GlobalIndexTable, MeshShard, OwnerNeighborDeriver,
        Patch, RefinementTree, TopologicalOrientation,
    };
}
