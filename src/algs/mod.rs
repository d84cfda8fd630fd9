//! Cross-rank algorithms: communication, exchange planning, partition mapping,
//! migration and interface reconstruction.

pub mod communicator;
pub mod dual_graph;
pub mod exchange;
pub mod halo;
pub mod interface;
pub mod load_balance;
pub mod migrate;
pub mod partition;
pub mod tree_migration;
pub mod wire;

pub use exchange::ExchangePlan;
pub use load_balance::{load_balance_mesh, load_balance_mesh_with};
pub use migrate::reconstruct_mesh;
pub use partition::map_cells;
