//! Run with e.g. `mpirun -n 3 cargo test --features mpi-support --test mpi_load_balance`.
#![cfg(feature = "mpi-support")]

use mesh_rebalance::algs::load_balance::global_counts;
use mesh_rebalance::mesh_generation::{BoxMeshOptions, distributed_hex_box};
use mesh_rebalance::prelude::*;
use serial_test::serial;

#[test]
#[serial]
fn refined_box_rebalances_under_mpi() {
    let comm = MpiComm::new().unwrap();
    let opts = BoxMeshOptions::unit(2, 2, 4).refined();
    let mut shard = distributed_hex_box(opts, comm.rank(), comm.size()).unwrap();
    // make the lowest rank heavy so there is something to move
    if comm.rank() == 0 {
        shard.ref_data.iter_mut().for_each(|r| *r = 1);
    }
    let out = load_balance_mesh(&shard, &WeightedBlockPartitioner, &RebalanceConfig::default(), &comm)
        .unwrap();
    match out {
        None => assert_eq!(comm.size(), 1),
        Some(s) => {
            s.validate_invariants().unwrap();
            assert_eq!(global_counts(s.counts(), &comm).unwrap().cells, opts.n_cells());
        }
    }
}
