use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use mesh_rebalance::algs::communicator::run_local;
use mesh_rebalance::algs::migrate::reconstruct_mesh;
use mesh_rebalance::mesh_generation::{BoxMeshOptions, distributed_hex_box};
use mesh_rebalance::prelude::*;

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct_mesh");
    group.sample_size(10);
    for &n in &[4usize, 8] {
        let opts = BoxMeshOptions::unit(n, n, n).refined();
        group.bench_with_input(BenchmarkId::new("random_roots_4_ranks", n), &opts, |b, &opts| {
            b.iter(|| {
                run_local(4, |comm| {
                    let shard = distributed_hex_box(opts, comm.rank(), comm.size()).unwrap();
                    let map: Vec<usize> = (0..shard.ncells())
                        .map(|c| {
                            let root = shard.gcells()[shard.cell_tree.root(c).unwrap()];
                            SmallRng::seed_from_u64(root).gen_range(0..comm.size())
                        })
                        .collect();
                    reconstruct_mesh(&shard, &map, &TopologicalOrientation, &comm)
                        .unwrap()
                        .ncells()
                })
            })
        });
    }
    group.finish();
}

fn bench_load_balance(c: &mut Criterion) {
    let opts = BoxMeshOptions::unit(8, 8, 8);
    c.bench_function("load_balance_mesh_block_4_ranks", |b| {
        b.iter(|| {
            run_local(4, |comm| {
                let mut shard = distributed_hex_box(opts, comm.rank(), comm.size()).unwrap();
                if comm.rank() == 0 {
                    shard.ref_data.iter_mut().for_each(|r| *r = 2);
                }
                load_balance_mesh(&shard, &WeightedBlockPartitioner, &RebalanceConfig::default(), &comm)
                    .unwrap()
                    .map(|s| s.ncells())
            })
        })
    });
}

criterion_group!(benches, bench_reconstruct, bench_load_balance);
criterion_main!(benches);
