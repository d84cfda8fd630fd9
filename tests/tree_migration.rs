//! Refinement trees and edge centers across a repartition.
mod util;

use mesh_rebalance::algs::communicator::{Communicator, run_local};
use mesh_rebalance::algs::migrate::reconstruct_mesh;
use mesh_rebalance::mesh_generation::BoxMeshOptions;
use mesh_rebalance::prelude::*;
use mesh_rebalance::topology::EntityState;
use util::{Snapshot, box_shard, root_map};

#[test]
fn swapped_slabs_keep_whole_trees() {
    let opts = BoxMeshOptions::unit(2, 2, 2).refined();
    let out = run_local(2, |comm| {
        let shard = box_shard(opts, &comm);
        let other = 1 - comm.rank();
        let moved = reconstruct_mesh(
            &shard,
            &vec![other; shard.ncells()],
            &TopologicalOrientation,
            &comm,
        )
        .unwrap();
        (Snapshot::of(&shard), Snapshot::of(&moved), moved)
    });
    // rank r now holds exactly what rank 1 - r held, trees included
    assert_eq!(out[0].1.cell_tree, out[1].0.cell_tree);
    assert_eq!(out[1].1.cell_tree, out[0].0.cell_tree);
    assert_eq!(out[0].1.face_tree, out[1].0.face_tree);
    assert_eq!(out[0].1.edge_centers, out[1].0.edge_centers);

    for (_, _, s) in &out {
        s.cell_tree.validate().unwrap();
        s.face_tree.validate().unwrap();
        for c in 0..s.ncells() {
            if s.cell_tree.is_root(c) {
                assert_eq!(s.cell_tree.state(c), EntityState::Split);
                assert_eq!(s.cell_tree.generations(c)[0].children.len(), 8);
            } else {
                assert_eq!(s.cell_tree.level(c), 1);
            }
        }
        // every refined face still knows the centers of its four edges
        for f in 0..s.nfaces() {
            if !s.face_tree.generations(f).is_empty() {
                assert_eq!(s.edge_centers.on_polygon(s.faces.row(f)).count(), 4);
            }
        }
    }
}

#[test]
fn children_follow_their_root_across_three_ranks() {
    let opts = BoxMeshOptions::unit(3, 1, 3).refined();
    let out = run_local(3, |comm| {
        let shard = box_shard(opts, &comm);
        let n = comm.size();
        let map = root_map(&shard, |g| (g as usize * 7 + 1) % n);
        let moved = reconstruct_mesh(&shard, &map, &TopologicalOrientation, &comm).unwrap();
        Snapshot::of(&moved)
    });
    let mut roots = 0;
    for snap in &out {
        for (&c, (parent, level, gens)) in &snap.cell_tree {
            if c == *parent {
                roots += 1;
                assert_eq!(gens.len(), 1);
                for child in &gens[0] {
                    assert_eq!(snap.cell_tree[child].0, c);
                    assert_eq!(snap.cell_tree[child].1, *level + 1);
                }
            }
        }
    }
    assert_eq!(roots, 9);
}
