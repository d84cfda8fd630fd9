#![allow(dead_code)]
use mesh_rebalance::algs::communicator::Communicator;
use mesh_rebalance::algs::exchange::all_gatherv;
use mesh_rebalance::mesh_generation::{BoxMeshOptions, distributed_hex_box};
use mesh_rebalance::topology::{Csr, GlobalId, MeshShard, RefinementTree};
use std::collections::{BTreeMap, BTreeSet};

/// This rank's slab of a box mesh.
pub fn box_shard<C: Communicator>(opts: BoxMeshOptions, comm: &C) -> MeshShard {
    distributed_hex_box(opts, comm.rank(), comm.size()).unwrap()
}

/// A shard without any entity.
pub fn empty_shard() -> MeshShard {
    MeshShard::new(Vec::new(), &[], Csr::new(), &[], Csr::new(), &[]).unwrap()
}

/// Destination of every local cell, chosen per tree root from its global id.
pub fn root_map(shard: &MeshShard, dest: impl Fn(GlobalId) -> usize) -> Vec<usize> {
    (0..shard.ncells())
        .map(|c| dest(shard.gcells()[shard.cell_tree.root(c).unwrap()]))
        .collect()
}

/// Every rank's ids, concatenated in rank order.
pub fn gather_ids<C: Communicator>(local: &[GlobalId], comm: &C) -> Vec<GlobalId> {
    all_gatherv(local, comm).unwrap().1
}

/// Assert vec is a permutation of another vec (order-agnostic).
pub fn assert_permutation<T: Ord + Copy + std::fmt::Debug>(got: &[T], want: &[T]) {
    let mut a = got.to_vec();
    a.sort_unstable();
    let mut b = want.to_vec();
    b.sort_unstable();
    assert_eq!(a, b, "not a permutation\n got={:?}\nwant={:?}", got, want);
}

type TreeView = BTreeMap<GlobalId, (GlobalId, u32, Vec<Vec<GlobalId>>)>;

/// A shard seen through global ids only, independent of local numbering.
#[derive(Debug, PartialEq)]
pub struct Snapshot {
    pub cells: BTreeMap<GlobalId, Vec<GlobalId>>,
    pub faces: BTreeMap<GlobalId, Vec<GlobalId>>,
    pub points: BTreeMap<GlobalId, [u64; 3]>,
    pub boundaries: BTreeMap<String, BTreeSet<GlobalId>>,
    pub patches: BTreeMap<usize, BTreeMap<GlobalId, GlobalId>>,
    pub ref_data: BTreeMap<GlobalId, i32>,
    pub cell_tree: TreeView,
    pub face_tree: TreeView,
    pub edge_centers: BTreeSet<(GlobalId, GlobalId, GlobalId)>,
}

fn tree_view(tree: &RefinementTree, gids: &[GlobalId]) -> TreeView {
    (0..tree.len())
        .map(|i| {
            let gens = tree
                .generations(i)
                .iter()
                .map(|g| g.children.iter().map(|&c| gids[c]).collect())
                .collect();
            (gids[i], (gids[tree.parent(i)], tree.level(i), gens))
        })
        .collect()
}

impl Snapshot {
    pub fn of(s: &MeshShard) -> Self {
        let (gc, gf, gp) = (s.gcells(), s.gfaces(), s.gpoints());
        Snapshot {
            cells: s
                .cells
                .rows()
                .enumerate()
                .map(|(c, row)| (gc[c], row.iter().map(|&f| gf[f]).collect()))
                .collect(),
            faces: s
                .faces
                .rows()
                .enumerate()
                .map(|(f, row)| (gf[f], row.iter().map(|&p| gp[p]).collect()))
                .collect(),
            points: s
                .coords
                .iter()
                .enumerate()
                .map(|(p, x)| (gp[p], x.map(f64::to_bits)))
                .collect(),
            boundaries: s
                .boundaries
                .iter()
                .map(|g| (g.name.clone(), g.faces.iter().map(|&f| gf[f]).collect()))
                .collect(),
            patches: s
                .patches
                .iter()
                .map(|p| (p.neighbor, p.links().map(|(f, c)| (gf[f], c)).collect()))
                .collect(),
            ref_data: s.ref_data.iter().enumerate().map(|(c, &r)| (gc[c], r)).collect(),
            cell_tree: tree_view(&s.cell_tree, gc),
            face_tree: tree_view(&s.face_tree, gf),
            edge_centers: s
                .edge_centers
                .iter()
                .map(|(p, q, c)| {
                    let (a, b) = (gp[p], gp[q]);
                    (a.min(b), a.max(b), gp[c])
                })
                .collect(),
        }
    }
}
