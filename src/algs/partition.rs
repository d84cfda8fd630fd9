//! Partition mapper: from a shard to one destination rank per local cell.
//!
//! The graph handed to the partitioner has one vertex per refinement-tree
//! root. A root's weight is `2^d`, where `d` is the sum of the refinement
//! flags over the root and all its descendants, so the balance targets the
//! load after the pending adaptation. Every cell then follows its root, which
//! keeps whole trees on one rank.

use crate::algs::communicator::Communicator;
use crate::algs::dual_graph::DualGraph;
use crate::algs::halo::exchange_interface_data;
use crate::algs::wire::WireId;
use crate::mesh_error::MeshError;
use crate::partitioning::{GraphPartitioner, check_parts};
use crate::topology::GlobalId;
use crate::topology::shard::MeshShard;
use std::collections::BTreeSet;

/// Graph vertex of every local cell.
#[derive(Clone, Debug, Default)]
pub struct RootIndex {
    /// Local cell id of each vertex's root.
    pub roots: Vec<usize>,
    /// Vertex of each local cell.
    pub vertex_of: Vec<usize>,
}

impl RootIndex {
    pub fn new(shard: &MeshShard) -> Result<Self, MeshError> {
        let tree = &shard.cell_tree;
        let mut vertex_of_root = vec![usize::MAX; shard.ncells()];
        let mut roots = Vec::new();
        for c in 0..shard.ncells() {
            if tree.is_root(c) {
                vertex_of_root[c] = roots.len();
                roots.push(c);
            }
        }
        let vertex_of = (0..shard.ncells())
            .map(|c| Ok(vertex_of_root[tree.root(c)?]))
            .collect::<Result<Vec<_>, MeshError>>()?;
        Ok(Self { roots, vertex_of })
    }

    pub fn n_vertices(&self) -> usize {
        self.roots.len()
    }
}

/// `2^depth` per vertex, with the depth estimate clamped to `[0, max_exponent]`.
pub fn vertex_weights(shard: &MeshShard, index: &RootIndex, max_exponent: u32) -> Vec<u64> {
    let mut depth = vec![0i64; index.n_vertices()];
    for (c, &flag) in shard.ref_data.iter().enumerate() {
        depth[index.vertex_of[c]] += flag as i64;
    }
    let cap = max_exponent.min(62) as i64;
    depth.into_iter().map(|d| 1u64 << d.clamp(0, cap)).collect()
}

/// Build this rank's slice of the distributed dual graph.
///
/// Collective: adjacency across interface patches is learned through a halo
/// exchange of root global ids.
pub fn build_dual_graph<C: Communicator>(
    shard: &MeshShard,
    index: &RootIndex,
    max_exponent: u32,
    comm: &C,
) -> Result<DualGraph, MeshError> {
    let gcells = shard.gcells();
    let root_gid = |c: usize| gcells[index.roots[index.vertex_of[c]]];
    let mut adj: Vec<BTreeSet<GlobalId>> = vec![BTreeSet::new(); index.n_vertices()];

    for f in 0..shard.nfaces() {
        let Some(n) = shard.neigh[f] else { continue };
        let o = shard.owner[f];
        let (vo, vn) = (index.vertex_of[o], index.vertex_of[n]);
        if vo != vn {
            adj[vo].insert(root_gid(n));
            adj[vn].insert(root_gid(o));
        }
    }

    let send: Vec<WireId> = (0..shard.ncells()).map(|c| WireId::of(root_gid(c))).collect();
    let remote = exchange_interface_data(shard, &send, 1, comm)?;
    for (patch, roots) in shard.patches.iter().zip(&remote) {
        for (&f, r) in patch.faces.iter().zip(roots) {
            adj[index.vertex_of[shard.owner[f]]].insert(r.get());
        }
    }

    let mut xadj = Vec::with_capacity(adj.len() + 1);
    let mut adjncy = Vec::new();
    xadj.push(0);
    for nbrs in adj {
        adjncy.extend(nbrs);
        xadj.push(adjncy.len());
    }
    let graph = DualGraph {
        vertex_gids: index.roots.iter().map(|&c| gcells[c]).collect(),
        xadj,
        adjncy,
        vwgt: vertex_weights(shard, index, max_exponent),
    };
    log::debug!(
        "rank {}: dual graph with {} vertices, {} arcs, weight {}",
        comm.rank(),
        graph.n_vertices(),
        graph.n_arcs(),
        graph.local_weight()
    );
    Ok(graph)
}

/// Destination rank of every local cell.
///
/// Collective. Partitioner failures are fatal and returned as errors.
pub fn map_cells<P: GraphPartitioner, C: Communicator>(
    shard: &MeshShard,
    partitioner: &P,
    max_exponent: u32,
    comm: &C,
) -> Result<Vec<usize>, MeshError> {
    let index = RootIndex::new(shard)?;
    let graph = build_dual_graph(shard, &index, max_exponent, comm)?;
    graph.validate()?;
    let parts = partitioner.partition(&graph, comm.size(), comm)?;
    check_parts(&parts, graph.n_vertices(), comm.size())?;
    Ok(expand_cell_map(&index, &parts))
}

/// Every cell follows the vertex of its tree root.
pub fn expand_cell_map(index: &RootIndex, vertex_parts: &[usize]) -> Vec<usize> {
    index.vertex_of.iter().map(|&v| vertex_parts[v]).collect()
}
