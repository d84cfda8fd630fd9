//! Distributed CSR *dual graph* handed to the partitioner.
//
// One vertex per local refinement-tree root. Vertices are named by the global
// id of their root cell, so adjacency can point at vertices held by another
// rank:
//
// * `xadj[i] .. xadj[i+1]`   = neighbour list of local vertex *i*
// * `adjncy`                 = concatenated neighbour vertex global ids
// * `vwgt[i]`                = vertex weight (>= 1)
//
// The graph is symmetric across ranks and self-free.

use crate::partitioning::error::PartitionError;
use crate::topology::GlobalId;

#[derive(Debug, Clone, Default)]
pub struct DualGraph {
    pub vertex_gids: Vec<GlobalId>,
    pub xadj: Vec<usize>,
    pub adjncy: Vec<GlobalId>,
    pub vwgt: Vec<u64>,
}

impl DualGraph {
    pub fn n_vertices(&self) -> usize {
        self.vertex_gids.len()
    }

    pub fn n_arcs(&self) -> usize {
        self.adjncy.len()
    }

    pub fn neighbors(&self, v: usize) -> &[GlobalId] {
        &self.adjncy[self.xadj[v]..self.xadj[v + 1]]
    }

    /// Total vertex weight, saturating at `u64::MAX`.
    pub fn local_weight(&self) -> u64 {
        self.vwgt.iter().copied().fold(0, u64::saturating_add)
    }

    /// Exact total vertex weight.
    pub fn local_weight_wide(&self) -> u128 {
        self.vwgt.iter().map(|&w| w as u128).sum()
    }

    /// Shape checks; rejects self loops and zero weights.
    pub fn validate(&self) -> Result<(), PartitionError> {
        let n = self.n_vertices();
        if self.xadj.len() != n + 1 || self.vwgt.len() != n {
            return Err(PartitionError::InvalidGraph(format!(
                "{n} vertices but xadj has {} and vwgt {} entries",
                self.xadj.len(),
                self.vwgt.len()
            )));
        }
        if self.xadj[0] != 0
            || self.xadj.windows(2).any(|w| w[0] > w[1])
            || self.xadj[n] != self.adjncy.len()
        {
            return Err(PartitionError::InvalidGraph("xadj is not a CSR offset array".into()));
        }
        for v in 0..n {
            if self.neighbors(v).contains(&self.vertex_gids[v]) {
                return Err(PartitionError::InvalidGraph(format!(
                    "vertex {} is adjacent to itself",
                    self.vertex_gids[v]
                )));
            }
        }
        if let Some(v) = self.vwgt.iter().position(|&w| w == 0) {
            return Err(PartitionError::InvalidGraph(format!(
                "vertex {} has zero weight",
                self.vertex_gids[v]
            )));
        }
        Ok(())
    }
}
