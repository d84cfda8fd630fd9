//! The per-rank mesh shard.
//!
//! A shard stores a face-based polyhedral mesh: faces list their points, cells
//! list their faces, and every local slot is paired with a permanent global id
//! through one [`GlobalIndexTable`] per entity kind.

use crate::config::AdaptParams;
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::cell_type::ElementType;
use crate::topology::csr::Csr;
use crate::topology::global_table::{EntityKind, GlobalIndexTable};
use crate::topology::orientation::{OwnerNeighborDeriver, TopologicalOrientation};
use crate::topology::patch::Patch;
use crate::topology::tree::RefinementTree;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named list of local boundary faces.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct BoundaryGroup {
    pub name: String,
    pub faces: Vec<usize>,
}

impl BoundaryGroup {
    pub fn new(name: impl Into<String>, faces: Vec<usize>) -> Self {
        Self {
            name: name.into(),
            faces,
        }
    }
}

/// Midpoints created by refinement, keyed by the unordered pair of edge end points.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EdgeCenters {
    map: BTreeMap<(usize, usize), usize>,
}

fn edge_key(p: usize, q: usize) -> (usize, usize) {
    if p <= q { (p, q) } else { (q, p) }
}

impl EdgeCenters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `center` as the midpoint of edge `{p, q}`; returns the previous center.
    pub fn insert(&mut self, p: usize, q: usize, center: usize) -> Option<usize> {
        self.map.insert(edge_key(p, q), center)
    }

    pub fn get(&self, p: usize, q: usize) -> Option<usize> {
        self.map.get(&edge_key(p, q)).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// `(p, q, center)` with `p < q`, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        self.map.iter().map(|(&(p, q), &c)| (p, q, c))
    }

    /// Entries whose edge joins two consecutive points of the polygon `ring`.
    pub fn on_polygon<'a>(
        &'a self,
        ring: &'a [usize],
    ) -> impl Iterator<Item = (usize, usize, usize)> + 'a {
        let n = ring.len();
        (0..n).filter_map(move |i| {
            let (p, q) = (ring[i], ring[(i + 1) % n]);
            self.get(p, q).map(|c| {
                let (a, b) = edge_key(p, q);
                (a, b, c)
            })
        })
    }
}

/// Local entity counts of a shard.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ShardCounts {
    pub cells: usize,
    pub faces: usize,
    pub points: usize,
}

/// Everything one rank owns of the distributed mesh.
#[derive(Clone, Debug)]
pub struct MeshShard {
    /// Point coordinates, indexed by local point id.
    pub coords: Vec<[f64; 3]>,
    /// Face to point adjacency (`ngon`).
    pub faces: Csr,
    /// Cell to face adjacency (`nface`).
    pub cells: Csr,
    pub cell_table: GlobalIndexTable,
    pub face_table: GlobalIndexTable,
    pub point_table: GlobalIndexTable,
    /// Local owner cell of each face.
    pub owner: Vec<usize>,
    /// Local neighbor cell of each face, `None` on boundary and interface faces.
    pub neigh: Vec<Option<usize>>,
    pub boundaries: Vec<BoundaryGroup>,
    /// One patch per neighbor rank, in increasing neighbor order.
    pub patches: Vec<Patch>,
    /// Per-cell refinement intent (positive: refine, negative: coarsen).
    pub ref_data: Vec<i32>,
    pub cell_tree: RefinementTree,
    pub face_tree: RefinementTree,
    pub edge_centers: EdgeCenters,
    pub params: AdaptParams,
}

impl MeshShard {
    /// Assemble a shard from connectivity and global ids.
    ///
    /// Owner/neighbor arrays come from [`TopologicalOrientation`]. Trees start as
    /// unrefined roots whose element types are guessed from face arities, and the
    /// remaining fields are empty.
    pub fn new(
        coords: Vec<[f64; 3]>,
        gpoints: &[GlobalId],
        faces: Csr,
        gfaces: &[GlobalId],
        cells: Csr,
        gcells: &[GlobalId],
    ) -> Result<Self, MeshError> {
        if coords.len() != gpoints.len() || faces.len() != gfaces.len() || cells.len() != gcells.len()
        {
            return Err(MeshError::InvalidConnectivity(format!(
                "{} points/{} faces/{} cells but {}/{}/{} global ids",
                coords.len(),
                faces.len(),
                cells.len(),
                gpoints.len(),
                gfaces.len(),
                gcells.len()
            )));
        }
        let face_tree = face_roots(&faces);
        let cell_tree = cell_roots(&cells, &faces);
        let mut shard = Self {
            coords,
            faces,
            cells,
            cell_table: GlobalIndexTable::from_globals(EntityKind::Cell, gcells)?,
            face_table: GlobalIndexTable::from_globals(EntityKind::Face, gfaces)?,
            point_table: GlobalIndexTable::from_globals(EntityKind::Point, gpoints)?,
            owner: Vec::new(),
            neigh: Vec::new(),
            boundaries: Vec::new(),
            patches: Vec::new(),
            ref_data: vec![0; gcells.len()],
            cell_tree,
            face_tree,
            edge_centers: EdgeCenters::new(),
            params: AdaptParams::default(),
        };
        shard.check_ranges()?;
        let on = TopologicalOrientation.derive(&shard)?;
        shard.owner = on.owner;
        shard.neigh = on.neigh;
        Ok(shard)
    }

    pub fn ncells(&self) -> usize {
        self.cells.len()
    }

    pub fn nfaces(&self) -> usize {
        self.faces.len()
    }

    pub fn npoints(&self) -> usize {
        self.coords.len()
    }

    pub fn counts(&self) -> ShardCounts {
        ShardCounts {
            cells: self.ncells(),
            faces: self.nfaces(),
            points: self.npoints(),
        }
    }

    pub fn gcells(&self) -> &[GlobalId] {
        self.cell_table.globals()
    }

    pub fn gfaces(&self) -> &[GlobalId] {
        self.face_table.globals()
    }

    pub fn gpoints(&self) -> &[GlobalId] {
        self.point_table.globals()
    }

    /// Per-face flag: does the face belong to a boundary group.
    pub fn boundary_mask(&self) -> Vec<bool> {
        let mut mask = vec![false; self.nfaces()];
        for g in &self.boundaries {
            for &f in &g.faces {
                if let Some(m) = mask.get_mut(f) {
                    *m = true;
                }
            }
        }
        mask
    }

    pub fn boundary(&self, name: &str) -> Option<&BoundaryGroup> {
        self.boundaries.iter().find(|g| g.name == name)
    }

    /// Faces with a local cell on both sides.
    pub fn n_internal_faces(&self) -> usize {
        self.neigh.iter().filter(|n| n.is_some()).count()
    }

    pub fn n_boundary_faces(&self) -> usize {
        self.boundary_mask().into_iter().filter(|&b| b).count()
    }

    pub fn n_patch_faces(&self) -> usize {
        self.patches.iter().map(Patch::len).sum()
    }

    pub fn patch(&self, neighbor: usize) -> Option<&Patch> {
        self.patches.iter().find(|p| p.neighbor == neighbor)
    }

    /// Range checks on the connectivity arrays alone.
    pub(crate) fn check_ranges(&self) -> Result<(), MeshError> {
        let (nf, np) = (self.nfaces(), self.npoints());
        if let Some(&p) = self.faces.values().iter().find(|&&p| p >= np) {
            return Err(MeshError::InvalidConnectivity(format!(
                "face references point {p} but the shard has {np} points"
            )));
        }
        if let Some(&f) = self.cells.values().iter().find(|&&f| f >= nf) {
            return Err(MeshError::InvalidConnectivity(format!(
                "cell references face {f} but the shard has {nf} faces"
            )));
        }
        Ok(())
    }
}

fn face_roots(faces: &Csr) -> RefinementTree {
    let mut tree = RefinementTree::roots(EntityKind::Face, 0, ElementType::Quadrilateral);
    for s in faces.strides() {
        let element = ElementType::from_face_arity(s).unwrap_or_default();
        tree.push(None, 0, element, Default::default());
    }
    tree
}

fn cell_roots(cells: &Csr, faces: &Csr) -> RefinementTree {
    let mut tree = RefinementTree::roots(EntityKind::Cell, 0, ElementType::Hexahedron);
    for row in cells.rows() {
        let arities: Vec<usize> = row
            .iter()
            .map(|&f| if f < faces.len() { faces.stride(f) } else { 0 })
            .collect();
        let element = ElementType::from_face_arities(&arities).unwrap_or(ElementType::Hexahedron);
        tree.push(None, 0, element, Default::default());
    }
    tree
}
