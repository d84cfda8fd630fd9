//! Structured, distributed hexahedral box meshes with boundary groups,
//! interface patches and an optional level of refinement.
//!
//! The box is cut into slabs of whole `z` layers, one slab per rank. Global
//! ids are a function of lattice position only, so every rank agrees on them
//! without communication.

use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::csr::Csr;
use crate::topology::global_table::{EntityKind, GlobalIndexTable};
use crate::topology::patch::Patch;
use crate::topology::shard::{BoundaryGroup, MeshShard};
use crate::topology::tree::EntityState;
use std::collections::BTreeMap;

/// Boundary group name for the minimum-x side.
pub const BOUNDARY_X_MIN: &str = "boundary_x_min";
/// Boundary group name for the maximum-x side.
pub const BOUNDARY_X_MAX: &str = "boundary_x_max";
/// Boundary group name for the minimum-y side.
pub const BOUNDARY_Y_MIN: &str = "boundary_y_min";
/// Boundary group name for the maximum-y side.
pub const BOUNDARY_Y_MAX: &str = "boundary_y_max";
/// Boundary group name for the minimum-z side.
pub const BOUNDARY_Z_MIN: &str = "boundary_z_min";
/// Boundary group name for the maximum-z side.
pub const BOUNDARY_Z_MAX: &str = "boundary_z_max";

const BOUNDARY_NAMES: [&str; 6] = [
    BOUNDARY_X_MIN,
    BOUNDARY_X_MAX,
    BOUNDARY_Y_MIN,
    BOUNDARY_Y_MAX,
    BOUNDARY_Z_MIN,
    BOUNDARY_Z_MAX,
];

/// Box mesh description.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxMeshOptions {
    /// Coarse cells per axis.
    pub n: [usize; 3],
    pub min: [f64; 3],
    pub max: [f64; 3],
    /// Split every coarse cell into 8 children and every coarse face into 4.
    ///
    /// Parents stay in the shard with state `Split`; midpoints of coarse edges
    /// are recorded as edge centers.
    pub refined: bool,
}

impl BoxMeshOptions {
    /// Unit cube with `nx`×`ny`×`nz` coarse cells.
    pub fn unit(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            n: [nx, ny, nz],
            min: [0.0; 3],
            max: [1.0; 3],
            refined: false,
        }
    }

    pub fn refined(mut self) -> Self {
        self.refined = true;
        self
    }

    /// Total number of cells over all ranks.
    pub fn n_cells(&self) -> usize {
        let coarse = Lattice { n: self.n }.n_cells();
        if self.refined { coarse * 9 } else { coarse }
    }

    /// Total number of distinct faces over all ranks.
    pub fn n_faces(&self) -> usize {
        let coarse = Lattice { n: self.n };
        if self.refined {
            coarse.n_faces() + coarse.scaled(2).n_faces()
        } else {
            coarse.n_faces()
        }
    }

    /// Total number of distinct points over all ranks.
    pub fn n_points(&self) -> usize {
        self.point_lattice().n_points()
    }

    fn point_lattice(&self) -> Lattice {
        Lattice { n: self.n }.scaled(if self.refined { 2 } else { 1 })
    }
}

/// Coarse `z` layers `[k0, k1)` assigned to `rank`.
pub fn slab(nz: usize, rank: usize, size: usize) -> (usize, usize) {
    (rank * nz / size, (rank + 1) * nz / size)
}

fn rank_of_layer(nz: usize, k: usize, size: usize) -> usize {
    (0..size)
        .find(|&r| {
            let (k0, k1) = slab(nz, r, size);
            k0 <= k && k < k1
        })
        .unwrap_or(size - 1)
}

/// Cell, face and point numbering of a structured grid with `n` cells per axis.
#[derive(Clone, Copy, Debug)]
struct Lattice {
    n: [usize; 3],
}

impl Lattice {
    fn scaled(self, s: usize) -> Self {
        Self {
            n: self.n.map(|v| v * s),
        }
    }

    fn n_cells(&self) -> usize {
        self.n.iter().product()
    }

    fn n_points(&self) -> usize {
        self.n.iter().map(|v| v + 1).product()
    }

    fn face_extent(&self, axis: usize) -> [usize; 3] {
        let mut e = self.n;
        e[axis] += 1;
        e
    }

    fn n_faces(&self) -> usize {
        (0..3).map(|a| self.face_extent(a).iter().product::<usize>()).sum()
    }

    fn cell(&self, c: [usize; 3]) -> GlobalId {
        (c[0] + self.n[0] * (c[1] + self.n[1] * c[2])) as GlobalId
    }

    fn point(&self, p: [usize; 3]) -> GlobalId {
        (p[0] + (self.n[0] + 1) * (p[1] + (self.n[1] + 1) * p[2])) as GlobalId
    }

    fn face(&self, axis: usize, f: [usize; 3]) -> GlobalId {
        let offset: usize = (0..axis).map(|a| self.face_extent(a).iter().product::<usize>()).sum();
        let e = self.face_extent(axis);
        (offset + f[0] + e[0] * (f[1] + e[1] * f[2])) as GlobalId
    }
}

fn step(p: [usize; 3], axis: usize, by: usize) -> [usize; 3] {
    let mut q = p;
    q[axis] += by;
    q
}

fn tangents(axis: usize) -> (usize, usize) {
    match axis {
        0 => (1, 2),
        1 => (0, 2),
        _ => (0, 1),
    }
}

/// Corners of the face with lower corner `f` and normal `axis`, scaled by `s`.
fn face_ring(axis: usize, f: [usize; 3], s: usize) -> [[usize; 3]; 4] {
    let (u, v) = tangents(axis);
    let p = f.map(|x| x * s);
    [p, step(p, u, s), step(step(p, u, s), v, s), step(p, v, s)]
}

/// Where a local face sits in its lattice.
#[derive(Clone, Copy, Debug)]
struct FacePos {
    axis: usize,
    at: [usize; 3],
    fine: bool,
}

struct Builder {
    opts: BoxMeshOptions,
    coarse: Lattice,
    fine: Lattice,
    points: GlobalIndexTable,
    coords: Vec<[f64; 3]>,
    faces: GlobalIndexTable,
    face_pos: Vec<FacePos>,
    ngon: Csr,
    nface: Csr,
    gcells: Vec<GlobalId>,
}

impl Builder {
    fn new(opts: BoxMeshOptions) -> Self {
        let coarse = Lattice { n: opts.n };
        Self {
            opts,
            coarse,
            fine: coarse.scaled(2),
            points: GlobalIndexTable::new(EntityKind::Point),
            coords: Vec::new(),
            faces: GlobalIndexTable::new(EntityKind::Face),
            face_pos: Vec::new(),
            ngon: Csr::new(),
            nface: Csr::new(),
            gcells: Vec::new(),
        }
    }

    fn cell_gid(&self, c: [usize; 3], fine: bool) -> GlobalId {
        if fine {
            self.coarse.n_cells() as GlobalId + self.fine.cell(c)
        } else {
            self.coarse.cell(c)
        }
    }

    fn face_gid(&self, axis: usize, f: [usize; 3], fine: bool) -> GlobalId {
        if fine {
            self.coarse.n_faces() as GlobalId + self.fine.face(axis, f)
        } else {
            self.coarse.face(axis, f)
        }
    }

    fn point_slot(&mut self, p: [usize; 3]) -> usize {
        let lattice = self.opts.point_lattice();
        let (slot, new) = self.points.register(lattice.point(p));
        if new {
            let BoxMeshOptions { min, max, .. } = self.opts;
            self.coords.push(std::array::from_fn(|a| {
                min[a] + (max[a] - min[a]) * p[a] as f64 / lattice.n[a] as f64
            }));
        }
        slot
    }

    fn face_slot(&mut self, axis: usize, f: [usize; 3], fine: bool) -> usize {
        let gid = self.face_gid(axis, f, fine);
        let (slot, new) = self.faces.register(gid);
        if new {
            let scale = if fine || !self.opts.refined { 1 } else { 2 };
            let ring = face_ring(axis, f, scale).map(|p| self.point_slot(p));
            self.ngon.push_row(&ring);
            self.face_pos.push(FacePos { axis, at: f, fine });
        }
        slot
    }

    fn add_cell(&mut self, c: [usize; 3], fine: bool) -> usize {
        let mut row = [0usize; 6];
        for axis in 0..3 {
            row[2 * axis] = self.face_slot(axis, c, fine);
            row[2 * axis + 1] = self.face_slot(axis, step(c, axis, 1), fine);
        }
        self.gcells.push(self.cell_gid(c, fine));
        self.nface.push_row(&row)
    }

    fn boundaries(&self) -> Vec<BoundaryGroup> {
        let mut groups: Vec<BoundaryGroup> =
            BOUNDARY_NAMES.iter().map(|&name| BoundaryGroup::new(name, Vec::new())).collect();
        for (slot, pos) in self.face_pos.iter().enumerate() {
            let n = if pos.fine { self.fine.n } else { self.coarse.n };
            if pos.at[pos.axis] == 0 {
                groups[2 * pos.axis].faces.push(slot);
            } else if pos.at[pos.axis] == n[pos.axis] {
                groups[2 * pos.axis + 1].faces.push(slot);
            }
        }
        groups
    }

    fn patches(&self, rank: usize, size: usize) -> Vec<Patch> {
        let nz = self.opts.n[2];
        let (k0, k1) = slab(nz, rank, size);
        let mut pairs: BTreeMap<usize, Vec<(usize, GlobalId)>> = BTreeMap::new();
        for (slot, pos) in self.face_pos.iter().enumerate() {
            if pos.axis != 2 {
                continue;
            }
            let s = if pos.fine { 2 } else { 1 };
            let k = pos.at[2];
            let (remote, layer) = if k0 > 0 && k == k0 * s {
                ([pos.at[0], pos.at[1], k - 1], k0 - 1)
            } else if k1 < nz && k == k1 * s {
                (pos.at, k1)
            } else {
                continue;
            };
            pairs
                .entry(rank_of_layer(nz, layer, size))
                .or_default()
                .push((slot, self.cell_gid(remote, pos.fine)));
        }
        pairs
            .into_iter()
            .map(|(neighbor, p)| Patch::from_pairs(neighbor, p))
            .collect()
    }
}

fn invalid_box(message: impl Into<String>) -> MeshError {
    MeshError::InvalidConnectivity(message.into())
}

/// The shard of a hexahedral box owned by `rank` out of `size` ranks.
///
/// Every rank gets a slab of whole coarse `z` layers. With more ranks than
/// layers some slabs are empty.
pub fn distributed_hex_box(
    opts: BoxMeshOptions,
    rank: usize,
    size: usize,
) -> Result<MeshShard, MeshError> {
    if opts.n.contains(&0) {
        return Err(invalid_box("nx, ny, and nz must be positive"));
    }
    if size == 0 || rank >= size {
        return Err(invalid_box(format!("rank {rank} out of {size}")));
    }
    let [nx, ny, _] = opts.n;
    let (k0, k1) = slab(opts.n[2], rank, size);

    let mut b = Builder::new(opts);
    let mut coarse_cells = Vec::new();
    for k in k0..k1 {
        for j in 0..ny {
            for i in 0..nx {
                coarse_cells.push(([i, j, k], b.add_cell([i, j, k], false)));
            }
        }
    }
    let mut children = Vec::new();
    if opts.refined {
        for &(c, _) in &coarse_cells {
            let kids: Vec<usize> = (0..8)
                .map(|o| {
                    let fc = [2 * c[0] + (o & 1), 2 * c[1] + ((o >> 1) & 1), 2 * c[2] + (o >> 2)];
                    b.add_cell(fc, true)
                })
                .collect();
            children.push(kids);
        }
    }

    let boundaries = b.boundaries();
    let patches = b.patches(rank, size);
    let mut shard = MeshShard::new(
        b.coords,
        b.points.globals(),
        b.ngon,
        b.faces.globals(),
        b.nface,
        &b.gcells,
    )?;
    shard.boundaries = boundaries;
    shard.patches = patches;

    if opts.refined {
        for (&(_, parent), kids) in coarse_cells.iter().zip(children) {
            shard.cell_tree.push_generation(parent, kids)?;
            shard.cell_tree.set_state(parent, EntityState::Split);
        }
        refine_faces(&mut shard, &b.face_pos, &b.coarse, &b.fine)?;
    }
    Ok(shard)
}

/// Face tree generations and edge centers of every local coarse face.
fn refine_faces(
    shard: &mut MeshShard,
    face_pos: &[FacePos],
    coarse: &Lattice,
    fine: &Lattice,
) -> Result<(), MeshError> {
    for (slot, pos) in face_pos.iter().enumerate() {
        if pos.fine {
            continue;
        }
        let (u, v) = tangents(pos.axis);
        let base = pos.at.map(|x| 2 * x);
        let kids: Option<Vec<usize>> = [(0, 0), (1, 0), (1, 1), (0, 1)]
            .into_iter()
            .map(|(a, c)| {
                let gid = coarse.n_faces() as GlobalId + fine.face(pos.axis, step(step(base, u, a), v, c));
                shard.face_table.get(gid)
            })
            .collect();
        if let Some(kids) = kids {
            shard.face_tree.push_generation(slot, kids)?;
            shard.face_tree.set_state(slot, EntityState::Split);
        }

        let ring = face_ring(pos.axis, pos.at, 2);
        for i in 0..4 {
            let (p, q) = (ring[i], ring[(i + 1) % 4]);
            let mid: [usize; 3] = std::array::from_fn(|a| (p[a] + q[a]) / 2);
            let slots = [p, q, mid].map(|x| shard.point_table.get(fine.point(x)));
            if let [Some(p), Some(q), Some(c)] = slots {
                shard.edge_centers.insert(p, q, c);
            }
        }
    }
    Ok(())
}

/// Single-rank hexahedral box.
pub fn hex_box(opts: BoxMeshOptions) -> Result<MeshShard, MeshError> {
    distributed_hex_box(opts, 0, 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debug_invariants::DebugInvariants;

    #[test]
    fn coarse_box_counts() {
        let s = hex_box(BoxMeshOptions::unit(2, 3, 4)).unwrap();
        assert_eq!(s.ncells(), 24);
        assert_eq!(s.nfaces(), 3 * 3 * 4 + 2 * 4 * 4 + 2 * 3 * 5);
        assert_eq!(s.npoints(), 3 * 4 * 5);
        assert_eq!(s.boundary(BOUNDARY_X_MIN).unwrap().faces.len(), 12);
        assert_eq!(s.boundary(BOUNDARY_Z_MAX).unwrap().faces.len(), 6);
        assert!(s.patches.is_empty());
        s.validate_invariants().unwrap();
    }

    #[test]
    fn slabs_cover_all_layers() {
        let ranges: Vec<_> = (0..3).map(|r| slab(5, r, 3)).collect();
        assert_eq!(ranges, vec![(0, 1), (1, 3), (3, 5)]);
        assert_eq!(rank_of_layer(5, 2, 3), 1);
    }

    #[test]
    fn middle_rank_has_two_patches() {
        let opts = BoxMeshOptions::unit(2, 2, 3);
        let s = distributed_hex_box(opts, 1, 3).unwrap();
        assert_eq!(s.ncells(), 4);
        let neighbors: Vec<usize> = s.patches.iter().map(|p| p.neighbor).collect();
        assert_eq!(neighbors, vec![0, 2]);
        // the cell below (0, 0, 1) is (0, 0, 0)
        let below = s.patch(0).unwrap();
        assert_eq!(below.len(), 4);
        assert!(below.remote_cells.contains(&0));
        s.validate_invariants().unwrap();
    }

    #[test]
    fn refined_box_has_trees_and_edge_centers() {
        let opts = BoxMeshOptions::unit(1, 1, 1).refined();
        let s = hex_box(opts).unwrap();
        assert_eq!(s.ncells(), opts.n_cells());
        assert_eq!(s.nfaces(), opts.n_faces());
        assert_eq!(s.npoints(), 27);
        assert_eq!(s.cell_tree.generations(0)[0].children.len(), 8);
        assert_eq!(s.cell_tree.state(0), EntityState::Split);
        assert_eq!(s.cell_tree.level(5), 1);
        for f in 0..6 {
            assert_eq!(s.face_tree.children_per_generation(f), 4);
        }
        assert_eq!(s.edge_centers.len(), 12);
        s.validate_invariants().unwrap();
    }

    #[test]
    fn extra_ranks_get_empty_shards() {
        // two layers over four ranks: (0, 0), (0, 1), (1, 1), (1, 2)
        let opts = BoxMeshOptions::unit(1, 1, 2);
        for rank in [0, 2] {
            let s = distributed_hex_box(opts, rank, 4).unwrap();
            assert_eq!(s.ncells(), 0);
            assert!(s.patches.is_empty());
        }
        let top = distributed_hex_box(opts, 3, 4).unwrap();
        assert_eq!(top.ncells(), 1);
        assert_eq!(top.patches.len(), 1);
        assert_eq!(top.patches[0].neighbor, 1);
    }
}
