//! Shard invariant checks.

use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::shard::MeshShard;

fn invalid(msg: String) -> MeshError {
    MeshError::InvalidConnectivity(msg)
}

impl DebugInvariants for MeshShard {
    fn debug_assert_invariants(&self) {
        crate::debug_invariants!(self.validate_invariants(), "mesh shard");
    }

    fn validate_invariants(&self) -> Result<(), MeshError> {
        let (nc, nf, np) = (self.ncells(), self.nfaces(), self.npoints());

        if self.cell_table.len() != nc || self.face_table.len() != nf || self.point_table.len() != np
        {
            return Err(invalid(format!(
                "tables hold {}/{}/{} ids for {nc} cells, {nf} faces, {np} points",
                self.cell_table.len(),
                self.face_table.len(),
                self.point_table.len()
            )));
        }
        self.check_ranges()?;

        if self.owner.len() != nf || self.neigh.len() != nf {
            return Err(invalid(format!(
                "owner/neigh have {}/{} entries for {nf} faces",
                self.owner.len(),
                self.neigh.len()
            )));
        }
        let mut refs = vec![0u8; nf];
        for (c, row) in self.cells.rows().enumerate() {
            for &f in row {
                if self.owner[f] != c && self.neigh[f] != Some(c) {
                    return Err(invalid(format!(
                        "cell {c} references face {f} but is neither its owner nor neighbor"
                    )));
                }
                refs[f] = refs[f].saturating_add(1);
            }
        }
        for f in 0..nf {
            let expected = if self.neigh[f].is_some() { 2 } else { 1 };
            if refs[f] != expected || self.owner[f] >= nc || self.neigh[f] == Some(self.owner[f]) {
                return Err(invalid(format!(
                    "face {f} is referenced {} times, owner {} neighbor {:?}",
                    refs[f], self.owner[f], self.neigh[f]
                )));
            }
        }

        for g in &self.boundaries {
            if let Some(&f) = g.faces.iter().find(|&&f| f >= nf) {
                return Err(invalid(format!("boundary '{}' lists face {f} of {nf}", g.name)));
            }
        }

        let mut in_patch = vec![false; nf];
        for p in &self.patches {
            if p.faces.len() != p.remote_cells.len() {
                return Err(invalid(format!(
                    "patch with rank {} has {} faces and {} remote cells",
                    p.neighbor,
                    p.faces.len(),
                    p.remote_cells.len()
                )));
            }
            for &f in &p.faces {
                if f >= nf || self.neigh[f].is_some() {
                    return Err(invalid(format!(
                        "patch face {f} is out of range or has a local neighbor"
                    )));
                }
                if std::mem::replace(&mut in_patch[f], true) {
                    return Err(invalid(format!("face {f} belongs to two patches")));
                }
            }
            if let Some(&gc) = p.remote_cells.iter().find(|&&gc| self.cell_table.contains(gc)) {
                return Err(invalid(format!(
                    "patch with rank {} names local cell {gc} as remote",
                    p.neighbor
                )));
            }
        }

        if self.ref_data.len() != nc {
            return Err(invalid(format!(
                "ref_data has {} entries for {nc} cells",
                self.ref_data.len()
            )));
        }
        if self.cell_tree.len() != nc || self.face_tree.len() != nf {
            return Err(invalid(format!(
                "trees hold {}/{} entities for {nc} cells and {nf} faces",
                self.cell_tree.len(),
                self.face_tree.len()
            )));
        }
        self.cell_tree.validate()?;
        self.face_tree.validate()?;

        if let Some((p, q, c)) = self.edge_centers.iter().find(|&(p, q, c)| p.max(q).max(c) >= np) {
            return Err(invalid(format!("edge center ({p}, {q}) -> {c} is out of range")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::patch::Patch;
    use crate::topology::shard::tests::two_cubes;

    #[test]
    fn fresh_shard_is_valid() {
        two_cubes(0).validate_invariants().unwrap();
    }

    #[test]
    fn patch_face_with_neighbor_is_rejected() {
        let mut s = two_cubes(0);
        s.patches.push(Patch::from_pairs(1, vec![(1, 99)]));
        assert!(s.validate_invariants().is_err());
    }

    #[test]
    fn face_in_two_patches_is_rejected() {
        let mut s = two_cubes(0);
        s.patches.push(Patch::from_pairs(1, vec![(0, 99)]));
        s.validate_invariants().unwrap();
        s.patches.push(Patch::from_pairs(2, vec![(0, 98)]));
        assert!(s.validate_invariants().is_err());
    }

    #[test]
    fn patch_naming_a_local_cell_is_rejected() {
        let mut s = two_cubes(0);
        // cell gid 1 lives on this shard
        s.patches.push(Patch::from_pairs(1, vec![(0, 1)]));
        assert!(matches!(
            s.validate_invariants(),
            Err(MeshError::InvalidConnectivity(msg)) if msg.contains("local cell 1")
        ));
        s.patches[0].remote_cells[0] = 99;
        s.validate_invariants().unwrap();
        s.patches[0].remote_cells.push(98);
        assert!(s.validate_invariants().is_err());
    }

    #[test]
    fn ref_data_length_is_checked() {
        let mut s = two_cubes(0);
        s.ref_data.pop();
        assert!(s.validate_invariants().is_err());
    }
}
