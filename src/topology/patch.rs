//! Interface patches: faces shared with exactly one neighbor rank.
use crate::topology::GlobalId;
use serde::{Deserialize, Serialize};

/// Faces this rank shares with `neighbor`, paired with the neighbor-side cell.
///
/// `faces[i]` is a local face id and `remote_cells[i]` the global id of the cell
/// on the far side. Entries are sorted by local face id.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    pub neighbor: usize,
    pub faces: Vec<usize>,
    pub remote_cells: Vec<GlobalId>,
}

impl Patch {
    /// Build a patch from unordered `(local face, remote cell)` pairs.
    pub fn from_pairs(neighbor: usize, mut pairs: Vec<(usize, GlobalId)>) -> Self {
        pairs.sort_unstable_by_key(|&(face, _)| face);
        let (faces, remote_cells) = pairs.into_iter().unzip();
        Self {
            neighbor,
            faces,
            remote_cells,
        }
    }

    pub fn len(&self) -> usize {
        self.faces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }

    /// Returns iterator over `(local face, remote cell)`.
    pub fn links(&self) -> impl Iterator<Item = (usize, GlobalId)> + '_ {
        self.faces
            .iter()
            .copied()
            .zip(self.remote_cells.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_sorted_by_local_face() {
        let p = Patch::from_pairs(3, vec![(9, 100), (2, 7), (5, 42)]);
        assert_eq!(p.neighbor, 3);
        assert_eq!(p.faces, vec![2, 5, 9]);
        assert_eq!(p.remote_cells, vec![7, 42, 100]);
        assert_eq!(p.links().nth(1), Some((5, 42)));
    }
}
