//! Owner/neighbor derivation for a freshly assembled shard.

use crate::mesh_error::MeshError;
use crate::topology::shard::MeshShard;

/// Owner and optional neighbor cell of every local face.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OwnerNeighbor {
    pub owner: Vec<usize>,
    pub neigh: Vec<Option<usize>>,
}

/// Rebuilds `owner`/`neigh` for a shard whose connectivity, tables and boundary
/// groups are final.
///
/// Implementations must not read `shard.owner` or `shard.neigh`. The result
/// must give every face exactly one owner; a face gets a neighbor exactly when
/// two local cells reference it.
pub trait OwnerNeighborDeriver {
    fn derive(&self, shard: &MeshShard) -> Result<OwnerNeighbor, MeshError>;
}

/// Orientation from cell order: the first cell referencing a face owns it, the
/// second one is its neighbor.
#[derive(Clone, Copy, Debug, Default)]
pub struct TopologicalOrientation;

impl OwnerNeighborDeriver for TopologicalOrientation {
    fn derive(&self, shard: &MeshShard) -> Result<OwnerNeighbor, MeshError> {
        let nf = shard.nfaces();
        let mut owner: Vec<Option<usize>> = vec![None; nf];
        let mut neigh: Vec<Option<usize>> = vec![None; nf];
        for (c, row) in shard.cells.rows().enumerate() {
            for &f in row {
                let gid = || shard.face_table.global(f).unwrap_or(f as u64);
                match (owner[f], neigh[f]) {
                    (None, _) => owner[f] = Some(c),
                    (Some(o), None) if o != c => neigh[f] = Some(c),
                    (Some(_), None) => {
                        return Err(MeshError::InvalidConnectivity(format!(
                            "cell {c} lists face {} twice",
                            gid()
                        )));
                    }
                    (Some(_), Some(_)) => {
                        return Err(MeshError::UnexpectedSharing {
                            face: gid(),
                            context: "owner/neighbor derivation",
                        });
                    }
                }
            }
        }
        let owner = owner
            .into_iter()
            .enumerate()
            .map(|(f, o)| {
                o.ok_or_else(|| {
                    MeshError::InvalidConnectivity(format!(
                        "face {} is referenced by no local cell",
                        shard.face_table.global(f).unwrap_or(f as u64)
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(OwnerNeighbor { owner, neigh })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::csr::Csr;
    use crate::topology::shard::tests::two_cubes;

    #[test]
    fn third_reference_is_unexpected_sharing() {
        let mut s = two_cubes(0);
        s.cells.push_row(&[1]);
        let err = TopologicalOrientation.derive(&s).unwrap_err();
        assert!(matches!(err, MeshError::UnexpectedSharing { face: 1, .. }));
    }

    #[test]
    fn unreferenced_face_is_invalid() {
        let mut s = two_cubes(0);
        s.cells = Csr::from_rows([vec![0, 1, 3, 4, 5, 6]]);
        assert!(matches!(
            TopologicalOrientation.derive(&s),
            Err(MeshError::InvalidConnectivity(_))
        ));
    }
}
