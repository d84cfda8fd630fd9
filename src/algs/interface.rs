//! Ghost interface builder.
//!
//! After migration a face is a boundary face (in some boundary group), an
//! internal face (local neighbor cell), or an interface candidate. Candidates
//! are announced to every rank; the rank holding the other side answers with
//! its owner cell, and answers are grouped into one patch per responding rank.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::{ExchangePlan, all_gatherv};
use crate::algs::wire::{WireId, WireInterfaceReply};
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::patch::Patch;
use crate::topology::shard::MeshShard;
use hashbrown::HashMap;

/// Global ids of the local faces that are neither boundary nor internal.
pub fn interface_candidates(shard: &MeshShard) -> Vec<GlobalId> {
    let boundary = shard.boundary_mask();
    (0..shard.nfaces())
        .filter(|&f| !boundary[f] && shard.neigh[f].is_none())
        .map(|f| shard.gfaces()[f])
        .collect()
}

/// Rebuild the interface patches of `shard`. Collective.
///
/// Patches come out in increasing neighbor order, each sorted by local face id.
pub fn build_patches<C: Communicator>(shard: &MeshShard, comm: &C) -> Result<Vec<Patch>, MeshError> {
    let (me, n) = (comm.rank(), comm.size());
    let candidates: Vec<WireId> = interface_candidates(shard).into_iter().map(WireId::of).collect();
    let (counts, announced) = all_gatherv(&candidates, comm)?;

    // answer the candidates of other ranks that this rank holds; a conflict is
    // reported only after the reply exchange so that no peer is left waiting
    let mut conflict = None;
    let mut send_counts = vec![0usize; n];
    let mut replies = Vec::new();
    let mut off = 0;
    for (r, &cnt) in counts.iter().enumerate() {
        let block = &announced[off..off + cnt];
        off += cnt;
        if r == me {
            continue;
        }
        for w in block {
            let gid = w.get();
            let Some(f) = shard.face_table.get(gid) else { continue };
            if shard.neigh[f].is_some() {
                conflict.get_or_insert(MeshError::UnexpectedSharing {
                    face: gid,
                    context: "interface face with a local neighbor",
                });
                continue;
            }
            replies.push(WireInterfaceReply::new(gid, shard.gcells()[shard.owner[f]]));
            send_counts[r] += 1;
        }
    }
    let plan = ExchangePlan::from_send_counts(send_counts, comm)?;
    let answers = plan.exchange(&replies, comm)?;
    if let Some(err) = conflict {
        return Err(err);
    }

    let mut answered: HashMap<GlobalId, usize> = HashMap::with_capacity(answers.len());
    let mut pairs: Vec<Vec<(usize, GlobalId)>> = vec![Vec::new(); n];
    for r in 0..n {
        for a in &answers[plan.recv_range(r)] {
            if let Some(first) = answered.insert(a.face(), r) {
                return Err(MeshError::NonManifoldInterface {
                    face: a.face(),
                    first,
                    second: r,
                });
            }
            let f = shard.face_table.lookup(a.face())?;
            if shard.cell_table.contains(a.cell()) {
                return Err(MeshError::UnexpectedSharing {
                    face: a.face(),
                    context: "remote cell of an interface face is local",
                });
            }
            pairs[r].push((f, a.cell()));
        }
    }

    let unanswered = candidates.len() - answered.len();
    if unanswered > 0 {
        log::warn!("rank {me}: {unanswered} interface candidate faces found no neighbor rank");
    }

    Ok(pairs
        .into_iter()
        .enumerate()
        .filter(|(_, p)| !p.is_empty())
        .map(|(r, p)| Patch::from_pairs(r, p))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::{NoComm, run_local};
    use crate::topology::csr::Csr;
    use crate::topology::shard::BoundaryGroup;
    use crate::topology::shard::tests::two_cubes;

    /// A unit cube whose first face has global id `shared`; the other faces
    /// get ids private to `cell`.
    fn lone_cube(cell: GlobalId, shared: GlobalId) -> MeshShard {
        let coords: Vec<[f64; 3]> = (0..8)
            .map(|i| [(i & 1) as f64, ((i >> 1) & 1) as f64, (i >> 2) as f64])
            .collect();
        let faces = Csr::from_rows([
            vec![0, 2, 6, 4],
            vec![1, 3, 7, 5],
            vec![0, 1, 5, 4],
            vec![2, 3, 7, 6],
            vec![0, 1, 3, 2],
            vec![4, 5, 7, 6],
        ]);
        let cells = Csr::from_rows([vec![0, 1, 2, 3, 4, 5]]);
        let gfaces: Vec<GlobalId> = std::iter::once(shared)
            .chain((1..6).map(|i| 100 * (cell + 1) + i))
            .collect();
        let gpoints: Vec<GlobalId> = (0..8).map(|i| 100 * (cell + 1) + i).collect();
        MeshShard::new(coords, &gpoints, faces, &gfaces, cells, &[cell]).unwrap()
    }

    #[test]
    fn boundary_and_internal_faces_are_not_candidates() {
        let mut s = two_cubes(0);
        assert_eq!(interface_candidates(&s).len(), 10);
        s.boundaries.push(BoundaryGroup::new("wall", vec![0, 2, 3]));
        let c = interface_candidates(&s);
        assert_eq!(c.len(), 7);
        assert!(!c.contains(&1));
    }

    #[test]
    fn face_on_three_ranks_is_non_manifold() {
        let out = run_local(3, |comm| {
            let s = lone_cube(comm.rank() as GlobalId, 1000);
            build_patches(&s, &comm).unwrap_err()
        });
        for err in out {
            assert!(
                matches!(err, MeshError::NonManifoldInterface { face: 1000, .. }),
                "{err}"
            );
        }
    }

    #[test]
    fn remote_cell_with_a_local_id_is_rejected() {
        let out = run_local(2, |comm| build_patches(&lone_cube(7, 1000), &comm).unwrap_err());
        for err in out {
            assert!(matches!(err, MeshError::UnexpectedSharing { face: 1000, .. }), "{err}");
        }
    }

    #[test]
    fn candidate_internal_elsewhere_is_rejected_without_stalling() {
        // face gid 1 is internal on rank 0 but a candidate on rank 1
        let out = run_local(2, |comm| {
            let s = if comm.rank() == 0 { two_cubes(0) } else { lone_cube(50, 1) };
            build_patches(&s, &comm)
        });
        assert!(matches!(
            out[0],
            Err(MeshError::UnexpectedSharing { face: 1, .. })
        ));
        assert!(out[1].as_ref().is_ok_and(|p| p.is_empty()));
    }

    #[test]
    fn two_lone_cubes_share_one_patch() {
        let out = run_local(2, |comm| {
            let s = lone_cube(comm.rank() as GlobalId, 1000);
            build_patches(&s, &comm).unwrap()
        });
        assert_eq!(out[0], vec![Patch::from_pairs(1, vec![(0, 1)])]);
        assert_eq!(out[1], vec![Patch::from_pairs(0, vec![(0, 0)])]);
    }

    #[test]
    fn single_rank_has_no_patches() {
        let s = two_cubes(0);
        assert!(build_patches(&s, &NoComm).unwrap().is_empty());
    }
}
