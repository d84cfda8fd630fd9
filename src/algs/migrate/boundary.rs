//! Boundary groups follow the owner cell of each boundary face.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::{ExchangePlan, all_gatherv, sort_by_destination};
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::global_table::GlobalIndexTable;
use crate::topology::shard::{BoundaryGroup, MeshShard};

/// Union of the group names of every rank, in first-seen rank order.
///
/// A rank may hold no faces of a group, or no groups at all (an empty shard).
fn group_names<C: Communicator>(shard: &MeshShard, comm: &C) -> Result<Vec<String>, MeshError> {
    let mut local = Vec::new();
    for g in &shard.boundaries {
        local.extend_from_slice(&(g.name.len() as u32).to_le_bytes());
        local.extend_from_slice(g.name.as_bytes());
    }
    let (_, all) = all_gatherv(&local, comm)?;

    let mut names: Vec<String> = Vec::new();
    let mut rest: &[u8] = &all;
    while let [a, b, c, d, tail @ ..] = rest {
        let len = u32::from_le_bytes([*a, *b, *c, *d]) as usize;
        if len > tail.len() {
            return Err(MeshError::BufferMismatch {
                context: "boundary group names",
                expected: len,
                actual: tail.len(),
            });
        }
        let (name, tail) = tail.split_at(len);
        let name = String::from_utf8_lossy(name);
        if !names.iter().any(|n| *n == name) {
            names.push(name.into_owned());
        }
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(MeshError::BufferMismatch {
            context: "boundary group names",
            expected: 0,
            actual: rest.len(),
        });
    }
    Ok(names)
}

/// Migrate every boundary group, one exchange per group name known to any rank.
pub(crate) fn migrate_boundaries<C: Communicator>(
    shard: &MeshShard,
    cell_map: &[usize],
    new_faces: &GlobalIndexTable,
    comm: &C,
) -> Result<Vec<BoundaryGroup>, MeshError> {
    let no_faces: Vec<usize> = Vec::new();
    group_names(shard, comm)?
        .into_iter()
        .map(|name| {
            let faces = shard.boundary(&name).map_or(&no_faces, |g| &g.faces);
            let dest: Vec<usize> = faces.iter().map(|&f| cell_map[shard.owner[f]]).collect();
            let plan = ExchangePlan::from_destinations(&dest, comm)?;
            let send: Vec<GlobalId> = sort_by_destination(&dest)
                .into_iter()
                .map(|i| shard.gfaces()[faces[i]])
                .collect();
            let recv = plan.exchange_ids(&send, comm)?;
            // the owner cell came here, so its faces were registered
            let faces = new_faces.localize(&recv)?;
            Ok(BoundaryGroup::new(name, faces))
        })
        .collect()
}
