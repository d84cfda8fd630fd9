//! Refinement hierarchy migration.
//!
//! A tree entity travels with the entity it describes, through the same plan.
//! Two passes: a fixed record per entity (parent, level, element, state), then
//! the variable-length generation lists, which get their own count exchange.
//! Parents and children are re-linked through the destination's global index
//! table once every record has been received.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::ExchangePlan;
use crate::algs::wire::WireTreeRecord;
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::cell_type::ElementType;
use crate::topology::global_table::GlobalIndexTable;
use crate::topology::tree::{EntityState, RefinementTree};

/// What to do when a parent or child did not come along.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MissingRelative {
    /// The entity must be local; a miss is [`MeshError::NotFound`].
    Fatal,
    /// Relink a missing parent to self and drop a generation with a missing child.
    Prune,
}

/// Rebuild `old` on the receiving side of `plan`.
///
/// `sent` lists the old local ids in send order; received entity `j` must be
/// slot `j` of `new_table`.
pub(crate) fn migrate_tree<C: Communicator>(
    old: &RefinementTree,
    old_table: &GlobalIndexTable,
    sent: &[usize],
    plan: &ExchangePlan,
    new_table: &GlobalIndexTable,
    missing: MissingRelative,
    comm: &C,
) -> Result<RefinementTree, MeshError> {
    let kind = old.kind();
    let malformed = |reason: String| MeshError::MalformedRecord { kind, reason };
    if sent.len() != plan.total_send() || new_table.len() != plan.total_recv() {
        return Err(MeshError::BufferMismatch {
            context: "tree migration plan",
            expected: plan.total_recv(),
            actual: new_table.len(),
        });
    }
    let gid_of = |i: usize| {
        old_table
            .global(i)
            .ok_or_else(|| malformed(format!("local {i} has no global id")))
    };

    // (a) fixed records
    let records = sent
        .iter()
        .map(|&e| {
            Ok(WireTreeRecord::new(
                gid_of(old.parent(e))?,
                old.level(e),
                old.element(e).code(),
                old.state(e).code(),
            ))
        })
        .collect::<Result<Vec<_>, MeshError>>()?;
    let records = plan.exchange(&records, comm)?;

    let n = records.len();
    let mut parent = Vec::with_capacity(n);
    let mut level = Vec::with_capacity(n);
    let mut element = Vec::with_capacity(n);
    let mut state = Vec::with_capacity(n);
    for (j, rec) in records.iter().enumerate() {
        let p = match (new_table.get(rec.parent()), missing) {
            (Some(p), _) => p,
            (None, MissingRelative::Fatal) => {
                return Err(MeshError::NotFound {
                    kind,
                    gid: rec.parent(),
                });
            }
            (None, MissingRelative::Prune) => {
                log::trace!(
                    "{kind} {}: parent {} stayed behind, now a root",
                    new_table.global(j).unwrap_or_default(),
                    rec.parent()
                );
                j
            }
        };
        parent.push(p);
        level.push(rec.level());
        element.push(
            ElementType::from_code(rec.kind())
                .ok_or_else(|| malformed(format!("unknown element code {}", rec.kind())))?,
        );
        state.push(
            EntityState::from_code(rec.state())
                .ok_or_else(|| malformed(format!("unknown state code {}", rec.state())))?,
        );
    }

    // (b) generation lists: [ngen, nchild, ngen * nchild child ids] per entity
    let mut send_counts = vec![0usize; plan.n_ranks()];
    let mut lists: Vec<GlobalId> = Vec::new();
    for (r, count) in send_counts.iter_mut().enumerate() {
        let before = lists.len();
        for &e in &sent[plan.send_range(r)] {
            let gens = old.generations(e);
            lists.push(gens.len() as GlobalId);
            lists.push(old.children_per_generation(e) as GlobalId);
            for g in gens {
                for &c in &g.children {
                    lists.push(gid_of(c)?);
                }
            }
        }
        *count = lists.len() - before;
    }
    let list_plan = ExchangePlan::from_send_counts(send_counts, comm)?;
    let lists = list_plan.exchange_ids(&lists, comm)?;

    let mut parsed: Vec<Vec<&[GlobalId]>> = Vec::with_capacity(n);
    let mut rest: &[GlobalId] = &lists;
    for _ in 0..n {
        let [ngen, nchild, tail @ ..] = rest else {
            return Err(malformed("generation list is truncated".into()));
        };
        let (ngen, nchild) = (*ngen as usize, *nchild as usize);
        let len = ngen
            .checked_mul(nchild)
            .filter(|&len| len <= tail.len())
            .ok_or_else(|| malformed(format!("{ngen} generations of {nchild} overrun the buffer")))?;
        let (body, tail) = tail.split_at(len);
        parsed.push(if nchild == 0 { Vec::new() } else { body.chunks(nchild).collect() });
        rest = tail;
    }
    if !rest.is_empty() {
        return Err(malformed(format!("{} trailing generation entries", rest.len())));
    }

    // wire children only now that every record is in
    let mut tree = RefinementTree::from_parts(
        kind,
        parent,
        level,
        element,
        state,
        vec![Vec::new(); n],
    );
    for (j, gens) in parsed.into_iter().enumerate() {
        for children in gens {
            let local: Option<Vec<usize>> = children.iter().map(|&g| new_table.get(g)).collect();
            match (local, missing) {
                (Some(local), _) => tree.push_generation(j, local)?,
                (None, MissingRelative::Fatal) => {
                    let gid = children
                        .iter()
                        .copied()
                        .find(|&g| !new_table.contains(g))
                        .unwrap_or_default();
                    return Err(MeshError::NotFound { kind, gid });
                }
                (None, MissingRelative::Prune) => {
                    log::trace!(
                        "{kind} {}: generation dropped, a child stayed behind",
                        new_table.global(j).unwrap_or_default()
                    );
                    // children that did come along become roots
                    for c in children.iter().filter_map(|&g| new_table.get(g)) {
                        if tree.parent(c) == j {
                            tree.detach(c);
                        }
                    }
                }
            }
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::topology::global_table::EntityKind;

    fn split_quad() -> (RefinementTree, GlobalIndexTable) {
        let mut t = RefinementTree::roots(EntityKind::Face, 1, ElementType::Quadrilateral);
        let kids: Vec<usize> = (0..4)
            .map(|_| t.push(None, 0, ElementType::Quadrilateral, EntityState::Active))
            .collect();
        t.push_generation(0, kids).unwrap();
        t.set_state(0, EntityState::Split);
        let table = GlobalIndexTable::from_globals(EntityKind::Face, &[50, 51, 52, 53, 54]).unwrap();
        (t, table)
    }

    #[test]
    fn identity_move_keeps_structure() {
        let (t, table) = split_quad();
        // reverse send order: received slot j holds old entity 4 - j
        let sent = vec![4, 3, 2, 1, 0];
        let new_table = GlobalIndexTable::from_globals(EntityKind::Face, &[54, 53, 52, 51, 50]).unwrap();
        let plan = ExchangePlan::from_counts(vec![5], vec![5]).unwrap();
        let out = migrate_tree(&t, &table, &sent, &plan, &new_table, MissingRelative::Fatal, &NoComm)
            .unwrap();
        assert!(out.is_root(4));
        assert_eq!(out.state(4), EntityState::Split);
        assert_eq!(out.generations(4)[0].children, vec![3, 2, 1, 0]);
        assert_eq!(out.parent(0), 4);
        assert_eq!(out.level(0), 1);
        out.validate().unwrap();
    }

    #[test]
    fn prune_drops_incomplete_generation() {
        let (t, table) = split_quad();
        // parent and three children move; child 54 stays behind
        let sent = vec![0, 1, 2, 3];
        let new_table = GlobalIndexTable::from_globals(EntityKind::Face, &[50, 51, 52, 53]).unwrap();
        let plan = ExchangePlan::from_counts(vec![4], vec![4]).unwrap();
        let out = migrate_tree(&t, &table, &sent, &plan, &new_table, MissingRelative::Prune, &NoComm)
            .unwrap();
        assert!(out.generations(0).is_empty());
        for c in 1..4 {
            assert!(out.is_root(c));
            assert_eq!(out.level(c), 1);
        }
        out.validate().unwrap();

        let err = migrate_tree(&t, &table, &sent, &plan, &new_table, MissingRelative::Fatal, &NoComm)
            .unwrap_err();
        assert!(matches!(err, MeshError::NotFound { gid: 54, .. }));
    }

    #[test]
    fn orphan_child_becomes_root_when_pruning() {
        let (t, table) = split_quad();
        let sent = vec![2];
        let new_table = GlobalIndexTable::from_globals(EntityKind::Face, &[52]).unwrap();
        let plan = ExchangePlan::from_counts(vec![1], vec![1]).unwrap();
        let out = migrate_tree(&t, &table, &sent, &plan, &new_table, MissingRelative::Prune, &NoComm)
            .unwrap();
        assert!(out.is_root(0));
        assert_eq!(out.level(0), 1);
    }
}
