//! Adaptive-refinement hierarchy for cells or faces.
//!
//! Every entity has a parent (itself at a root), a level, an element type and a
//! state. Each refinement event appends one [`Generation`]: a fixed-size group of
//! children. Generations are stored as an owned, ordered `Vec` per entity.

use crate::mesh_error::MeshError;
use crate::topology::cell_type::ElementType;
use crate::topology::global_table::EntityKind;
use serde::{Deserialize, Serialize};

/// Adaptation state of a tree entity.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum EntityState {
    /// Leaf entity taking part in the current mesh.
    #[default]
    Active,
    /// Entity refined into children during some adaptation round.
    Split,
    /// Entity whose children were merged back.
    Coarsened,
}

impl EntityState {
    pub fn code(self) -> u32 {
        match self {
            EntityState::Active => 0,
            EntityState::Split => 1,
            EntityState::Coarsened => 2,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            0 => EntityState::Active,
            1 => EntityState::Split,
            2 => EntityState::Coarsened,
            _ => return None,
        })
    }
}

/// Children produced by one refinement event, as local ids.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Generation {
    pub children: Vec<usize>,
}

/// Refinement tree over the local entities of one kind.
#[derive(Clone, Debug)]
pub struct RefinementTree {
    kind: EntityKind,
    parent: Vec<usize>,
    level: Vec<u32>,
    element: Vec<ElementType>,
    state: Vec<EntityState>,
    generations: Vec<Vec<Generation>>,
}

impl RefinementTree {
    /// A forest of `n` unrefined roots of type `element`.
    pub fn roots(kind: EntityKind, n: usize, element: ElementType) -> Self {
        Self {
            kind,
            parent: (0..n).collect(),
            level: vec![0; n],
            element: vec![element; n],
            state: vec![EntityState::Active; n],
            generations: vec![Vec::new(); n],
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn parent(&self, i: usize) -> usize {
        self.parent[i]
    }

    pub fn level(&self, i: usize) -> u32 {
        self.level[i]
    }

    pub fn element(&self, i: usize) -> ElementType {
        self.element[i]
    }

    pub fn state(&self, i: usize) -> EntityState {
        self.state[i]
    }

    pub fn is_root(&self, i: usize) -> bool {
        self.parent[i] == i
    }

    pub fn generations(&self, i: usize) -> &[Generation] {
        &self.generations[i]
    }

    /// Children per generation of entity `i`, or 0 when it was never refined.
    pub fn children_per_generation(&self, i: usize) -> usize {
        self.generations[i].first().map_or(0, |g| g.children.len())
    }

    /// Append a new entity and return its local id.
    pub fn push(
        &mut self,
        parent: Option<usize>,
        level: u32,
        element: ElementType,
        state: EntityState,
    ) -> usize {
        let id = self.parent.len();
        self.parent.push(parent.unwrap_or(id));
        self.level.push(level);
        self.element.push(element);
        self.state.push(state);
        self.generations.push(Vec::new());
        id
    }

    pub fn set_state(&mut self, i: usize, state: EntityState) {
        self.state[i] = state;
    }

    /// Make `i` a root of its own. Its level is kept.
    pub(crate) fn detach(&mut self, i: usize) {
        self.parent[i] = i;
    }

    /// Record one refinement event of `parent`.
    ///
    /// All generations of an entity have the same number of children; each child
    /// gets `parent` as its parent and the next level.
    pub fn push_generation(&mut self, parent: usize, children: Vec<usize>) -> Result<(), MeshError> {
        let n = self.len();
        if parent >= n || children.iter().any(|&c| c >= n || c == parent) {
            return Err(MeshError::MalformedRecord {
                kind: self.kind,
                reason: format!("generation of {parent} references an entity out of range"),
            });
        }
        let expected = self.children_per_generation(parent);
        if expected != 0 && expected != children.len() {
            return Err(MeshError::MalformedRecord {
                kind: self.kind,
                reason: format!(
                    "generation of {parent} has {} children, earlier generations have {expected}",
                    children.len()
                ),
            });
        }
        let level = self.level[parent] + 1;
        for &c in &children {
            self.parent[c] = parent;
            self.level[c] = level;
        }
        self.generations[parent].push(Generation { children });
        Ok(())
    }

    /// Follow parent links up to the root of `i`.
    pub fn root(&self, mut i: usize) -> Result<usize, MeshError> {
        for _ in 0..=self.len() {
            let p = self.parent[i];
            if p == i {
                return Ok(i);
            }
            i = p;
        }
        Err(MeshError::MalformedRecord {
            kind: self.kind,
            reason: format!("parent chain of {i} does not reach a root"),
        })
    }

    /// All descendants of `i` over every generation, depth first.
    pub fn descendants(&self, i: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.generations[i]
            .iter()
            .rev()
            .flat_map(|g| g.children.iter().rev().copied())
            .collect();
        while let Some(c) = stack.pop() {
            out.push(c);
            for g in self.generations[c].iter().rev() {
                stack.extend(g.children.iter().rev().copied());
            }
        }
        out
    }

    /// Check parent links against generation records.
    pub fn validate(&self) -> Result<(), MeshError> {
        let n = self.len();
        let malformed = |reason: String| MeshError::MalformedRecord {
            kind: self.kind,
            reason,
        };
        if self.level.len() != n
            || self.element.len() != n
            || self.state.len() != n
            || self.generations.len() != n
        {
            return Err(malformed("tree arrays have different lengths".into()));
        }
        for (i, &p) in self.parent.iter().enumerate() {
            if p >= n {
                return Err(malformed(format!("parent {p} of {i} is out of range")));
            }
        }
        let mut listed = vec![false; n];
        for (p, gens) in self.generations.iter().enumerate() {
            let mut width = None;
            for g in gens {
                if *width.get_or_insert(g.children.len()) != g.children.len() {
                    return Err(malformed(format!("generations of {p} differ in size")));
                }
                for &c in &g.children {
                    if c >= n || self.parent[c] != p {
                        return Err(malformed(format!(
                            "child {c} of {p} is out of range or has another parent"
                        )));
                    }
                    listed[c] = true;
                }
            }
        }
        if let Some(c) = (0..n).find(|&c| self.parent[c] != c && !listed[c]) {
            return Err(malformed(format!(
                "{c} names {} as parent but is in none of its generations",
                self.parent[c]
            )));
        }
        Ok(())
    }

    pub(crate) fn from_parts(
        kind: EntityKind,
        parent: Vec<usize>,
        level: Vec<u32>,
        element: Vec<ElementType>,
        state: Vec<EntityState>,
        generations: Vec<Vec<Generation>>,
    ) -> Self {
        Self {
            kind,
            parent,
            level,
            element,
            state,
            generations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_split_hex() -> RefinementTree {
        let mut t = RefinementTree::roots(EntityKind::Cell, 1, ElementType::Hexahedron);
        let children: Vec<usize> = (0..8)
            .map(|_| t.push(None, 0, ElementType::Hexahedron, EntityState::Active))
            .collect();
        t.push_generation(0, children).unwrap();
        t.set_state(0, EntityState::Split);
        t
    }

    #[test]
    fn generation_links_children() {
        let t = one_split_hex();
        assert_eq!(t.len(), 9);
        assert!(t.is_root(0));
        for c in 1..9 {
            assert_eq!(t.parent(c), 0);
            assert_eq!(t.level(c), 1);
            assert_eq!(t.root(c).unwrap(), 0);
        }
        assert_eq!(t.children_per_generation(0), 8);
        assert_eq!(t.descendants(0), (1..9).collect::<Vec<_>>());
    }

    #[test]
    fn generation_size_is_fixed() {
        let mut t = one_split_hex();
        let extra: Vec<usize> = (0..4)
            .map(|_| t.push(None, 0, ElementType::Hexahedron, EntityState::Active))
            .collect();
        assert!(matches!(
            t.push_generation(0, extra),
            Err(MeshError::MalformedRecord { .. })
        ));
    }

    #[test]
    fn nested_descendants() {
        let mut t = one_split_hex();
        let grandkids: Vec<usize> = (0..8)
            .map(|_| t.push(None, 0, ElementType::Hexahedron, EntityState::Active))
            .collect();
        t.push_generation(3, grandkids.clone()).unwrap();
        assert_eq!(t.level(grandkids[0]), 2);
        assert_eq!(t.root(grandkids[7]).unwrap(), 0);
        assert_eq!(t.descendants(0).len(), 16);
        assert_eq!(t.descendants(3), grandkids);
    }

    #[test]
    fn unlisted_child_is_invalid() {
        let mut t = one_split_hex();
        t.push(Some(0), 1, ElementType::Hexahedron, EntityState::Active);
        assert!(matches!(t.validate(), Err(MeshError::MalformedRecord { .. })));
        t.detach(9);
        t.validate().unwrap();
        assert!(t.is_root(9));
    }

    #[test]
    fn state_codes_roundtrip_and_reject_unknown() {
        for s in [EntityState::Active, EntityState::Split, EntityState::Coarsened] {
            assert_eq!(EntityState::from_code(s.code()), Some(s));
        }
        assert_eq!(EntityState::from_code(9), None);
    }
}
