//! Global-to-local index tables.
//!
//! One [`GlobalIndexTable`] exists per entity kind (cell, face, point). A table
//! hands out local slots in registration order and is rebuilt from scratch on
//! every repartition, so it never needs invalidation.

use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use hashbrown::HashMap;
use std::fmt;

/// Kind of distributed mesh entity a table or error refers to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum EntityKind {
    Cell,
    Face,
    Point,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Cell => "cell",
            EntityKind::Face => "face",
            EntityKind::Point => "point",
        };
        f.write_str(name)
    }
}

/// Bidirectional map between permanent global ids and rank-local slots.
///
/// Ids are not assumed dense or contiguous.
#[derive(Clone, Debug)]
pub struct GlobalIndexTable {
    kind: EntityKind,
    local_of: HashMap<GlobalId, usize>,
    global_of: Vec<GlobalId>,
}

impl GlobalIndexTable {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            local_of: HashMap::new(),
            global_of: Vec::new(),
        }
    }

    pub fn with_capacity(kind: EntityKind, capacity: usize) -> Self {
        Self {
            kind,
            local_of: HashMap::with_capacity(capacity),
            global_of: Vec::with_capacity(capacity),
        }
    }

    /// Build a table whose slot `i` holds `gids[i]`.
    ///
    /// Fails with [`MeshError::DuplicateGlobalId`] if an id repeats.
    pub fn from_globals(kind: EntityKind, gids: &[GlobalId]) -> Result<Self, MeshError> {
        let mut table = Self::with_capacity(kind, gids.len());
        for &gid in gids {
            table.register_unique(gid)?;
        }
        Ok(table)
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Return the local slot of `gid`, assigning the next free slot on first sight.
    ///
    /// The boolean is `true` when the slot was created by this call.
    pub fn register(&mut self, gid: GlobalId) -> (usize, bool) {
        if let Some(&slot) = self.local_of.get(&gid) {
            return (slot, false);
        }
        let slot = self.global_of.len();
        self.local_of.insert(gid, slot);
        self.global_of.push(gid);
        (slot, true)
    }

    /// Register an id that must not have been seen before.
    pub fn register_unique(&mut self, gid: GlobalId) -> Result<usize, MeshError> {
        match self.register(gid) {
            (slot, true) => Ok(slot),
            (_, false) => Err(MeshError::DuplicateGlobalId {
                kind: self.kind,
                gid,
            }),
        }
    }

    /// Local slot of a registered id.
    pub fn lookup(&self, gid: GlobalId) -> Result<usize, MeshError> {
        self.local_of
            .get(&gid)
            .copied()
            .ok_or(MeshError::NotFound {
                kind: self.kind,
                gid,
            })
    }

    pub fn get(&self, gid: GlobalId) -> Option<usize> {
        self.local_of.get(&gid).copied()
    }

    pub fn contains(&self, gid: GlobalId) -> bool {
        self.local_of.contains_key(&gid)
    }

    /// Global id stored in local slot `slot`.
    pub fn global(&self, slot: usize) -> Option<GlobalId> {
        self.global_of.get(slot).copied()
    }

    /// Global ids in slot order.
    pub fn globals(&self) -> &[GlobalId] {
        &self.global_of
    }

    pub fn into_globals(self) -> Vec<GlobalId> {
        self.global_of
    }

    pub fn len(&self) -> usize {
        self.global_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global_of.is_empty()
    }

    /// Translate a connectivity array from global ids to local slots.
    pub fn localize(&self, ids: &[GlobalId]) -> Result<Vec<usize>, MeshError> {
        ids.iter().map(|&gid| self.lookup(gid)).collect()
    }
}
