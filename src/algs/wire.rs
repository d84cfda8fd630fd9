//! Fixed little-endian wire records for migration messages.
//!
//! All multi-byte integers are stored pre-LE with `.to_le()` and decoded with
//! `.from_le()`. Records are `Pod`, so buffers are moved with `bytemuck` casts.

use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use bytemuck::{Pod, Zeroable};
use std::mem::{align_of, size_of};

pub fn encode<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

/// Copy a received byte buffer into records. Works for any alignment of `bytes`.
pub fn decode<T: Pod>(context: &'static str, bytes: &[u8]) -> Result<Vec<T>, MeshError> {
    let sz = size_of::<T>();
    if sz == 0 || bytes.len() % sz != 0 {
        return Err(MeshError::BufferMismatch {
            context,
            expected: bytes.len().next_multiple_of(sz.max(1)),
            actual: bytes.len(),
        });
    }
    let mut out = vec![T::zeroed(); bytes.len() / sz];
    bytemuck::cast_slice_mut::<T, u8>(&mut out).copy_from_slice(bytes);
    Ok(out)
}

/// A global id on the wire.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireId {
    pub id_le: u64,
}
impl WireId {
    pub fn of(id: GlobalId) -> Self {
        Self { id_le: id.to_le() }
    }
    pub fn get(&self) -> GlobalId {
        u64::from_le(self.id_le)
    }
}

/// A stride or count on the wire.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64,
}
impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// A refinement flag on the wire.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireFlag {
    pub v_le: i32,
}
impl WireFlag {
    pub fn new(v: i32) -> Self {
        Self { v_le: v.to_le() }
    }
    pub fn get(&self) -> i32 {
        i32::from_le(self.v_le)
    }
}

/// Point coordinates, as raw IEEE-754 bits.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireCoord {
    pub xyz_le: [u64; 3],
}
impl WireCoord {
    pub fn new(x: [f64; 3]) -> Self {
        Self {
            xyz_le: x.map(|c| c.to_bits().to_le()),
        }
    }
    pub fn get(&self) -> [f64; 3] {
        self.xyz_le.map(|b| f64::from_bits(u64::from_le(b)))
    }
}

/// Fixed part of a refinement-tree entity: parent, level, element, state.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireTreeRecord {
    pub parent_le: u64,
    pub level_le: u32,
    pub kind_le: u32,
    pub state_le: u32,
    pub reserved_le: u32, // keep zero
}
impl WireTreeRecord {
    pub fn new(parent: GlobalId, level: u32, kind: u32, state: u32) -> Self {
        Self {
            parent_le: parent.to_le(),
            level_le: level.to_le(),
            kind_le: kind.to_le(),
            state_le: state.to_le(),
            reserved_le: 0,
        }
    }
    pub fn parent(&self) -> GlobalId {
        u64::from_le(self.parent_le)
    }
    pub fn level(&self) -> u32 {
        u32::from_le(self.level_le)
    }
    pub fn kind(&self) -> u32 {
        u32::from_le(self.kind_le)
    }
    pub fn state(&self) -> u32 {
        u32::from_le(self.state_le)
    }
}

/// Answer to an interface query: this rank owns `face` through `cell`.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireInterfaceReply {
    pub face_le: u64,
    pub cell_le: u64,
}
impl WireInterfaceReply {
    pub fn new(face: GlobalId, cell: GlobalId) -> Self {
        Self {
            face_le: face.to_le(),
            cell_le: cell.to_le(),
        }
    }
    pub fn face(&self) -> GlobalId {
        u64::from_le(self.face_le)
    }
    pub fn cell(&self) -> GlobalId {
        u64::from_le(self.cell_le)
    }
}

/// Edge `{p, q}` with midpoint `center`, as global point ids.
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct WireEdgeCenter {
    pub p_le: u64,
    pub q_le: u64,
    pub center_le: u64,
}
impl WireEdgeCenter {
    pub fn new(p: GlobalId, q: GlobalId, center: GlobalId) -> Self {
        Self {
            p_le: p.to_le(),
            q_le: q.to_le(),
            center_le: center.to_le(),
        }
    }
    pub fn p(&self) -> GlobalId {
        u64::from_le(self.p_le)
    }
    pub fn q(&self) -> GlobalId {
        u64::from_le(self.q_le)
    }
    pub fn center(&self) -> GlobalId {
        u64::from_le(self.center_le)
    }
}

// ===== Compile-time sanity checks =========================================

const _: () = {
    assert!(size_of::<WireId>() == 8);
    assert!(size_of::<WireCount>() == 8);
    assert!(size_of::<WireFlag>() == 4);
    assert!(size_of::<WireCoord>() == 24);
    assert!(size_of::<WireTreeRecord>() == 24);
    assert!(align_of::<WireTreeRecord>() == 8);
    assert!(size_of::<WireInterfaceReply>() == 16);
    assert!(size_of::<WireEdgeCenter>() == 24);
};
