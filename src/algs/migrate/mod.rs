//! Entity migration: rebuild a shard from an explicit destination per cell.
//!
//! Entities move in ownership order. Cells are pushed to their destination;
//! faces are then pulled by the new owner of the cells that reference them,
//! from the rank each cell came from; points are pulled the same way from the
//! rank that provided each face. Every global index table of the new shard is
//! built from scratch.

mod boundary;
mod cells;
mod edge_centers;
mod faces;
mod points;

use crate::algs::communicator::Communicator;
use crate::algs::exchange::ExchangePlan;
use crate::algs::interface::build_patches;
use crate::algs::tree_migration::{MissingRelative, migrate_tree};
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::csr::Csr;
use crate::topology::global_table::GlobalIndexTable;
use crate::topology::orientation::OwnerNeighborDeriver;
use crate::topology::shard::MeshShard;

/// One request/reply round of a pull.
pub(crate) struct Pull {
    /// Plan of the reply; received item `k` answers the `k`-th request.
    pub reply: ExchangePlan,
    /// Old local ids this rank serves, in reply send order.
    pub served: Vec<usize>,
}

/// Ask rank `r` for the entities `requests[r]` and resolve what others ask of
/// this rank. An id asked of the wrong rank is a planning bug and fatal.
pub(crate) fn pull<C: Communicator>(
    requests: &[Vec<GlobalId>],
    old_table: &GlobalIndexTable,
    comm: &C,
) -> Result<Pull, MeshError> {
    let plan = ExchangePlan::from_send_counts(requests.iter().map(Vec::len).collect(), comm)?;
    let flat: Vec<GlobalId> = requests.concat();
    let asked = plan.exchange_ids(&flat, comm)?;
    let served = old_table.localize(&asked)?;
    Ok(Pull {
        reply: plan.reversed(),
        served,
    })
}

/// Migrate `shard` so that local cell `c` ends up on rank `cell_map[c]`.
///
/// Collective. Cells, faces, points, boundary groups, refinement flags, edge
/// centers and both refinement trees move; owner/neighbor arrays come from
/// `orientation`, and interface patches are rebuilt.
pub fn reconstruct_mesh<D, C>(
    shard: &MeshShard,
    cell_map: &[usize],
    orientation: &D,
    comm: &C,
) -> Result<MeshShard, MeshError>
where
    D: OwnerNeighborDeriver + ?Sized,
    C: Communicator,
{
    let moved_cells = cells::migrate_cells(shard, cell_map, comm)?;
    let moved_faces = faces::migrate_faces(shard, &moved_cells, comm)?;
    let moved_points = points::migrate_points(shard, &moved_faces, comm)?;

    let nface = moved_faces.table.localize(&moved_cells.nface)?;
    let ngon = moved_points.table.localize(&moved_faces.ngon)?;
    let cells = Csr::from_strides(&moved_cells.strides, nface)?;
    let faces = Csr::from_strides(&moved_faces.strides, ngon)?;

    let ref_data = cells::migrate_ref_data(shard, &moved_cells, comm)?;
    let boundaries =
        boundary::migrate_boundaries(shard, cell_map, &moved_faces.table, comm)?;
    let edge_centers = edge_centers::migrate_edge_centers(
        shard,
        &moved_faces.pull,
        &moved_points.table,
        comm,
    )?;

    let cell_tree = migrate_tree(
        &shard.cell_tree,
        &shard.cell_table,
        &moved_cells.sent,
        &moved_cells.plan,
        &moved_cells.table,
        MissingRelative::Fatal,
        comm,
    )?;
    let face_tree = migrate_tree(
        &shard.face_tree,
        &shard.face_table,
        &moved_faces.pull.served,
        &moved_faces.pull.reply,
        &moved_faces.table,
        MissingRelative::Prune,
        comm,
    )?;

    let mut out = MeshShard {
        cell_tree,
        face_tree,
        coords: moved_points.coords,
        faces,
        cells,
        cell_table: moved_cells.table,
        face_table: moved_faces.table,
        point_table: moved_points.table,
        owner: Vec::new(),
        neigh: Vec::new(),
        boundaries,
        patches: Vec::new(),
        ref_data,
        edge_centers,
        params: shard.params.clone(),
    };
    out.check_ranges()?;

    let on = orientation.derive(&out)?;
    out.owner = on.owner;
    out.neigh = on.neigh;
    out.patches = build_patches(&out, comm)?;
    out.debug_assert_invariants();
    Ok(out)
}
