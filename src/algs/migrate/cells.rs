//! Cell phase: ship cells, their face lists and their refinement flags.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::{ExchangePlan, sort_by_destination};
use crate::algs::wire::WireFlag;
use crate::mesh_error::MeshError;
use crate::topology::GlobalId;
use crate::topology::global_table::{EntityKind, GlobalIndexTable};
use crate::topology::shard::MeshShard;

/// Cells received by this rank.
///
/// New cell slot `j` is the `j`-th cell received: source-rank major, then the
/// source's send order.
pub(crate) struct MovedCells {
    pub plan: ExchangePlan,
    /// Old local cells in send order.
    pub sent: Vec<usize>,
    pub table: GlobalIndexTable,
    /// Face count of every received cell.
    pub strides: Vec<usize>,
    /// Face global ids of every received cell, concatenated.
    pub nface: Vec<GlobalId>,
    offsets: Vec<usize>,
}

impl MovedCells {
    /// Face global ids of received cell `j`.
    pub fn nface_row(&self, j: usize) -> &[GlobalId] {
        &self.nface[self.offsets[j]..self.offsets[j + 1]]
    }
}

pub(crate) fn migrate_cells<C: Communicator>(
    shard: &MeshShard,
    cell_map: &[usize],
    comm: &C,
) -> Result<MovedCells, MeshError> {
    if cell_map.len() != shard.ncells() {
        return Err(MeshError::BufferMismatch {
            context: "cell map",
            expected: shard.ncells(),
            actual: cell_map.len(),
        });
    }
    let plan = ExchangePlan::from_destinations(cell_map, comm)?;
    let sent = sort_by_destination(cell_map);

    let gcells: Vec<GlobalId> = sent.iter().map(|&c| shard.gcells()[c]).collect();
    let recv = plan.exchange_ids(&gcells, comm)?;
    let mut table = GlobalIndexTable::with_capacity(EntityKind::Cell, recv.len());
    for gid in recv {
        table.register_unique(gid)?;
    }

    let send_strides: Vec<usize> = sent.iter().map(|&c| shard.cells.stride(c)).collect();
    let strides = plan.exchange_counts(&send_strides, comm)?;
    let nface_send: Vec<GlobalId> = sent
        .iter()
        .flat_map(|&c| shard.cells.row(c).iter().map(|&f| shard.gfaces()[f]))
        .collect();
    let nface = plan
        .with_strides(&send_strides, &strides)?
        .exchange_ids(&nface_send, comm)?;

    log::debug!(
        "rank {}: sent {} cells, received {}",
        comm.rank(),
        plan.total_send(),
        plan.total_recv()
    );
    let mut offsets = Vec::with_capacity(strides.len() + 1);
    offsets.push(0);
    for &s in &strides {
        offsets.push(offsets[offsets.len() - 1] + s);
    }
    Ok(MovedCells {
        plan,
        sent,
        table,
        strides,
        nface,
        offsets,
    })
}

/// Refinement flags follow the cells through the cell plan.
pub(crate) fn migrate_ref_data<C: Communicator>(
    shard: &MeshShard,
    moved: &MovedCells,
    comm: &C,
) -> Result<Vec<i32>, MeshError> {
    let send: Vec<WireFlag> = moved
        .sent
        .iter()
        .map(|&c| WireFlag::new(shard.ref_data[c]))
        .collect();
    Ok(moved
        .plan
        .exchange(&send, comm)?
        .iter()
        .map(WireFlag::get)
        .collect())
}
