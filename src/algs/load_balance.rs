//! `load_balance_mesh`: weigh, partition, migrate, rebuild.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::all_gather_count;
use crate::algs::migrate::reconstruct_mesh;
use crate::algs::partition::{RootIndex, map_cells, vertex_weights};
use crate::config::RebalanceConfig;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshError;
use crate::partitioning::{GraphPartitioner, global_imbalance};
use crate::topology::orientation::{OwnerNeighborDeriver, TopologicalOrientation};
use crate::topology::shard::{MeshShard, ShardCounts};

/// Repartition `shard` across all ranks of `comm`.
///
/// Collective. Returns `Ok(None)` when nothing was done: a single rank, or a
/// current imbalance at or below `config.imbalance_threshold`. Owner/neighbor
/// arrays of the new shard come from [`TopologicalOrientation`].
pub fn load_balance_mesh<P, C>(
    shard: &MeshShard,
    partitioner: &P,
    config: &RebalanceConfig,
    comm: &C,
) -> Result<Option<MeshShard>, MeshError>
where
    P: GraphPartitioner,
    C: Communicator,
{
    load_balance_mesh_with(shard, partitioner, &TopologicalOrientation, config, comm)
}

/// [`load_balance_mesh`] with a caller-supplied owner/neighbor deriver.
pub fn load_balance_mesh_with<P, D, C>(
    shard: &MeshShard,
    partitioner: &P,
    orientation: &D,
    config: &RebalanceConfig,
    comm: &C,
) -> Result<Option<MeshShard>, MeshError>
where
    P: GraphPartitioner,
    D: OwnerNeighborDeriver + ?Sized,
    C: Communicator,
{
    if comm.size() == 1 {
        log::debug!("single rank, repartition skipped");
        return Ok(None);
    }
    let before = current_imbalance(shard, config.max_weight_exponent, comm)?;
    if let Some(threshold) = config.imbalance_threshold {
        if before <= threshold {
            if comm.rank() == 0 {
                log::info!("imbalance {before:.3} <= {threshold:.3}, repartition skipped");
            }
            return Ok(None);
        }
    }

    let cell_map = map_cells(shard, partitioner, config.max_weight_exponent, comm)?;
    let out = reconstruct_mesh(shard, &cell_map, orientation, comm)?;
    if config.validate {
        out.validate_invariants()?;
    }

    let after = current_imbalance(&out, config.max_weight_exponent, comm)?;
    let old = global_counts(shard.counts(), comm)?;
    let new = global_counts(out.counts(), comm)?;
    if comm.rank() == 0 {
        log::info!(
            "repartitioned {} cells over {} ranks ({} face and {} point copies): imbalance {:.3} -> {:.3}",
            new.cells,
            comm.size(),
            new.faces,
            new.points,
            before,
            after
        );
        if old.cells != new.cells {
            log::warn!("global cell count changed: {} -> {}", old.cells, new.cells);
        }
    }
    Ok(Some(out))
}

/// Imbalance of the refinement-weighted root loads.
pub fn current_imbalance<C: Communicator>(
    shard: &MeshShard,
    max_exponent: u32,
    comm: &C,
) -> Result<f64, MeshError> {
    let index = RootIndex::new(shard)?;
    let load = vertex_weights(shard, &index, max_exponent)
        .into_iter()
        .fold(0u64, u64::saturating_add);
    global_imbalance(load, comm)
}

/// Sum of local entity counts over all ranks.
///
/// Interface faces and their points are held by both sides, so only the cell
/// count is free of duplicates.
pub fn global_counts<C: Communicator>(local: ShardCounts, comm: &C) -> Result<ShardCounts, MeshError> {
    let sum = |v: usize| -> Result<usize, MeshError> { Ok(all_gather_count(v, comm)?.into_iter().sum()) };
    Ok(ShardCounts {
        cells: sum(local.cells)?,
        faces: sum(local.faces)?,
        points: sum(local.points)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algs::communicator::NoComm;
    use crate::partitioning::WeightedBlockPartitioner;
    use crate::topology::shard::tests::two_cubes;

    #[test]
    fn single_rank_is_skipped() {
        let s = two_cubes(0);
        let out = load_balance_mesh(&s, &WeightedBlockPartitioner, &RebalanceConfig::default(), &NoComm)
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn one_rank_holds_everything() {
        let s = two_cubes(0);
        assert_eq!(current_imbalance(&s, 30, &NoComm).unwrap(), 0.0);
        let g = global_counts(s.counts(), &NoComm).unwrap();
        assert_eq!((g.cells, g.faces, g.points), (2, 11, 12));
    }
}
