//! Load-balance metrics over a distribution.

use crate::algs::communicator::Communicator;
use crate::algs::exchange::all_gather_count;
use crate::mesh_error::MeshError;
use itertools::Itertools;

/// Imbalance of per-part loads: `max_r (W_r - W/n) / (W/n)`.
///
/// Zero for an empty load vector or zero total weight.
pub fn imbalance_of(loads: &[u64]) -> f64 {
    let total: u128 = loads.iter().map(|&w| w as u128).sum();
    if total == 0 || loads.is_empty() {
        return 0.0;
    }
    let ideal = total as f64 / loads.len() as f64;
    loads
        .iter()
        .map(|&w| (w as f64 - ideal) / ideal)
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option()
        .map_or(0.0, |(_, max)| max)
}

/// Imbalance of the current distribution, given this rank's load.
///
/// Collective: every rank receives the same value.
pub fn global_imbalance<C: Communicator>(local_load: u64, comm: &C) -> Result<f64, MeshError> {
    let loads: Vec<u64> = all_gather_count(local_load as usize, comm)?
        .into_iter()
        .map(|w| w as u64)
        .collect();
    Ok(imbalance_of(&loads))
}

/// Load of every part under `parts`, one part per vertex.
pub fn part_loads(parts: &[usize], weights: &[u64], n_parts: usize) -> Vec<u64> {
    debug_assert_eq!(parts.len(), weights.len());
    parts
        .iter()
        .zip(weights)
        .fold(vec![0u64; n_parts], |mut acc, (&p, &w)| {
            if let Some(slot) = acc.get_mut(p) {
                *slot = slot.saturating_add(w);
            }
            acc
        })
}
