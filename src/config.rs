//! Runtime configuration for repartitioning and the refinement parameters a
//! shard carries between adaptation rounds.

use serde::{Deserialize, Serialize};

/// Knobs of [`load_balance_mesh`](crate::algs::load_balance::load_balance_mesh).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Upper clamp of the refinement depth estimate used as a weight exponent.
    pub max_weight_exponent: u32,
    /// Skip repartitioning when the current imbalance does not exceed this value.
    pub imbalance_threshold: Option<f64>,
    /// Validate the rebuilt shard before returning it.
    pub validate: bool,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            max_weight_exponent: 30,
            imbalance_threshold: None,
            validate: true,
        }
    }
}

/// Refinement parameters of the adaptation driver.
///
/// The repartitioner never reads them; they are copied into the rebuilt shard.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptParams {
    pub ref_threshold: f64,
    pub unref_threshold: f64,
    pub eps: f64,
    pub hmin: f64,
    pub hmax: f64,
    pub unrefine: bool,
    /// Extrusion direction when adapting a 2D mesh stored as one layer of 3D cells.
    pub mode_2d: Option<[f64; 3]>,
}

impl Default for AdaptParams {
    fn default() -> Self {
        Self {
            ref_threshold: 1.0,
            unref_threshold: -1.0,
            eps: 1e-12,
            hmin: 0.0,
            hmax: f64::MAX,
            unrefine: false,
            mode_2d: None,
        }
    }
}
