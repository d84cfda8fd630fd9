use mesh_rebalance::config::{AdaptParams, RebalanceConfig};
use mesh_rebalance::mesh_generation::{BoxMeshOptions, hex_box};

#[test]
fn empty_json_is_the_default_config() {
    let cfg: RebalanceConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, RebalanceConfig::default());
    assert_eq!(cfg.imbalance_threshold, None);
}

#[test]
fn config_survives_a_json_roundtrip() {
    let cfg = RebalanceConfig {
        max_weight_exponent: 12,
        imbalance_threshold: Some(0.1),
        validate: false,
    };
    let back: RebalanceConfig = serde_json::from_str(&serde_json::to_string(&cfg).unwrap()).unwrap();
    assert_eq!(back, cfg);
}

#[test]
fn new_shards_carry_default_params() {
    let s = hex_box(BoxMeshOptions::unit(1, 1, 1)).unwrap();
    assert_eq!(s.params, AdaptParams::default());
    assert!(!s.params.unrefine);
    assert_eq!(s.params.mode_2d, None);
}
