use super::*;
use crate::timeline::reconcile::ReconcileStrategy;

#[test]
fn default_config_is_valid() {
    let cfg = JobConfig::default();
    cfg.validate().unwrap();
    assert_eq!(cfg.mode, CompositeMode::Frames);
    assert_eq!(cfg.verbosity, Verbosity::Normal);
    assert_eq!(cfg.reconcile.strategy, ReconcileStrategy::BoundedDrift);
}

#[test]
fn partial_json_fills_defaults() {
    let cfg: JobConfig = serde_json::from_str(
        r#"{
            "mode": "filter_graph",
            "verbosity": "quiet",
            "reconcile": { "frame_skip": 3, "strategy": "exact_lcm" },
            "encoder": { "palette_size": 64 }
        }"#,
    )
    .unwrap();
    cfg.validate().unwrap();
    assert_eq!(cfg.mode, CompositeMode::FilterGraph);
    assert_eq!(cfg.verbosity, Verbosity::Quiet);
    assert_eq!(cfg.reconcile.frame_skip, 3);
    assert_eq!(cfg.reconcile.strategy, ReconcileStrategy::ExactLcm);
    assert_eq!(cfg.reconcile.max_total_frames, 240);
    assert_eq!(cfg.encoder.palette_size, 64);
    assert_eq!(cfg.encoder.frame_delay_ms, 50);
    assert!(cfg.threading.parallel);
}

#[test]
fn invalid_sections_fail_validation() {
    let mut cfg = JobConfig::default();
    cfg.reconcile.frame_skip = 0;
    assert!(matches!(cfg.validate(), Err(GifloomError::Input(_))));

    let mut cfg = JobConfig::default();
    cfg.encoder.palette_size = 300;
    assert!(cfg.validate().is_err());

    let mut cfg = JobConfig::default();
    cfg.threading.threads = Some(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn load_rejects_invalid_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.json");
    std::fs::write(&path, r#"{"reconcile": {"max_drift": 0.9}}"#).unwrap();
    assert!(JobConfig::load(&path).is_err());

    std::fs::write(&path, r#"{"scratch_root": "/tmp/gifloom-test"}"#).unwrap();
    let cfg = JobConfig::load(&path).unwrap();
    assert_eq!(cfg.scratch_root, Some(PathBuf::from("/tmp/gifloom-test")));
}
