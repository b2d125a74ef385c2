//! End-to-end tests for the measurement bridge: configuration loading,
//! caching, call budgets, latency flags and outcome serialization.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use relational_reasoner::{
    BridgeConfig, Error, MeasurementBridge, MeasurementEngine, MeasurementOutcome,
    PointCloudMeasurement, Result,
};
use serde_json::json;

// ============================================================================
// Helper: an engine that records every call it receives.
// ============================================================================

#[derive(Default)]
struct RecordingEngine {
    calls: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, String)>>,
    delay: Option<Duration>,
    fail: bool,
}

impl MeasurementEngine for RecordingEngine {
    fn measure(&self, path: &Path, units: &str) -> Result<PointCloudMeasurement> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().push((path.to_path_buf(), units.to_owned()));
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        if self.fail {
            return Err(Error::Measurement(format!("cannot read {}", path.display())));
        }
        let mut m = PointCloudMeasurement::new(units);
        m.count = 10;
        m.volume = Some(2.5);
        Ok(m)
    }
}

fn config(raw: serde_json::Value) -> BridgeConfig {
    BridgeConfig::from_json_str(&raw.to_string()).unwrap()
}

// ============================================================================
// 1. Configuration
// ============================================================================

#[test]
fn test_config_from_file() {
    let path = std::env::temp_dir().join(format!("relational-reasoner-bridge-{}.json", std::process::id()));
    std::fs::write(
        &path,
        json!({
            "limits": {"max_calls_per_cycle": 3, "cache_ttl_seconds": 120, "max_latency_ms": 500},
            "determinism": {"seed": 7, "noise_mode": "gaussian"}
        })
        .to_string(),
    )
    .unwrap();

    let loaded = BridgeConfig::from_path(&path);
    std::fs::remove_file(&path).unwrap();
    let loaded = loaded.unwrap();

    assert_eq!(loaded.limits.max_calls_per_cycle, 3);
    assert_eq!(loaded.limits.max_cache_entries, 64);
    assert_eq!(loaded.cache_ttl(), Duration::from_secs(120));
    assert_eq!(loaded.max_latency(), Some(Duration::from_millis(500)));
    assert_eq!(loaded.determinism.seed, 7);
    assert!(loaded.determinism.fixed_timestamps);
    assert_eq!(loaded.determinism.noise_mode, "gaussian");
}

#[test]
fn test_config_rejects_garbage() {
    assert!(matches!(BridgeConfig::from_json_str("not json"), Err(Error::Json(_))));
    assert!(matches!(
        BridgeConfig::from_json_str(r#"{"determinism": {"noise_mode": "  "}}"#),
        Err(Error::Config(_))
    ));
}

// ============================================================================
// 2. Caching
// ============================================================================

#[test]
fn test_units_are_trimmed_for_the_engine_and_normalized_for_the_cache() {
    let bridge = MeasurementBridge::new(
        RecordingEngine::default(),
        config(json!({"limits": {"cache_ttl_seconds": 60}})),
    );
    bridge.measure("c", " /scans/a.ply ", " Feet ");
    let again = bridge.measure("c", "/scans/a.ply", "feet");

    assert!(again.cache_hit());
    assert_eq!(bridge.engine().calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        bridge.engine().seen.lock().clone(),
        vec![(PathBuf::from("/scans/a.ply"), "Feet".to_string())]
    );
}

#[test]
fn test_determinism_change_misses_the_cache() {
    let engine = RecordingEngine::default();
    let first = MeasurementBridge::new(engine, config(json!({"limits": {"cache_ttl_seconds": 60}})));
    first.measure("c", "/scans/a.ply", "meters");
    assert!(first.measure("c", "/scans/a.ply", "meters").cache_hit());

    // a bridge with another seed owns its own cache and never sees the first one
    let second = MeasurementBridge::new(
        RecordingEngine::default(),
        config(json!({"limits": {"cache_ttl_seconds": 60}, "determinism": {"seed": 1}})),
    );
    assert!(!second.measure("c", "/scans/a.ply", "meters").cache_hit());
}

#[test]
fn test_no_caching_without_ttl() {
    let bridge = MeasurementBridge::new(RecordingEngine::default(), BridgeConfig::default());
    bridge.measure("c", "/scans/a.ply", "meters");
    bridge.measure("c", "/scans/a.ply", "meters");
    let metrics = bridge.metrics();
    assert_eq!(metrics.calls_total, 2);
    assert_eq!(metrics.cache_hits_total, 0);
    assert_eq!(metrics.cache_misses_total, 0);
    assert_eq!(bridge.cache_stats().size, 0);
}

#[test]
fn test_cache_hits_do_not_spend_budget() {
    let bridge = MeasurementBridge::new(
        RecordingEngine::default(),
        config(json!({"limits": {"cache_ttl_seconds": 60, "max_calls_per_cycle": 1}})),
    );
    assert_eq!(bridge.measure("c", "/a.ply", "meters").status(), "completed");
    assert!(bridge.measure("c", "/a.ply", "meters").cache_hit());
    assert_eq!(bridge.measure("c", "/b.ply", "meters").status(), "skipped");

    bridge.clear_cache();
    assert_eq!(bridge.measure("c", "/a.ply", "meters").status(), "skipped");
    assert_eq!(bridge.measure("d", "/a.ply", "meters").status(), "completed");
}

#[test]
fn test_dot_segments_share_a_cache_entry() {
    let bridge = MeasurementBridge::new(
        RecordingEngine::default(),
        config(json!({"limits": {"cache_ttl_seconds": 60}})),
    );
    bridge.measure("c", "/scans/a.ply", "meters");
    assert!(bridge.measure("c", "/scans/tmp/../a.ply", "meters").cache_hit());
    assert!(bridge.measure("c", "/scans/./a.ply", "meters").cache_hit());
    assert_eq!(bridge.engine().calls.load(Ordering::SeqCst), 1);
    assert_eq!(bridge.cache_stats().entries[0].path, PathBuf::from("/scans/a.ply"));
}

// ============================================================================
// 3. Cycle budgets
// ============================================================================

#[test]
fn test_interleaved_cycles_are_budgeted_separately() {
    let bridge = MeasurementBridge::new(
        RecordingEngine::default(),
        config(json!({"limits": {"max_calls_per_cycle": 1}})),
    );
    let statuses: Vec<&str> = [("c1", "/a.ply"), ("c2", "/b.ply"), ("c1", "/c.ply"), ("c2", "/d.ply")]
        .into_iter()
        .map(|(cycle, path)| bridge.measure(cycle, path, "meters").status())
        .collect();
    assert_eq!(statuses, vec!["completed", "completed", "skipped", "skipped"]);
    assert_eq!(bridge.engine().calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_unlimited_budget() {
    let bridge = MeasurementBridge::new(RecordingEngine::default(), BridgeConfig::default());
    for path in ["/a.ply", "/b.ply", "/c.ply"] {
        assert_eq!(bridge.measure("c1", path, "meters").status(), "completed");
    }
    assert_eq!(bridge.cycle_calls("c1"), 3);
}

// ============================================================================
// 4. Failures and latency
// ============================================================================

#[test]
fn test_failures_are_counted_and_not_cached() {
    let engine = RecordingEngine { fail: true, ..Default::default() };
    let bridge = MeasurementBridge::new(engine, config(json!({"limits": {"cache_ttl_seconds": 60}})));
    let outcome = bridge.measure("c", "/broken.ply", "meters");

    match &outcome {
        MeasurementOutcome::Error { error, path, .. } => {
            assert!(error.contains("cannot read"));
            assert_eq!(path, &PathBuf::from("/broken.ply"));
        }
        other => panic!("expected an error outcome, got {other:?}"),
    }
    bridge.measure("c", "/broken.ply", "meters");
    let metrics = bridge.metrics();
    assert_eq!(metrics.failures_total, 2);
    assert_eq!(metrics.calls_total, 2);
    assert_eq!(metrics.cache_misses_total, 2);
}

#[test]
fn test_slow_engine_is_flagged() {
    let engine = RecordingEngine { delay: Some(Duration::from_millis(20)), ..Default::default() };
    let bridge = MeasurementBridge::new(engine, config(json!({"limits": {"max_latency_ms": 1}})));
    match bridge.measure("c", "/slow.ply", "meters") {
        MeasurementOutcome::Completed { latency_limit_exceeded, latency_ms, .. } => {
            assert!(latency_limit_exceeded);
            assert!(latency_ms >= 20.0);
        }
        other => panic!("expected completion, got {other:?}"),
    }
    assert!(bridge.metrics().latency_ms_total >= 20.0);
}

// ============================================================================
// 5. Serialized outcomes
// ============================================================================

#[test]
fn test_outcome_serialization() {
    let bridge = MeasurementBridge::new(RecordingEngine::default(), BridgeConfig::default());

    let skipped = serde_json::to_value(bridge.measure("c", "", "meters")).unwrap();
    assert_eq!(skipped, json!({"status": "skipped", "reason": "empty spatial_path"}));

    let completed = serde_json::to_value(bridge.measure("c", "/a.ply", "")).unwrap();
    assert_eq!(completed["status"], json!("completed"));
    assert_eq!(completed["cache_hit"], json!(false));
    assert_eq!(completed["measurement"]["units"], json!("meters"));
    assert_eq!(completed["determinism"], json!({"seed": 42, "fixed_timestamps": true, "noise_mode": "none"}));
}
