//! Measurement bridge: calls an external point-cloud engine through an
//! owned, bounded cache.
//!
//! ```text
//! measure(cycle, path, units)
//!   ├─ blank path ─────────────────────────────► skipped
//!   ├─ cache hit (TTL > 0) ────────────────────► completed, cache_hit
//!   ├─ cycle budget spent ─────────────────────► skipped
//!   └─ engine.measure()
//!        ├─ Err ───────────────────────────────► error   (failures_total += 1)
//!        ├─ no points ─────────────────────────► skipped
//!        └─ Ok ──► cache insert ───────────────► completed
//! ```
//!
//! The bridge owns every piece of state it touches (cache, counters, cycle
//! budget); two bridges never share anything.

mod cache;
mod config;

pub use cache::{normalize_path, normalize_units, CacheEntryInfo, CacheKey, CacheStats, MeasurementCache};
pub use config::{BridgeConfig, DeterminismConfig, LimitsConfig};

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::spatial::PointCloudMeasurement;
use crate::Result;

// ============================================================================
// Engine seam
// ============================================================================

/// An external point-cloud measurement engine.
pub trait MeasurementEngine {
    fn measure(&self, path: &Path, units: &str) -> Result<PointCloudMeasurement>;
}

impl<F> MeasurementEngine for F
where
    F: Fn(&Path, &str) -> Result<PointCloudMeasurement>,
{
    fn measure(&self, path: &Path, units: &str) -> Result<PointCloudMeasurement> {
        self(path, units)
    }
}

// ============================================================================
// Outcome
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MeasurementOutcome {
    Completed {
        path: PathBuf,
        measurement: PointCloudMeasurement,
        determinism: DeterminismConfig,
        cache_hit: bool,
        latency_ms: f64,
        latency_limit_exceeded: bool,
    },
    Skipped {
        reason: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<PathBuf>,
    },
    Error {
        error: String,
        path: PathBuf,
        latency_ms: f64,
    },
}

impl MeasurementOutcome {
    pub fn status(&self) -> &'static str {
        match self {
            MeasurementOutcome::Completed { .. } => "completed",
            MeasurementOutcome::Skipped { .. } => "skipped",
            MeasurementOutcome::Error { .. } => "error",
        }
    }

    pub fn measurement(&self) -> Option<&PointCloudMeasurement> {
        match self {
            MeasurementOutcome::Completed { measurement, .. } => Some(measurement),
            _ => None,
        }
    }

    pub fn cache_hit(&self) -> bool {
        matches!(self, MeasurementOutcome::Completed { cache_hit: true, .. })
    }
}

pub const SKIP_EMPTY_PATH: &str = "empty spatial_path";
pub const SKIP_BUDGET: &str = "call budget exhausted for cycle";
pub const SKIP_NO_POINTS: &str = "no points loaded";

// ============================================================================
// Metrics
// ============================================================================

/// Snapshot of the bridge counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BridgeMetrics {
    pub calls_total: u64,
    pub failures_total: u64,
    pub cache_hits_total: u64,
    pub cache_misses_total: u64,
    pub latency_ms_total: f64,
}

#[derive(Debug, Default)]
struct Counters {
    calls_total: AtomicU64,
    failures_total: AtomicU64,
    cache_hits_total: AtomicU64,
    cache_misses_total: AtomicU64,
    latency_us_total: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn add_latency(&self, elapsed: std::time::Duration) {
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.latency_us_total.fetch_add(micros, Ordering::Relaxed);
    }

    fn snapshot(&self) -> BridgeMetrics {
        BridgeMetrics {
            calls_total: self.calls_total.load(Ordering::Relaxed),
            failures_total: self.failures_total.load(Ordering::Relaxed),
            cache_hits_total: self.cache_hits_total.load(Ordering::Relaxed),
            cache_misses_total: self.cache_misses_total.load(Ordering::Relaxed),
            latency_ms_total: self.latency_us_total.load(Ordering::Relaxed) as f64 / 1000.0,
        }
    }
}

/// A cycle unseen for this long is forgotten.
const CYCLE_STALE_AFTER: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone, Copy)]
struct CycleUsage {
    used: u32,
    last_seen: Instant,
}

/// Engine calls spent per cycle id.
#[derive(Debug, Default)]
struct CycleBudget {
    cycles: HashMap<String, CycleUsage>,
}

impl CycleBudget {
    /// Reserve one engine call in `cycle`. `limit == 0` never refuses.
    fn try_take(&mut self, cycle: &str, limit: u32, now: Instant) -> bool {
        self.cycles
            .retain(|_, usage| now.saturating_duration_since(usage.last_seen) <= CYCLE_STALE_AFTER);
        let usage = self
            .cycles
            .entry_ref(cycle)
            .or_insert(CycleUsage { used: 0, last_seen: now });
        usage.last_seen = now;
        if limit > 0 && usage.used >= limit {
            return false;
        }
        usage.used += 1;
        true
    }

    fn used(&self, cycle: &str) -> u32 {
        self.cycles.get(cycle).map_or(0, |usage| usage.used)
    }
}

// ============================================================================
// MeasurementBridge
// ============================================================================

pub struct MeasurementBridge<E> {
    engine: E,
    config: BridgeConfig,
    cache: MeasurementCache,
    budget: Mutex<CycleBudget>,
    counters: Counters,
}

impl<E: MeasurementEngine> MeasurementBridge<E> {
    pub fn new(engine: E, config: BridgeConfig) -> Self {
        let cache = MeasurementCache::new(config.limits.max_cache_entries, config.cache_ttl());
        Self {
            engine,
            config,
            cache,
            budget: Mutex::new(CycleBudget::default()),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn metrics(&self) -> BridgeMetrics {
        self.counters.snapshot()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Engine calls already spent in `cycle`.
    pub fn cycle_calls(&self, cycle: &str) -> u32 {
        self.budget.lock().used(cycle)
    }

    /// Measure `path` within `cycle`.
    pub fn measure(&self, cycle: &str, path: &str, units: &str) -> MeasurementOutcome {
        let path = path.trim();
        if path.is_empty() {
            return MeasurementOutcome::Skipped { reason: SKIP_EMPTY_PATH, path: None };
        }
        let units = units.trim();
        let units = if units.is_empty() { "meters" } else { units };

        let key = match CacheKey::new(path, units, &self.config.determinism) {
            Ok(key) => key,
            Err(e) => {
                return MeasurementOutcome::Error {
                    error: e.to_string(),
                    path: PathBuf::from(path),
                    latency_ms: 0.0,
                };
            }
        };

        let caching = self.cache.is_enabled();
        if caching {
            if let Some(measurement) = self.cache.get(&key) {
                Counters::bump(&self.counters.cache_hits_total);
                debug!(path, "measurement cache hit");
                return MeasurementOutcome::Completed {
                    path: PathBuf::from(path),
                    measurement,
                    determinism: self.config.determinism.clone(),
                    cache_hit: true,
                    latency_ms: 0.0,
                    latency_limit_exceeded: false,
                };
            }
            Counters::bump(&self.counters.cache_misses_total);
            debug!(path, "measurement cache miss");
        }

        let limit = self.config.limits.max_calls_per_cycle;
        if !self.budget.lock().try_take(cycle, limit, Instant::now()) {
            debug!(cycle, path, "engine call refused, cycle budget spent");
            return MeasurementOutcome::Skipped { reason: SKIP_BUDGET, path: Some(PathBuf::from(path)) };
        }

        Counters::bump(&self.counters.calls_total);
        let started = Instant::now();
        let result = self.engine.measure(Path::new(path), units);
        let elapsed = started.elapsed();
        self.counters.add_latency(elapsed);
        let latency_ms = elapsed.as_secs_f64() * 1000.0;

        let measurement = match result {
            Ok(m) => m,
            Err(e) => {
                Counters::bump(&self.counters.failures_total);
                warn!(path, error = %e, "measurement failed");
                return MeasurementOutcome::Error { error: e.to_string(), path: PathBuf::from(path), latency_ms };
            }
        };

        if measurement.count == 0 {
            return MeasurementOutcome::Skipped { reason: SKIP_NO_POINTS, path: Some(PathBuf::from(path)) };
        }

        let latency_limit_exceeded = self.config.max_latency().is_some_and(|limit| elapsed > limit);
        if latency_limit_exceeded {
            warn!(
                path,
                latency_ms,
                limit_ms = self.config.limits.max_latency_ms,
                "measurement latency exceeded limit"
            );
        }

        if caching {
            self.cache.insert(key, measurement.clone());
        }

        MeasurementOutcome::Completed {
            path: PathBuf::from(path),
            measurement,
            determinism: self.config.determinism.clone(),
            cache_hit: false,
            latency_ms,
            latency_limit_exceeded,
        }
    }
}
