//! Bounded LRU cache of completed measurements with TTL expiry, on moka.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use serde::Serialize;

use super::config::{DeterminismConfig, DEFAULT_MAX_CACHE_ENTRIES};
use crate::spatial::PointCloudMeasurement;
use crate::Result;

const DEFAULT_UNITS: &str = "meters";

/// Trimmed, lower-cased units; blank reads as meters.
pub fn normalize_units(units: &str) -> String {
    let units = units.trim();
    if units.is_empty() {
        DEFAULT_UNITS.to_owned()
    } else {
        units.to_lowercase()
    }
}

/// Absolute path with `.` and `..` folded away lexically. Symlinks are not
/// resolved and `..` never climbs above the root.
pub fn normalize_path(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if out.parent().is_some() {
                    out.pop();
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    path: PathBuf,
    units: String,
    determinism: DeterminismConfig,
}

impl CacheKey {
    /// Fails only when `path` cannot be made absolute (e.g. it is empty).
    pub fn new(path: impl AsRef<Path>, units: &str, determinism: &DeterminismConfig) -> Result<Self> {
        Ok(Self {
            path: normalize_path(path.as_ref())?,
            units: normalize_units(units),
            determinism: determinism.clone(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn determinism(&self) -> &DeterminismConfig {
        &self.determinism
    }
}

#[derive(Debug, Clone)]
struct Slot {
    stored_at: Instant,
    measurement: PointCloudMeasurement,
}

/// One row of [`MeasurementCache::stats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheEntryInfo {
    pub path: PathBuf,
    pub units: String,
    pub determinism: DeterminismConfig,
    pub age_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    /// Oldest first.
    pub entries: Vec<CacheEntryInfo>,
}

/// A `None` cache means caching is off (zero TTL or zero capacity).
pub struct MeasurementCache {
    cache: Option<Cache<CacheKey, Slot>>,
    ttl: Duration,
}

impl MeasurementCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let cache = (!ttl.is_zero() && capacity > 0).then(|| {
            Cache::builder()
                .max_capacity(capacity as u64)
                .time_to_live(ttl)
                .eviction_policy(EvictionPolicy::lru())
                .build()
        });
        Self { cache, ttl }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.cache.as_ref().map_or(0, |cache| {
            cache.run_pending_tasks();
            cache.entry_count() as usize
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
            cache.run_pending_tasks();
        }
    }

    /// Fresh entry for `key`, marked most recently used.
    pub fn get(&self, key: &CacheKey) -> Option<PointCloudMeasurement> {
        self.cache.as_ref()?.get(key).map(|slot| slot.measurement)
    }

    pub fn insert(&self, key: CacheKey, measurement: PointCloudMeasurement) {
        if let Some(cache) = &self.cache {
            cache.insert(key, Slot { stored_at: Instant::now(), measurement });
            // apply the capacity bound now rather than on a later write
            cache.run_pending_tasks();
        }
    }

    pub fn stats(&self) -> CacheStats {
        let Some(cache) = &self.cache else {
            return CacheStats { size: 0, entries: Vec::new() };
        };
        cache.run_pending_tasks();
        let now = Instant::now();
        let mut rows: Vec<(Instant, CacheEntryInfo)> = cache
            .iter()
            .map(|(key, slot)| {
                let info = CacheEntryInfo {
                    path: key.path.clone(),
                    units: key.units.clone(),
                    determinism: key.determinism.clone(),
                    age_seconds: now.saturating_duration_since(slot.stored_at).as_secs_f64(),
                };
                (slot.stored_at, info)
            })
            .collect();
        rows.sort_by_key(|(stored_at, _)| *stored_at);
        CacheStats {
            size: rows.len(),
            entries: rows.into_iter().map(|(_, info)| info).collect(),
        }
    }
}

impl std::fmt::Debug for MeasurementCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementCache")
            .field("enabled", &self.is_enabled())
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Default for MeasurementCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CACHE_ENTRIES, Duration::ZERO)
    }
}
