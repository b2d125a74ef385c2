//! Findings for `spatial` constraints: units, bounds and volume payloads.

use std::collections::BTreeSet;

use crate::model::{Entity, SpatialArgs, Value};
use super::policy::Finding;

/// Inspect a spatial payload against its entity (if any).
///
/// Returns every finding; an empty set means the constraint holds.
pub fn inspect(args: &SpatialArgs, entity: Option<&Entity>) -> BTreeSet<Finding> {
    let mut findings = BTreeSet::new();
    // null reads as absent, matching how the JSON decoder treats it
    let bounds = args.bounds.as_ref().filter(|v| !v.is_null());
    let volume = args.volume.as_ref().filter(|v| !v.is_null());

    if let Some(units) = &args.units {
        if !units.is_string() {
            findings.insert(Finding::UnitsInvalid);
        }
    }

    if let Some(bounds) = bounds {
        inspect_bounds(bounds, &mut findings);
    }

    if let Some(volume) = volume {
        inspect_volume(volume, entity, &mut findings);
    }

    if entity.is_none() && (bounds.is_some() || volume.is_some()) {
        findings.insert(Finding::EntityMissing);
    }

    findings
}

/// `{min: [x, y, z], max: [x, y, z]}` with `min <= max` on every axis.
fn inspect_bounds(bounds: &Value, findings: &mut BTreeSet<Finding>) {
    let Some(map) = bounds.as_map() else {
        findings.insert(Finding::BoundsInvalid);
        return;
    };
    let corner = |key: &str| map.get(key).and_then(Value::as_list).filter(|c| c.len() == 3);
    let (Some(min), Some(max)) = (corner("min"), corner("max")) else {
        findings.insert(Finding::BoundsShapeInvalid);
        return;
    };
    let numeric = |c: &[Value]| c.iter().map(Value::as_float).collect::<Option<Vec<f64>>>();
    let (Some(min), Some(max)) = (numeric(min), numeric(max)) else {
        findings.insert(Finding::BoundsNumericInvalid);
        return;
    };
    if min.iter().zip(&max).any(|(lo, hi)| lo > hi) {
        findings.insert(Finding::BoundsOrderInvalid);
    }
}

/// A number is a non-negativity check; a `{min?, max?}` map is a range
/// checked against the entity's numeric `volume` attribute.
fn inspect_volume(volume: &Value, entity: Option<&Entity>, findings: &mut BTreeSet<Finding>) {
    if let Some(v) = volume.as_float() {
        if v < 0.0 {
            findings.insert(Finding::VolumeNegative);
        }
        return;
    }
    let Some(range) = volume.as_map() else {
        findings.insert(Finding::VolumeSpecInvalid);
        return;
    };

    let (min, max) = (range_end(range.get("min")), range_end(range.get("max")));
    let (min, max) = match (min, max) {
        (Ok(min), Ok(max)) => (min, max),
        (min, max) => {
            if min.is_err() {
                findings.insert(Finding::VolumeMinInvalid);
            }
            if max.is_err() {
                findings.insert(Finding::VolumeMaxInvalid);
            }
            return;
        }
    };

    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            findings.insert(Finding::VolumeRangeInvalid);
        }
    }

    let Some(entity) = entity else {
        findings.insert(Finding::EntityMissing);
        return;
    };
    let Some(actual) = entity.numeric("volume") else {
        findings.insert(Finding::EntityVolumeMissing);
        return;
    };
    if min.is_some_and(|lo| actual < lo) {
        findings.insert(Finding::VolumeBelowMin);
    }
    if max.is_some_and(|hi| actual > hi) {
        findings.insert(Finding::VolumeAboveMax);
    }
}

/// An absent or null range end is unbounded; a non-number is malformed.
fn range_end(v: Option<&Value>) -> Result<Option<f64>, ()> {
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_float().map(Some).ok_or(()),
    }
}
