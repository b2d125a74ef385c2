//! Severity decision table shared by the numeric and spatial validators.
//!
//! A validator only reports *findings*. Whether a breach is hard or soft,
//! and which reason string it carries, is decided here from one table:
//!
//! | Finding class | Resulting severity |
//! |---------------|--------------------|
//! | any data-quality finding | `soft` |
//! | logical findings only | declared severity |

use std::collections::BTreeSet;

use serde::Serialize;

use crate::model::Severity;

/// One observation made while validating a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Finding {
    // Numeric
    EntityMissing,
    AttributeMissing,
    ComparisonFailed,
    // Spatial payload shape
    UnitsInvalid,
    BoundsInvalid,
    BoundsShapeInvalid,
    BoundsNumericInvalid,
    VolumeSpecInvalid,
    VolumeMinInvalid,
    VolumeMaxInvalid,
    EntityVolumeMissing,
    // Spatial value mismatches
    BoundsOrderInvalid,
    VolumeNegative,
    VolumeRangeInvalid,
    VolumeBelowMin,
    VolumeAboveMax,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingClass {
    /// Data absent or shaped wrong. Always soft.
    DataQuality,
    /// A genuine breach. Keeps the declared severity.
    Logical,
}

impl Finding {
    pub fn class(self) -> FindingClass {
        use Finding::*;
        match self {
            EntityMissing | AttributeMissing | UnitsInvalid | BoundsInvalid
            | BoundsShapeInvalid | BoundsNumericInvalid | VolumeSpecInvalid
            | VolumeMinInvalid | VolumeMaxInvalid | EntityVolumeMissing => FindingClass::DataQuality,
            ComparisonFailed | BoundsOrderInvalid | VolumeNegative | VolumeRangeInvalid
            | VolumeBelowMin | VolumeAboveMax => FindingClass::Logical,
        }
    }
}

/// Which reason table applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Numeric,
    Spatial,
}

struct ReasonTable {
    /// When set, any data-quality finding collapses to this reason.
    data_quality: Option<&'static str>,
    /// Checked in order; the first present finding names the reason.
    rows: &'static [(Finding, &'static str)],
    fallback: &'static str,
}

const NUMERIC: ReasonTable = ReasonTable {
    data_quality: None,
    rows: &[
        (Finding::EntityMissing, "entity_missing"),
        (Finding::AttributeMissing, "attribute_missing_or_non_numeric"),
    ],
    fallback: "constraint_violation",
};

const SPATIAL: ReasonTable = ReasonTable {
    data_quality: Some("missing or malformed spatial data"),
    rows: &[
        (Finding::VolumeAboveMax, "volume exceeds allowed maximum"),
        (Finding::VolumeBelowMin, "volume below allowed minimum"),
        (Finding::BoundsOrderInvalid, "bounds invalid (min greater than max)"),
    ],
    fallback: "spatial constraint mismatch",
};

/// Outcome for a constraint that produced at least one finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verdict {
    pub severity: Severity,
    pub reason: &'static str,
}

/// Decide severity and reason. `None` when there is nothing to report.
pub fn decide(family: Family, declared: Severity, findings: &BTreeSet<Finding>) -> Option<Verdict> {
    if findings.is_empty() {
        return None;
    }
    let table = match family {
        Family::Numeric => &NUMERIC,
        Family::Spatial => &SPATIAL,
    };
    let data_quality = findings.iter().any(|f| f.class() == FindingClass::DataQuality);
    let severity = if data_quality { Severity::Soft } else { declared };

    let reason = match table.data_quality {
        Some(reason) if data_quality => reason,
        _ => table
            .rows
            .iter()
            .find(|(f, _)| findings.contains(f))
            .map(|(_, reason)| *reason)
            .unwrap_or(table.fallback),
    };
    Some(Verdict { severity, reason })
}
