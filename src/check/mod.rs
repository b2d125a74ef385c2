//! # Constraint Checker
//!
//! Validates a relational state against its declared constraints.
//!
//! Constraints are visited in declaration order and every violation keeps
//! the index of the constraint that produced it. Malformed constraints are
//! skipped without affecting later ones. Severity and reason come from the
//! shared decision table in [`policy`].

pub mod policy;
pub mod spatial;

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::model::{Constraint, Declared, Entry, NumericArgs, RelationalState, Severity, SpatialArgs};
use policy::{decide, Family, Finding};

/// A single constraint breach.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// Position of the constraint in `state.constraints`.
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: Severity,
    pub entity_id: String,
    #[serde(flatten)]
    pub detail: ViolationDetail,
    /// The constraint as declared.
    pub constraint: Constraint,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ViolationDetail {
    Numeric {
        attribute: String,
        expected: f64,
        actual: Option<f64>,
    },
    Spatial {
        details: BTreeSet<Finding>,
    },
}

/// Result of [`check_constraints`].
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConstraintReport {
    /// Sorted ascending by `index`.
    pub violations: Vec<Violation>,
    pub has_hard_violation: bool,
    pub has_soft_violation: bool,
    /// A hard breach counts as a logical contradiction downstream.
    pub contradiction: bool,
}

impl ConstraintReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check every constraint of `state`.
pub fn check_constraints(state: &RelationalState) -> ConstraintReport {
    let mut violations = Vec::new();

    for (index, entry) in state.constraints.iter().enumerate() {
        let constraint = match entry {
            Entry::Valid(c) => c,
            Entry::Malformed(raw) => {
                trace!(index, kind = raw.type_name(), "malformed constraint skipped");
                continue;
            }
        };
        if constraint.entity_id().is_empty() {
            trace!(index, "constraint without entity id skipped");
            continue;
        }

        let violation = match constraint {
            Constraint::Spatial(declared) => check_spatial(state, index, constraint, declared),
            Constraint::Lt(declared)
            | Constraint::Gt(declared)
            | Constraint::Eq(declared)
            | Constraint::Neq(declared) => check_numeric(state, index, constraint, declared),
        };
        violations.extend(violation);
    }

    violations.sort_by_key(|v| v.index);
    let has_hard_violation = violations.iter().any(|v| v.severity == Severity::Hard);
    let has_soft_violation = violations.iter().any(|v| v.severity == Severity::Soft);

    debug!(
        constraints = state.constraints.len(),
        violations = violations.len(),
        has_hard_violation,
        "constraints checked"
    );

    ConstraintReport {
        violations,
        has_hard_violation,
        has_soft_violation,
        contradiction: has_hard_violation,
    }
}

fn check_numeric(
    state: &RelationalState,
    index: usize,
    constraint: &Constraint,
    declared: &Declared<NumericArgs>,
) -> Option<Violation> {
    let args = &declared.args;
    if args.attribute.is_empty() {
        trace!(index, "numeric constraint without attribute skipped");
        return None;
    }
    let op = constraint.comparison()?;

    let mut findings = BTreeSet::new();
    let actual = match state.entity(&args.entity_id) {
        None => {
            findings.insert(Finding::EntityMissing);
            None
        }
        Some(entity) => {
            let actual = entity.numeric(&args.attribute);
            match actual {
                None => {
                    findings.insert(Finding::AttributeMissing);
                }
                Some(a) if !op.holds(a, args.value) => {
                    findings.insert(Finding::ComparisonFailed);
                }
                Some(_) => {}
            }
            actual
        }
    };

    let verdict = decide(Family::Numeric, declared.severity, &findings)?;
    Some(Violation {
        index,
        kind: constraint.type_name(),
        severity: verdict.severity,
        entity_id: args.entity_id.clone(),
        detail: ViolationDetail::Numeric {
            attribute: args.attribute.clone(),
            expected: args.value,
            actual,
        },
        constraint: constraint.clone(),
        reason: verdict.reason,
    })
}

fn check_spatial(
    state: &RelationalState,
    index: usize,
    constraint: &Constraint,
    declared: &Declared<SpatialArgs>,
) -> Option<Violation> {
    let args = &declared.args;
    let findings = spatial::inspect(args, state.entity(&args.entity_id));
    let verdict = decide(Family::Spatial, declared.severity, &findings)?;
    Some(Violation {
        index,
        kind: constraint.type_name(),
        severity: verdict.severity,
        entity_id: args.entity_id.clone(),
        detail: ViolationDetail::Spatial { details: findings },
        constraint: constraint.clone(),
        reason: verdict.reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Comparison, Entity};

    fn state_with(x: i64, severity: Severity) -> RelationalState {
        RelationalState::new()
            .with_entity(Entity::new("A").with_attribute("x", x))
            .with_constraint(Constraint::numeric(Comparison::Lt, "A", "x", 5.0, severity))
    }

    #[test]
    fn satisfied_constraint_is_silent() {
        let report = check_constraints(&state_with(3, Severity::Hard));
        assert!(report.is_clean());
        assert!(!report.contradiction);
    }

    #[test]
    fn breach_keeps_declared_severity() {
        let report = check_constraints(&state_with(7, Severity::Hard));
        assert_eq!(report.violations.len(), 1);
        let v = &report.violations[0];
        assert_eq!(v.severity, Severity::Hard);
        assert_eq!(
            v.detail,
            ViolationDetail::Numeric { attribute: "x".into(), expected: 5.0, actual: Some(7.0) }
        );
        assert!(report.has_hard_violation && report.contradiction);
        assert!(!report.has_soft_violation);
    }

    #[test]
    fn missing_entity_is_soft() {
        let state = RelationalState::new()
            .with_constraint(Constraint::numeric(Comparison::Gt, "A", "x", 1.0, Severity::Hard));
        let report = check_constraints(&state);
        assert_eq!(report.violations[0].severity, Severity::Soft);
        assert_eq!(report.violations[0].reason, "entity_missing");
        assert!(!report.contradiction);
    }

    #[test]
    fn boolean_attribute_is_not_numeric() {
        let state = RelationalState::new()
            .with_entity(Entity::new("A").with_attribute("x", true))
            .with_constraint(Constraint::numeric(Comparison::Eq, "A", "x", 1.0, Severity::Hard));
        let report = check_constraints(&state);
        assert_eq!(report.violations[0].reason, "attribute_missing_or_non_numeric");
        assert_eq!(report.violations[0].severity, Severity::Soft);
    }

    #[test]
    fn empty_entity_id_is_skipped() {
        let state = RelationalState::new()
            .with_constraint(Constraint::numeric(Comparison::Lt, "", "x", 1.0, Severity::Hard));
        assert!(check_constraints(&state).is_clean());
    }
}
