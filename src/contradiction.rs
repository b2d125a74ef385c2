//! # Contradiction Detector
//!
//! Rule: two confident relations with the same `(subj, pred)` and different
//! `obj` contradict each other.
//!
//! Only relations with confidence `>= 0.8` take part; the threshold is a
//! hard cutoff. Relations are bucketed by `(subj, pred)`, each distinct
//! object keeps its first-seen relation, and the object seen earliest is the
//! *base*. Every other object in the bucket is paired against the base, never
//! against each other.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, trace};

use crate::model::{Entry, Relation, RelationalState, Value};

/// Minimum confidence for a relation to take part in detection.
pub const CONFIDENCE_THRESHOLD: f64 = 0.8;

/// Bucket key separator (U+241F SYMBOL FOR UNIT SEPARATOR).
const KEY_SEPARATOR: char = '\u{241f}';

/// Compact view of one side of a contradiction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationDescriptor {
    pub pred: String,
    pub obj: String,
    pub confidence: f64,
    pub source: Option<Value>,
}

impl From<&Relation> for RelationDescriptor {
    fn from(r: &Relation) -> Self {
        Self {
            pred: r.pred.clone(),
            obj: r.obj.clone(),
            confidence: r.effective_confidence(),
            source: r.source.clone(),
        }
    }
}

/// Base relation versus one conflicting relation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contradiction {
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// The shared subject.
    pub entities: Vec<String>,
    /// `[base, other]`.
    pub relations: [RelationDescriptor; 2],
    /// Positions of `[base, other]` in `state.relations`.
    pub relation_indices: [usize; 2],
    pub reason: &'static str,
}

/// Result of [`detect_contradictions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContradictionReport {
    pub contradictions: Vec<Contradiction>,
    pub has_contradiction: bool,
    /// Alias of `has_contradiction`.
    pub contradiction: bool,
    /// `"relation_conflict"` when anything was found, else `"none"`.
    pub via: &'static str,
}

/// Find conflicting high-confidence relations.
///
/// Buckets are visited in sorted key order; within a bucket, conflicting
/// objects are emitted in sorted object order.
pub fn detect_contradictions(state: &RelationalState) -> ContradictionReport {
    // key -> (obj -> first-seen (index, relation)); indices arrive ascending,
    // so the first insert per object is the earliest one.
    let mut buckets: BTreeMap<String, BTreeMap<&str, (usize, &Relation)>> = BTreeMap::new();

    for (index, entry) in state.relations.iter().enumerate() {
        let relation = match entry {
            Entry::Valid(r) => r,
            Entry::Malformed(_) => {
                trace!(index, "malformed relation skipped");
                continue;
            }
        };
        if relation.effective_confidence() < CONFIDENCE_THRESHOLD {
            continue;
        }
        let key = format!("{}{KEY_SEPARATOR}{}", relation.subj, relation.pred);
        buckets
            .entry(key)
            .or_default()
            .entry(relation.obj.as_str())
            .or_insert((index, relation));
    }

    let mut contradictions = Vec::new();
    for objects in buckets.values() {
        if objects.len() < 2 {
            continue;
        }
        let Some(&(base_index, base)) = objects.values().min_by_key(|(index, _)| *index) else {
            continue;
        };
        for &(other_index, other) in objects.values() {
            if other_index == base_index {
                continue;
            }
            contradictions.push(Contradiction {
                kind: "relation_conflict",
                entities: vec![base.subj.clone()],
                relations: [base.into(), other.into()],
                relation_indices: [base_index, other_index],
                reason: "conflicting values for same predicate",
            });
        }
    }

    let has_contradiction = !contradictions.is_empty();
    debug!(
        relations = state.relations.len(),
        contradictions = contradictions.len(),
        "contradictions detected"
    );

    ContradictionReport {
        contradictions,
        has_contradiction,
        contradiction: has_contradiction,
        via: if has_contradiction { "relation_conflict" } else { "none" },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(relations: Vec<Relation>) -> RelationalState {
        relations.into_iter().fold(RelationalState::new(), RelationalState::with_relation)
    }

    #[test]
    fn two_confident_objects_conflict() {
        let report = detect_contradictions(&state(vec![
            Relation::new("a", "p", "x", 0.9),
            Relation::new("a", "p", "y", 0.85),
        ]));
        assert_eq!(report.contradictions.len(), 1);
        let c = &report.contradictions[0];
        assert_eq!(c.relations[0].obj, "x");
        assert_eq!(c.relations[1].obj, "y");
        assert_eq!(c.relation_indices, [0, 1]);
        assert_eq!(report.via, "relation_conflict");
    }

    #[test]
    fn threshold_is_a_hard_cutoff() {
        let report = detect_contradictions(&state(vec![
            Relation::new("a", "p", "x", 0.9),
            Relation::new("a", "p", "y", 0.79),
        ]));
        assert!(!report.has_contradiction);
        assert_eq!(report.via, "none");
    }

    #[test]
    fn duplicate_objects_do_not_conflict() {
        let report = detect_contradictions(&state(vec![
            Relation::new("a", "p", "x", 0.9),
            Relation::new("a", "p", "x", 0.95),
        ]));
        assert!(!report.has_contradiction);
    }

    #[test]
    fn base_is_earliest_object() {
        let report = detect_contradictions(&state(vec![
            Relation::new("a", "p", "z", 0.9),
            Relation::new("a", "p", "b", 0.9),
            Relation::new("a", "p", "c", 0.9),
        ]));
        let pairs: Vec<[usize; 2]> = report.contradictions.iter().map(|c| c.relation_indices).collect();
        assert_eq!(pairs, vec![[0, 1], [0, 2]]);
        assert!(report.contradictions.iter().all(|c| c.relations[0].obj == "z"));
    }

    #[test]
    fn out_of_range_confidence_reads_as_zero() {
        let report = detect_contradictions(&state(vec![
            Relation::new("a", "p", "x", 1.5),
            Relation::new("a", "p", "y", 0.9),
        ]));
        assert!(!report.has_contradiction);
    }
}
