//! # Action Recommender
//!
//! Combines constraint and contradiction verdicts with caller signals into
//! an ordered list of recommended actions.
//!
//! Priority, not voting:
//! 1. hard violation or contradiction: `contradiction_resolve` is decisive,
//!    other valid candidates follow as secondary recommendations
//! 2. synthesis candidate: `synthesis` is decisive, `review` may follow
//! 3. review candidate: `review` is decisive
//! 4. otherwise `review` is recommended with no decisive action

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::check::{check_constraints, ConstraintReport};
use crate::contradiction::{detect_contradictions, ContradictionReport};
use crate::model::lenient;
use crate::model::state::json_type_name;
use crate::model::RelationalState;
use crate::{Error, Result};

/// Minimum similarity for a synthesis candidate.
pub const SIMILARITY_THRESHOLD: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ContradictionResolve,
    Review,
    Synthesis,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::ContradictionResolve => write!(f, "contradiction_resolve"),
            Action::Review => write!(f, "review"),
            Action::Synthesis => write!(f, "synthesis"),
        }
    }
}

/// Caller-supplied signals. Every field is optional and loosely typed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Signals {
    #[serde(default, deserialize_with = "lenient::loose_number")]
    pub similarity: f64,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub usefulness: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string")]
    pub objective_relation: Option<String>,
}

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_similarity(mut self, similarity: f64) -> Self {
        self.similarity = similarity;
        self
    }

    pub fn with_usefulness(mut self, usefulness: impl Into<String>) -> Self {
        self.usefulness = Some(usefulness.into());
        self
    }

    pub fn with_objective_relation(mut self, relation: impl Into<String>) -> Self {
        self.objective_relation = Some(relation.into());
        self
    }

    pub fn from_json(raw: &serde_json::Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(Error::InvalidSignals(json_type_name(raw).into()));
        }
        Ok(serde_json::from_value(raw.clone())?)
    }

    /// Useful now and similar enough to merge.
    pub fn suggests_synthesis(&self) -> bool {
        self.usefulness.as_deref() == Some("useful_now") && self.similarity >= SIMILARITY_THRESHOLD
    }

    /// Aligned with the current objective.
    pub fn suggests_review(&self) -> bool {
        self.objective_relation.as_deref() == Some("aligned")
    }
}

/// Result of [`propose_actions`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionPlan {
    /// Deduplicated, first occurrence wins.
    pub recommended_actions: SmallVec<[Action; 3]>,
    pub decisive_recommendation: Option<Action>,
    pub reasons: Vec<&'static str>,
    pub constraints: ConstraintReport,
    pub contradictions: ContradictionReport,
}

const REASON_HARD: &str = "hard constraint violation";
const REASON_CONTRADICTION: &str = "contradiction detected";
const REASON_ALIGNED: &str = "objective alignment";
const REASON_SYNTHESIS: &str = "high similarity and usefulness";

/// Recommend actions for `state` under `signals`.
pub fn propose_actions(state: &RelationalState, signals: &Signals) -> ActionPlan {
    let constraints = check_constraints(state);
    let contradictions = detect_contradictions(state);

    let has_hard = constraints.has_hard_violation;
    let has_contradiction = contradictions.has_contradiction;
    let synthesis = signals.suggests_synthesis();
    let review = signals.suggests_review();

    let mut recommended: SmallVec<[Action; 3]> = SmallVec::new();
    let mut reasons = Vec::new();
    let decisive;

    if has_hard || has_contradiction {
        recommended.push(Action::ContradictionResolve);
        decisive = Some(Action::ContradictionResolve);
        if has_hard {
            reasons.push(REASON_HARD);
        }
        if has_contradiction {
            reasons.push(REASON_CONTRADICTION);
        }
        if review {
            recommended.push(Action::Review);
            reasons.push(REASON_ALIGNED);
        }
        if synthesis {
            recommended.push(Action::Synthesis);
            reasons.push(REASON_SYNTHESIS);
        }
    } else if synthesis {
        recommended.push(Action::Synthesis);
        decisive = Some(Action::Synthesis);
        reasons.push(REASON_SYNTHESIS);
        if review {
            recommended.push(Action::Review);
            reasons.push(REASON_ALIGNED);
        }
        reasons.push("no contradictions");
        reasons.push("no constraint violations");
    } else if review {
        recommended.push(Action::Review);
        decisive = Some(Action::Review);
        reasons.push(REASON_ALIGNED);
    } else {
        recommended.push(Action::Review);
        decisive = None;
    }

    let mut recommended_actions: SmallVec<[Action; 3]> = SmallVec::new();
    for action in recommended {
        if !recommended_actions.contains(&action) {
            recommended_actions.push(action);
        }
    }

    debug!(
        ?decisive,
        actions = recommended_actions.len(),
        has_hard,
        has_contradiction,
        "actions proposed"
    );

    ActionPlan {
        recommended_actions,
        decisive_recommendation: decisive,
        reasons,
        constraints,
        contradictions,
    }
}
