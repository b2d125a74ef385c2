//! # relational-reasoner — Deterministic Rule-and-Metric Engine
//!
//! Reasons over a small symbolic world (entities, relations, constraints)
//! plus caller-supplied signals, and produces three kinds of judgments:
//! constraint violations, contradictions between confident relations, and a
//! recommended next action. A companion capability merges several records
//! into one derived record and scores how much that improves coherence.
//!
//! ## Design Principles
//!
//! 1. **Pure**: every operation is a function of its arguments. No clock, no
//!    randomness, no shared mutable state. Same input, bit-identical output.
//! 2. **Total**: malformed domain data degrades to a skip or a soft
//!    violation. Only a wrong call shape (a state that is not a mapping,
//!    synthesis with no matching records) is an `Err`.
//! 3. **Tagged inputs**: loose JSON is decoded once at the boundary into
//!    tagged enums, with an explicit malformed channel (`Entry::Malformed`).
//!
//! ## Quick Start
//!
//! ```rust
//! use relational_reasoner::{check_constraints, Comparison, Constraint, Entity,
//!     RelationalState, Severity};
//!
//! let state = RelationalState::new()
//!     .with_entity(Entity::new("A").with_attribute("x", 7))
//!     .with_constraint(Constraint::numeric(Comparison::Lt, "A", "x", 5.0, Severity::Hard));
//!
//! let report = check_constraints(&state);
//! assert!(report.has_hard_violation);
//! assert_eq!(report.violations[0].reason, "constraint_violation");
//! ```
//!
//! ## Components
//!
//! | Component | Module | Depends on |
//! |-----------|--------|------------|
//! | Numeric summaries | `stats` | `model` |
//! | Similarity / coherence / merge | `coherence` | `model` |
//! | Constraint checking | `check` | `model` |
//! | Contradiction detection | `contradiction` | `model` |
//! | Action recommendation | `actions` | `check`, `contradiction` |
//! | Synthesis | `synthesis` | `coherence`, `stats` |
//! | Spatial measurement attachment | `spatial` | `model` |
//! | Measurement bridge and cache | `bridge` | `spatial` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod stats;
pub mod coherence;
pub mod check;
pub mod contradiction;
pub mod actions;
pub mod synthesis;
pub mod spatial;
pub mod bridge;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    AttributeMap, Comparison, Constraint, Declared, Entity, Entry, NumericArgs, Record,
    Relation, RelationalState, Severity, SpatialArgs, SynthesisOpportunity, Value,
};

// ============================================================================
// Re-exports: Reasoning core
// ============================================================================

pub use stats::{summarize_distribution, summarize_numbers, Distribution};
pub use coherence::{combine_values, combine_vectors, cosine_similarity, measure_coherence};
pub use check::{check_constraints, ConstraintReport, Violation};
pub use contradiction::{detect_contradictions, Contradiction, ContradictionReport, CONFIDENCE_THRESHOLD};
pub use actions::{propose_actions, Action, ActionPlan, Signals, SIMILARITY_THRESHOLD};
pub use synthesis::{propose_next_steps, synthesize, NextStep, SynthesisResult, GAIN_EPSILON};

// ============================================================================
// Re-exports: Spatial bridge
// ============================================================================

pub use spatial::{attach_measurement, Bounds, PointCloudMeasurement};
pub use bridge::{
    BridgeConfig, BridgeMetrics, CacheKey, DeterminismConfig, LimitsConfig, MeasurementBridge,
    MeasurementCache, MeasurementEngine, MeasurementOutcome,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid relational state: expected a map, got {0}")]
    InvalidState(String),

    #[error("Invalid record: expected a map, got {0}")]
    InvalidRecord(String),

    #[error("Invalid synthesis opportunity: expected a map, got {0}")]
    InvalidOpportunity(String),

    #[error("Invalid signals: expected a map, got {0}")]
    InvalidSignals(String),

    #[error("No synthesis targets: none of {requested:?} match a known record")]
    NoSynthesisTargets { requested: Vec<String> },

    #[error("Measurement error: {0}")]
    Measurement(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
