//! # Relational Model
//!
//! Plain DTOs for everything the engine reasons over: the relational state
//! (entities, relations, constraints) and the records fed to synthesis.
//!
//! Design rule: this module is pure data. No I/O, no state, no evaluation
//! logic beyond lenient decoding.

use std::collections::BTreeMap;

pub mod value;
pub mod lenient;
pub mod entity;
pub mod relation;
pub mod constraint;
pub mod state;
pub mod record;

pub use value::Value;
pub use lenient::Entry;
pub use entity::Entity;
pub use relation::Relation;
pub use constraint::{Comparison, Constraint, Declared, NumericArgs, Severity, SpatialArgs};
pub use state::RelationalState;
pub use record::{Record, SynthesisOpportunity};

/// Attribute name to value, kept in sorted key order.
pub type AttributeMap = BTreeMap<String, Value>;
