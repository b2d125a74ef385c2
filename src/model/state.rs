//! The relational state snapshot under evaluation.

use serde::{Deserialize, Serialize};

use super::{lenient, Constraint, Entity, Entry, Relation};
use crate::{Error, Result};

/// Entities, relations and constraints under evaluation.
///
/// Entry positions matter: violation and contradiction rows refer back to
/// them by index. Malformed entries keep their slot and are skipped.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RelationalState {
    #[serde(default, deserialize_with = "lenient::entries")]
    pub entities: Vec<Entry<Entity>>,
    #[serde(default, deserialize_with = "lenient::entries")]
    pub relations: Vec<Entry<Relation>>,
    #[serde(default, deserialize_with = "lenient::entries")]
    pub constraints: Vec<Entry<Constraint>>,
}

impl RelationalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a state from JSON. Only a non-mapping top level is rejected;
    /// every malformation below it is kept as a malformed entry.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(Error::InvalidState(json_type_name(raw).into()));
        }
        Ok(serde_json::from_value(raw.clone())?)
    }

    pub fn with_entity(mut self, entity: Entity) -> Self {
        self.entities.push(Entry::Valid(entity));
        self
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(Entry::Valid(relation));
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(Entry::Valid(constraint));
        self
    }

    /// First well-formed entity with the given id.
    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .filter_map(Entry::valid)
            .find(|e| e.id == id)
    }

    /// Well-formed relations with their original positions.
    pub fn relations_indexed(&self) -> impl Iterator<Item = (usize, &Relation)> {
        self.relations
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.valid().map(|r| (i, r)))
    }

    /// Well-formed constraints with their original positions.
    pub fn constraints_indexed(&self) -> impl Iterator<Item = (usize, &Constraint)> {
        self.constraints
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.valid().map(|c| (i, c)))
    }
}

pub(crate) fn json_type_name(raw: &serde_json::Value) -> &'static str {
    match raw {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "map",
    }
}
