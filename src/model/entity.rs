//! Entity in the relational state.

use serde::{Deserialize, Serialize};

use super::{lenient, AttributeMap, Value};

/// A named thing in the symbolic world, carrying free-form attributes.
///
/// `id` is unique within a state. Only numeric (non-boolean) attributes take
/// part in constraint evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default, deserialize_with = "lenient::attributes")]
    pub attributes: AttributeMap,
    #[serde(rename = "type", default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Entity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: AttributeMap::new(),
            kind: None,
            source: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// The attribute as a number, if present and numeric (booleans excluded).
    pub fn numeric(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }
}
