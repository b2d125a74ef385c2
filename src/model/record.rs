//! Records: the atomic units of knowledge eligible for synthesis.

use serde::{Deserialize, Serialize};

use super::state::json_type_name;
use super::{lenient, AttributeMap, Value};
use crate::{Error, Result};

/// A record with a value and an optional conceptual vector.
///
/// Fields the engine does not interpret (`context_id`, `objective_links`,
/// ...) are carried in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_id: String,
    #[serde(default)]
    pub value: Value,
    #[serde(default, deserialize_with = "lenient::vector", skip_serializing_if = "Option::is_none")]
    pub conceptual_vector: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub derived: bool,
    #[serde(default, deserialize_with = "lenient::string_list", skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(flatten)]
    pub extra: AttributeMap,
}

impl Record {
    pub fn new(record_id: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            record_id: record_id.into(),
            value: value.into(),
            conceptual_vector: None,
            derived: false,
            inputs: Vec::new(),
            extra: AttributeMap::new(),
        }
    }

    pub fn with_vector(mut self, vector: impl Into<Vec<f64>>) -> Self {
        self.conceptual_vector = Some(vector.into());
        self
    }

    /// Decode a record from JSON; anything but a mapping is a caller error.
    pub fn from_json(raw: &serde_json::Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(Error::InvalidRecord(json_type_name(raw).into()));
        }
        Ok(serde_json::from_value(raw.clone())?)
    }
}

/// Which records to merge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SynthesisOpportunity {
    #[serde(default, deserialize_with = "lenient::string_list")]
    pub target_ids: Vec<String>,
}

impl SynthesisOpportunity {
    pub fn new<I, S>(target_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { target_ids: target_ids.into_iter().map(Into::into).collect() }
    }

    pub fn from_json(raw: &serde_json::Value) -> Result<Self> {
        if !raw.is_object() {
            return Err(Error::InvalidOpportunity(json_type_name(raw).into()));
        }
        Ok(serde_json::from_value(raw.clone())?)
    }
}
