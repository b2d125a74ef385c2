//! Relation (directed labeled edge) in the relational state.

use serde::{Deserialize, Serialize};

use super::{lenient, Value};

/// A `subj -pred-> obj` assertion with a confidence in `[0, 1]`.
///
/// A confidence that is missing, out of range or not a number decodes as `0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub subj: String,
    pub pred: String,
    pub obj: String,
    #[serde(default, deserialize_with = "lenient::confidence")]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
}

impl Relation {
    pub fn new(
        subj: impl Into<String>,
        pred: impl Into<String>,
        obj: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            subj: subj.into(),
            pred: pred.into(),
            obj: obj.into(),
            confidence,
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<Value>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Confidence as the engine sees it: out-of-range or non-finite reads as `0`.
    pub fn effective_confidence(&self) -> f64 {
        if self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence) {
            self.confidence
        } else {
            0.0
        }
    }

    pub fn source_str(&self) -> Option<&str> {
        self.source.as_ref().and_then(Value::as_str)
    }
}
