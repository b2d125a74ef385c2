//! Declared constraints over entity attributes and spatial payloads.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use super::{lenient, Value};

/// How decisive a breach is. Anything other than `"hard"` decodes as soft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Hard,
    #[default]
    Soft,
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v.as_str() {
            Some("hard") => Severity::Hard,
            _ => Severity::Soft,
        })
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Hard => write!(f, "hard"),
            Severity::Soft => write!(f, "soft"),
        }
    }
}

/// Comparison applied by a numeric constraint: `actual <op> expected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Lt,
    Gt,
    Eq,
    Neq,
}

impl Comparison {
    /// Whether `actual` satisfies the comparison. Exact float semantics.
    pub fn holds(self, actual: f64, expected: f64) -> bool {
        match self {
            Comparison::Lt => actual < expected,
            Comparison::Gt => actual > expected,
            Comparison::Eq => actual == expected,
            Comparison::Neq => actual != expected,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Comparison::Lt => "lt",
            Comparison::Gt => "gt",
            Comparison::Eq => "eq",
            Comparison::Neq => "neq",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericArgs {
    pub entity_id: String,
    pub attribute: String,
    pub value: f64,
}

/// Spatial payload. Each part stays raw so shape problems surface as
/// soft violations at check time instead of decode failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialArgs {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declared<A> {
    pub args: A,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, deserialize_with = "lenient::opt_string", skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl<A> Declared<A> {
    pub fn new(args: A, severity: Severity) -> Self {
        Self { args, severity, source: None }
    }
}

/// A constraint, tagged by its `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Constraint {
    Lt(Declared<NumericArgs>),
    Gt(Declared<NumericArgs>),
    Eq(Declared<NumericArgs>),
    Neq(Declared<NumericArgs>),
    Spatial(Declared<SpatialArgs>),
}

impl Constraint {
    pub fn numeric(
        op: Comparison,
        entity_id: impl Into<String>,
        attribute: impl Into<String>,
        value: f64,
        severity: Severity,
    ) -> Self {
        let declared = Declared::new(
            NumericArgs {
                entity_id: entity_id.into(),
                attribute: attribute.into(),
                value,
            },
            severity,
        );
        match op {
            Comparison::Lt => Constraint::Lt(declared),
            Comparison::Gt => Constraint::Gt(declared),
            Comparison::Eq => Constraint::Eq(declared),
            Comparison::Neq => Constraint::Neq(declared),
        }
    }

    pub fn spatial(args: SpatialArgs, severity: Severity) -> Self {
        Constraint::Spatial(Declared::new(args, severity))
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = Some(source.into());
        match &mut self {
            Constraint::Lt(d) | Constraint::Gt(d) | Constraint::Eq(d) | Constraint::Neq(d) => {
                d.source = source
            }
            Constraint::Spatial(d) => d.source = source,
        }
        self
    }

    /// The `type` tag as written on the wire.
    pub fn type_name(&self) -> &'static str {
        match self.comparison() {
            Some(op) => op.as_str(),
            None => "spatial",
        }
    }

    pub fn comparison(&self) -> Option<Comparison> {
        match self {
            Constraint::Lt(_) => Some(Comparison::Lt),
            Constraint::Gt(_) => Some(Comparison::Gt),
            Constraint::Eq(_) => Some(Comparison::Eq),
            Constraint::Neq(_) => Some(Comparison::Neq),
            Constraint::Spatial(_) => None,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Constraint::Lt(d) | Constraint::Gt(d) | Constraint::Eq(d) | Constraint::Neq(d) => d.severity,
            Constraint::Spatial(d) => d.severity,
        }
    }

    pub fn entity_id(&self) -> &str {
        match self {
            Constraint::Lt(d) | Constraint::Gt(d) | Constraint::Eq(d) | Constraint::Neq(d) => {
                &d.args.entity_id
            }
            Constraint::Spatial(d) => &d.args.entity_id,
        }
    }

    pub fn source(&self) -> Option<&str> {
        match self {
            Constraint::Lt(d) | Constraint::Gt(d) | Constraint::Eq(d) | Constraint::Neq(d) => {
                d.source.as_deref()
            }
            Constraint::Spatial(d) => d.source.as_deref(),
        }
    }
}
