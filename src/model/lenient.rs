//! Lenient field decoders.
//!
//! Domain data arrives loosely typed. Nothing below the top-level mapping is
//! allowed to fail decoding: a field of the wrong shape falls back to its
//! defined default, and a whole entry of the wrong shape lands in
//! [`Entry::Malformed`] so index positions stay intact.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use super::{AttributeMap, Value};

/// One slot of a state collection: either a decoded `T` or the raw payload
/// that failed to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Entry<T> {
    Valid(T),
    Malformed(Value),
}

impl<T> Entry<T> {
    pub fn valid(&self) -> Option<&T> {
        match self {
            Entry::Valid(t) => Some(t),
            Entry::Malformed(_) => None,
        }
    }

    pub fn is_malformed(&self) -> bool { matches!(self, Entry::Malformed(_)) }
}

impl<T> From<T> for Entry<T> {
    fn from(t: T) -> Self { Entry::Valid(t) }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrOther<T> {
    List(Vec<Entry<T>>),
    Other(IgnoredAny),
}

/// A collection field; anything other than a list reads as empty.
pub fn entries<'de, D, T>(d: D) -> Result<Vec<Entry<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match ListOrOther::<T>::deserialize(d)? {
        ListOrOther::List(items) => items,
        ListOrOther::Other(_) => Vec::new(),
    })
}

/// Relation confidence: a finite number in `[0, 1]`, otherwise `0`.
pub fn confidence<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(v.as_float()
        .filter(|c| c.is_finite() && (0.0..=1.0).contains(c))
        .unwrap_or(0.0))
}

/// A number or a numeric string, otherwise `0`.
pub fn loose_number<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let v = Value::deserialize(d)?;
    let n = match &v {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        other => other.as_float(),
    };
    Ok(n.filter(|n| n.is_finite()).unwrap_or(0.0))
}

/// Strings only; anything else reads as absent.
pub fn opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Keeps the non-empty strings of a list, in order.
pub fn string_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::List(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

pub fn attributes<'de, D: Deserializer<'de>>(d: D) -> Result<AttributeMap, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::Map(m) => m,
        _ => AttributeMap::new(),
    })
}

/// Conceptual vector: a list reads as a vector with non-numeric components
/// zeroed; anything else reads as absent.
pub fn vector<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<f64>>, D::Error> {
    let v = Value::deserialize(d)?;
    Ok(match v {
        Value::List(items) => Some(items.iter().map(|x| x.as_float().unwrap_or(0.0)).collect()),
        _ => None,
    })
}
