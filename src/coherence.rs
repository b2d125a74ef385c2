//! Pairwise vector similarity, aggregate coherence, and deterministic merges.

use tracing::trace;

use crate::model::{AttributeMap, Value};

/// Cosine similarity rescaled from `[-1, 1]` to `[0, 1]`.
///
/// Compares the first `min(len(a), len(b))` components only. Empty or
/// zero-norm inputs score `0`.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);
    let (mut dot, mut mag_a, mut mag_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if !(denom > 0.0 && denom.is_finite()) {
        return 0.0;
    }
    let cos = dot / denom;
    (0.5 * (cos + 1.0)).clamp(0.0, 1.0)
}

/// Mean pairwise similarity over the non-empty vectors.
///
/// Fewer than two qualifying vectors is defined as coherence `0`.
pub fn measure_coherence<V: AsRef<[f64]>>(vectors: &[V]) -> f64 {
    let vecs: Vec<&[f64]> = vectors
        .iter()
        .map(AsRef::as_ref)
        .filter(|v| !v.is_empty())
        .collect();
    if vecs.len() < 2 {
        return 0.0;
    }
    let mut total = 0.0;
    let mut count = 0usize;
    for i in 0..vecs.len() {
        for j in (i + 1)..vecs.len() {
            total += cosine_similarity(vecs[i], vecs[j]);
            count += 1;
        }
    }
    total / count as f64
}

/// Merge values by shape.
///
/// - all numbers (booleans excluded): arithmetic mean
/// - all strings: newline-joined in input order
/// - all maps: shallow merge, each map applied in sorted key order, later
///   maps winning on collision
/// - anything else: the inputs as a list, unmodified
///
/// Empty input yields `Value::Null`.
pub fn combine_values(values: &[Value]) -> Value {
    if values.is_empty() {
        return Value::Null;
    }

    if values.iter().all(Value::is_numeric) {
        let sum: f64 = values.iter().filter_map(Value::as_float).sum();
        return Value::Float(sum / values.len() as f64);
    }

    if let Some(texts) = values.iter().map(Value::as_str).collect::<Option<Vec<_>>>() {
        return Value::String(texts.join("\n"));
    }

    if let Some(maps) = values.iter().map(Value::as_map).collect::<Option<Vec<_>>>() {
        let mut merged = AttributeMap::new();
        for m in maps {
            for (k, v) in m {
                merged.insert(k.clone(), v.clone());
            }
        }
        return Value::Map(merged);
    }

    trace!(count = values.len(), "heterogeneous values, keeping them as a list");
    Value::List(values.to_vec())
}

/// Elementwise mean, padding shorter vectors with `0` up to the longest.
pub fn combine_vectors<V: AsRef<[f64]>>(vectors: &[V]) -> Vec<f64> {
    let max_len = vectors.iter().map(|v| v.as_ref().len()).max().unwrap_or(0);
    if max_len == 0 {
        return Vec::new();
    }
    let mut acc = vec![0.0f64; max_len];
    for v in vectors {
        for (slot, x) in acc.iter_mut().zip(v.as_ref()) {
            *slot += x;
        }
    }
    let denom = vectors.len() as f64;
    acc.into_iter().map(|x| x / denom).collect()
}

/// Euclidean norm.
pub fn vector_norm(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}
