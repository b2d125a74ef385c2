//! Order statistics over loosely typed value collections.

use serde::{Deserialize, Serialize};

use crate::model::Value;

/// Distribution summary. Every statistic except `n` is `None` when no
/// numeric value was present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Distribution {
    pub n: usize,
    pub mean: Option<f64>,
    pub stdev: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub p05: Option<f64>,
    pub p50: Option<f64>,
    pub p95: Option<f64>,
}

/// Summarize the numeric entries of `values`. Booleans and non-numbers are
/// ignored.
pub fn summarize_distribution(values: &[Value]) -> Distribution {
    summarize_numbers(values.iter().filter_map(Value::as_float))
}

/// Summarize a sequence of numbers.
///
/// `mean`/`stdev` use the population variance (denominator `n`).
pub fn summarize_numbers(values: impl IntoIterator<Item = f64>) -> Distribution {
    let mut xs: Vec<f64> = values.into_iter().collect();
    if xs.is_empty() {
        return Distribution::default();
    }
    xs.sort_by(f64::total_cmp);

    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;

    Distribution {
        n: xs.len(),
        mean: Some(mean),
        stdev: Some(var.sqrt()),
        min: xs.first().copied(),
        max: xs.last().copied(),
        p05: quantile_sorted(&xs, 0.05),
        p50: quantile_sorted(&xs, 0.50),
        p95: quantile_sorted(&xs, 0.95),
    }
}

/// Linear interpolation between the two order statistics bounding
/// `q * (n - 1)`. `q <= 0` and `q >= 1` return the extremes exactly.
pub fn quantile_sorted(xs: &[f64], q: f64) -> Option<f64> {
    let (first, last) = (xs.first()?, xs.last()?);
    if q <= 0.0 {
        return Some(*first);
    }
    if q >= 1.0 {
        return Some(*last);
    }
    let pos = q * (xs.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(xs[lo]);
    }
    let frac = pos - lo as f64;
    Some(xs[lo] * (1.0 - frac) + xs[hi] * frac)
}
