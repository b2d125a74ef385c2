//! # Synthesis Engine
//!
//! Merges target records into one derived record, scores the coherence
//! gain of doing so, and explains the score.
//!
//! ```text
//! target ids ─► filter to known ─► sort ─► gather values / vectors
//!                                            │
//!                      combine_values ◄──────┤
//!                      combine_vectors ◄─────┤
//!   before = coherence(vectors)              │
//!   after  = coherence([merged] ++ vectors)  │
//!   gain   = after - before                  ▼
//!        why: value stats, norm stats, leave-one-out stability
//! ```
//!
//! The sorted input list is canonical: it names the derived record and
//! drives every recomputation, so caller ordering of `target_ids` never
//! changes the result.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use crate::coherence::{combine_values, combine_vectors, measure_coherence, vector_norm};
use crate::model::{Record, SynthesisOpportunity, Value};
use crate::stats::{summarize_distribution, summarize_numbers, Distribution};
use crate::{Error, Result};

/// Tolerance below which a gain counts as no change.
pub const GAIN_EPSILON: f64 = 1e-12;

const DERIVED_PREFIX: &str = "synth_";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoherenceTriple {
    pub before: f64,
    pub after: f64,
    pub gain: f64,
}

/// Leave-one-out summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stability {
    pub leave_one_out_n: usize,
    pub leave_one_out_min_gain: Option<f64>,
    pub leave_one_out_max_gain: Option<f64>,
    /// Every leave-one-out gain is positive exactly when the full gain is.
    /// Vacuously true with no counterfactuals.
    pub sign_consistent_with_full: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoherenceExplanation {
    pub before: f64,
    pub after: f64,
    pub gain: f64,
    pub stability: Stability,
}

/// Explanation block of a synthesis result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Why {
    pub version: u32,
    pub inputs: Vec<String>,
    pub value_stats: Distribution,
    pub vector_norm_stats: Distribution,
    pub coherence: CoherenceExplanation,
}

/// The pipeline rerun with one input dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Counterfactual {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub dropped_input: String,
    pub kept_inputs: Vec<String>,
    pub coherence_before: f64,
    pub coherence_after: f64,
    pub coherence_gain: f64,
    pub delta_gain_vs_full: f64,
}

/// Derived record plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesisResult {
    pub new_record_id: String,
    pub value: Value,
    pub conceptual_vector: Vec<f64>,
    /// Sorted, deduplicated ids of the merged records.
    pub inputs: Vec<String>,
    pub coherence_gain: f64,
    pub why: Why,
    /// Sorted by `dropped_input`.
    pub counterfactuals: Vec<Counterfactual>,
}

impl SynthesisResult {
    /// Materialize the derived record.
    pub fn to_record(&self) -> Record {
        let mut record = Record::new(self.new_record_id.clone(), self.value.clone())
            .with_vector(self.conceptual_vector.clone());
        record.derived = true;
        record.inputs = self.inputs.clone();
        record
    }
}

/// Next step implied by a synthesis gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NextStep {
    Measure,
    Integrate,
    ReEvaluate,
}

/// Merge the records named by `opportunity`.
///
/// Fails with [`Error::NoSynthesisTargets`] when no target id matches a
/// record.
pub fn synthesize(records: &[Record], opportunity: &SynthesisOpportunity) -> Result<SynthesisResult> {
    let known: BTreeSet<&str> = records.iter().map(|r| r.record_id.as_str()).collect();
    let inputs: Vec<String> = opportunity
        .target_ids
        .iter()
        .map(String::as_str)
        .filter(|id| known.contains(id))
        .collect::<BTreeSet<&str>>()
        .into_iter()
        .map(str::to_owned)
        .collect();
    if inputs.is_empty() {
        return Err(Error::NoSynthesisTargets { requested: opportunity.target_ids.clone() });
    }

    let targets = gather(records, &inputs);
    let values: Vec<Value> = targets.iter().map(|r| r.value.clone()).collect();
    let vectors = vectors_of(&targets);

    let new_value = combine_values(&values);
    let (new_vector, full) = score(&vectors);

    let counterfactuals = leave_one_out(records, &inputs, full.gain);
    let stability = stability(&counterfactuals, full.gain);

    debug!(
        inputs = inputs.len(),
        gain = full.gain,
        sign_consistent = stability.sign_consistent_with_full,
        "synthesis scored"
    );

    let why = Why {
        version: 1,
        inputs: inputs.clone(),
        value_stats: summarize_distribution(&values),
        vector_norm_stats: summarize_numbers(vectors.iter().map(|v| vector_norm(v))),
        coherence: CoherenceExplanation {
            before: full.before,
            after: full.after,
            gain: full.gain,
            stability,
        },
    };

    Ok(SynthesisResult {
        new_record_id: format!("{DERIVED_PREFIX}{}", inputs.join("_")),
        value: new_value,
        conceptual_vector: new_vector,
        inputs,
        coherence_gain: full.gain,
        why,
        counterfactuals,
    })
}

/// `[measure, integrate]` on a gain, `[measure]` on no change,
/// `[re_evaluate]` on a loss.
pub fn propose_next_steps(result: &SynthesisResult) -> Vec<NextStep> {
    let gain = if result.coherence_gain.is_finite() { result.coherence_gain } else { 0.0 };
    if gain > GAIN_EPSILON {
        vec![NextStep::Measure, NextStep::Integrate]
    } else if gain.abs() <= GAIN_EPSILON {
        vec![NextStep::Measure]
    } else {
        vec![NextStep::ReEvaluate]
    }
}

/// Records whose id is in `ids`, in records order.
fn gather<'r>(records: &'r [Record], ids: &[String]) -> Vec<&'r Record> {
    records
        .iter()
        .filter(|r| ids.binary_search(&r.record_id).is_ok())
        .collect()
}

fn vectors_of<'r>(targets: &[&'r Record]) -> Vec<&'r [f64]> {
    targets
        .iter()
        .filter_map(|r| r.conceptual_vector.as_deref())
        .collect()
}

/// Merged vector and the before/after/gain triple for a vector set.
fn score(vectors: &[&[f64]]) -> (Vec<f64>, CoherenceTriple) {
    let merged = combine_vectors(vectors);
    let before = measure_coherence(vectors);
    let mut with_merged: Vec<&[f64]> = Vec::with_capacity(vectors.len() + 1);
    with_merged.push(&merged);
    with_merged.extend_from_slice(vectors);
    let after = measure_coherence(&with_merged);
    let triple = CoherenceTriple { before, after, gain: after - before };
    (merged, triple)
}

fn leave_one_out(records: &[Record], inputs: &[String], full_gain: f64) -> Vec<Counterfactual> {
    if inputs.len() < 2 {
        return Vec::new();
    }
    // `inputs` is sorted, so iterating it yields rows sorted by dropped id.
    inputs
        .iter()
        .map(|dropped| {
            let kept: Vec<String> = inputs.iter().filter(|id| *id != dropped).cloned().collect();
            let targets = gather(records, &kept);
            let (_, triple) = score(&vectors_of(&targets));
            Counterfactual {
                kind: "drop_input",
                dropped_input: dropped.clone(),
                kept_inputs: kept,
                coherence_before: triple.before,
                coherence_after: triple.after,
                coherence_gain: triple.gain,
                delta_gain_vs_full: triple.gain - full_gain,
            }
        })
        .collect()
}

fn stability(counterfactuals: &[Counterfactual], full_gain: f64) -> Stability {
    let gains: Vec<f64> = counterfactuals.iter().map(|c| c.coherence_gain).collect();
    let full_positive = full_gain > 0.0;
    Stability {
        leave_one_out_n: gains.len(),
        leave_one_out_min_gain: gains.iter().copied().reduce(f64::min),
        leave_one_out_max_gain: gains.iter().copied().reduce(f64::max),
        sign_consistent_with_full: gains.iter().all(|g| (*g > 0.0) == full_positive),
    }
}
