//! End-to-end tests for synthesis: derived record, coherence gain,
//! explanation block and leave-one-out counterfactuals.

use pretty_assertions::assert_eq;
use relational_reasoner::{
    propose_next_steps, synthesize, Error, NextStep, Record, SynthesisOpportunity, Value,
};
use serde_json::{json, Value as Json};

fn records(raw: Json) -> Vec<Record> {
    raw.as_array()
        .unwrap()
        .iter()
        .map(|r| Record::from_json(r).unwrap())
        .collect()
}

fn opportunity(ids: &[&str]) -> SynthesisOpportunity {
    SynthesisOpportunity::new(ids.iter().copied())
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================================
// 1. Degenerate geometry
// ============================================================================

#[test]
fn test_two_identical_vectors() {
    let rs = records(json!([
        {"record_id": "a", "value": 1, "conceptual_vector": [1, 0]},
        {"record_id": "b", "value": 3, "conceptual_vector": [1, 0]}
    ]));
    let result = synthesize(&rs, &opportunity(&["a", "b"])).unwrap();

    let coherence = &result.why.coherence;
    assert_eq!((coherence.before, coherence.after, coherence.gain), (1.0, 1.0, 0.0));
    assert!(result.coherence_gain.is_finite());

    // dropping either input leaves one vector: before 0, after 1
    let rows: Vec<(String, f64, f64, f64)> = result
        .counterfactuals
        .iter()
        .map(|c| (c.dropped_input.clone(), c.coherence_before, c.coherence_after, c.coherence_gain))
        .collect();
    assert_eq!(
        rows,
        vec![("a".to_string(), 0.0, 1.0, 1.0), ("b".to_string(), 0.0, 1.0, 1.0)]
    );
    assert_eq!(coherence.stability.leave_one_out_min_gain, Some(1.0));
    assert_eq!(coherence.stability.leave_one_out_max_gain, Some(1.0));
    assert!(!coherence.stability.sign_consistent_with_full);
    assert_eq!(propose_next_steps(&result), vec![NextStep::Measure]);
}

#[test]
fn test_records_without_vectors_score_zero() {
    let rs = records(json!([
        {"record_id": "a", "value": "first"},
        {"record_id": "b", "value": "second", "conceptual_vector": "not a list"}
    ]));
    let result = synthesize(&rs, &opportunity(&["a", "b"])).unwrap();
    assert_eq!(result.coherence_gain, 0.0);
    assert!(result.conceptual_vector.is_empty());
    assert_eq!(result.value, Value::from("first\nsecond"));
    assert_eq!(result.why.vector_norm_stats.n, 0);
}

// ============================================================================
// 2. Scoring and explanation
// ============================================================================

#[test]
fn test_orthogonal_pair_gains() {
    let rs = records(json!([
        {"record_id": "a", "value": 2, "conceptual_vector": [1, 0]},
        {"record_id": "b", "value": 4, "conceptual_vector": [0, 1]}
    ]));
    let result = synthesize(&rs, &opportunity(&["a", "b"])).unwrap();

    let half_sqrt2 = 0.5 * 2f64.sqrt();
    let towards_merged = 0.5 * (half_sqrt2 + 1.0);
    let expected_after = (2.0 * towards_merged + 0.5) / 3.0;

    assert!(close(result.why.coherence.before, 0.5));
    assert!(close(result.why.coherence.after, expected_after));
    assert!(close(result.coherence_gain, expected_after - 0.5));
    assert_eq!(result.conceptual_vector, vec![0.5, 0.5]);
    assert!(result.why.coherence.stability.sign_consistent_with_full);
    assert_eq!(propose_next_steps(&result), vec![NextStep::Measure, NextStep::Integrate]);

    let stats = &result.why.value_stats;
    assert_eq!((stats.n, stats.mean, stats.min, stats.max), (2, Some(3.0), Some(2.0), Some(4.0)));
    assert_eq!(result.why.vector_norm_stats.mean, Some(1.0));

    for cf in &result.counterfactuals {
        assert!(close(cf.delta_gain_vs_full, cf.coherence_gain - result.coherence_gain));
    }
}

#[test]
fn test_explanation_serialized_shape() {
    let rs = records(json!([
        {"record_id": "x", "value": {"k": 1}, "conceptual_vector": [3, 4]},
        {"record_id": "y", "value": {"k": 2, "j": 0}, "conceptual_vector": [3, 4]}
    ]));
    let out = serde_json::to_value(synthesize(&rs, &opportunity(&["y", "x"])).unwrap()).unwrap();

    assert_eq!(out["new_record_id"], json!("synth_x_y"));
    assert_eq!(out["inputs"], json!(["x", "y"]));
    assert_eq!(out["value"], json!({"j": 0, "k": 2}));
    assert_eq!(out["why"]["version"], json!(1));
    assert_eq!(out["why"]["inputs"], json!(["x", "y"]));
    assert_eq!(out["why"]["vector_norm_stats"]["p50"], json!(5.0));
    assert_eq!(out["why"]["value_stats"]["mean"], Json::Null);
    assert_eq!(out["why"]["coherence"]["stability"]["leave_one_out_n"], json!(2));
    assert_eq!(out["counterfactuals"][0]["type"], json!("drop_input"));
    assert_eq!(out["counterfactuals"][0]["dropped_input"], json!("x"));
    assert_eq!(out["counterfactuals"][0]["kept_inputs"], json!(["y"]));
}

// ============================================================================
// 3. Input handling
// ============================================================================

#[test]
fn test_target_order_does_not_matter() {
    let rs = records(json!([
        {"record_id": "c", "value": 1.5, "conceptual_vector": [0.2, 0.9, 0.1]},
        {"record_id": "a", "value": 7, "conceptual_vector": [1, 0.3]},
        {"record_id": "b", "value": -2, "conceptual_vector": [0.5, 0.5, 0.5]}
    ]));
    let forward = serde_json::to_string(&synthesize(&rs, &opportunity(&["a", "b", "c"])).unwrap()).unwrap();
    let shuffled = serde_json::to_string(&synthesize(&rs, &opportunity(&["c", "a", "b", "a"])).unwrap()).unwrap();
    assert_eq!(forward, shuffled);
}

#[test]
fn test_counterfactuals_sorted_by_dropped_id() {
    let rs = records(json!([
        {"record_id": "m", "value": 1, "conceptual_vector": [1, 0]},
        {"record_id": "z", "value": 1, "conceptual_vector": [0, 1]},
        {"record_id": "b", "value": 1, "conceptual_vector": [1, 1]}
    ]));
    let result = synthesize(&rs, &opportunity(&["z", "m", "b"])).unwrap();
    let dropped: Vec<&str> = result.counterfactuals.iter().map(|c| c.dropped_input.as_str()).collect();
    assert_eq!(dropped, vec!["b", "m", "z"]);
    assert_eq!(result.why.coherence.stability.leave_one_out_n, 3);
}

#[test]
fn test_unknown_targets_are_ignored_but_none_is_an_error() {
    let rs = records(json!([{"record_id": "a", "value": 1, "conceptual_vector": [1]}]));
    let result = synthesize(&rs, &opportunity(&["a", "ghost"])).unwrap();
    assert_eq!(result.inputs, vec!["a".to_string()]);
    assert!(result.counterfactuals.is_empty());
    assert!(result.why.coherence.stability.sign_consistent_with_full);

    let err = synthesize(&rs, &opportunity(&["ghost"])).unwrap_err();
    assert!(matches!(err, Error::NoSynthesisTargets { .. }));
    assert!(synthesize(&rs, &SynthesisOpportunity::default()).is_err());
}

#[test]
fn test_opportunity_decoding() {
    let opp = SynthesisOpportunity::from_json(&json!({"target_ids": ["a", 3, "", null, "b"]})).unwrap();
    assert_eq!(opp.target_ids, vec!["a".to_string(), "b".to_string()]);
    assert!(SynthesisOpportunity::from_json(&json!(["a"])).is_err());
    assert!(Record::from_json(&json!(12)).is_err());
}

#[test]
fn test_derived_record_round_trips_through_json() {
    let rs = records(json!([
        {"record_id": "a", "value": 1, "conceptual_vector": [1, 2]},
        {"record_id": "b", "value": 2, "conceptual_vector": [2, 1]}
    ]));
    let derived = synthesize(&rs, &opportunity(&["a", "b"])).unwrap().to_record();
    let raw = serde_json::to_value(&derived).unwrap();
    assert_eq!(raw["derived"], json!(true));
    assert_eq!(raw["inputs"], json!(["a", "b"]));
    assert_eq!(Record::from_json(&raw).unwrap(), derived);
}
