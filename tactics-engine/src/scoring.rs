//! Weighted composite scoring
//!
//! For each record, the score is the weighted mean of every attribute that
//! is active, carries a numeric value on the record and has a configured
//! weight. With no qualifying attribute (or a zero weight sum) the score is
//! 0.00 rather than null, so consumers never special-case a missing score.

use crate::record::EntityRecord;
use std::collections::BTreeMap;

/// Lower bound of a weight
pub const MIN_WEIGHT: f64 = 0.0;
/// Upper bound of a weight
pub const MAX_WEIGHT: f64 = 2.0;
/// Weight assigned to every weightable attribute at startup
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Round to two decimal digits
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Score one record without mutating it
pub fn weighted_score(
    record: &EntityRecord,
    active_attributes: &[String],
    weights: &BTreeMap<String, f64>,
) -> f64 {
    let mut sum = 0.0;
    let mut total_weight = 0.0;
    for id in active_attributes {
        let (Some(value), Some(weight)) = (record.value(id), weights.get(id)) else {
            continue;
        };
        sum += value * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        round2(sum / total_weight)
    } else {
        0.0
    }
}

/// Write `weighted_score` onto every record
///
/// Idempotent for unchanged inputs.
pub fn compute_weighted_scores(
    records: &mut [EntityRecord],
    active_attributes: &[String],
    weights: &BTreeMap<String, f64>,
) {
    for record in records.iter_mut() {
        let score = weighted_score(record, active_attributes, weights);
        record.set_weighted_score(Some(score));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn weights(list: &[(&str, f64)]) -> BTreeMap<String, f64> {
        list.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn two_records() -> Vec<EntityRecord> {
        vec![
            EntityRecord::new("groupA", "E1")
                .with_value("attr1", Some(2.0))
                .with_value("attr2", Some(4.0)),
            EntityRecord::new("groupA", "E2")
                .with_value("attr1", Some(4.0))
                .with_value("attr2", Some(2.0)),
        ]
    }

    #[test]
    fn test_equal_weights_scenario() {
        let mut records = two_records();
        compute_weighted_scores(
            &mut records,
            &ids(&["attr1", "attr2"]),
            &weights(&[("attr1", 1.0), ("attr2", 1.0)]),
        );
        assert_eq!(records[0].weighted_score(), Some(3.0));
        assert_eq!(records[1].weighted_score(), Some(3.0));
    }

    #[test]
    fn test_all_zero_weights_yield_zero_not_nan() {
        let mut records = two_records();
        compute_weighted_scores(
            &mut records,
            &ids(&["attr1", "attr2"]),
            &weights(&[("attr1", 0.0), ("attr2", 0.0)]),
        );
        for r in &records {
            let score = r.weighted_score().expect("score present");
            assert!(!score.is_nan());
            assert_eq!(score, 0.0);
        }
    }

    #[test]
    fn test_no_active_attribute_yields_zero() {
        let mut records = two_records();
        compute_weighted_scores(&mut records, &[], &weights(&[("attr1", 1.0)]));
        assert_eq!(records[0].weighted_score(), Some(0.0));
    }

    #[test]
    fn test_only_active_weighted_non_null_attributes_count() {
        let record = EntityRecord::new("g", "e")
            .with_value("a", Some(10.0))
            .with_value("b", None)
            .with_value("c", Some(100.0))
            .with_value("d", Some(1000.0));
        // d is inactive, c has no weight, b is null
        let score = weighted_score(
            &record,
            &ids(&["a", "b", "c"]),
            &weights(&[("a", 2.0), ("b", 1.0), ("d", 1.0)]),
        );
        assert_eq!(score, 10.0);
    }

    #[test]
    fn test_unequal_weights_rounded_to_two_digits() {
        let record = EntityRecord::new("g", "e")
            .with_value("a", Some(1.0))
            .with_value("b", Some(2.0));
        // (1*1 + 2*2) / 3 = 1.666...
        let score = weighted_score(&record, &ids(&["a", "b"]), &weights(&[("a", 1.0), ("b", 2.0)]));
        assert_eq!(score, 1.67);
    }

    #[test]
    fn test_idempotent() {
        let mut records = two_records();
        let active = ids(&["attr1", "attr2"]);
        let w = weights(&[("attr1", 0.3), ("attr2", 1.7)]);
        compute_weighted_scores(&mut records, &active, &w);
        let first: Vec<_> = records.iter().map(|r| r.weighted_score()).collect();
        compute_weighted_scores(&mut records, &active, &w);
        let second: Vec<_> = records.iter().map(|r| r.weighted_score()).collect();
        assert_eq!(first, second);
    }
}
