//! Canonical entity records
//!
//! Created once by the normalizer and never destroyed during a session. Only
//! the derived fields (`weighted_score`, `cluster`) change afterwards, and
//! only through the scoring engine and the clustering adapter.

use crate::identity::EntityKey;
use serde::Serialize;
use std::collections::BTreeMap;

/// One analyzed entity with attribute values and derived fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityRecord {
    key: EntityKey,
    /// Attribute id -> numeric value (ordinal attributes hold their rank)
    values: BTreeMap<String, Option<f64>>,
    /// Attribute id -> original display label (ordinal attributes only)
    labels: BTreeMap<String, String>,
    #[serde(rename = "weightedScore", skip_serializing_if = "Option::is_none")]
    weighted_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cluster: Option<u32>,
}

impl EntityRecord {
    /// Create a record with no attributes
    pub fn new(group: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            key: EntityKey::new(group, entity),
            values: BTreeMap::new(),
            labels: BTreeMap::new(),
            weighted_score: None,
            cluster: None,
        }
    }

    /// Builder-style attribute assignment
    pub fn with_value(mut self, id: &str, value: Option<f64>) -> Self {
        self.values.insert(id.to_string(), value);
        self
    }

    /// Builder-style ordinal assignment (rank plus display label)
    pub fn with_ordinal(mut self, id: &str, rank: Option<u32>, label: &str) -> Self {
        self.values.insert(id.to_string(), rank.map(f64::from));
        self.labels.insert(id.to_string(), label.to_string());
        self
    }

    pub(crate) fn insert_value(&mut self, id: &str, value: Option<f64>) {
        self.values.insert(id.to_string(), value);
    }

    pub(crate) fn insert_label(&mut self, id: &str, label: String) {
        self.labels.insert(id.to_string(), label);
    }

    /// Identity
    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Group label
    pub fn group(&self) -> &str {
        &self.key.group
    }

    /// Entity label
    pub fn entity(&self) -> &str {
        &self.key.entity
    }

    /// Numeric value of an attribute; `None` when absent or null
    pub fn value(&self, id: &str) -> Option<f64> {
        self.values.get(id).copied().flatten()
    }

    /// True when the record carries the attribute (even if null)
    pub fn has_attribute(&self, id: &str) -> bool {
        self.values.contains_key(id)
    }

    /// Attribute ids carried by the record
    pub fn attribute_ids(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Original display label of an ordinal attribute
    pub fn label(&self, id: &str) -> Option<&str> {
        self.labels.get(id).map(String::as_str)
    }

    /// Weighted composite score, present once scoring has run
    pub fn weighted_score(&self) -> Option<f64> {
        self.weighted_score
    }

    /// Cluster label, present only while clustering is active
    pub fn cluster(&self) -> Option<u32> {
        self.cluster
    }

    pub(crate) fn set_weighted_score(&mut self, score: Option<f64>) {
        self.weighted_score = score;
    }

    pub(crate) fn set_cluster(&mut self, cluster: Option<u32>) {
        self.cluster = cluster;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_distinguishes_missing_and_null() {
        let record = EntityRecord::new("L", "T")
            .with_value("a", Some(3.0))
            .with_value("b", None);
        assert_eq!(record.value("a"), Some(3.0));
        assert_eq!(record.value("b"), None);
        assert!(record.has_attribute("b"));
        assert!(!record.has_attribute("c"));
    }

    #[test]
    fn test_derived_fields_absent_until_set() {
        let mut record = EntityRecord::new("L", "T");
        assert_eq!(record.weighted_score(), None);
        assert_eq!(record.cluster(), None);
        record.set_weighted_score(Some(1.5));
        record.set_cluster(Some(2));
        assert_eq!(record.weighted_score(), Some(1.5));
        assert_eq!(record.cluster(), Some(2));
    }

    #[test]
    fn test_ordinal_keeps_rank_and_label() {
        let record = EntityRecord::new("L", "T").with_ordinal("line", Some(2), "Offside Trap");
        assert_eq!(record.value("line"), Some(2.0));
        assert_eq!(record.label("line"), Some("Offside Trap"));
    }
}
