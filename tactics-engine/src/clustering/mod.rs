//! Clustering adapter
//!
//! The partitioning itself belongs to an external collaborator behind the
//! [`ClusteringBackend`] trait. The adapter:
//! - selects the variable subset (numeric and present on at least one row)
//! - short-circuits to "no clustering" when k = 0 or no variable qualifies
//! - numbers every request, so only the latest response is merged
//! - merges labels back by identity, never by position
//! - purges stale labels before every new request and every merge

mod kmeans;

pub use kmeans::KMeans;

use crate::identity::EntityKey;
use crate::record::EntityRecord;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// One entity row submitted for clustering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRow {
    /// Entity identity
    pub key: EntityKey,
    /// Values aligned with `ClusterRequest::variables`
    pub values: Vec<Option<f64>>,
}

/// A numbered clustering request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRequest {
    /// Request sequence number (strictly increasing)
    pub seq: u64,
    /// Number of clusters
    pub k: usize,
    /// Variable ids, in column order
    pub variables: Vec<String>,
    /// Entity rows
    pub rows: Vec<ClusterRow>,
}

/// One label returned by the collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterLabel {
    /// Entity identity
    pub key: EntityKey,
    /// Cluster index
    pub cluster: u32,
}

/// Collaborator response; label order is not guaranteed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterResponse {
    /// Sequence number of the request this answers
    pub seq: u64,
    /// Labels keyed by identity
    pub labels: Vec<ClusterLabel>,
}

/// External partitioning collaborator
pub trait ClusteringBackend {
    /// Partition the request rows into `request.k` clusters
    fn partition(&self, request: &ClusterRequest) -> Vec<ClusterLabel>;

    /// Run the backend and wrap its labels in a response
    fn respond(&self, request: &ClusterRequest) -> ClusterResponse {
        ClusterResponse {
            seq: request.seq,
            labels: self.partition(request),
        }
    }
}

/// Variables eligible for clustering: candidates with a value on some row
pub fn eligible_variables(rows: &[&EntityRecord], candidates: &[String]) -> Vec<String> {
    candidates
        .iter()
        .filter(|id| rows.iter().any(|r| r.value(id).is_some()))
        .cloned()
        .collect()
}

/// Request numbering and label bookkeeping
#[derive(Debug, Default)]
pub struct ClusteringAdapter {
    last_seq: u64,
    outstanding: Option<u64>,
    submitted: BTreeSet<EntityKey>,
}

impl ClusteringAdapter {
    /// Create an adapter with no request issued
    pub fn new() -> Self {
        Self::default()
    }

    /// Sequence number of the request still awaiting its response
    pub fn outstanding(&self) -> Option<u64> {
        self.outstanding
    }

    /// Entities submitted with the latest request
    pub fn submitted(&self) -> &BTreeSet<EntityKey> {
        &self.submitted
    }

    /// Drop every label and forget the outstanding request
    pub fn clear(&mut self, records: &mut [EntityRecord]) {
        for record in records.iter_mut() {
            record.set_cluster(None);
        }
        self.outstanding = None;
        self.submitted.clear();
    }

    /// Build a new request over `rows`, or `None` when clustering is off
    ///
    /// Labels from earlier requests are purged from `records` either way,
    /// and any outstanding request is superseded.
    pub fn prepare(
        &mut self,
        records: &mut [EntityRecord],
        visible: &[EntityKey],
        candidates: &[String],
        k: usize,
    ) -> Option<ClusterRequest> {
        self.clear(records);
        if k == 0 {
            return None;
        }

        let visible_set: BTreeSet<&EntityKey> = visible.iter().collect();
        let rows: Vec<&EntityRecord> = records
            .iter()
            .filter(|r| visible_set.contains(r.key()))
            .collect();
        let variables = eligible_variables(&rows, candidates);
        if variables.is_empty() || rows.is_empty() {
            debug!("No eligible clustering variables, clustering skipped");
            return None;
        }

        self.last_seq += 1;
        self.outstanding = Some(self.last_seq);
        self.submitted = rows.iter().map(|r| r.key().clone()).collect();

        let request = ClusterRequest {
            seq: self.last_seq,
            k,
            rows: rows
                .iter()
                .map(|r| ClusterRow {
                    key: r.key().clone(),
                    values: variables.iter().map(|v| r.value(v)).collect(),
                })
                .collect(),
            variables,
        };
        debug!(
            "Prepared cluster request {} (k={}, {} rows, {} variables)",
            request.seq,
            request.k,
            request.rows.len(),
            request.variables.len()
        );
        Some(request)
    }

    /// Merge a response; returns how many records received a label
    ///
    /// A response whose sequence number is not the outstanding one is
    /// rejected with `StaleClusterResult` and leaves `records` untouched.
    pub fn merge(&mut self, records: &mut [EntityRecord], response: &ClusterResponse) -> Result<usize> {
        if self.outstanding != Some(response.seq) {
            let latest = self.outstanding.unwrap_or(0);
            warn!(
                "Discarding stale cluster result {} (outstanding: {:?})",
                response.seq, self.outstanding
            );
            return Err(Error::StaleClusterResult {
                seq: response.seq,
                latest,
            });
        }

        let labels: HashMap<&EntityKey, u32> = response
            .labels
            .iter()
            .filter(|l| self.submitted.contains(&l.key))
            .map(|l| (&l.key, l.cluster))
            .collect();

        let mut labeled = 0;
        for record in records.iter_mut() {
            let label = labels.get(record.key()).copied();
            if label.is_some() {
                labeled += 1;
            }
            record.set_cluster(label);
        }

        self.outstanding = None;
        Ok(labeled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<EntityRecord> {
        vec![
            EntityRecord::new("L1", "A").with_value("x", Some(1.0)).with_value("y", None),
            EntityRecord::new("L1", "B").with_value("x", Some(2.0)).with_value("y", None),
            EntityRecord::new("L2", "C").with_value("x", Some(9.0)).with_value("y", None),
        ]
    }

    fn keys(records: &[EntityRecord]) -> Vec<EntityKey> {
        records.iter().map(|r| r.key().clone()).collect()
    }

    fn vars(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_only_present_variables_are_eligible() {
        let recs = records();
        let rows: Vec<&EntityRecord> = recs.iter().collect();
        assert_eq!(eligible_variables(&rows, &vars(&["x", "y", "z"])), vars(&["x"]));
    }

    #[test]
    fn test_k_zero_short_circuits_and_purges() {
        let mut recs = records();
        recs[0].set_cluster(Some(4));
        let mut adapter = ClusteringAdapter::new();
        let visible = keys(&recs);
        assert!(adapter.prepare(&mut recs, &visible, &vars(&["x"]), 0).is_none());
        assert!(recs.iter().all(|r| r.cluster().is_none()));
    }

    #[test]
    fn test_no_eligible_variables_short_circuits() {
        let mut recs = records();
        let mut adapter = ClusteringAdapter::new();
        let visible = keys(&recs);
        assert!(adapter.prepare(&mut recs, &visible, &vars(&["y"]), 3).is_none());
        assert_eq!(adapter.outstanding(), None);
    }

    #[test]
    fn test_merge_by_identity_not_position() {
        let mut recs = records();
        let mut adapter = ClusteringAdapter::new();
        let visible = keys(&recs);
        let request = adapter.prepare(&mut recs, &visible, &vars(&["x"]), 2).unwrap();

        // Reversed order relative to the request
        let response = ClusterResponse {
            seq: request.seq,
            labels: vec![
                ClusterLabel { key: EntityKey::new("L2", "C"), cluster: 1 },
                ClusterLabel { key: EntityKey::new("L1", "B"), cluster: 0 },
                ClusterLabel { key: EntityKey::new("L1", "A"), cluster: 0 },
            ],
        };
        assert_eq!(adapter.merge(&mut recs, &response).unwrap(), 3);
        assert_eq!(recs[0].cluster(), Some(0));
        assert_eq!(recs[1].cluster(), Some(0));
        assert_eq!(recs[2].cluster(), Some(1));
    }

    #[test]
    fn test_stale_response_discarded() {
        let mut recs = records();
        let mut adapter = ClusteringAdapter::new();
        let visible = keys(&recs);
        let first = adapter.prepare(&mut recs, &visible, &vars(&["x"]), 2).unwrap();
        let second = adapter.prepare(&mut recs, &visible, &vars(&["x"]), 3).unwrap();
        assert!(second.seq > first.seq);

        let stale = ClusterResponse {
            seq: first.seq,
            labels: vec![ClusterLabel { key: EntityKey::new("L1", "A"), cluster: 7 }],
        };
        let err = adapter.merge(&mut recs, &stale).unwrap_err();
        assert_eq!(err, Error::StaleClusterResult { seq: first.seq, latest: second.seq });
        assert!(recs.iter().all(|r| r.cluster().is_none()));
        assert_eq!(adapter.outstanding(), Some(second.seq));
    }

    #[test]
    fn test_subset_change_clears_labels_outside_new_subset() {
        let mut recs = records();
        let mut adapter = ClusteringAdapter::new();
        let all = keys(&recs);
        let req = adapter.prepare(&mut recs, &all, &vars(&["x"]), 2).unwrap();
        let labels = req
            .rows
            .iter()
            .map(|r| ClusterLabel { key: r.key.clone(), cluster: 1 })
            .collect();
        adapter.merge(&mut recs, &ClusterResponse { seq: req.seq, labels }).unwrap();
        assert!(recs.iter().all(|r| r.cluster() == Some(1)));

        // Narrow to L1 only; C must lose its old label
        let l1: Vec<EntityKey> = all.iter().filter(|k| k.group == "L1").cloned().collect();
        let req = adapter.prepare(&mut recs, &l1, &vars(&["x"]), 2).unwrap();
        assert_eq!(req.rows.len(), 2);
        assert!(recs.iter().all(|r| r.cluster().is_none()));

        // Labels for entities outside the submitted subset are ignored
        let response = ClusterResponse {
            seq: req.seq,
            labels: vec![
                ClusterLabel { key: EntityKey::new("L1", "A"), cluster: 0 },
                ClusterLabel { key: EntityKey::new("L2", "C"), cluster: 1 },
            ],
        };
        assert_eq!(adapter.merge(&mut recs, &response).unwrap(), 1);
        assert_eq!(recs[2].cluster(), None);
    }

    #[test]
    fn test_duplicate_response_after_merge_is_stale() {
        let mut recs = records();
        let mut adapter = ClusteringAdapter::new();
        let visible = keys(&recs);
        let req = adapter.prepare(&mut recs, &visible, &vars(&["x"]), 2).unwrap();
        let response = ClusterResponse { seq: req.seq, labels: vec![] };
        assert!(adapter.merge(&mut recs, &response).is_ok());
        assert!(adapter.merge(&mut recs, &response).is_err());
    }
}
