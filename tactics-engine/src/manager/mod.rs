//! Selection/filter state manager
//!
//! Single owner of the canonical record array and the selection state.
//! Every mutation goes through an operation on [`StateManager`], which:
//! 1. validates and applies the change, keeping the state consistent
//! 2. runs the recomputation cascade (scores, correlation, cluster request)
//! 3. emits typed change events on the [`EventBus`]
//! 4. returns a [`RecomputePlan`] describing what views must pull
//!
//! Operations live in `operations.rs`, view-slice builders in `slices.rs`.
//! All operations are synchronous; the only asynchronous boundary is the
//! clustering collaborator, which is handed a numbered request.

mod operations;
mod slices;

use crate::clustering::{ClusterRequest, ClusteringAdapter};
use crate::correlation::{compute_correlation_matrix, CorrelationMatrix};
use crate::identity::EntityKey;
use crate::record::EntityRecord;
use crate::registry::{AttributeRegistry, RESERVED_KEYS};
use crate::scoring::{compute_weighted_scores, DEFAULT_WEIGHT};
use crate::selection::{DisplayParams, SelectionState};
use crate::table::filter_rows;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tactics_common::config::{CorrelationScope, DashboardConfig};
use tactics_common::events::{DashboardEvent, EmptyReason, EventBus, ViewKind};
use tactics_common::time;
use tracing::{debug, warn};

/// What an operation invalidated
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecomputePlan {
    /// Views that must pull a fresh slice
    pub rebuild: BTreeSet<ViewKind>,
    /// Views that keep their payload but must re-apply brushes/highlights
    pub reconcile: BTreeSet<ViewKind>,
    /// Set when the selection is empty and surfaces must show their empty state
    pub empty: Option<EmptyReason>,
    /// Weighted scores were recomputed
    pub scores_recomputed: bool,
    /// Correlation matrix was recomputed
    pub correlation_recomputed: bool,
    /// Sequence number of a newly issued clustering request
    pub cluster_request: Option<u64>,
}

impl RecomputePlan {
    /// Plan that invalidates nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// True when nothing was invalidated
    pub fn is_noop(&self) -> bool {
        self.rebuild.is_empty()
            && self.reconcile.is_empty()
            && self.empty.is_none()
            && !self.scores_recomputed
            && !self.correlation_recomputed
            && self.cluster_request.is_none()
    }

    /// Fold a later plan into this one
    pub fn merge(&mut self, other: RecomputePlan) {
        self.rebuild.extend(other.rebuild);
        self.reconcile.extend(other.reconcile);
        // The later operation decides emptiness
        self.empty = other.empty;
        self.scores_recomputed |= other.scores_recomputed;
        self.correlation_recomputed |= other.correlation_recomputed;
        if other.cluster_request.is_some() {
            self.cluster_request = other.cluster_request;
        }
        self.reconcile.retain(|v| !self.rebuild.contains(v));
    }

    fn rebuild(mut self, views: &[ViewKind]) -> Self {
        self.rebuild.extend(views.iter().copied());
        self
    }

    fn reconcile(mut self, views: &[ViewKind]) -> Self {
        self.reconcile.extend(views.iter().copied());
        self
    }
}

/// Canonical state owner
pub struct StateManager {
    registry: AttributeRegistry,
    records: Vec<EntityRecord>,
    config: DashboardConfig,
    bus: Arc<EventBus>,
    state: SelectionState,
    all_groups: Vec<String>,
    all_attributes: Vec<String>,
    correlation: Option<CorrelationMatrix>,
    clustering: ClusteringAdapter,
    pending_request: Option<ClusterRequest>,
}

impl StateManager {
    /// Create the manager with every group and attribute active
    ///
    /// Records repeating an earlier identity are dropped. The attribute
    /// universe is the registered attributes present on at least one record,
    /// followed by unregistered fields in sorted order.
    pub fn new(
        registry: AttributeRegistry,
        records: Vec<EntityRecord>,
        config: DashboardConfig,
        bus: Arc<EventBus>,
    ) -> Self {
        let mut seen = BTreeSet::new();
        let records: Vec<EntityRecord> = records
            .into_iter()
            .filter(|r| {
                let first = seen.insert(r.key().clone());
                if !first {
                    warn!("Duplicate identity {}, keeping first occurrence", r.key());
                }
                first
            })
            .collect();

        let all_groups: Vec<String> = records
            .iter()
            .map(|r| r.group().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let present: BTreeSet<&str> = records.iter().flat_map(|r| r.attribute_ids()).collect();
        let mut all_attributes: Vec<String> = registry
            .attributes()
            .iter()
            .filter(|a| present.contains(a.id.as_str()))
            .map(|a| a.id.clone())
            .collect();
        all_attributes.extend(
            present
                .iter()
                .filter(|id| registry.get(id).is_none() && !RESERVED_KEYS.contains(*id))
                .map(|id| id.to_string()),
        );

        let weights: BTreeMap<String, f64> = all_attributes
            .iter()
            .filter(|id| registry.is_weightable(id))
            .map(|id| (id.clone(), DEFAULT_WEIGHT))
            .collect();

        let state = SelectionState::new(
            all_groups.clone(),
            all_attributes.clone(),
            weights,
            DisplayParams::from(&config.display),
        );

        debug!(
            "State manager created: {} records, {} groups, {} attributes",
            records.len(),
            all_groups.len(),
            all_attributes.len()
        );

        let mut manager = Self {
            registry,
            records,
            config,
            bus,
            state,
            all_groups,
            all_attributes,
            correlation: None,
            clustering: ClusteringAdapter::new(),
            pending_request: None,
        };
        manager.recompute_correlation();
        manager
    }

    /// Attribute metadata
    pub fn registry(&self) -> &AttributeRegistry {
        &self.registry
    }

    /// Full canonical record set
    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// Effective configuration
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Event bus the manager publishes on
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Read-only selection state
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Every group label in the dataset, sorted
    pub fn groups(&self) -> &[String] {
        &self.all_groups
    }

    /// Every attribute present in the dataset
    pub fn attributes(&self) -> &[String] {
        &self.all_attributes
    }

    /// Current correlation matrix (`None` while the selection is empty)
    pub fn correlation(&self) -> Option<&CorrelationMatrix> {
        self.correlation.as_ref()
    }

    /// Record by identity
    pub fn record(&self, key: &EntityKey) -> Option<&EntityRecord> {
        self.records.iter().find(|r| r.key() == key)
    }

    /// Records of the active groups; empty when no group is active
    pub fn visible_records(&self) -> Vec<&EntityRecord> {
        self.records
            .iter()
            .filter(|r| self.state.is_group_active(r.group()))
            .collect()
    }

    /// Identities of the visible records
    pub fn visible_keys(&self) -> Vec<EntityKey> {
        self.visible_records().iter().map(|r| r.key().clone()).collect()
    }

    /// Visible records passing the search text and every brush
    pub fn filtered_records(&self) -> Vec<&EntityRecord> {
        filter_rows(&self.visible_records(), &self.state.search_text, &self.state.brushes)
    }

    /// Why views must render their empty state, if they must
    pub fn empty_reason(&self) -> Option<EmptyReason> {
        if self.state.active_groups.is_empty() {
            Some(EmptyReason::NoGroups)
        } else if self.state.active_attributes.is_empty() {
            Some(EmptyReason::NoAttributes)
        } else {
            None
        }
    }

    fn emit(&self, event: DashboardEvent) {
        debug!("Emitting {}", event.event_type());
        self.bus.emit_lossy(event);
    }

    /// Emit the trailing events of an operation and hand the plan back
    fn finish(&self, plan: RecomputePlan) -> RecomputePlan {
        if let Some(reason) = plan.empty {
            self.emit(DashboardEvent::EmptySelection {
                reason,
                timestamp: time::now(),
            });
        }
        if !plan.rebuild.is_empty() {
            self.emit(DashboardEvent::ViewsInvalidated {
                views: plan.rebuild.iter().copied().collect(),
                timestamp: time::now(),
            });
        }
        plan
    }

    fn correlation_ids(&self) -> Vec<String> {
        match self.config.correlation_scope {
            CorrelationScope::Active => self.state.active_attributes.clone(),
            CorrelationScope::All => self.all_attributes.clone(),
        }
    }

    fn recompute_correlation(&mut self) -> bool {
        let ids = self.correlation_ids();
        if ids.is_empty() || self.state.active_groups.is_empty() {
            self.correlation = None;
            return false;
        }
        let matrix = compute_correlation_matrix(&self.visible_records(), &ids);
        if !matrix.degenerate_pairs().is_empty() {
            debug!("{} degenerate correlation pairs valued 0", matrix.degenerate_pairs().len());
        }
        self.correlation = Some(matrix);
        true
    }

    /// Issue a fresh clustering request for the visible subset (or purge when k = 0)
    fn recluster(&mut self, plan: &mut RecomputePlan) {
        let visible = self.visible_keys();
        let request = self.clustering.prepare(
            &mut self.records,
            &visible,
            &self.state.active_attributes,
            self.state.cluster_count,
        );
        if let Some(request) = &request {
            plan.cluster_request = Some(request.seq);
            self.emit(DashboardEvent::ClusterRequested {
                seq: request.seq,
                k: request.k,
                rows: request.rows.len(),
                variables: request.variables.clone(),
                timestamp: time::now(),
            });
        }
        self.pending_request = request;
    }

    fn clear_brushes(&mut self) {
        for attribute in std::mem::take(&mut self.state.brushes).into_keys() {
            self.emit(DashboardEvent::BrushChanged {
                attribute,
                range: None,
                timestamp: time::now(),
            });
        }
    }

    /// Drop highlights outside the visible population
    fn prune_highlights(&mut self) {
        let before = self.state.highlighted.len();
        let active: BTreeSet<String> = self.state.active_groups.iter().cloned().collect();
        self.state.highlighted.retain(|k| active.contains(&k.group));
        if self.state.highlighted.len() != before {
            self.emit(DashboardEvent::HighlightChanged {
                count: self.state.highlighted.len(),
                timestamp: time::now(),
            });
        }
    }

    /// Recomputation after a group or attribute change
    ///
    /// Every view is rebuilt from canonical records rather than patched.
    fn cascade(&mut self, attributes_changed: bool) -> RecomputePlan {
        let mut plan = RecomputePlan::none().rebuild(&ViewKind::ALL);

        if self.state.active_groups.is_empty() {
            self.clear_brushes();
            self.prune_highlights();
            self.correlation = None;
            self.clustering.clear(&mut self.records);
            self.pending_request = None;
            self.clamp_page();
            plan.empty = Some(EmptyReason::NoGroups);
            debug!("No groups active, downstream computation skipped");
            return plan;
        }

        self.prune_highlights();
        self.clamp_page();

        if attributes_changed {
            if let Some(weights) = &self.state.applied_weights {
                compute_weighted_scores(&mut self.records, &self.state.active_attributes, weights);
                plan.scores_recomputed = true;
            }
        }

        plan.correlation_recomputed = self.recompute_correlation();
        if self.state.active_attributes.is_empty() {
            plan.empty = Some(EmptyReason::NoAttributes);
        }
        self.recluster(&mut plan);
        plan
    }
}
