//! State manager operations
//!
//! Each public method is one user-visible state transition. Failed
//! validation leaves the state untouched.

use super::{RecomputePlan, StateManager};
use crate::clustering::{ClusterRequest, ClusterResponse, ClusteringBackend};
use crate::identity::EntityKey;
use crate::scoring::{compute_weighted_scores, MAX_WEIGHT, MIN_WEIGHT};
use crate::selection::{BrushRange, DisplayParam};
use crate::table::pagination::calculate_pagination;
use crate::table::{SortSpec, TableColumn};
use crate::{Error, Result};
use std::collections::BTreeSet;
use tactics_common::events::{DashboardEvent, EmptyReason, ViewKind};
use tactics_common::time;
use tracing::{debug, info, warn};

const PLOT_AND_TABLE: [ViewKind; 2] = [ViewKind::Plot, ViewKind::Table];

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items.into_iter().filter(|i| seen.insert(i.clone())).collect()
}

impl StateManager {
    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Replace the active group filter; order is kept as selection order
    pub fn set_active_groups<I, S>(&mut self, groups: I) -> Result<RecomputePlan>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let groups = dedup(groups.into_iter().map(Into::into));
        if let Some(unknown) = groups.iter().find(|g| !self.all_groups.contains(g)) {
            return Err(Error::UnknownGroup(unknown.clone()));
        }
        Ok(self.apply_groups(groups))
    }

    /// Add or remove one group
    pub fn toggle_group(&mut self, group: &str) -> Result<RecomputePlan> {
        self.check_group(group)?;
        let mut groups = self.state.active_groups.clone();
        match groups.iter().position(|g| g == group) {
            Some(i) => {
                groups.remove(i);
            }
            None => groups.push(group.to_string()),
        }
        Ok(self.apply_groups(groups))
    }

    /// Make `group` the only active group
    pub fn solo_group(&mut self, group: &str) -> Result<RecomputePlan> {
        self.check_group(group)?;
        Ok(self.apply_groups(vec![group.to_string()]))
    }

    /// Activate every group, in sorted order
    pub fn select_all_groups(&mut self) -> RecomputePlan {
        let all = self.all_groups.clone();
        self.apply_groups(all)
    }

    /// Deactivate every group; brushes and highlights are cleared with them
    pub fn clear_groups(&mut self) -> RecomputePlan {
        self.apply_groups(Vec::new())
    }

    fn check_group(&self, group: &str) -> Result<()> {
        if self.all_groups.iter().any(|g| g == group) {
            Ok(())
        } else {
            Err(Error::UnknownGroup(group.to_string()))
        }
    }

    fn apply_groups(&mut self, groups: Vec<String>) -> RecomputePlan {
        if groups == self.state.active_groups {
            return RecomputePlan::none();
        }
        info!("Active groups: {:?}", groups);
        self.state.active_groups = groups;
        self.emit(DashboardEvent::GroupsChanged {
            active: self.state.active_groups.clone(),
            timestamp: time::now(),
        });
        let plan = self.cascade(false);
        self.finish(plan)
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Replace the active attribute list
    pub fn set_active_attributes<I, S>(&mut self, ids: I) -> Result<RecomputePlan>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids = dedup(ids.into_iter().map(Into::into));
        if let Some(unknown) = ids.iter().find(|id| !self.all_attributes.contains(id)) {
            return Err(Error::UnknownAttribute(unknown.clone()));
        }
        self.state.last_removed.clear();
        Ok(self.apply_attributes(ids))
    }

    /// Remove an active attribute or add an inactive one
    ///
    /// Re-adding the attribute removed last restores its former position, so
    /// toggling twice leaves the list unchanged.
    pub fn toggle_attribute(&mut self, id: &str) -> Result<RecomputePlan> {
        self.toggle_attributes(&[id])
    }

    /// Toggle several attributes as one change
    ///
    /// Attributes removed by the previous toggle go back to their former
    /// positions, in ascending order, so repeating the same toggle restores
    /// the list.
    pub fn toggle_attributes(&mut self, ids: &[&str]) -> Result<RecomputePlan> {
        for id in ids {
            self.check_attribute(id)?;
        }
        let ids = dedup(ids.iter().map(|id| id.to_string()));
        let (remove, add): (Vec<String>, Vec<String>) = ids
            .into_iter()
            .partition(|id| self.state.is_attribute_active(id));

        let mut list = self.state.active_attributes.clone();
        let removed: Vec<(String, usize)> = list
            .iter()
            .enumerate()
            .filter(|(_, a)| remove.contains(*a))
            .map(|(i, a)| (a.clone(), i))
            .collect();
        list.retain(|a| !remove.contains(a));

        let mut restored: Vec<(String, usize)> = std::mem::take(&mut self.state.last_removed)
            .into_iter()
            .filter(|(id, _)| add.contains(id))
            .collect();
        restored.sort_by_key(|(_, i)| *i);
        for (id, i) in &restored {
            let at = (*i).min(list.len());
            list.insert(at, id.clone());
        }
        for id in &add {
            if !restored.iter().any(|(r, _)| r == id) {
                list.push(id.clone());
            }
        }

        self.state.last_removed = removed;
        Ok(self.apply_attributes(list))
    }

    /// Make `id` the only active attribute
    pub fn solo_attribute(&mut self, id: &str) -> Result<RecomputePlan> {
        self.check_attribute(id)?;
        self.state.last_removed.clear();
        Ok(self.apply_attributes(vec![id.to_string()]))
    }

    /// Activate every attribute in dataset order
    pub fn select_all_attributes(&mut self) -> RecomputePlan {
        self.state.last_removed.clear();
        let all = self.all_attributes.clone();
        self.apply_attributes(all)
    }

    /// Deactivate every attribute
    pub fn clear_attributes(&mut self) -> RecomputePlan {
        self.state.last_removed.clear();
        self.apply_attributes(Vec::new())
    }

    fn check_attribute(&self, id: &str) -> Result<()> {
        if self.all_attributes.iter().any(|a| a == id) {
            Ok(())
        } else {
            Err(Error::UnknownAttribute(id.to_string()))
        }
    }

    fn apply_attributes(&mut self, ids: Vec<String>) -> RecomputePlan {
        if ids == self.state.active_attributes {
            return RecomputePlan::none();
        }
        info!("Active attributes: {:?}", ids);
        self.state.active_attributes = ids;

        // A brush on a hidden axis no longer filters anything
        let stale: Vec<String> = self
            .state
            .brushes
            .keys()
            .filter(|id| !self.state.is_attribute_active(id))
            .cloned()
            .collect();
        for attribute in stale {
            self.state.brushes.remove(&attribute);
            self.emit(DashboardEvent::BrushChanged {
                attribute,
                range: None,
                timestamp: time::now(),
            });
        }

        self.emit(DashboardEvent::AttributesChanged {
            active: self.state.active_attributes.clone(),
            timestamp: time::now(),
        });
        let plan = self.cascade(true);
        self.finish(plan)
    }

    // ------------------------------------------------------------------
    // Weights
    // ------------------------------------------------------------------

    /// Move one weight slider; the value is clamped to [0, 2]
    ///
    /// Scores are not recomputed until `apply_weights`.
    pub fn set_weight(&mut self, id: &str, value: f64) -> Result<RecomputePlan> {
        if !self.state.weights.contains_key(id) {
            return Err(Error::UnknownAttribute(id.to_string()));
        }
        if value.is_nan() {
            return Err(Error::InvalidInput(format!("weight for '{}' is NaN", id)));
        }
        let value = value.clamp(MIN_WEIGHT, MAX_WEIGHT);
        self.state.weights.insert(id.to_string(), value);
        self.emit(DashboardEvent::WeightChanged {
            attribute: id.to_string(),
            value,
            timestamp: time::now(),
        });
        Ok(self.finish(RecomputePlan::none().rebuild(&[ViewKind::Controls])))
    }

    /// Score the full record set with the pending weights
    pub fn apply_weights(&mut self) -> RecomputePlan {
        let weights = self.state.weights.clone();
        compute_weighted_scores(&mut self.records, &self.state.active_attributes, &weights);
        self.state.applied_weights = Some(weights);
        info!("Weights applied to {} records", self.records.len());
        self.emit(DashboardEvent::WeightsApplied {
            scored: self.records.len(),
            timestamp: time::now(),
        });

        let mut plan = RecomputePlan::none().rebuild(&[ViewKind::Plot, ViewKind::Table, ViewKind::Controls]);
        plan.scores_recomputed = true;
        plan.empty = self.empty_reason();
        self.finish(plan)
    }

    // ------------------------------------------------------------------
    // Clustering
    // ------------------------------------------------------------------

    /// Change k; 0 disables clustering and purges every label
    ///
    /// Any other value issues a new clustering request for the visible subset
    /// and triggers a full plot rebuild with cluster coloring.
    pub fn set_cluster_count(&mut self, k: usize) -> Result<RecomputePlan> {
        if k > self.config.max_clusters {
            return Err(Error::InvalidInput(format!(
                "cluster count {} exceeds maximum {}",
                k, self.config.max_clusters
            )));
        }
        let old_k = self.state.cluster_count;
        self.state.cluster_count = k;
        info!("Cluster count: {} -> {}", old_k, k);
        self.emit(DashboardEvent::ClusterCountChanged {
            old_k,
            new_k: k,
            timestamp: time::now(),
        });

        let mut plan = RecomputePlan::none().rebuild(&[ViewKind::Plot, ViewKind::Table, ViewKind::Controls]);
        plan.empty = self.empty_reason();
        if self.state.active_groups.is_empty() {
            self.clustering.clear(&mut self.records);
            self.pending_request = None;
        } else {
            self.recluster(&mut plan);
        }
        Ok(self.finish(plan))
    }

    /// Request awaiting dispatch to the clustering collaborator
    pub fn pending_cluster_request(&self) -> Option<&ClusterRequest> {
        self.pending_request.as_ref()
    }

    /// Take the pending request for dispatch
    pub fn take_cluster_request(&mut self) -> Option<ClusterRequest> {
        self.pending_request.take()
    }

    /// Merge a collaborator response
    ///
    /// A response for a superseded request is discarded and reported as
    /// `StaleClusterResult`; state is untouched in that case.
    pub fn complete_clustering(&mut self, response: &ClusterResponse) -> Result<RecomputePlan> {
        match self.clustering.merge(&mut self.records, response) {
            Ok(labeled) => {
                debug!("Merged {} cluster labels from request {}", labeled, response.seq);
                if self.pending_request.as_ref().is_some_and(|r| r.seq == response.seq) {
                    self.pending_request = None;
                }
                self.emit(DashboardEvent::ClustersAssigned {
                    seq: response.seq,
                    labeled,
                    timestamp: time::now(),
                });
                let mut plan = RecomputePlan::none().rebuild(&PLOT_AND_TABLE);
                plan.empty = self.empty_reason();
                Ok(self.finish(plan))
            }
            Err(Error::StaleClusterResult { seq, latest }) => {
                self.emit(DashboardEvent::StaleClusterDiscarded {
                    seq,
                    latest,
                    timestamp: time::now(),
                });
                Err(Error::StaleClusterResult { seq, latest })
            }
            Err(e) => Err(e),
        }
    }

    /// Run the pending request synchronously on `backend`
    ///
    /// Returns `Ok(None)` when no request is pending.
    pub fn run_clustering(&mut self, backend: &dyn ClusteringBackend) -> Result<Option<RecomputePlan>> {
        let Some(request) = self.take_cluster_request() else {
            return Ok(None);
        };
        let response = backend.respond(&request);
        self.complete_clustering(&response).map(Some)
    }

    // ------------------------------------------------------------------
    // Brushes and highlights
    // ------------------------------------------------------------------

    /// Store or clear the brush on one active attribute
    pub fn set_brush(&mut self, id: &str, range: Option<(f64, f64)>) -> Result<RecomputePlan> {
        self.check_attribute(id)?;
        let range = match range {
            Some((a, b)) => {
                if self.state.active_groups.is_empty() {
                    return Err(Error::EmptySelection(EmptyReason::NoGroups));
                }
                if !self.state.is_attribute_active(id) {
                    return Err(Error::InvalidInput(format!("attribute '{}' is not active", id)));
                }
                Some(BrushRange::new(a, b)?)
            }
            None => None,
        };

        let changed = match range {
            Some(r) => self.state.brushes.insert(id.to_string(), r) != Some(r),
            None => self.state.brushes.remove(id).is_some(),
        };
        if !changed {
            return Ok(RecomputePlan::none());
        }
        debug!("Brush on {}: {:?}", id, range);
        self.emit(DashboardEvent::BrushChanged {
            attribute: id.to_string(),
            range: range.map(|r| r.bounds()),
            timestamp: time::now(),
        });
        self.clamp_page();
        Ok(self.finish(
            RecomputePlan::none()
                .rebuild(&[ViewKind::Table])
                .reconcile(&[ViewKind::Plot]),
        ))
    }

    /// Replace the highlight set; identities outside the visible population are ignored
    pub fn set_highlighted<I>(&mut self, keys: I) -> RecomputePlan
    where
        I: IntoIterator<Item = EntityKey>,
    {
        let visible: BTreeSet<EntityKey> = self.visible_keys().into_iter().collect();
        let (kept, ignored): (BTreeSet<EntityKey>, BTreeSet<EntityKey>) =
            keys.into_iter().partition(|k| visible.contains(k));
        if !ignored.is_empty() {
            warn!("Ignoring {} highlight(s) outside the visible rows", ignored.len());
        }
        self.replace_highlights(kept)
    }

    /// Flip one row checkbox
    pub fn toggle_highlight(&mut self, key: &EntityKey) -> RecomputePlan {
        let mut next = self.state.highlighted.clone();
        if !next.remove(key) {
            next.insert(key.clone());
        }
        self.set_highlighted(next)
    }

    /// Select or deselect every row of the current filtered set
    pub fn select_all_filtered(&mut self, selected: bool) -> RecomputePlan {
        let filtered: BTreeSet<EntityKey> = self
            .filtered_records()
            .iter()
            .map(|r| r.key().clone())
            .collect();
        let mut next = self.state.highlighted.clone();
        if selected {
            next.extend(filtered);
        } else {
            next.retain(|k| !filtered.contains(k));
        }
        self.clamp_page();
        self.replace_highlights(next)
    }

    fn replace_highlights(&mut self, next: BTreeSet<EntityKey>) -> RecomputePlan {
        if next == self.state.highlighted {
            return RecomputePlan::none();
        }
        self.state.highlighted = next;
        self.emit(DashboardEvent::HighlightChanged {
            count: self.state.highlighted.len(),
            timestamp: time::now(),
        });
        self.finish(
            RecomputePlan::none()
                .rebuild(&[ViewKind::Table])
                .reconcile(&[ViewKind::Plot]),
        )
    }

    // ------------------------------------------------------------------
    // Table
    // ------------------------------------------------------------------

    /// Replace the search text and return to page 1
    pub fn set_search_text(&mut self, text: &str) -> RecomputePlan {
        if text == self.state.search_text && self.state.page == 1 {
            return RecomputePlan::none();
        }
        self.state.search_text = text.to_string();
        self.state.page = 1;
        self.emit(DashboardEvent::SearchChanged {
            text: self.state.search_text.clone(),
            timestamp: time::now(),
        });
        self.finish(RecomputePlan::none().rebuild(&[ViewKind::Table]))
    }

    /// Header click: sort by `column`, flipping direction on a repeated click
    pub fn sort_by(&mut self, column: &str) -> Result<RecomputePlan> {
        let column = TableColumn::from_key(column, &self.registry);
        if let TableColumn::Attribute(id) = &column {
            self.check_attribute(id)?;
        }
        let spec = SortSpec::after_click(self.state.sort.as_ref(), column);
        self.emit(DashboardEvent::SortChanged {
            column: spec.column.key().to_string(),
            descending: spec.is_descending(),
            timestamp: time::now(),
        });
        self.state.sort = Some(spec);
        Ok(self.finish(RecomputePlan::none().rebuild(&[ViewKind::Table])))
    }

    /// Go to `page`, clamped to the current page range
    pub fn set_page(&mut self, page: usize) -> RecomputePlan {
        let total = self.filtered_records().len();
        let page = calculate_pagination(total, page, self.config.page_size).page;
        if page == self.state.page {
            return RecomputePlan::none();
        }
        self.state.page = page;
        self.emit(DashboardEvent::PageChanged {
            page,
            timestamp: time::now(),
        });
        self.finish(RecomputePlan::none().rebuild(&[ViewKind::Table]))
    }

    /// Pull the stored page back into range after the filtered set shrank
    pub(super) fn clamp_page(&mut self) {
        let total = self.filtered_records().len();
        let page = calculate_pagination(total, self.state.page, self.config.page_size).page;
        if page != self.state.page {
            debug!("Page {} out of range, clamped to {}", self.state.page, page);
            self.state.page = page;
            self.emit(DashboardEvent::PageChanged {
                page,
                timestamp: time::now(),
            });
        }
    }

    /// Next page (no-op on the last page)
    pub fn next_page(&mut self) -> RecomputePlan {
        self.set_page(self.state.page.saturating_add(1))
    }

    /// Previous page (no-op on page 1)
    pub fn prev_page(&mut self) -> RecomputePlan {
        self.set_page(self.state.page.saturating_sub(1).max(1))
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Set a presentation parameter, clamped to [0, 1]
    pub fn set_display_param(&mut self, param: DisplayParam, value: f64) -> Result<RecomputePlan> {
        if value.is_nan() {
            return Err(Error::InvalidInput(format!("{:?} value is NaN", param)));
        }
        self.state.display.set(param, value);
        let d = self.state.display;
        self.emit(DashboardEvent::DisplayChanged {
            opacity: d.opacity,
            smoothness: d.smoothness,
            bundling: d.bundling,
            timestamp: time::now(),
        });
        Ok(self.finish(RecomputePlan::none().rebuild(&[ViewKind::Plot, ViewKind::Controls])))
    }
}
