//! Event types for the dashboard change-notification system
//!
//! Provides the shared event definitions and the EventBus. The state manager
//! emits one or more events per mutation; view adapters subscribe and pull
//! the slice of derived state they need.

mod view_types;

pub use view_types::{EmptyReason, ViewKind};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Dashboard change events
///
/// Events are broadcast via EventBus and can be serialized for logging or
/// for a remote renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DashboardEvent {
    /// Active group filter changed
    ///
    /// Triggers:
    /// - Correlation matrix recompute
    /// - Plot rebuild, table requery
    GroupsChanged {
        /// Active groups in selection order
        active: Vec<String>,
        /// When the filter changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active attribute list changed
    AttributesChanged {
        /// Active attribute ids in order
        active: Vec<String>,
        /// When the list changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A weight slider moved (not yet applied)
    WeightChanged {
        /// Attribute id
        attribute: String,
        /// Clamped weight value (0.0-2.0)
        value: f64,
        /// When the weight changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Weighted scores recomputed over the full record set
    WeightsApplied {
        /// Number of records scored
        scored: usize,
        /// When scores were applied
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Cluster count changed (0 = clustering disabled)
    ClusterCountChanged {
        /// Previous k
        old_k: usize,
        /// New k
        new_k: usize,
        /// When k changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A clustering request was issued to the external collaborator
    ClusterRequested {
        /// Request sequence number
        seq: u64,
        /// Number of clusters requested
        k: usize,
        /// Number of entity rows submitted
        rows: usize,
        /// Variables submitted
        variables: Vec<String>,
        /// When the request was issued
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Cluster labels merged back onto records
    ClustersAssigned {
        /// Sequence number of the merged response
        seq: u64,
        /// Number of records that received a label
        labeled: usize,
        /// When labels were merged
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A superseded clustering response was discarded
    StaleClusterDiscarded {
        /// Sequence number of the discarded response
        seq: u64,
        /// Latest issued sequence number
        latest: u64,
        /// When the response was discarded
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A brush range was stored or cleared
    BrushChanged {
        /// Attribute id
        attribute: String,
        /// New range, `None` when cleared
        range: Option<(f64, f64)>,
        /// When the brush changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Highlight set replaced
    HighlightChanged {
        /// Number of highlighted entities
        count: usize,
        /// When the highlight set changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Table search text changed
    SearchChanged {
        /// New search text
        text: String,
        /// When the text changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Table sort column or direction changed
    SortChanged {
        /// Sort column identifier
        column: String,
        /// True for descending order
        descending: bool,
        /// When the sort changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Table page changed
    PageChanged {
        /// Requested page (1-indexed, clamped on query)
        page: usize,
        /// When the page changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Plot display parameters changed (presentation only)
    DisplayChanged {
        /// Line opacity
        opacity: f64,
        /// Curve smoothness
        smoothness: f64,
        /// Bundling strength
        bundling: f64,
        /// When parameters changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Selection became empty; surfaces must show their empty state
    EmptySelection {
        /// Why the selection is empty
        reason: EmptyReason,
        /// When the selection emptied
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Surfaces that must pull a fresh slice
    ViewsInvalidated {
        /// Invalidated surfaces
        views: Vec<ViewKind>,
        /// When the views were invalidated
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl DashboardEvent {
    /// Get event type as string for logging and filtering
    pub fn event_type(&self) -> &str {
        match self {
            DashboardEvent::GroupsChanged { .. } => "GroupsChanged",
            DashboardEvent::AttributesChanged { .. } => "AttributesChanged",
            DashboardEvent::WeightChanged { .. } => "WeightChanged",
            DashboardEvent::WeightsApplied { .. } => "WeightsApplied",
            DashboardEvent::ClusterCountChanged { .. } => "ClusterCountChanged",
            DashboardEvent::ClusterRequested { .. } => "ClusterRequested",
            DashboardEvent::ClustersAssigned { .. } => "ClustersAssigned",
            DashboardEvent::StaleClusterDiscarded { .. } => "StaleClusterDiscarded",
            DashboardEvent::BrushChanged { .. } => "BrushChanged",
            DashboardEvent::HighlightChanged { .. } => "HighlightChanged",
            DashboardEvent::SearchChanged { .. } => "SearchChanged",
            DashboardEvent::SortChanged { .. } => "SortChanged",
            DashboardEvent::PageChanged { .. } => "PageChanged",
            DashboardEvent::DisplayChanged { .. } => "DisplayChanged",
            DashboardEvent::EmptySelection { .. } => "EmptySelection",
            DashboardEvent::ViewsInvalidated { .. } => "ViewsInvalidated",
        }
    }
}

/// Central event distribution bus
///
/// Thin wrapper over a `tokio::sync::broadcast` channel. Receivers can drain
/// it synchronously with `try_recv`, so no runtime is required.
pub struct EventBus {
    tx: broadcast::Sender<DashboardEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Examples
    ///
    /// ```
    /// use tactics_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: DashboardEvent,
    ) -> Result<usize, broadcast::error::SendError<DashboardEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: DashboardEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
