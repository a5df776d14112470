//! Cross-view synchronization layer
//!
//! Translates events raised by one surface into state-manager operations,
//! and pushes the resulting state back out to every registered surface.
//!
//! Inbound: [`SyncLayer::dispatch`] maps a [`ViewEvent`] (keyed by display
//! labels, as renderers emit them) to the matching manager operation.
//!
//! Outbound: [`SyncLayer::pump`] drains the manager's event bus. Views named
//! by `ViewsInvalidated` pull a fresh slice; brush and highlight changes are
//! re-applied through the [`Brushable`] / [`Highlightable`] capabilities.
//!
//! Reconciliation is level-triggered. A surface that redraws asynchronously
//! reports `ViewRendered` when done, and the *current* brushes and
//! highlights are applied again, whatever happened in between.

use crate::identity::EntityKey;
use crate::manager::{RecomputePlan, StateManager};
use crate::selection::BrushRange;
use crate::views::ViewSlice;
use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use tactics_common::events::{DashboardEvent, EmptyReason, ViewKind};
use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, warn};

/// Interaction raised by a rendering surface
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// Heatmap axis label clicked (display title)
    CorrelationLabelClicked {
        /// Label text
        label: String,
    },
    /// Heatmap cell clicked; toggles both attributes (once on the diagonal)
    CorrelationCellClicked {
        /// Row label text
        row: String,
        /// Column label text
        column: String,
    },
    /// Plot axis brushed or cleared
    AxisBrushed {
        /// Axis label text
        label: String,
        /// Brushed interval, `None` when cleared
        range: Option<(f64, f64)>,
    },
    /// Table row checkbox flipped
    RowToggled {
        /// Row identity
        key: EntityKey,
    },
    /// Table select-all checkbox
    AllRowsToggled {
        /// New checkbox state
        selected: bool,
    },
    /// Table header clicked
    HeaderClicked {
        /// Column key
        column: String,
    },
    /// Table search box edited
    SearchEdited {
        /// New text
        text: String,
    },
    /// Table "next" button
    NextPage,
    /// Table "previous" button
    PrevPage,
    /// A surface finished an (asynchronous) redraw
    ViewRendered {
        /// Surface that redrew
        kind: ViewKind,
    },
}

/// Surface that can emphasize a subset of entities
pub trait Highlightable {
    /// Emphasize exactly `keys`, dimming the rest
    fn highlight(&mut self, keys: &BTreeSet<EntityKey>);
    /// Remove all emphasis
    fn unhighlight(&mut self);
}

/// Surface that can display brush ranges
pub trait Brushable {
    /// Show exactly `brushes`; axes not listed carry no brush
    fn apply_brushes(&mut self, brushes: &BTreeMap<String, BrushRange>);
}

/// Rendering collaborator adapter
pub trait ViewAdapter {
    /// Surface this adapter paints
    fn kind(&self) -> ViewKind;

    /// Paint a fresh slice
    fn render(&mut self, slice: &ViewSlice);

    /// Paint the empty state
    fn render_empty(&mut self, reason: EmptyReason);

    /// Highlight capability, if the surface has one
    fn as_highlightable(&mut self) -> Option<&mut dyn Highlightable> {
        None
    }

    /// Brush capability, if the surface has one
    fn as_brushable(&mut self) -> Option<&mut dyn Brushable> {
        None
    }
}

/// Bridge between surfaces and the state manager
pub struct SyncLayer {
    receiver: Receiver<DashboardEvent>,
    adapters: Vec<Box<dyn ViewAdapter>>,
    /// Surfaces rendered but not yet reported back as redrawn
    awaiting_render: BTreeSet<ViewKind>,
}

impl SyncLayer {
    /// Subscribe to the manager's event bus
    pub fn new(manager: &StateManager) -> Self {
        Self {
            receiver: manager.bus().subscribe(),
            adapters: Vec::new(),
            awaiting_render: BTreeSet::new(),
        }
    }

    /// Register a surface
    pub fn register(&mut self, adapter: Box<dyn ViewAdapter>) {
        debug!("Registered {} view adapter", adapter.kind());
        self.adapters.push(adapter);
    }

    /// Surfaces whose redraw has not been confirmed yet
    pub fn awaiting_render(&self) -> &BTreeSet<ViewKind> {
        &self.awaiting_render
    }

    fn attribute_for_label<'a>(manager: &'a StateManager, label: &str) -> Result<&'a str> {
        manager.registry().id_for_title(label).map_or_else(
            || {
                // Unregistered fields are labelled by their raw id
                let label = label.trim();
                manager
                    .attributes()
                    .iter()
                    .find(|a| a.as_str() == label)
                    .map(String::as_str)
                    .ok_or_else(|| {
                        warn!("No attribute labelled '{}'", label);
                        Error::UnknownAttribute(label.to_string())
                    })
            },
            Ok,
        )
    }

    /// Apply one surface event to the manager
    pub fn dispatch(&mut self, manager: &mut StateManager, event: ViewEvent) -> Result<RecomputePlan> {
        debug!("Dispatching {:?}", event);
        match event {
            ViewEvent::CorrelationLabelClicked { label } => {
                let id = Self::attribute_for_label(manager, &label)?.to_string();
                manager.toggle_attribute(&id)
            }
            ViewEvent::CorrelationCellClicked { row, column } => {
                let first = Self::attribute_for_label(manager, &row)?.to_string();
                let second = Self::attribute_for_label(manager, &column)?.to_string();
                manager.toggle_attributes(&[first.as_str(), second.as_str()])
            }
            ViewEvent::AxisBrushed { label, range } => {
                let id = Self::attribute_for_label(manager, &label)?.to_string();
                manager.set_brush(&id, range)
            }
            ViewEvent::RowToggled { key } => Ok(manager.toggle_highlight(&key)),
            ViewEvent::AllRowsToggled { selected } => Ok(manager.select_all_filtered(selected)),
            ViewEvent::HeaderClicked { column } => manager.sort_by(&column),
            ViewEvent::SearchEdited { text } => Ok(manager.set_search_text(&text)),
            ViewEvent::NextPage => Ok(manager.next_page()),
            ViewEvent::PrevPage => Ok(manager.prev_page()),
            ViewEvent::ViewRendered { kind } => {
                self.awaiting_render.remove(&kind);
                self.reconcile(manager, kind);
                Ok(RecomputePlan::none())
            }
        }
    }

    /// Drain pending change events and update surfaces; returns events handled
    pub fn pump(&mut self, manager: &StateManager) -> usize {
        let mut handled = 0;
        let mut rebuild: BTreeSet<ViewKind> = BTreeSet::new();
        let mut reconcile: BTreeSet<ViewKind> = BTreeSet::new();

        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    handled += 1;
                    match event {
                        DashboardEvent::ViewsInvalidated { views, .. } => rebuild.extend(views),
                        DashboardEvent::BrushChanged { .. } | DashboardEvent::HighlightChanged { .. } => {
                            reconcile.extend([ViewKind::Plot, ViewKind::Table]);
                        }
                        _ => {}
                    }
                }
                Err(TryRecvError::Lagged(missed)) => {
                    warn!("Sync layer lagged by {} events, refreshing every view", missed);
                    rebuild.extend(ViewKind::ALL);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        for kind in &rebuild {
            self.refresh(manager, *kind);
        }
        for kind in reconcile.difference(&rebuild) {
            self.reconcile(manager, *kind);
        }
        handled
    }

    /// Re-render every registered surface
    pub fn refresh_all(&mut self, manager: &StateManager) {
        for kind in ViewKind::ALL {
            self.refresh(manager, kind);
        }
    }

    fn refresh(&mut self, manager: &StateManager, kind: ViewKind) {
        let slice = manager.view_slice(kind);
        let mut rendered = false;
        for adapter in self.adapters.iter_mut().filter(|a| a.kind() == kind) {
            match &slice {
                Ok(slice) => adapter.render(slice),
                Err(Error::EmptySelection(reason)) => adapter.render_empty(*reason),
                Err(e) => {
                    warn!("Could not build {} slice: {}", kind, e);
                    continue;
                }
            }
            rendered = true;
        }
        if rendered {
            self.awaiting_render.insert(kind);
        }
    }

    /// Push the current brushes and highlights onto one surface
    fn reconcile(&mut self, manager: &StateManager, kind: ViewKind) {
        let state = manager.state();
        for adapter in self.adapters.iter_mut().filter(|a| a.kind() == kind) {
            if let Some(h) = adapter.as_highlightable() {
                if state.highlighted().is_empty() {
                    h.unhighlight();
                } else {
                    h.highlight(state.highlighted());
                }
            }
            if let Some(b) = adapter.as_brushable() {
                b.apply_brushes(state.brushes());
            }
        }
    }
}
