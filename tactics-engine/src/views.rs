//! View slices handed to rendering collaborators
//!
//! Each surface pulls one of these after a `ViewsInvalidated` event. They are
//! plain serializable data; nothing here knows how a surface paints.

use crate::identity::EntityKey;
use crate::selection::DisplayParams;
use crate::table::{SortSpec, TableColumn};
use serde::Serialize;
use std::collections::BTreeMap;
use tactics_common::events::ViewKind;

/// Correlation heatmap payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationView {
    /// Attribute ids indexing rows and columns
    pub attributes: Vec<String>,
    /// Display titles, aligned with `attributes`
    pub titles: Vec<String>,
    /// Matrix values
    pub values: Vec<Vec<f64>>,
    /// Cell text, two decimals
    pub text: Vec<Vec<String>>,
    /// Labels to emphasize (attribute is in the active list)
    pub selected: Vec<bool>,
    /// Pairs valued 0 because they were degenerate
    pub degenerate: Vec<(String, String)>,
}

/// One axis of the multi-axis plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotDimension {
    /// Attribute id
    pub id: String,
    /// Axis title
    pub title: String,
    /// Attribute group, when registered
    pub group: Option<String>,
    /// Rank -> label tick overrides (ordinal attributes only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ticks: Vec<(u32, String)>,
    /// Current brush on this axis
    pub brush: Option<(f64, f64)>,
}

/// One entity line of the multi-axis plot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotRow {
    /// Identity
    pub key: EntityKey,
    /// Values by attribute id (ordinal attributes hold their rank)
    pub values: BTreeMap<String, Option<f64>>,
    /// Weighted score, once applied
    #[serde(rename = "weightedScore")]
    pub weighted_score: Option<f64>,
    /// Cluster label while k > 0
    pub cluster: Option<u32>,
    /// Line color
    pub color: &'static str,
    /// Entity is in the highlight set
    pub highlighted: bool,
    /// Some entity is highlighted and this one is not
    pub dimmed: bool,
    /// Entity fails at least one brush
    pub brushed_out: bool,
}

/// Multi-axis plot payload, rebuilt from canonical records at every structural change
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotPayload {
    /// Identity columns shown before the attribute axes
    pub base_columns: Vec<String>,
    /// Attribute axes, in active order
    pub dimensions: Vec<PlotDimension>,
    /// One line per visible entity
    pub rows: Vec<PlotRow>,
    /// True when lines are colored by cluster rather than group
    pub color_by_cluster: bool,
    /// Presentation parameters
    pub display: DisplayParams,
}

/// Grouped header cell spanning adjacent columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderGroup {
    /// Group caption
    pub name: String,
    /// Number of columns covered
    pub span: usize,
}

/// Table column header
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHeader {
    /// Column
    pub column: TableColumn,
    /// Caption
    pub title: String,
    /// Caption of the grouped header row above
    pub group: String,
}

/// Table cell: display text plus the sortable value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCell {
    /// Text shown (ordinal label, formatted number, identity label or empty)
    pub text: String,
    /// Numeric value, if any
    pub value: Option<f64>,
}

/// One table row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    /// Identity
    pub key: EntityKey,
    /// Cells aligned with `TableView::headers`
    pub cells: Vec<TableCell>,
    /// Row checkbox state (highlight set membership)
    pub selected: bool,
}

/// Row table payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableView {
    /// Column headers
    pub headers: Vec<TableHeader>,
    /// Grouped header row
    pub header_groups: Vec<HeaderGroup>,
    /// Rows on the current page
    pub rows: Vec<TableRow>,
    /// Clamped page
    pub page: usize,
    /// Total pages (at least 1)
    pub total_pages: usize,
    /// Rows matching search and brushes
    pub total_rows: usize,
    /// Current sort
    pub sort: Option<SortSpec>,
    /// Current search text
    pub search: String,
    /// Select-all checkbox state: every filtered row is highlighted
    pub all_selected: bool,
}

/// Group filter entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupOption {
    /// Group label
    pub name: String,
    /// In the active filter
    pub selected: bool,
    /// Line color while clustering is off
    pub color: Option<&'static str>,
}

/// Column filter entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeOption {
    /// Attribute id
    pub id: String,
    /// Display title
    pub title: String,
    /// In the active list
    pub selected: bool,
}

/// One weight slider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightSlider {
    /// Attribute id
    pub id: String,
    /// Display title
    pub title: String,
    /// Pending value
    pub value: f64,
}

/// Weight sliders of one attribute group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightGroup {
    /// Attribute group name
    pub group: String,
    /// Sliders in registry order
    pub sliders: Vec<WeightSlider>,
}

/// Widget panel state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlsView {
    /// Group dropdown summary
    pub group_label: String,
    /// Group dropdown entries, sorted
    pub groups: Vec<GroupOption>,
    /// Column dropdown summary
    pub attribute_label: String,
    /// Column dropdown entries
    pub attributes: Vec<AttributeOption>,
    /// Weights panel (active weightable attributes only)
    pub weights: Vec<WeightGroup>,
    /// Pending weights differ from the applied ones
    pub weights_pending: bool,
    /// Offered cluster counts
    pub cluster_options: Vec<usize>,
    /// Current cluster count
    pub cluster_count: usize,
    /// Cluster selector shown (k = 0)
    pub show_cluster_selector: bool,
    /// Smoothness and bundling sliders shown (k > 0)
    pub show_smoothness_bundling: bool,
    /// Display parameters
    pub display: DisplayParams,
}

/// Any surface's slice
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view")]
pub enum ViewSlice {
    /// Heatmap slice
    Correlation(CorrelationView),
    /// Plot slice
    Plot(PlotPayload),
    /// Table slice
    Table(TableView),
    /// Controls slice
    Controls(ControlsView),
}

impl ViewSlice {
    /// Surface this slice belongs to
    pub fn kind(&self) -> ViewKind {
        match self {
            ViewSlice::Correlation(_) => ViewKind::Correlation,
            ViewSlice::Plot(_) => ViewKind::Plot,
            ViewSlice::Table(_) => ViewKind::Table,
            ViewSlice::Controls(_) => ViewKind::Controls,
        }
    }
}

/// Dropdown summary: "All Leagues", "No Leagues", the single name, or "N leagues selected"
pub fn summary_label(selected: &[String], total: usize, noun: &str, title: impl Fn(&str) -> String) -> String {
    match selected.len() {
        0 => format!("No {}s", noun),
        n if n == total => format!("All {}s", noun),
        1 => title(&selected[0]),
        n => format!("{} {}s selected", n, noun.to_lowercase()),
    }
}

/// Two-decimal cell text
pub fn format_value(value: f64) -> String {
    format!("{:.2}", value)
}
