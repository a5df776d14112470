//! View-related type definitions
//!
//! Supporting types naming the rendering surfaces and the reasons a surface
//! falls back to its empty state.

use serde::{Deserialize, Serialize};

/// Rendering surface identifiers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "PascalCase")]
pub enum ViewKind {
    /// Correlation matrix (heatmap)
    Correlation,
    /// Multi-axis line plot
    Plot,
    /// Paginated row table
    Table,
    /// Widget panel (filter labels, weight sliders, cluster/display controls)
    Controls,
}

impl ViewKind {
    /// Every surface, in refresh order
    pub const ALL: [ViewKind; 4] = [
        ViewKind::Correlation,
        ViewKind::Plot,
        ViewKind::Table,
        ViewKind::Controls,
    ];
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewKind::Correlation => write!(f, "Correlation"),
            ViewKind::Plot => write!(f, "Plot"),
            ViewKind::Table => write!(f, "Table"),
            ViewKind::Controls => write!(f, "Controls"),
        }
    }
}

/// Why a surface renders its empty state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// The active group filter is empty
    NoGroups,
    /// The active attribute list is empty
    NoAttributes,
}

impl std::fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmptyReason::NoGroups => write!(f, "no groups selected"),
            EmptyReason::NoAttributes => write!(f, "no attributes selected"),
        }
    }
}
