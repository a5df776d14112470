//! # Tactics Engine
//!
//! Coordinated analytics and view-synchronization core for the tactical
//! profile dashboard. Holds the canonical derived state (normalized records,
//! weighted scores, attribute correlations, cluster labels, filters and
//! highlights) and keeps the correlation matrix, the multi-axis plot and the
//! row table consistent as the selection changes.
//!
//! Control flow:
//! view event -> [`sync::SyncLayer`] -> [`manager::StateManager`] operation
//! -> recomputation cascade -> change events -> views pull their slices.

pub mod clustering;
pub mod correlation;
pub mod error;
pub mod identity;
pub mod manager;
pub mod normalizer;
pub mod palette;
pub mod record;
pub mod registry;
pub mod scoring;
pub mod selection;
pub mod sync;
pub mod table;
pub mod views;

pub use error::{Error, Result};
pub use identity::EntityKey;
pub use manager::{RecomputePlan, StateManager};
pub use record::EntityRecord;
pub use registry::AttributeRegistry;
pub use sync::SyncLayer;
