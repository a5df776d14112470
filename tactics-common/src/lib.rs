//! # Tactics Common Library
//!
//! Shared code for the tactics dashboard crates including:
//! - Error and result types
//! - Configuration loading (TOML + environment + platform defaults)
//! - Change event types (DashboardEvent enum) and the EventBus
//! - Timestamp helpers

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
