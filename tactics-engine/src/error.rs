//! Error types for the analytics engine
//!
//! None of these are fatal. Each variant has a defined recovery:
//! - `MalformedRecord`: the field is nulled, the batch continues
//! - `EmptySelection`: the surface renders its empty state
//! - `DegenerateCorrelation`: the pair is valued 0
//! - `StaleClusterResult`: the response is discarded, state untouched

use tactics_common::events::EmptyReason;
use thiserror::Error;

/// Engine error taxonomy
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// A raw field could not be parsed as a known category or a number
    #[error("Malformed field '{field}' on '{entity}': {raw:?}")]
    MalformedRecord {
        /// Entity label (or row index when the identity itself is malformed)
        entity: String,
        /// Field name
        field: String,
        /// Raw value as text
        raw: String,
    },

    /// Active group filter or attribute list is empty
    #[error("Empty selection: {0}")]
    EmptySelection(EmptyReason),

    /// Zero variance (or no complete pairs) for an attribute pair
    #[error("Degenerate correlation between '{first}' and '{second}'")]
    DegenerateCorrelation {
        /// First attribute id
        first: String,
        /// Second attribute id
        second: String,
    },

    /// A clustering response arrived after a newer request was issued
    #[error("Stale cluster result: request {seq} superseded by {latest}")]
    StaleClusterResult {
        /// Sequence number carried by the response
        seq: u64,
        /// Latest issued sequence number (0 when nothing is outstanding)
        latest: u64,
    },

    /// Attribute id not present in the registry or the dataset
    #[error("Unknown attribute: {0}")]
    UnknownAttribute(String),

    /// Group label not present in the dataset
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    /// Registry definition rejected (duplicate id, non-bijective scale, ...)
    #[error("Invalid registry: {0}")]
    InvalidRegistry(String),

    /// Invalid operation argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience Result type using the engine Error
pub type Result<T> = std::result::Result<T, Error>;
