//! Core data model definitions shared across Sentinel crates.
#![allow(missing_docs)]

pub mod error;
pub mod event;
pub mod ids;
pub mod severity;

pub use error::{ModelError, Result as ModelResult};
pub use event::{Coordinates, HazardEvent, format_timestamp};
pub use ids::{HazardId, SLUG_MAX_LEN};
pub use severity::{
    SEVERITY_HIGH, SEVERITY_LOW, SEVERITY_MEDIUM, SEVERITY_UNKNOWN,
    severity_by_magnitude,
};
