#![allow(dead_code)]

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod config;

pub use config::{
    BookingConfig, ConfigError, QueryPreset, ScheduleConfig, StationCode, TimeWindow,
    DEFAULT_LEAD_SECONDS, DEFAULT_QUERY_INTERVAL_MS, MIN_LEAD_SECONDS, MIN_QUERY_INTERVAL_MS,
};

/// Error raised by a page surface when an element is missing or a reference went stale.
///
/// These are transient by nature: the engine absorbs them at tick/phase level.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("element missing: {0}")]
    Missing(String),
    #[error("stale reference: {0}")]
    Stale(String),
    #[error("{message}")]
    Message { message: String },
}

impl SurfaceError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    pub fn missing(what: impl Into<String>) -> Self {
        Self::Missing(what.into())
    }
}

/// Identifier of one booking run, from activation to its terminal state.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to the action bound to a result row (its "book" button).
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct ActionRef(pub String);

impl ActionRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ActionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn surface_error_messages() {
        assert_eq!(
            SurfaceError::missing("#query_ticket").to_string(),
            "element missing: #query_ticket"
        );
        assert_eq!(SurfaceError::new("boom").to_string(), "boom");
    }
}
