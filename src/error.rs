//! Error type shared by every grid operation.

use thiserror::Error;

/// Errors raised by the grid engine.
///
/// Every failure is a client-correctable input problem, so there is a single
/// kind carrying a human readable explanation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Invalid GeoJSON: {0}")]
    InvalidGeoJson(String),
}

impl GridError {
    pub fn invalid(message: impl Into<String>) -> Self {
        GridError::InvalidGeoJson(message.into())
    }

    /// The explanation without the error-kind prefix.
    pub fn message(&self) -> &str {
        match self {
            GridError::InvalidGeoJson(message) => message,
        }
    }
}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        GridError::InvalidGeoJson(e.to_string())
    }
}

impl From<geojson::Error> for GridError {
    fn from(e: geojson::Error) -> Self {
        GridError::InvalidGeoJson(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GridError>;
