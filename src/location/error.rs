use thiserror::Error;

use crate::chat::Notice;

/// Terminal failures of a location request. Each one halts the pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("timed out waiting for a position fix")]
    Timeout,
}

impl LocationError {
    /// Notice shown to the user for this failure
    pub fn notice(&self) -> Notice {
        match self {
            LocationError::PermissionDenied => {
                Notice::new("Permission Denied", "Location permission is required.")
            }
            LocationError::PositionUnavailable(_) => Notice::new(
                "Position unavailable",
                "Unable to obtain a position fix. Please ensure location services are enabled.",
            ),
            LocationError::Timeout => {
                Notice::new("Timeout", "Timed out waiting for a position fix.")
            }
        }
    }
}

pub type LocationResult<T> = Result<T, LocationError>;

/// Failures of the best-effort reverse geocoding step. Never surfaced to the user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    #[error("geocoder returned no results")]
    NoResults,

    #[error("geocode request failed: {0}")]
    Request(String),

    #[error("failed to parse geocode response: {0}")]
    Parse(String),
}
