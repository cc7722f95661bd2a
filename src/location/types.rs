//! Value types produced by the location pipeline.

use serde::{Deserialize, Serialize};

/// A single position fix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Human readable form, e.g. `Latitude: 37.0, Longitude: -122.0`
    pub fn describe(&self) -> String {
        format!(
            "Latitude: {}, Longitude: {}",
            format_degrees(self.latitude),
            format_degrees(self.longitude)
        )
    }

    /// `lat{sep}lon` with both values formatted as degrees.
    pub fn joined(&self, sep: &str) -> String {
        format!(
            "{}{}{}",
            format_degrees(self.latitude),
            sep,
            format_degrees(self.longitude)
        )
    }
}

/// Address resolved for a coordinate, plus an optional static map image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressResult {
    pub formatted_address: String,
    pub map_image_url: Option<String>,
}

/// Format degrees keeping at least one fractional digit and never using
/// exponent notation.
pub fn format_degrees(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}
