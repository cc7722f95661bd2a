//! Reverse geocoding and static map URLs.

use serde::Deserialize;

use super::error::GeocodeError;
use super::types::Coordinate;
use crate::constants::{GEOCODE_TIMEOUT, STATIC_MAP_SIZE, STATIC_MAP_ZOOM, USER_AGENT};

/// Default reverse geocoding host (OpenCage)
pub const DEFAULT_GEOCODER_URL: &str = "https://api.opencagedata.com";

/// Default static map renderer (OpenStreetMap mapgen)
pub const DEFAULT_STATIC_MAP_URL: &str = "https://staticmap.openstreetmap.org/cgi-bin/mapgen.cgi";

/// Converts a coordinate into a formatted address.
pub trait Geocoder: Send + Sync {
    fn reverse(&self, coordinate: Coordinate) -> Result<String, GeocodeError>;
}

/// Reverse geocoding response.
///
/// Only the fields we use are modelled. Example JSON:
/// ```json
/// {
///   "results": [
///     { "formatted": "1 Infinite Loop, Cupertino, CA 95014, United States of America" }
///   ],
///   "status": { "code": 200, "message": "OK" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub results: Vec<GeocodeResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResult {
    pub formatted: String,
}

impl GeocodeResponse {
    /// Formatted address of the first result, verbatim
    pub fn first_formatted(self) -> Result<String, GeocodeError> {
        self.results
            .into_iter()
            .next()
            .map(|result| result.formatted)
            .ok_or(GeocodeError::NoResults)
    }
}

/// OpenCage-compatible reverse geocoder.
pub struct OpenCageGeocoder {
    agent: ureq::Agent,
    base_url: String,
    api_key: String,
}

impl OpenCageGeocoder {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(GEOCODE_TIMEOUT)
            .user_agent(USER_AGENT)
            .build();

        Self {
            agent,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Reverse lookup request; the query values are form-encoded
    pub fn request(&self, coordinate: Coordinate) -> ureq::Request {
        let endpoint = format!("{}/geocode/v1/json", self.base_url.trim_end_matches('/'));
        self.agent
            .get(&endpoint)
            .query("q", &coordinate.joined(" "))
            .query("key", &self.api_key)
    }
}

impl Geocoder for OpenCageGeocoder {
    fn reverse(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
        // Errors are reported without the URL so the key stays out of the logs
        match self.request(coordinate).call() {
            Ok(resp) => resp
                .into_json::<GeocodeResponse>()
                .map_err(|e| GeocodeError::Parse(e.to_string()))?
                .first_formatted(),
            Err(ureq::Error::Status(code, _)) => {
                Err(GeocodeError::Request(format!("HTTP {}", code)))
            }
            Err(e) => Err(GeocodeError::Request(e.kind().to_string())),
        }
    }
}

/// Static map image URL template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticMapTemplate {
    base_url: String,
}

impl StaticMapTemplate {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Map centred on the coordinate with a marker on it
    pub fn url(&self, coordinate: Coordinate) -> String {
        let center = coordinate.joined(",");
        format!(
            "{}?center={}&zoom={}&size={}x{}&maptype=mapnik&markers={}",
            self.base_url, center, STATIC_MAP_ZOOM, STATIC_MAP_SIZE, STATIC_MAP_SIZE, center
        )
    }
}

impl Default for StaticMapTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_STATIC_MAP_URL)
    }
}
