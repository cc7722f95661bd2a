//! Position sources: where a coordinate fix comes from.

use bevy::log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::error::{LocationError, LocationResult};
use super::types::Coordinate;
use crate::constants::{DEFAULT_MAX_CACHED_AGE_MS, DEFAULT_POSITION_TIMEOUT_MS, USER_AGENT};

/// Extra time given to HTTP lookups past the fetch deadline.
/// The announcer's deadline fires first; this only bounds the worker thread.
const IP_LOOKUP_GRACE: Duration = Duration::from_secs(2);

/// Options for a single position read
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    /// Prefer an accurate fix over a fast one
    pub high_accuracy: bool,
    /// Upper bound on waiting for the fix
    pub timeout: Duration,
    /// Accept a previous fix younger than this
    pub max_cached_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(DEFAULT_POSITION_TIMEOUT_MS),
            max_cached_age: Duration::from_millis(DEFAULT_MAX_CACHED_AGE_MS),
        }
    }
}

/// Where fixes come from, as configured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionProvider {
    /// Approximate position from a geo-IP lookup
    #[default]
    Ip,
    /// A position entered in the settings
    Fixed,
}

impl PositionProvider {
    pub fn all() -> &'static [PositionProvider] {
        &[PositionProvider::Ip, PositionProvider::Fixed]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PositionProvider::Ip => "Network (IP lookup)",
            PositionProvider::Fixed => "Fixed position",
        }
    }
}

/// Device location service.
pub trait PositionSource: Send + Sync {
    /// Read the current position. May block.
    fn current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate>;
}

/// Source that always reports a configured fix.
pub struct FixedPositionSource {
    fix: Option<Coordinate>,
}

impl FixedPositionSource {
    pub fn new(fix: Option<Coordinate>) -> Self {
        Self { fix }
    }
}

impl PositionSource for FixedPositionSource {
    fn current_position(&self, _options: &PositionOptions) -> LocationResult<Coordinate> {
        self.fix.ok_or_else(|| {
            LocationError::PositionUnavailable("no fixed position configured".to_string())
        })
    }
}

/// Response of the geo-IP lookup service.
///
/// Example JSON:
/// ```json
/// { "ip": "203.0.113.7", "city": "Cupertino", "latitude": 37.3318, "longitude": -122.0312 }
/// ```
/// On failure the service answers `{ "error": true, "reason": "RateLimited" }`.
#[derive(Debug, Deserialize)]
pub struct IpLookupResponse {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub error: bool,
    pub reason: Option<String>,
}

impl IpLookupResponse {
    pub fn into_coordinate(self) -> LocationResult<Coordinate> {
        if self.error {
            let reason = self.reason.unwrap_or_else(|| "lookup refused".to_string());
            return Err(LocationError::PositionUnavailable(reason));
        }

        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Ok(Coordinate::new(latitude, longitude)),
            _ => Err(LocationError::PositionUnavailable(
                "lookup returned no coordinates".to_string(),
            )),
        }
    }
}

/// Approximate position from the public IP address.
pub struct IpPositionSource {
    base_url: String,
}

impl IpPositionSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn lookup_url(&self) -> String {
        format!("{}/json/", self.base_url.trim_end_matches('/'))
    }
}

impl PositionSource for IpPositionSource {
    fn current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate> {
        if options.high_accuracy {
            debug!("IP lookup cannot honour high accuracy, returning approximate fix");
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(options.timeout + IP_LOOKUP_GRACE)
            .user_agent(USER_AGENT)
            .build();

        match agent.get(&self.lookup_url()).call() {
            Ok(resp) => match resp.into_json::<IpLookupResponse>() {
                Ok(lookup) => lookup.into_coordinate(),
                Err(e) => Err(LocationError::PositionUnavailable(format!(
                    "failed to parse lookup response: {}",
                    e
                ))),
            },
            Err(ureq::Error::Status(code, _)) => Err(LocationError::PositionUnavailable(
                format!("lookup service answered HTTP {}", code),
            )),
            Err(e) => Err(LocationError::PositionUnavailable(format!(
                "lookup failed: {}",
                e
            ))),
        }
    }
}

/// Wraps a source and reuses its last fix while it is fresh enough.
pub struct CachedPositionSource<S> {
    inner: S,
    last_fix: Mutex<Option<(Instant, Coordinate)>>,
}

impl<S: PositionSource> CachedPositionSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, max_age: Duration) -> Option<Coordinate> {
        let last_fix = self.last_fix.lock().unwrap_or_else(|e| e.into_inner());
        match *last_fix {
            Some((at, coordinate)) if at.elapsed() < max_age => Some(coordinate),
            _ => None,
        }
    }
}

impl<S: PositionSource> PositionSource for CachedPositionSource<S> {
    fn current_position(&self, options: &PositionOptions) -> LocationResult<Coordinate> {
        if let Some(coordinate) = self.cached(options.max_cached_age) {
            debug!("Using cached position fix");
            return Ok(coordinate);
        }

        let coordinate = self.inner.current_position(options)?;
        *self.last_fix.lock().unwrap_or_else(|e| e.into_inner()) =
            Some((Instant::now(), coordinate));
        Ok(coordinate)
    }
}
