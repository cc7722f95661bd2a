//! Centralized constants used across the application.
//!
//! Defaults that can be overridden live in the config module; the values here
//! are either fixed by external services or only tune the UI.

use std::time::Duration;

/// Default window width in pixels (phone-ish portrait proportions)
pub const DEFAULT_WINDOW_WIDTH: f32 = 480.0;

/// Default window height in pixels
pub const DEFAULT_WINDOW_HEIGHT: f32 = 820.0;

/// Upper bound on waiting for a position fix
pub const DEFAULT_POSITION_TIMEOUT_MS: u64 = 30_000;

/// Accept a cached fix up to this age
pub const DEFAULT_MAX_CACHED_AGE_MS: u64 = 10_000;

/// Timeout for a single reverse-geocoding request
pub const GEOCODE_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for fetching a static map image
pub const MAP_IMAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Largest map image body we are willing to download (bytes)
pub const MAX_MAP_IMAGE_BYTES: u64 = 4 * 1024 * 1024;

/// Maximum number of map image downloads to start per frame.
pub const MAX_MAP_FETCHES_PER_FRAME: usize = 2;

/// Zoom level requested from the static map service
pub const STATIC_MAP_ZOOM: u8 = 15;

/// Pixel size requested from the static map service (square)
pub const STATIC_MAP_SIZE: u32 = 400;

/// Display size of a map image inside the message list
pub const MAP_DISPLAY_SIZE: f32 = 240.0;

/// Timeout for the TCP connectivity probe
pub const CONNECTIVITY_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// User agent sent with every outbound HTTP request
pub const USER_AGENT: &str = concat!("geochat/", env!("CARGO_PKG_VERSION"));
