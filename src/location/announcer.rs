//! The location announcement pipeline.
//!
//! permission check -> position fetch -> reverse geocode -> message entries.
//! The first two steps are terminal on failure, the geocode step is
//! best-effort and never prevents the coordinate from being announced.

use bevy::log::{debug, info, warn};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;

use super::error::{LocationError, LocationResult};
use super::geocode::{Geocoder, StaticMapTemplate};
use super::permission::{LocationCapability, PermissionGate, PermissionStatus};
use super::position::{PositionOptions, PositionSource};
use super::types::{AddressResult, Coordinate};
use crate::chat::{MessageEntry, Notice};

/// Runs location requests against injected platform capabilities.
///
/// Holds no per-request state; every call performs the full sequence.
#[derive(Clone)]
pub struct LocationAnnouncer {
    permission: Arc<dyn PermissionGate>,
    position: Arc<dyn PositionSource>,
    geocoder: Option<Arc<dyn Geocoder>>,
    static_map: Option<StaticMapTemplate>,
    options: PositionOptions,
}

impl LocationAnnouncer {
    pub fn new(
        permission: Arc<dyn PermissionGate>,
        position: Arc<dyn PositionSource>,
        options: PositionOptions,
    ) -> Self {
        Self {
            permission,
            position,
            geocoder: None,
            static_map: None,
            options,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_static_map(mut self, template: StaticMapTemplate) -> Self {
        self.static_map = Some(template);
        self
    }

    fn capability(&self) -> LocationCapability {
        if self.options.high_accuracy {
            LocationCapability::Fine
        } else {
            LocationCapability::Coarse
        }
    }

    /// Permission check followed by a bounded position fetch
    pub fn locate(&self) -> LocationResult<Coordinate> {
        let capability = self.capability();
        debug!("Requesting {} permission", capability.display_name());

        if self.permission.request(capability) == PermissionStatus::Denied {
            info!("Location permission denied");
            return Err(LocationError::PermissionDenied);
        }

        let result = fetch_with_deadline(Arc::clone(&self.position), self.options);
        match &result {
            Ok(coordinate) => debug!("Position fix: {}", coordinate.describe()),
            Err(e) => info!("Position fetch failed: {}", e),
        }
        result
    }

    /// Best-effort reverse geocode. Failures are logged and swallowed.
    pub fn describe(&self, coordinate: Coordinate) -> Option<AddressResult> {
        let Some(geocoder) = &self.geocoder else {
            debug!("No geocoder configured, skipping address lookup");
            return None;
        };

        match geocoder.reverse(coordinate) {
            Ok(formatted_address) => {
                debug!("Resolved address: {}", formatted_address);
                Some(AddressResult {
                    formatted_address,
                    map_image_url: self.static_map.as_ref().map(|t| t.url(coordinate)),
                })
            }
            Err(e) => {
                warn!("Address lookup skipped: {}", e);
                None
            }
        }
    }

    /// Full pipeline in one call
    #[allow(dead_code)]
    pub fn announce(&self) -> LocationResult<Announcement> {
        let coordinate = self.locate()?;
        let address = self.describe(coordinate);
        Ok(Announcement {
            coordinate,
            address,
        })
    }
}

/// Run the source on a worker thread and wait at most `options.timeout`.
///
/// An expired read is not cancelled; its late answer is discarded.
fn fetch_with_deadline(
    source: Arc<dyn PositionSource>,
    options: PositionOptions,
) -> LocationResult<Coordinate> {
    let (tx, rx) = mpsc::channel();

    let spawned = std::thread::Builder::new()
        .name("position-fetch".to_string())
        .spawn(move || {
            let _ = tx.send(source.current_position(&options));
        });

    if let Err(e) = spawned {
        return Err(LocationError::PositionUnavailable(format!(
            "failed to start position fetch: {}",
            e
        )));
    }

    match rx.recv_timeout(options.timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(LocationError::Timeout),
        Err(RecvTimeoutError::Disconnected) => Err(LocationError::PositionUnavailable(
            "position source stopped without answering".to_string(),
        )),
    }
}

/// Outcome of a successful pipeline run
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq)]
pub struct Announcement {
    pub coordinate: Coordinate,
    pub address: Option<AddressResult>,
}

#[allow(dead_code)]
impl Announcement {
    /// Entries to append, in order
    pub fn entries(&self) -> Vec<MessageEntry> {
        let mut entries = vec![coordinate_entry(self.coordinate)];
        if let Some(address) = &self.address {
            entries.extend(address_entries(address));
        }
        entries
    }

    pub fn notices(&self) -> Vec<Notice> {
        let mut notices = vec![coordinate_notice(self.coordinate)];
        if let Some(address) = &self.address {
            notices.push(address_notice(address));
        }
        notices
    }
}

pub fn coordinate_entry(coordinate: Coordinate) -> MessageEntry {
    MessageEntry::text(format!("Location: {}", coordinate.describe()))
}

/// Address text followed by the map reference, if any
pub fn address_entries(address: &AddressResult) -> Vec<MessageEntry> {
    let mut entries = vec![MessageEntry::text(format!(
        "Address: {}",
        address.formatted_address
    ))];
    if let Some(url) = &address.map_image_url {
        entries.push(MessageEntry::map(url.clone()));
    }
    entries
}

pub fn coordinate_notice(coordinate: Coordinate) -> Notice {
    Notice::new("Location", coordinate.describe())
}

pub fn address_notice(address: &AddressResult) -> Notice {
    Notice::new("Address", address.formatted_address.clone())
}
