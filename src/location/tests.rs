//! Unit tests for the location pipeline, using fake capabilities.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use bevy::app::{App, TaskPoolOptions, TaskPoolPlugin, Update};
use bevy::ecs::schedule::IntoScheduleConfigs;

use super::announcer::{address_entries, coordinate_entry, LocationAnnouncer};
use super::error::{GeocodeError, LocationError, LocationResult};
use super::geocode::{Geocoder, StaticMapTemplate};
use super::permission::{
    FixedPermission, ImplicitPermission, LocationCapability, PermissionGate, PermissionStatus,
    PromptPermission,
};
use super::position::{PositionOptions, PositionSource};
use super::systems::{
    build_announcer, poll_describe_tasks, poll_locate_tasks, record_described, record_located,
    LocateTask, PermissionPrompts,
};
use super::types::{AddressResult, Coordinate};
use crate::chat::{MessageEntry, MessageLog, NoticeQueue};
use crate::config::AppConfigData;
use crate::location::{PermissionMode, PositionProvider};

// Fakes

struct RecordingGate {
    status: PermissionStatus,
    requests: Mutex<Vec<LocationCapability>>,
}

impl RecordingGate {
    fn new(status: PermissionStatus) -> Arc<Self> {
        Arc::new(Self {
            status,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<LocationCapability> {
        self.requests.lock().unwrap().clone()
    }
}

impl PermissionGate for RecordingGate {
    fn request(&self, capability: LocationCapability) -> PermissionStatus {
        self.requests.lock().unwrap().push(capability);
        self.status
    }
}

struct FakeSource {
    result: LocationResult<Coordinate>,
    delay: Duration,
    calls: AtomicUsize,
}

impl FakeSource {
    fn fix(latitude: f64, longitude: f64) -> Arc<Self> {
        Self::answering(Ok(Coordinate::new(latitude, longitude)))
    }

    fn answering(result: LocationResult<Coordinate>) -> Arc<Self> {
        Arc::new(Self {
            result,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(Coordinate::new(1.0, 2.0)),
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PositionSource for FakeSource {
    fn current_position(&self, _options: &PositionOptions) -> LocationResult<Coordinate> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        self.result.clone()
    }
}

struct FakeGeocoder {
    result: Result<String, GeocodeError>,
    seen: Mutex<Vec<Coordinate>>,
}

impl FakeGeocoder {
    fn answering(result: Result<String, GeocodeError>) -> Arc<Self> {
        Arc::new(Self {
            result,
            seen: Mutex::new(Vec::new()),
        })
    }
}

impl Geocoder for FakeGeocoder {
    fn reverse(&self, coordinate: Coordinate) -> Result<String, GeocodeError> {
        self.seen.lock().unwrap().push(coordinate);
        self.result.clone()
    }
}

struct SlowGeocoder(Duration);

impl Geocoder for SlowGeocoder {
    fn reverse(&self, _coordinate: Coordinate) -> Result<String, GeocodeError> {
        thread::sleep(self.0);
        Ok("Slow Street".to_string())
    }
}

fn pipeline(gate: Arc<dyn PermissionGate>, source: Arc<dyn PositionSource>) -> LocationAnnouncer {
    LocationAnnouncer::new(gate, source, PositionOptions::default())
}

/// Run the two recorded stages the way the Bevy systems do
fn run_chain(announcer: &LocationAnnouncer, log: &mut MessageLog, notices: &mut NoticeQueue) {
    if let Some(coordinate) = record_located(announcer.locate(), log, notices) {
        record_described(announcer.describe(coordinate), log, notices);
    }
}

// Permission step

#[test]
fn test_denied_permission_skips_fetch_and_appends_nothing() {
    let gate = RecordingGate::new(PermissionStatus::Denied);
    let source = FakeSource::fix(37.0, -122.0);
    let announcer = pipeline(gate.clone(), source.clone());

    let mut log = MessageLog::default();
    let mut notices = NoticeQueue::default();
    run_chain(&announcer, &mut log, &mut notices);

    assert_eq!(source.calls(), 0);
    assert!(log.is_empty());
    assert_eq!(notices.len(), 1);
    assert_eq!(
        notices.current().map(|n| n.title.as_str()),
        Some("Permission Denied")
    );
    assert_eq!(gate.requests().len(), 1);
}

#[test]
fn test_high_accuracy_requests_fine_capability() {
    let gate = RecordingGate::new(PermissionStatus::Granted);
    let announcer = pipeline(gate.clone(), FakeSource::fix(0.5, 0.5));
    announcer.locate().unwrap();
    assert_eq!(gate.requests(), vec![LocationCapability::Fine]);
}

#[test]
fn test_low_accuracy_requests_coarse_capability() {
    let gate = RecordingGate::new(PermissionStatus::Granted);
    let options = PositionOptions {
        high_accuracy: false,
        ..Default::default()
    };
    let announcer = LocationAnnouncer::new(gate.clone(), FakeSource::fix(0.5, 0.5), options);
    announcer.locate().unwrap();
    assert_eq!(gate.requests(), vec![LocationCapability::Coarse]);
}

// Fetch step

#[test]
fn test_fetch_failures_halt_with_matching_notice() {
    let cases = [
        (LocationError::PermissionDenied, "Permission Denied"),
        (
            LocationError::PositionUnavailable("gps off".to_string()),
            "Position unavailable",
        ),
        (LocationError::Timeout, "Timeout"),
    ];

    for (error, title) in cases {
        let geocoder = FakeGeocoder::answering(Ok("unused".to_string()));
        let announcer = pipeline(
            Arc::new(ImplicitPermission),
            FakeSource::answering(Err(error.clone())),
        )
        .with_geocoder(geocoder.clone());

        let mut log = MessageLog::default();
        let mut notices = NoticeQueue::default();
        run_chain(&announcer, &mut log, &mut notices);

        assert!(log.is_empty(), "{:?} must not append", error);
        assert_eq!(notices.current().map(|n| n.title.as_str()), Some(title));
        assert!(geocoder.seen.lock().unwrap().is_empty());
    }
}

#[test]
fn test_slow_source_times_out() {
    let source = FakeSource::slow(Duration::from_millis(500));
    let options = PositionOptions {
        timeout: Duration::from_millis(20),
        ..Default::default()
    };
    let announcer = LocationAnnouncer::new(Arc::new(ImplicitPermission), source, options);

    assert_eq!(announcer.locate(), Err(LocationError::Timeout));
}

#[test]
fn test_fast_source_beats_deadline() {
    let source = FakeSource::slow(Duration::from_millis(5));
    let options = PositionOptions {
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    let announcer = LocationAnnouncer::new(Arc::new(ImplicitPermission), source, options);

    assert_eq!(announcer.locate(), Ok(Coordinate::new(1.0, 2.0)));
}

// Geocode step and emission

#[test]
fn test_successful_lookup_scenario() {
    let geocoder = FakeGeocoder::answering(Ok("1 Infinite Loop".to_string()));
    let announcer = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(37.0, -122.0))
        .with_geocoder(geocoder.clone())
        .with_static_map(StaticMapTemplate::default());

    let mut log = MessageLog::default();
    let mut notices = NoticeQueue::default();
    run_chain(&announcer, &mut log, &mut notices);

    let entries = log.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(
        entries[0],
        MessageEntry::text("Location: Latitude: 37.0, Longitude: -122.0")
    );
    assert_eq!(entries[1], MessageEntry::text("Address: 1 Infinite Loop"));
    let url = entries[2].map_url().expect("third entry is a map");
    assert!(url.contains("37.0,-122.0"));

    assert_eq!(
        *geocoder.seen.lock().unwrap(),
        vec![Coordinate::new(37.0, -122.0)]
    );

    assert_eq!(notices.dismiss().map(|n| n.title), Some("Location".to_string()));
    let address = notices.dismiss().unwrap();
    assert_eq!(address.title, "Address");
    assert_eq!(address.body, "1 Infinite Loop");
    assert!(notices.is_empty());
}

#[test]
fn test_failed_lookup_only_records_coordinate() {
    let failures = [
        GeocodeError::NoResults,
        GeocodeError::Request("connection refused".to_string()),
        GeocodeError::Parse("expected value".to_string()),
    ];

    for failure in failures {
        let announcer = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(37.0, -122.0))
            .with_geocoder(FakeGeocoder::answering(Err(failure)))
            .with_static_map(StaticMapTemplate::default());

        let mut log = MessageLog::default();
        let mut notices = NoticeQueue::default();
        run_chain(&announcer, &mut log, &mut notices);

        assert_eq!(
            log.entries(),
            &[MessageEntry::text("Location: Latitude: 37.0, Longitude: -122.0")]
        );
        assert_eq!(notices.len(), 1);
        assert_eq!(notices.current().map(|n| n.title.as_str()), Some("Location"));
    }
}

#[test]
fn test_no_geocoder_only_records_coordinate() {
    let announcer = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(1.5, 2.5));
    let announcement = announcer.announce().unwrap();

    assert!(announcement.address.is_none());
    assert_eq!(
        announcement.entries(),
        vec![MessageEntry::text("Location: Latitude: 1.5, Longitude: 2.5")]
    );
    assert_eq!(announcement.notices().len(), 1);
}

#[test]
fn test_address_without_map_template_has_no_map_entry() {
    let announcer = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(1.0, 1.0))
        .with_geocoder(FakeGeocoder::answering(Ok("Null Island".to_string())));

    let announcement = announcer.announce().unwrap();
    let entries = announcement.entries();

    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.map_url().is_none()));
}

#[test]
fn test_map_entry_never_without_address() {
    let address = AddressResult {
        formatted_address: "Somewhere".to_string(),
        map_image_url: Some("https://maps.example/x.png".to_string()),
    };
    let entries = address_entries(&address);
    assert_eq!(entries[0], MessageEntry::text("Address: Somewhere"));
    assert_eq!(entries[1], MessageEntry::map("https://maps.example/x.png"));

    let coordinate_only = coordinate_entry(Coordinate::new(3.0, 4.0));
    assert!(coordinate_only.map_url().is_none());
}

#[test]
fn test_announce_runs_full_sequence_every_time() {
    let source = FakeSource::fix(10.0, 20.0);
    let geocoder = FakeGeocoder::answering(Ok("Here".to_string()));
    let announcer = pipeline(Arc::new(ImplicitPermission), source.clone())
        .with_geocoder(geocoder.clone());

    announcer.announce().unwrap();
    announcer.announce().unwrap();

    assert_eq!(source.calls(), 2);
    assert_eq!(geocoder.seen.lock().unwrap().len(), 2);
}

// Concurrency

#[test]
fn test_independent_chains_both_append() {
    let fast = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(1.0, 1.0));
    let slow = pipeline(
        Arc::new(ImplicitPermission),
        FakeSource::slow(Duration::from_millis(30)),
    )
    .with_geocoder(FakeGeocoder::answering(Ok("Slow Street".to_string())));

    let slow_worker = thread::spawn(move || slow.announce());
    let fast_worker = thread::spawn(move || fast.announce());

    let mut log = MessageLog::default();
    let mut lengths = vec![log.len()];

    // Completions can arrive in either order; the log only grows
    for worker in [fast_worker, slow_worker] {
        let announcement = worker.join().unwrap().unwrap();
        log.extend(announcement.entries());
        lengths.push(log.len());
    }

    assert_eq!(log.len(), 3);
    assert!(lengths.windows(2).all(|w| w[0] < w[1]));
}

/// App running only the polling systems, with a single-threaded task pool
fn polling_app() -> App {
    let mut app = App::new();
    app.add_plugins(TaskPoolPlugin {
        task_pool_options: TaskPoolOptions::with_num_threads(1),
    })
    .init_resource::<MessageLog>()
    .init_resource::<NoticeQueue>()
    .add_systems(Update, (poll_locate_tasks, poll_describe_tasks).chain());
    app
}

fn update_until(app: &mut App, done: impl Fn(&App) -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done(app) && Instant::now() < deadline {
        app.update();
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn test_pending_prompt_does_not_hold_back_other_chains() {
    let (gate, prompts) = PromptPermission::channel();
    let waiting = pipeline(Arc::new(gate), FakeSource::fix(1.0, 1.0));
    let ready = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(37.0, -122.0));

    let mut app = polling_app();
    app.world_mut().spawn(LocateTask::start(waiting).unwrap());
    app.world_mut().spawn(LocateTask::start(ready).unwrap());

    update_until(&mut app, |app| !app.world().resource::<MessageLog>().is_empty());

    // The first chain is still parked on its consent prompt
    let prompt = prompts
        .recv_timeout(Duration::from_secs(1))
        .expect("first chain raised a prompt");
    assert_eq!(
        app.world().resource::<MessageLog>().entries(),
        &[coordinate_entry(Coordinate::new(37.0, -122.0))]
    );

    prompt.answer(PermissionStatus::Granted);
    update_until(&mut app, |app| app.world().resource::<MessageLog>().len() == 2);

    assert_eq!(
        app.world().resource::<MessageLog>().entries(),
        &[
            coordinate_entry(Coordinate::new(37.0, -122.0)),
            coordinate_entry(Coordinate::new(1.0, 1.0)),
        ]
    );
}

#[test]
fn test_slow_describe_does_not_hold_back_other_chains() {
    let slow = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(1.0, 1.0))
        .with_geocoder(Arc::new(SlowGeocoder(Duration::from_millis(500))));
    let fast = pipeline(Arc::new(ImplicitPermission), FakeSource::fix(2.0, 2.0));

    let mut app = polling_app();
    app.world_mut().spawn(LocateTask::start(slow).unwrap());
    update_until(&mut app, |app| app.world().resource::<MessageLog>().len() == 1);

    let started = Instant::now();
    app.world_mut().spawn(LocateTask::start(fast).unwrap());
    update_until(&mut app, |app| app.world().resource::<MessageLog>().len() == 2);

    assert!(started.elapsed() < Duration::from_millis(400));
    assert_eq!(
        app.world().resource::<MessageLog>().entries()[1],
        coordinate_entry(Coordinate::new(2.0, 2.0))
    );
}

#[test]
fn test_permission_prompts_queue_until_answered() {
    let mut prompts = PermissionPrompts::default();
    assert!(!prompts.is_waiting());

    let gate = prompts.gate();
    let requester = thread::spawn(move || gate.request(LocationCapability::Fine));

    let deadline = Instant::now() + Duration::from_secs(5);
    while !prompts.is_waiting() && Instant::now() < deadline {
        prompts.collect();
        thread::sleep(Duration::from_millis(5));
    }

    assert!(prompts.is_waiting());
    assert_eq!(
        prompts.current().map(|p| p.capability),
        Some(LocationCapability::Fine)
    );

    prompts.answer_current(PermissionStatus::Denied);
    assert!(!prompts.is_waiting());
    assert_eq!(requester.join().unwrap(), PermissionStatus::Denied);
}

#[test]
fn test_prompt_gate_drives_pipeline() {
    let (gate, prompts) = PromptPermission::channel();
    let announcer = pipeline(Arc::new(gate), FakeSource::fix(5.0, 6.0));

    let ui = thread::spawn(move || {
        prompts.recv().unwrap().answer(PermissionStatus::Granted);
        prompts.recv().unwrap().answer(PermissionStatus::Denied);
    });

    assert_eq!(announcer.locate(), Ok(Coordinate::new(5.0, 6.0)));
    assert_eq!(announcer.locate(), Err(LocationError::PermissionDenied));
    ui.join().unwrap();
}

// Building from configuration

#[test]
fn test_build_announcer_from_denied_config() {
    let mut data = AppConfigData::default();
    data.location.permission = PermissionMode::Denied;
    data.location.provider = PositionProvider::Fixed;
    data.location.fixed_position = Some(Coordinate::new(1.0, 2.0));

    let (gate, _prompts) = PromptPermission::channel();
    let announcer = build_announcer(&data, gate);

    assert_eq!(announcer.locate(), Err(LocationError::PermissionDenied));
}

#[test]
fn test_build_announcer_from_fixed_config() {
    let mut data = AppConfigData::default();
    data.location.permission = PermissionMode::Granted;
    data.location.provider = PositionProvider::Fixed;
    data.location.fixed_position = Some(Coordinate::new(37.0, -122.0));

    let (gate, _prompts) = PromptPermission::channel();
    let announcement = build_announcer(&data, gate).announce().unwrap();

    // No API key configured, so no address lookup
    assert_eq!(announcement.coordinate, Coordinate::new(37.0, -122.0));
    assert!(announcement.address.is_none());
}

#[test]
fn test_fixed_permission_denies() {
    let gate = FixedPermission(PermissionStatus::Denied);
    let announcer = pipeline(Arc::new(gate), FakeSource::fix(0.5, 0.5));
    assert_eq!(announcer.announce(), Err(LocationError::PermissionDenied));
}
