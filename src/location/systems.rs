//! Bevy systems that drive location requests from the chat screen.
//!
//! A request runs as two background jobs: locate (permission + fix), then
//! describe (reverse geocode). Each press starts an independent chain.
//!
//! Both steps block (on the consent prompt, the position deadline or the
//! geocoder), so each job gets its own thread instead of a task pool slot.
//! Systems only check whether a job has finished.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use std::collections::VecDeque;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use super::announcer::{
    address_entries, address_notice, coordinate_entry, coordinate_notice, LocationAnnouncer,
};
use super::error::{LocationError, LocationResult};
use super::geocode::{OpenCageGeocoder, StaticMapTemplate};
use super::permission::{
    FixedPermission, ImplicitPermission, PermissionGate, PermissionMode, PermissionPrompt,
    PermissionStatus, PromptPermission,
};
use super::position::{
    CachedPositionSource, FixedPositionSource, IpPositionSource, PositionProvider, PositionSource,
};
use super::types::{AddressResult, Coordinate};
use crate::chat::{MessageLog, NoticeQueue};
use crate::config::{AppConfig, AppConfigData, SettingsChanged};

/// Message sent by the Location button
#[derive(Message)]
pub struct LocationRequest;

/// The announcer built from the current settings
#[derive(Resource, Default)]
pub struct ActiveAnnouncer(pub Option<LocationAnnouncer>);

/// Blocking work on a dedicated thread
pub struct Job<T>(Option<JoinHandle<T>>);

impl<T: Send + 'static> Job<T> {
    fn spawn(name: &str, work: impl FnOnce() -> T + Send + 'static) -> std::io::Result<Self> {
        thread::Builder::new()
            .name(name.to_string())
            .spawn(work)
            .map(|handle| Self(Some(handle)))
    }

    /// The outcome once the thread has finished, without waiting for it
    fn poll(&mut self) -> Option<thread::Result<T>> {
        if !self.0.as_ref().is_some_and(JoinHandle::is_finished) {
            return None;
        }
        self.0.take().map(JoinHandle::join)
    }
}

/// Background job: permission check and position fetch
#[derive(Component)]
pub struct LocateTask {
    job: Job<LocationResult<Coordinate>>,
    announcer: LocationAnnouncer,
}

impl LocateTask {
    pub fn start(announcer: LocationAnnouncer) -> std::io::Result<Self> {
        let worker = announcer.clone();
        let job = Job::spawn("locate", move || worker.locate())?;
        Ok(Self { job, announcer })
    }
}

/// Background job: best-effort reverse geocode
#[derive(Component)]
pub struct DescribeTask(Job<Option<AddressResult>>);

impl DescribeTask {
    pub fn start(announcer: LocationAnnouncer, coordinate: Coordinate) -> std::io::Result<Self> {
        Job::spawn("describe", move || announcer.describe(coordinate)).map(Self)
    }
}

/// Consent prompts raised by the pipeline, waiting for the user
#[derive(Resource)]
pub struct PermissionPrompts {
    gate: PromptPermission,
    incoming: Mutex<Receiver<PermissionPrompt>>,
    pending: VecDeque<PermissionPrompt>,
}

impl Default for PermissionPrompts {
    fn default() -> Self {
        let (gate, incoming) = PromptPermission::channel();
        Self {
            gate,
            incoming: Mutex::new(incoming),
            pending: VecDeque::new(),
        }
    }
}

impl PermissionPrompts {
    /// A gate whose prompts arrive in this resource
    pub fn gate(&self) -> PromptPermission {
        self.gate.clone()
    }

    /// Move newly raised prompts into the pending queue
    pub fn collect(&mut self) {
        let incoming = self.incoming.get_mut().unwrap_or_else(|e| e.into_inner());
        while let Ok(prompt) = incoming.try_recv() {
            self.pending.push_back(prompt);
        }
    }

    pub fn current(&self) -> Option<&PermissionPrompt> {
        self.pending.front()
    }

    /// Whether a prompt is on screen or waiting to be shown
    pub fn is_waiting(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn answer_current(&mut self, status: PermissionStatus) {
        if let Some(prompt) = self.pending.pop_front() {
            prompt.answer(status);
        }
    }
}

/// Build the announcer for the given settings
pub fn build_announcer(data: &AppConfigData, prompt_gate: PromptPermission) -> LocationAnnouncer {
    let location = &data.location;

    let permission: Arc<dyn PermissionGate> = match location.permission {
        PermissionMode::Prompt => Arc::new(prompt_gate),
        PermissionMode::Granted => Arc::new(ImplicitPermission),
        PermissionMode::Denied => Arc::new(FixedPermission(PermissionStatus::Denied)),
    };

    let position: Arc<dyn PositionSource> = match location.provider {
        PositionProvider::Ip => Arc::new(CachedPositionSource::new(IpPositionSource::new(
            location.ip_lookup_url.clone(),
        ))),
        PositionProvider::Fixed => Arc::new(FixedPositionSource::new(location.fixed_position)),
    };

    let mut announcer = LocationAnnouncer::new(permission, position, location.position_options());

    match data.geocoder.api_key() {
        Some(key) => {
            announcer = announcer.with_geocoder(Arc::new(OpenCageGeocoder::new(
                data.geocoder.base_url.clone(),
                key,
            )));
        }
        None => info!("No geocoder API key configured, addresses will not be resolved"),
    }

    if let Some(url) = &data.geocoder.static_map_url {
        announcer = announcer.with_static_map(StaticMapTemplate::new(url.clone()));
    }

    announcer
}

/// Rebuild the announcer at startup and whenever settings change
pub fn rebuild_announcer(
    mut events: MessageReader<SettingsChanged>,
    config: Res<AppConfig>,
    prompts: Res<PermissionPrompts>,
    mut active: ResMut<ActiveAnnouncer>,
) {
    events.clear();
    active.0 = Some(build_announcer(&config.data, prompts.gate()));
    debug!(
        "Location announcer ready (permission: {:?}, provider: {:?})",
        config.data.location.permission, config.data.location.provider
    );
}

/// Start a locate job for every Location press
pub fn start_locate_system(
    mut commands: Commands,
    mut events: MessageReader<LocationRequest>,
    active: Res<ActiveAnnouncer>,
    mut notices: ResMut<NoticeQueue>,
) {
    for _ in events.read() {
        let Some(announcer) = active.0.clone() else {
            warn!("Location requested before the announcer was ready");
            continue;
        };

        match LocateTask::start(announcer) {
            Ok(task) => {
                commands.spawn(task);
            }
            Err(e) => {
                error!("Failed to start location request: {}", e);
                notices.push(LocationError::PositionUnavailable(e.to_string()).notice());
            }
        }
    }
}

/// Record a finished locate step. Returns the fix when there is one.
pub fn record_located(
    result: LocationResult<Coordinate>,
    log: &mut MessageLog,
    notices: &mut NoticeQueue,
) -> Option<Coordinate> {
    match result {
        Ok(coordinate) => {
            log.append(coordinate_entry(coordinate));
            notices.push(coordinate_notice(coordinate));
            Some(coordinate)
        }
        Err(e) => {
            notices.push(e.notice());
            None
        }
    }
}

/// Record a finished describe step. A missing address records nothing.
pub fn record_described(
    address: Option<AddressResult>,
    log: &mut MessageLog,
    notices: &mut NoticeQueue,
) {
    if let Some(address) = address {
        log.extend(address_entries(&address));
        notices.push(address_notice(&address));
    }
}

/// Poll locate jobs; successful fixes continue with a describe job
pub fn poll_locate_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut LocateTask)>,
    mut log: ResMut<MessageLog>,
    mut notices: ResMut<NoticeQueue>,
) {
    for (entity, mut locate) in tasks.iter_mut() {
        let Some(outcome) = locate.job.poll() else {
            continue;
        };

        let result = outcome.unwrap_or_else(|_| {
            Err(LocationError::PositionUnavailable(
                "location worker stopped unexpectedly".to_string(),
            ))
        });

        if let Some(coordinate) = record_located(result, &mut log, &mut notices) {
            match DescribeTask::start(locate.announcer.clone(), coordinate) {
                Ok(task) => {
                    commands.spawn(task);
                }
                Err(e) => warn!("Address lookup skipped: {}", e),
            }
        }

        commands.entity(entity).despawn();
    }
}

/// Poll describe jobs
pub fn poll_describe_tasks(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut DescribeTask)>,
    mut log: ResMut<MessageLog>,
    mut notices: ResMut<NoticeQueue>,
) {
    for (entity, mut task) in tasks.iter_mut() {
        let Some(outcome) = task.0.poll() else {
            continue;
        };

        let address = outcome.unwrap_or_else(|_| {
            warn!("Address lookup stopped unexpectedly");
            None
        });
        record_described(address, &mut log, &mut notices);
        commands.entity(entity).despawn();
    }
}

/// Pick up prompts raised since the last frame, ahead of the UI pass
pub fn collect_permission_prompts(mut prompts: ResMut<PermissionPrompts>) {
    prompts.collect();
}

/// Renders the consent prompt for the oldest pending request
pub fn permission_prompt_ui(
    mut contexts: EguiContexts,
    mut prompts: ResMut<PermissionPrompts>,
) -> Result {
    let Some(capability) = prompts.current().map(|p| p.capability) else {
        return Ok(());
    };

    let mut answer = None;

    egui::Window::new("Location Permission")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            ui.set_min_width(300.0);
            ui.label("This app needs access to your location to send your current position.");
            ui.label(
                egui::RichText::new(format!("Requested: {}", capability.display_name())).weak(),
            );
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("Allow").clicked() {
                    answer = Some(PermissionStatus::Granted);
                }
                if ui.button("Deny").clicked() {
                    answer = Some(PermissionStatus::Denied);
                }
            });
        });

    if let Some(status) = answer {
        prompts.answer_current(status);
    }

    Ok(())
}
