//! Network reachability for the status bar.
//!
//! Periodically opens a TCP connection to a well-known address in the
//! background and records whether it succeeded.

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use chrono::{DateTime, Local};
use futures_lite::future;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::config::{AppConfig, ConfigLoaded};
use crate::constants::CONNECTIVITY_PROBE_TIMEOUT;

/// Latest known reachability
#[derive(Resource)]
pub struct ConnectivityState {
    pub is_connected: bool,
    /// When the last probe finished
    pub last_checked: Option<DateTime<Local>>,
}

impl Default for ConnectivityState {
    fn default() -> Self {
        // Assume online until a probe says otherwise
        Self {
            is_connected: true,
            last_checked: None,
        }
    }
}

impl ConnectivityState {
    /// Record a probe result, returning true if the state flipped
    pub fn record(&mut self, reachable: bool, at: DateTime<Local>) -> bool {
        let changed = self.is_connected != reachable;
        self.is_connected = reachable;
        self.last_checked = Some(at);
        changed
    }
}

/// Probe schedule
#[derive(Resource)]
pub struct ProbeSchedule {
    timer: Timer,
    address: String,
}

impl Default for ProbeSchedule {
    fn default() -> Self {
        Self {
            timer: Timer::from_seconds(5.0, TimerMode::Repeating),
            address: String::new(),
        }
    }
}

/// Probe running in the background
#[derive(Component)]
pub struct ProbeTask(Task<bool>);

/// Try to open a TCP connection to `address` (blocking)
pub fn probe(address: &str, timeout: Duration) -> bool {
    let addrs = match address.to_socket_addrs() {
        Ok(addrs) => addrs,
        Err(e) => {
            debug!("Probe address {} did not resolve: {}", address, e);
            return false;
        }
    };

    addrs
        .into_iter()
        .any(|addr| TcpStream::connect_timeout(&addr, timeout).is_ok())
}

/// Startup system: read the probe settings and run the first probe
fn setup_probe_schedule(mut commands: Commands, config: Res<AppConfig>) {
    let settings = &config.data.connectivity;
    let interval = settings.interval_secs.max(1) as f32;

    let mut timer = Timer::from_seconds(interval, TimerMode::Repeating);
    // Fire on the first update
    timer.set_elapsed(timer.duration());

    commands.insert_resource(ProbeSchedule {
        timer,
        address: settings.probe_address.clone(),
    });
}

/// Spawn a probe when the timer fires and none is in flight
fn start_probe_system(
    mut commands: Commands,
    time: Res<Time>,
    mut schedule: ResMut<ProbeSchedule>,
    in_flight: Query<(), With<ProbeTask>>,
) {
    schedule.timer.tick(time.delta());
    if !schedule.timer.just_finished() || !in_flight.is_empty() {
        return;
    }

    let address = schedule.address.clone();
    let task = AsyncComputeTaskPool::get()
        .spawn(async move { probe(&address, CONNECTIVITY_PROBE_TIMEOUT) });
    commands.spawn(ProbeTask(task));
}

/// Apply finished probes
fn poll_probe_system(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut ProbeTask)>,
    mut state: ResMut<ConnectivityState>,
) {
    for (entity, mut probe_task) in tasks.iter_mut() {
        if let Some(reachable) = future::block_on(future::poll_once(&mut probe_task.0)) {
            if state.record(reachable, Local::now()) {
                if reachable {
                    info!("Network reachable");
                } else {
                    warn!("Network unreachable");
                }
            }
            commands.entity(entity).despawn();
        }
    }
}

pub struct ConnectivityPlugin;

impl Plugin for ConnectivityPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ConnectivityState>()
            .init_resource::<ProbeSchedule>()
            .add_systems(Startup, setup_probe_schedule.after(ConfigLoaded))
            .add_systems(Update, (start_probe_system, poll_probe_system).chain());
    }
}
