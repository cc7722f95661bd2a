//! Location announcements for the chat screen.
//!
//! Requests the location permission, reads a position fix, reverse geocodes it
//! and appends the result to the message log.
//!
//! ## Module Structure
//!
//! - [`types`] - Coordinate and address values
//! - [`error`] - Pipeline error types
//! - [`permission`] - Consent gates
//! - [`position`] - Position sources
//! - [`geocode`] - Reverse geocoder and static map URLs
//! - [`announcer`] - The sequential pipeline
//! - [`systems`] - Bevy task spawning, polling and the consent prompt

mod announcer;
mod error;
mod geocode;
mod permission;
mod position;
mod systems;
mod types;

#[cfg(test)]
mod tests;

pub use geocode::{DEFAULT_GEOCODER_URL, DEFAULT_STATIC_MAP_URL};
pub use permission::PermissionMode;
pub use position::{PositionOptions, PositionProvider};
pub use systems::{DescribeTask, LocateTask, LocationRequest, PermissionPrompts};
pub use types::Coordinate;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

use crate::config::{ConfigLoaded, SettingsChanged};

pub struct LocationPlugin;

impl Plugin for LocationPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<systems::ActiveAnnouncer>()
            .init_resource::<systems::PermissionPrompts>()
            .add_message::<LocationRequest>()
            .add_systems(Startup, systems::rebuild_announcer.after(ConfigLoaded))
            .add_systems(
                Update,
                (
                    systems::rebuild_announcer.run_if(on_message::<SettingsChanged>),
                    systems::start_locate_system.run_if(on_message::<LocationRequest>),
                    systems::poll_locate_tasks,
                    systems::poll_describe_tasks,
                    systems::collect_permission_prompts,
                )
                    .chain(),
            )
            .add_systems(EguiPrimaryContextPass, systems::permission_prompt_ui);
    }
}
