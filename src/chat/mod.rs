//! The chat screen: message log, composer, toolbar actions and notices.

mod message_log;
mod notices;
mod screen;
mod settings;

pub use message_log::{MessageEntry, MessageLog};
pub use notices::{Notice, NoticeQueue};

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

/// Message to append the composer draft to the log
#[derive(Message)]
pub struct SendTextRequest;

/// Message from the Image button
#[derive(Message)]
pub struct SendImageRequest;

/// Draft text in the composer
#[derive(Resource, Default)]
pub struct Composer {
    pub draft: String,
}

impl Composer {
    /// Take the trimmed draft, leaving the composer empty.
    /// Whitespace-only drafts are kept and yield nothing.
    pub fn take_message(&mut self) -> Option<String> {
        let trimmed = self.draft.trim();
        if trimmed.is_empty() {
            return None;
        }

        let message = trimmed.to_string();
        self.draft.clear();
        Some(message)
    }
}

/// System to send the composer draft
fn send_text_system(
    mut events: MessageReader<SendTextRequest>,
    mut composer: ResMut<Composer>,
    mut log: ResMut<MessageLog>,
) {
    for _ in events.read() {
        if let Some(message) = composer.take_message() {
            log.append(MessageEntry::PlainText(message));
        }
    }
}

/// Image sending is a placeholder
fn send_image_system(
    mut events: MessageReader<SendImageRequest>,
    mut notices: ResMut<NoticeQueue>,
) {
    for _ in events.read() {
        notices.push(Notice::new("Send Image", "Sending an image..."));
    }
}

pub struct ChatPlugin;

impl Plugin for ChatPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MessageLog>()
            .init_resource::<NoticeQueue>()
            .init_resource::<Composer>()
            .init_resource::<settings::SettingsDialogState>()
            .add_message::<SendTextRequest>()
            .add_message::<SendImageRequest>()
            .add_systems(
                Update,
                (
                    send_text_system.run_if(on_message::<SendTextRequest>),
                    send_image_system.run_if(on_message::<SendImageRequest>),
                ),
            )
            // Panels first, then the central list, then overlays
            .add_systems(
                EguiPrimaryContextPass,
                (
                    screen::status_bar_ui,
                    screen::toolbar_ui,
                    screen::composer_ui,
                    screen::message_list_ui,
                    settings::settings_dialog_ui,
                    notices::notice_ui,
                )
                    .chain(),
            );
    }
}
