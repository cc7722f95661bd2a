//! Transient user-facing notices (the modal alerts of the chat screen).

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use std::collections::VecDeque;

use crate::location::PermissionPrompts;

/// A short alert with a title and a one-line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Notices waiting to be acknowledged, shown one at a time in arrival order.
#[derive(Resource, Default, Debug)]
pub struct NoticeQueue {
    pending: VecDeque<Notice>,
}

impl NoticeQueue {
    pub fn push(&mut self, notice: Notice) {
        self.pending.push_back(notice);
    }

    pub fn current(&self) -> Option<&Notice> {
        self.pending.front()
    }

    pub fn dismiss(&mut self) -> Option<Notice> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Renders the front notice as a modal window.
/// Held back while a location consent prompt is showing.
pub fn notice_ui(
    mut contexts: EguiContexts,
    mut notices: ResMut<NoticeQueue>,
    prompts: Res<PermissionPrompts>,
) -> Result {
    if prompts.is_waiting() {
        return Ok(());
    }

    let Some(notice) = notices.current().cloned() else {
        return Ok(());
    };

    let mut dismissed = false;

    egui::Window::new(notice.title.as_str())
        .id(egui::Id::new("notice_window"))
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            ui.set_min_width(260.0);
            ui.label(&notice.body);
            ui.add_space(10.0);

            ui.horizontal(|ui| {
                if ui.button("OK").clicked() {
                    dismissed = true;
                }
                if notices.len() > 1 {
                    ui.label(egui::RichText::new(format!("{} more", notices.len() - 1)).weak());
                }
            });
        });

    if dismissed {
        notices.dismiss();
    }

    Ok(())
}
