//! Chat screen panels: status bar, toolbar, composer and message list.

use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use super::settings::SettingsDialogState;
use super::{Composer, MessageEntry, MessageLog, SendImageRequest, SendTextRequest};
use crate::config::AppConfig;
use crate::connectivity::ConnectivityState;
use crate::constants::MAP_DISPLAY_SIZE;
use crate::location::{DescribeTask, LocateTask, LocationRequest};
use crate::map_preview::{MapImage, MapImageCache};
use crate::theme;

/// Top status bar, colored by network reachability
pub fn status_bar_ui(
    mut contexts: EguiContexts,
    connectivity: Res<ConnectivityState>,
    config: Res<AppConfig>,
    mut settings: ResMut<SettingsDialogState>,
) -> Result {
    let fill = theme::status_color(connectivity.is_connected);

    egui::TopBottomPanel::top("status_bar")
        .frame(
            egui::Frame::new()
                .fill(fill)
                .inner_margin(egui::Margin::symmetric(12, 6)),
        )
        .show_separator_line(false)
        .show(contexts.ctx_mut()?, |ui| {
            ui.horizontal(|ui| {
                let label = if connectivity.is_connected {
                    "● Online"
                } else {
                    "● Offline"
                };

                let checked = connectivity
                    .last_checked
                    .map(|at| format!("Last checked {}", at.format("%H:%M:%S")))
                    .unwrap_or_else(|| "Not checked yet".to_string());

                ui.label(egui::RichText::new(label).color(theme::STATUS_TEXT).strong())
                    .on_hover_text(checked);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui
                        .button(egui::RichText::new("Settings").color(theme::STATUS_TEXT))
                        .clicked()
                    {
                        settings.open(&config.data);
                    }
                });
            });
        });

    Ok(())
}

/// Bottom toolbar with Send / Image / Location
pub fn toolbar_ui(
    mut contexts: EguiContexts,
    mut send_text: MessageWriter<SendTextRequest>,
    mut send_image: MessageWriter<SendImageRequest>,
    mut locate: MessageWriter<LocationRequest>,
    in_flight: Query<(), Or<(With<LocateTask>, With<DescribeTask>)>>,
) -> Result {
    let ctx = contexts.ctx_mut()?;
    let pending = in_flight.iter().count();

    egui::TopBottomPanel::bottom("toolbar")
        .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::same(10)))
        .show(ctx, |ui| {
            if pending > 0 {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label(egui::RichText::new("Locating...").weak());
                });
                ui.add_space(4.0);
            }

            ui.columns(3, |columns| {
                if toolbar_button(&mut columns[0], "Send") {
                    send_text.write(SendTextRequest);
                }
                if toolbar_button(&mut columns[1], "Image") {
                    send_image.write(SendImageRequest);
                }
                if toolbar_button(&mut columns[2], "Location") {
                    locate.write(LocationRequest);
                }
            });
        });

    Ok(())
}

fn toolbar_button(ui: &mut egui::Ui, label: &str) -> bool {
    let button = egui::Button::new(
        egui::RichText::new(label)
            .size(16.0)
            .color(theme::TOOLBAR_TEXT),
    )
    .fill(theme::TOOLBAR_BUTTON)
    .min_size(egui::vec2(ui.available_width(), 36.0));

    ui.add(button).clicked()
}

/// Message composer above the toolbar; Enter sends
pub fn composer_ui(
    mut contexts: EguiContexts,
    mut composer: ResMut<Composer>,
    mut send_text: MessageWriter<SendTextRequest>,
) -> Result {
    egui::TopBottomPanel::bottom("composer")
        .frame(egui::Frame::new().inner_margin(egui::Margin::same(10)))
        .show_separator_line(false)
        .show(contexts.ctx_mut()?, |ui| {
            let response = ui.add(
                egui::TextEdit::singleline(&mut composer.draft)
                    .hint_text("Type a message...")
                    .desired_width(f32::INFINITY),
            );

            if response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                send_text.write(SendTextRequest);
                response.request_focus();
            }
        });

    Ok(())
}

/// Conversation, oldest at the top, newest at the bottom
pub fn message_list_ui(
    mut contexts: EguiContexts,
    log: Res<MessageLog>,
    maps: Res<MapImageCache>,
) -> Result {
    egui::CentralPanel::default()
        .frame(
            egui::Frame::new()
                .fill(theme::CONVERSATION_BACKGROUND)
                .inner_margin(egui::Margin::same(10)),
        )
        .show(contexts.ctx_mut()?, |ui| {
            egui::ScrollArea::vertical()
                .stick_to_bottom(true)
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    ui.with_layout(egui::Layout::top_down(egui::Align::Max), |ui| {
                        for entry in log.entries() {
                            match entry {
                                MessageEntry::PlainText(text) => message_bubble(ui, text),
                                MessageEntry::MapReference { url } => map_bubble(ui, url, &maps),
                            }
                            ui.add_space(8.0);
                        }
                    });
                });
        });

    Ok(())
}

fn message_bubble(ui: &mut egui::Ui, text: &str) {
    egui::Frame::new()
        .fill(theme::BUBBLE_FILL)
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::same(10))
        .show(ui, |ui| {
            ui.set_max_width(ui.available_width() * 0.8);
            ui.label(egui::RichText::new(text).color(theme::BUBBLE_TEXT));
        });
}

fn map_bubble(ui: &mut egui::Ui, url: &str, maps: &MapImageCache) {
    egui::Frame::new()
        .stroke(egui::Stroke::new(1.0, theme::MAP_BORDER))
        .corner_radius(egui::CornerRadius::same(8))
        .inner_margin(egui::Margin::same(4))
        .show(ui, |ui| match maps.get(url) {
            Some(MapImage::Ready { texture_id, .. }) => {
                let size = egui::vec2(MAP_DISPLAY_SIZE, MAP_DISPLAY_SIZE);
                let image = egui::Image::new(egui::load::SizedTexture::new(*texture_id, size))
                    .sense(egui::Sense::click());

                if ui.add(image).on_hover_text("Open map in browser").clicked()
                    && let Err(e) = open::that(url)
                {
                    warn!("Failed to open map in browser: {}", e);
                }
            }
            Some(MapImage::Failed { reason }) => {
                ui.hyperlink_to("Map", url).on_hover_text(reason.as_str());
            }
            Some(MapImage::Loading) | None => {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.label("Loading map...");
                });
            }
        });
}
