use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::config::{AppConfigData, GeocoderSettings, LocationSettings, UpdateSettingsRequest};
use crate::location::{Coordinate, PermissionMode, PositionProvider};

/// State for the settings dialog
#[derive(Resource, Default)]
pub struct SettingsDialogState {
    /// Whether the dialog is open
    pub is_open: bool,
    /// Edited location settings
    pub location: LocationSettings,
    /// Edited geocoder settings (the key is edited separately)
    pub geocoder: GeocoderSettings,
    /// Edited API key (as string for text editing)
    pub api_key: String,
    /// Edited fixed position
    pub latitude: f64,
    pub longitude: f64,
    /// Whether changes have been made
    pub has_changes: bool,
}

impl SettingsDialogState {
    /// Open the dialog with the current config
    pub fn open(&mut self, config: &AppConfigData) {
        self.location = config.location.clone();
        self.geocoder = config.geocoder.clone();
        self.api_key = config.geocoder.api_key().unwrap_or_default().to_string();

        let fixed = config.location.fixed_position.unwrap_or_default();
        self.latitude = fixed.latitude;
        self.longitude = fixed.longitude;

        self.has_changes = false;
        self.is_open = true;
    }

    /// Build the settings update from the edited fields
    pub fn to_request(&self) -> UpdateSettingsRequest {
        let mut location = self.location.clone();
        if location.provider == PositionProvider::Fixed {
            location.fixed_position = Some(Coordinate::new(self.latitude, self.longitude));
        }

        let key = self.api_key.trim();
        let geocoder = GeocoderSettings {
            api_key: (!key.is_empty()).then(|| key.to_string()),
            ..self.geocoder.clone()
        };

        UpdateSettingsRequest { location, geocoder }
    }
}

/// Renders the settings dialog
pub fn settings_dialog_ui(
    mut contexts: EguiContexts,
    mut dialog_state: ResMut<SettingsDialogState>,
    mut update_events: MessageWriter<UpdateSettingsRequest>,
) -> Result {
    if !dialog_state.is_open {
        return Ok(());
    }

    let mut should_close = false;
    let mut should_save = false;
    let state = &mut *dialog_state;

    egui::Window::new("Settings")
        .collapsible(false)
        .resizable(false)
        .min_width(320.0)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(contexts.ctx_mut()?, |ui| {
            // Location section
            ui.group(|ui| {
                ui.label(egui::RichText::new("Location").strong());
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label("Permission:");
                    egui::ComboBox::from_id_salt("permission_mode")
                        .selected_text(state.location.permission.display_name())
                        .show_ui(ui, |ui| {
                            for mode in PermissionMode::all() {
                                if ui
                                    .selectable_value(
                                        &mut state.location.permission,
                                        *mode,
                                        mode.display_name(),
                                    )
                                    .changed()
                                {
                                    state.has_changes = true;
                                }
                            }
                        });
                });

                ui.horizontal(|ui| {
                    ui.label("Position from:");
                    egui::ComboBox::from_id_salt("position_provider")
                        .selected_text(state.location.provider.display_name())
                        .show_ui(ui, |ui| {
                            for provider in PositionProvider::all() {
                                if ui
                                    .selectable_value(
                                        &mut state.location.provider,
                                        *provider,
                                        provider.display_name(),
                                    )
                                    .changed()
                                {
                                    state.has_changes = true;
                                }
                            }
                        });
                });

                if state.location.provider == PositionProvider::Fixed {
                    ui.horizontal(|ui| {
                        ui.label("Latitude:");
                        let lat = ui.add(
                            egui::DragValue::new(&mut state.latitude)
                                .speed(0.01)
                                .range(-90.0..=90.0),
                        );
                        ui.label("Longitude:");
                        let lon = ui.add(
                            egui::DragValue::new(&mut state.longitude)
                                .speed(0.01)
                                .range(-180.0..=180.0),
                        );
                        if lat.changed() || lon.changed() {
                            state.has_changes = true;
                        }
                    });
                }

                if ui
                    .checkbox(&mut state.location.high_accuracy, "High accuracy")
                    .changed()
                {
                    state.has_changes = true;
                }
            });

            ui.add_space(12.0);

            // Geocoder section
            ui.group(|ui| {
                ui.label(egui::RichText::new("Address Lookup").strong());
                ui.add_space(8.0);

                ui.horizontal(|ui| {
                    ui.label("API key:");
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut state.api_key)
                            .password(true)
                            .desired_width(200.0)
                            .hint_text("Not set"),
                    );
                    if response.changed() {
                        state.has_changes = true;
                    }
                });

                ui.add_space(4.0);
                ui.label(
                    egui::RichText::new("Without a key, only coordinates are announced.")
                        .weak()
                        .small(),
                );
            });

            ui.add_space(16.0);

            ui.horizontal(|ui| {
                if ui
                    .add_enabled(state.has_changes, egui::Button::new("Save"))
                    .clicked()
                {
                    should_save = true;
                }

                if ui.button("Cancel").clicked() {
                    should_close = true;
                }
            });
        });

    if should_save {
        update_events.write(state.to_request());
        state.has_changes = false;
        should_close = true;
    }

    if should_close {
        state.is_open = false;
    }

    Ok(())
}
