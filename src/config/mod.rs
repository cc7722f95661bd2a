use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chat::{Notice, NoticeQueue};
use crate::constants::{DEFAULT_MAX_CACHED_AGE_MS, DEFAULT_POSITION_TIMEOUT_MS};
use crate::location::{
    Coordinate, PermissionMode, PositionOptions, PositionProvider, DEFAULT_GEOCODER_URL,
    DEFAULT_STATIC_MAP_URL,
};

/// System set for config loading (other plugins can run after this)
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigLoaded;

/// How location requests are answered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationSettings {
    /// Consent behaviour for location requests
    pub permission: PermissionMode,
    /// Where position fixes come from
    pub provider: PositionProvider,
    /// Position reported by the fixed provider
    pub fixed_position: Option<Coordinate>,
    pub high_accuracy: bool,
    /// Upper bound on waiting for a fix
    pub timeout_ms: u64,
    /// Accept a previous fix up to this age
    pub max_cached_age_ms: u64,
    /// Geo-IP lookup service used by the IP provider
    pub ip_lookup_url: String,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            permission: PermissionMode::default(),
            provider: PositionProvider::default(),
            fixed_position: None,
            high_accuracy: true,
            timeout_ms: DEFAULT_POSITION_TIMEOUT_MS,
            max_cached_age_ms: DEFAULT_MAX_CACHED_AGE_MS,
            ip_lookup_url: "https://ipapi.co".to_string(),
        }
    }
}

impl LocationSettings {
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.high_accuracy,
            timeout: Duration::from_millis(self.timeout_ms),
            max_cached_age: Duration::from_millis(self.max_cached_age_ms),
        }
    }
}

/// Reverse geocoding and map rendering services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderSettings {
    /// API key for the geocoder (geocoding is skipped without one)
    pub api_key: Option<String>,
    pub base_url: String,
    /// Static map renderer (no map entry without one)
    pub static_map_url: Option<String>,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEOCODER_URL.to_string(),
            static_map_url: Some(DEFAULT_STATIC_MAP_URL.to_string()),
        }
    }
}

impl GeocoderSettings {
    /// Non-empty API key, if configured
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Network status probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivitySettings {
    /// `host:port` to open a TCP connection to
    pub probe_address: String,
    pub interval_secs: u64,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self {
            probe_address: "1.1.1.1:53".to_string(),
            interval_secs: 5,
        }
    }
}

/// Application configuration persisted to disk
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppConfigData {
    #[serde(default)]
    pub location: LocationSettings,

    #[serde(default)]
    pub geocoder: GeocoderSettings,

    #[serde(default)]
    pub connectivity: ConnectivitySettings,
}

/// Runtime configuration resource
#[derive(Resource)]
pub struct AppConfig {
    /// The persisted configuration data
    pub data: AppConfigData,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Whether config needs to be saved (dirty flag)
    pub dirty: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: AppConfigData::default(),
            config_path: get_config_path(),
            dirty: false,
        }
    }
}

/// Message to trigger config save
#[derive(Message)]
pub struct SaveConfigRequest;

/// Message to replace the location and geocoder settings
#[derive(Message)]
pub struct UpdateSettingsRequest {
    pub location: LocationSettings,
    pub geocoder: GeocoderSettings,
}

/// Sent after settings were applied, so dependent state can be rebuilt
#[derive(Message)]
pub struct SettingsChanged;

/// Get the path to the config file (platform-appropriate location)
fn get_config_path() -> PathBuf {
    crate::paths::config_file()
}

/// Result of loading config from disk
struct LoadConfigResult {
    data: AppConfigData,
    /// Error message if config was reset to defaults due to an error
    reset_reason: Option<String>,
}

/// Parse config file contents
fn parse_config(json: &str) -> Result<AppConfigData, String> {
    serde_json::from_str(json).map_err(|e| format!("Configuration file was corrupted: {}", e))
}

/// Load configuration from disk
fn load_config(config_path: &Path) -> LoadConfigResult {
    if !config_path.exists() {
        info!("No config file found, using defaults");
        return LoadConfigResult {
            data: AppConfigData::default(),
            reset_reason: None,
        };
    }

    match std::fs::read_to_string(config_path) {
        Ok(json) => match parse_config(&json) {
            Ok(data) => {
                info!("Loaded config from {:?}", config_path);
                LoadConfigResult {
                    data,
                    reset_reason: None,
                }
            }
            Err(reason) => {
                warn!("{}", reason);
                LoadConfigResult {
                    data: AppConfigData::default(),
                    reset_reason: Some(reason),
                }
            }
        },
        Err(e) => {
            warn!("Failed to read config file: {}", e);
            LoadConfigResult {
                data: AppConfigData::default(),
                reset_reason: Some(format!("Could not read configuration file: {}", e)),
            }
        }
    }
}

/// Save configuration to disk
fn save_config(config: &AppConfig) {
    match serde_json::to_string_pretty(&config.data) {
        Ok(json) => {
            if let Err(e) = std::fs::write(&config.config_path, json) {
                error!("Failed to save config: {}", e);
            } else {
                info!("Config saved to {:?}", config.config_path);
            }
        }
        Err(e) => {
            error!("Failed to serialize config: {}", e);
        }
    }
}

/// Startup system to load config from disk into the existing resource
fn load_config_system(mut config: ResMut<AppConfig>, mut notices: ResMut<NoticeQueue>) {
    let result = load_config(&config.config_path);
    config.data = result.data;
    config.dirty = false;

    if let Some(reason) = result.reset_reason {
        notices.push(Notice::new(
            "Configuration Reset",
            format!("{}\nDefault settings are in use.", reason),
        ));
    }
}

/// System to save config when requested
fn save_config_system(
    mut events: MessageReader<SaveConfigRequest>,
    mut config: ResMut<AppConfig>,
) {
    for _ in events.read() {
        if config.dirty {
            save_config(&config);
            config.dirty = false;
        }
    }
}

/// System to apply edited settings
fn update_settings_system(
    mut events: MessageReader<UpdateSettingsRequest>,
    mut config: ResMut<AppConfig>,
    mut save_events: MessageWriter<SaveConfigRequest>,
    mut changed_events: MessageWriter<SettingsChanged>,
) {
    for event in events.read() {
        config.data.location = event.location.clone();
        config.data.geocoder = event.geocoder.clone();
        config.dirty = true;
        save_events.write(SaveConfigRequest);
        changed_events.write(SettingsChanged);
        info!("Location settings updated");
    }
}

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<AppConfig>()
            .init_resource::<NoticeQueue>()
            .add_message::<SaveConfigRequest>()
            .add_message::<UpdateSettingsRequest>()
            .add_message::<SettingsChanged>()
            .add_systems(Startup, load_config_system.in_set(ConfigLoaded))
            .add_systems(
                Update,
                (
                    update_settings_system.run_if(on_message::<UpdateSettingsRequest>),
                    save_config_system.run_if(on_message::<SaveConfigRequest>),
                )
                    .chain(),
            );
    }
}
