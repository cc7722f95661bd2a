//! Map image previews for map entries in the message log.
//!
//! Static map images are downloaded in the background, decoded, and
//! registered with egui so the message list can draw them.

use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::tasks::{AsyncComputeTaskPool, Task};
use bevy_egui::{egui, EguiTextureHandle, EguiUserTextures};
use futures_lite::future;
use std::collections::HashMap;
use std::io::Read;

use crate::chat::MessageLog;
use crate::constants::{
    MAP_IMAGE_TIMEOUT, MAX_MAP_FETCHES_PER_FRAME, MAX_MAP_IMAGE_BYTES, USER_AGENT,
};

/// Why a map image could not be shown
#[derive(Debug, thiserror::Error)]
pub enum MapFetchError {
    #[error("Map request failed: {0}")]
    Request(String),

    #[error("Map image is larger than {} bytes", MAX_MAP_IMAGE_BYTES)]
    TooLarge,

    #[error("Map image could not be decoded: {0}")]
    Decode(String),
}

/// Decoded RGBA pixels
#[derive(Debug)]
pub struct DecodedMap {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Display state of one map URL
pub enum MapImage {
    Loading,
    Ready {
        texture_id: egui::TextureId,
        /// Keeps the image asset alive while egui references it
        #[allow(dead_code)]
        handle: Handle<Image>,
    },
    Failed {
        reason: String,
    },
}

/// Map images keyed by URL
#[derive(Resource, Default)]
pub struct MapImageCache {
    images: HashMap<String, MapImage>,
}

impl MapImageCache {
    pub fn get(&self, url: &str) -> Option<&MapImage> {
        self.images.get(url)
    }

    fn contains(&self, url: &str) -> bool {
        self.images.contains_key(url)
    }
}

/// Background download of one map image
#[derive(Component)]
pub struct MapFetchTask {
    url: String,
    task: Task<Result<DecodedMap, MapFetchError>>,
}

/// Download and decode a map image (blocking)
fn fetch_map(url: &str) -> Result<DecodedMap, MapFetchError> {
    let agent = ureq::AgentBuilder::new()
        .timeout(MAP_IMAGE_TIMEOUT)
        .user_agent(USER_AGENT)
        .build();

    let response = match agent.get(url).call() {
        Ok(resp) => resp,
        Err(ureq::Error::Status(code, _)) => {
            return Err(MapFetchError::Request(format!("HTTP {}", code)));
        }
        Err(e) => return Err(MapFetchError::Request(e.kind().to_string())),
    };

    let mut bytes = Vec::new();
    response
        .into_reader()
        .take(MAX_MAP_IMAGE_BYTES + 1)
        .read_to_end(&mut bytes)
        .map_err(|e| MapFetchError::Request(e.to_string()))?;

    if bytes.len() as u64 > MAX_MAP_IMAGE_BYTES {
        return Err(MapFetchError::TooLarge);
    }

    decode_map(&bytes)
}

/// Decode PNG/JPEG/WebP/GIF bytes to RGBA
pub fn decode_map(bytes: &[u8]) -> Result<DecodedMap, MapFetchError> {
    let image = image::load_from_memory(bytes)
        .map_err(|e| MapFetchError::Decode(e.to_string()))?
        .to_rgba8();

    Ok(DecodedMap {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

/// Wrap decoded pixels in a bevy image
fn to_bevy_image(decoded: DecodedMap) -> Image {
    Image::new(
        Extent3d {
            width: decoded.width,
            height: decoded.height,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        decoded.rgba,
        TextureFormat::Rgba8UnormSrgb,
        default(),
    )
}

/// Start downloads for map URLs that have no cache entry yet.
/// A few per frame to avoid flooding the task pool.
fn queue_map_fetches(
    mut commands: Commands,
    log: Res<MessageLog>,
    mut cache: ResMut<MapImageCache>,
) {
    let pending: Vec<String> = log
        .map_urls()
        .filter(|url| !cache.contains(url))
        .take(MAX_MAP_FETCHES_PER_FRAME)
        .map(str::to_string)
        .collect();

    let task_pool = AsyncComputeTaskPool::get();
    for url in pending {
        debug!("Fetching map image {}", url);
        cache.images.insert(url.clone(), MapImage::Loading);

        let fetch_url = url.clone();
        let task = task_pool.spawn(async move { fetch_map(&fetch_url) });
        commands.spawn(MapFetchTask { url, task });
    }
}

/// Register finished downloads with egui
fn poll_map_fetches(
    mut commands: Commands,
    mut tasks: Query<(Entity, &mut MapFetchTask)>,
    mut cache: ResMut<MapImageCache>,
    mut images: ResMut<Assets<Image>>,
    mut egui_textures: ResMut<EguiUserTextures>,
) {
    for (entity, mut fetch) in tasks.iter_mut() {
        let Some(result) = future::block_on(future::poll_once(&mut fetch.task)) else {
            continue;
        };

        let state = match result {
            Ok(decoded) => {
                let handle = images.add(to_bevy_image(decoded));
                let texture_id = egui_textures.add_image(EguiTextureHandle::Weak(handle.id()));
                MapImage::Ready { texture_id, handle }
            }
            Err(e) => {
                warn!("Map image unavailable: {}", e);
                MapImage::Failed {
                    reason: e.to_string(),
                }
            }
        };

        cache.images.insert(fetch.url.clone(), state);
        commands.entity(entity).despawn();
    }
}

pub struct MapPreviewPlugin;

impl Plugin for MapPreviewPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapImageCache>()
            .add_systems(Update, (queue_map_fetches, poll_map_fetches).chain());
    }
}
