//=========================================================================
// Resource Loader
//=========================================================================
//
// Batch loader: flattens a manifest, skips resident keys and dispatches
// the rest to the engine.
//
// Flow:
//   load_batch(manifest)
//     → flatten → classify each descriptor
//     → resident or still decoding? skip
//     → inline image  → add_inline_texture
//     → inline audio  → decode_audio (tracked until its notification)
//     → path          → enqueue(LoadRequest)
//     → start_load(scene)  exactly once per batch
//
//   pump_decodes() → decode notifications → add_sound(key)
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use super::{classify, AssetKind, AssetSource, Classification, Extension, Manifest};
use crate::core::scene::SceneId;
use crate::engine::{Engine, LoadRequest, TransportSettings};
use crate::error::{AssetError, StageError};

//=== Load Options ========================================================

/// Base URLs and transport settings applied to path assets.
///
/// URLs are built by plain concatenation, so bases usually end in `/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub image_base_url: String,
    pub sound_base_url: String,
    pub video_base_url: String,
    pub transport: Option<TransportSettings>,
}

impl LoadOptions {
    fn base_for(&self, kind: AssetKind) -> &str {
        match kind {
            AssetKind::Audio | AssetKind::InlineAudio => &self.sound_base_url,
            AssetKind::Video => &self.video_base_url,
            _ => &self.image_base_url,
        }
    }
}

//=== Resource Loader =====================================================

/// Dispatches manifest batches to the engine loader.
#[derive(Debug, Default)]
pub struct ResourceLoader {
    reserved_keys: Vec<String>,
    /// Inline audio keys whose decode has not been reported yet.
    pending_decodes: Vec<String>,
}

impl ResourceLoader {
    //--- Construction -----------------------------------------------------

    /// Creates a loader that skips the given top-level manifest keys.
    pub fn new(reserved_keys: Vec<String>) -> Self {
        Self {
            reserved_keys,
            ..Self::default()
        }
    }

    //--- Batches ----------------------------------------------------------

    /// Queues every non-resident asset of `manifest` on `scene`'s loader
    /// and starts it.
    ///
    /// Returns the keys that were queued, registered or handed to the
    /// decoder, in manifest order. Unsupported entries are logged and
    /// skipped; only engine-contract failures are returned as errors.
    ///
    /// A path key queued by another scene that has not finished loading
    /// is queued again here, so this scene's load completes only once the
    /// asset is resident.
    pub fn load_batch<E: Engine>(
        &mut self,
        engine: &mut E,
        scene: &SceneId,
        manifest: &Manifest,
        options: &LoadOptions,
    ) -> Result<Vec<String>, StageError> {
        let flat = manifest.flatten(&self.reserved_keys);
        let mut queued = Vec::new();

        for descriptor in &flat.descriptors {
            let key = descriptor.key.as_str();
            let Classification { kind, source } = match classify(descriptor) {
                Ok(classification) => classification,
                Err(err) => {
                    warn!("Skipping asset: {}", err);
                    continue;
                }
            };

            if engine.is_resident(kind.cache(), key) {
                debug!("Asset '{}' already resident, skipping", key);
                continue;
            }
            if self.pending_decodes.iter().any(|pending| pending == key) {
                debug!("Asset '{}' is still decoding, skipping", key);
                continue;
            }

            match source {
                AssetSource::Inline(payload) if kind == AssetKind::InlineImage => {
                    engine.add_inline_texture(key, &payload);
                }
                AssetSource::Inline(payload) => {
                    engine.decode_audio(key, &payload);
                    self.pending_decodes.push(key.to_owned());
                }
                AssetSource::Path { path, extension } => {
                    let metadata = match kind {
                        AssetKind::Atlas => {
                            let metadata = flat.atlas_data.get(&format!("{key}_data")).cloned();
                            if metadata.is_none() {
                                warn!(
                                    "{}",
                                    AssetError::MissingAtlasMetadata {
                                        key: key.to_owned()
                                    }
                                );
                            }
                            metadata
                        }
                        _ => None,
                    };
                    let url = format!("{}{}", options.base_for(kind), path);
                    let request =
                        build_request(key, url, kind, extension, metadata, &options.transport);
                    engine.enqueue(scene, request)?;
                }
            }
            queued.push(key.to_owned());
        }

        engine.start_load(scene)?;

        if queued.is_empty() {
            debug!("Scene {} has nothing new to load", scene);
        } else {
            info!("Scene {} loading {} assets: {:?}", scene, queued.len(), queued);
        }
        Ok(queued)
    }

    //--- Decodes ----------------------------------------------------------

    /// Registers decoded inline audio with the sound manager.
    ///
    /// Notifications for keys this loader never decoded are ignored.
    /// Returns the keys registered by this call.
    pub fn pump_decodes<E: Engine>(&mut self, engine: &mut E) -> Vec<String> {
        let notifications = engine.decode_notifications();
        let mut registered = Vec::new();

        for key in notifications.try_iter() {
            let Some(pos) = self.pending_decodes.iter().position(|pending| *pending == key) else {
                debug!("Ignoring decode notification for unknown key '{}'", key);
                continue;
            };
            self.pending_decodes.remove(pos);

            if engine.add_sound(&key).is_none() {
                warn!("Decoded audio '{}' could not be added as a sound", key);
                continue;
            }
            debug!("Decoded audio '{}' registered", key);
            registered.push(key);
        }
        registered
    }

    pub fn pending_decodes(&self) -> &[String] {
        &self.pending_decodes
    }
}

//=== Request Building ====================================================

fn build_request(
    key: &str,
    url: String,
    kind: AssetKind,
    extension: Extension,
    metadata: Option<serde_json::Value>,
    transport: &Option<TransportSettings>,
) -> LoadRequest {
    let key = key.to_owned();
    let transport = transport.clone();
    match kind {
        AssetKind::SpriteSheet {
            frame_width,
            frame_height,
        } => LoadRequest::SpriteSheet {
            key,
            url,
            frame_width,
            frame_height,
            transport,
        },
        AssetKind::Atlas => LoadRequest::Atlas {
            key,
            url,
            metadata,
            transport,
        },
        AssetKind::Audio => LoadRequest::Audio { key, url, transport },
        AssetKind::Video => LoadRequest::Video {
            key,
            url,
            as_blob: true,
            no_audio: false,
            transport,
        },
        _ if extension == Extension::Svg => LoadRequest::Svg { key, url, transport },
        _ => LoadRequest::Image { key, url, transport },
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
