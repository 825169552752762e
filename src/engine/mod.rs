//=========================================================================
// Engine Contract
//=========================================================================
//
// The host services the orchestration layer drives.
//
// This module defines the contract between the orchestration core and a
// concrete engine backend, so backends can be swapped without touching
// the controller, loader or registry.
//
// Components:
// - `SceneDirector`: scene lifecycle (add, launch, restart, sleep, wake)
// - `ResourceCache`: residency checks and inline texture registration
// - `LoadQueue`: per-scene asset queue with a completion notification
// - `TimerService`: scene-scoped delayed callbacks
// - `AudioService`: global sound manager and audio decoding
// - `headless`: in-memory backend for tests and tooling
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use serde_json::Value;

//=== Internal Dependencies ===============================================

use crate::core::assets::InlinePayload;
use crate::core::scene::SceneId;
use crate::core::signal::Completion;
use crate::error::StageError;

//=== Module Declarations =================================================

mod headless;

//=== Public API ==========================================================

pub use headless::{EngineCall, HeadlessEngine};

//=== Lifecycle Status ====================================================

/// Lifecycle state the engine reports for a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleStatus {
    Pending,
    NotStarted,
    Starting,
    Loading,
    Creating,
    Running,
    Paused,
    Sleeping,
    Shutdown,
    Destroyed,
}

//=== Cache Kind ==========================================================

/// Resident cache an asset lands in once loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CacheKind {
    Texture,
    Audio,
    Video,
}

//=== Transport Settings ==================================================

/// Per-request transport overrides forwarded to the engine loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportSettings {
    pub timeout_ms: Option<u64>,
    pub with_credentials: bool,
    pub headers: Vec<(String, String)>,
}

//=== Load Request ========================================================

/// One entry on a scene's load queue.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadRequest {
    Image {
        key: String,
        url: String,
        transport: Option<TransportSettings>,
    },
    Svg {
        key: String,
        url: String,
        transport: Option<TransportSettings>,
    },
    SpriteSheet {
        key: String,
        url: String,
        frame_width: u32,
        frame_height: u32,
        transport: Option<TransportSettings>,
    },
    Atlas {
        key: String,
        url: String,
        metadata: Option<Value>,
        transport: Option<TransportSettings>,
    },
    Audio {
        key: String,
        url: String,
        transport: Option<TransportSettings>,
    },
    Video {
        key: String,
        url: String,
        as_blob: bool,
        no_audio: bool,
        transport: Option<TransportSettings>,
    },
}

impl LoadRequest {
    pub fn key(&self) -> &str {
        match self {
            Self::Image { key, .. }
            | Self::Svg { key, .. }
            | Self::SpriteSheet { key, .. }
            | Self::Atlas { key, .. }
            | Self::Audio { key, .. }
            | Self::Video { key, .. } => key,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Self::Image { url, .. }
            | Self::Svg { url, .. }
            | Self::SpriteSheet { url, .. }
            | Self::Atlas { url, .. }
            | Self::Audio { url, .. }
            | Self::Video { url, .. } => url,
        }
    }

    /// Cache the request lands in once the load completes.
    pub fn cache(&self) -> CacheKind {
        match self {
            Self::Image { .. } | Self::Svg { .. } | Self::SpriteSheet { .. } | Self::Atlas { .. } => {
                CacheKind::Texture
            }
            Self::Audio { .. } => CacheKind::Audio,
            Self::Video { .. } => CacheKind::Video,
        }
    }
}

//=== Sounds ==============================================================

/// Opaque handle to a sound instance owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundHandle(pub u64);

/// A currently playing sound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSound {
    pub handle: SoundHandle,
    pub key: String,
}

/// Notifications for one `play` call.
///
/// `finished` is abandoned when the sound is stopped before it ends.
#[derive(Debug)]
pub struct Playback {
    pub started: Completion<()>,
    pub finished: Completion<()>,
}

//=== Service Traits ======================================================

/// Scene lifecycle operations.
///
/// Every method taking an id fails with `StageError::SceneNotFound` when
/// the engine does not know the scene.
pub trait SceneDirector {
    /// Registers a scene with the engine. Adding a known id is a no-op.
    fn add_scene(&mut self, id: &SceneId);

    /// Starts a scene in the background. Its preload runs on the next tick.
    fn launch(&mut self, id: &SceneId) -> Result<(), StageError>;

    /// Restarts a scene, re-running its preload.
    fn restart(&mut self, id: &SceneId) -> Result<(), StageError>;

    fn status(&self, id: &SceneId) -> Result<LifecycleStatus, StageError>;

    fn sleep(&mut self, id: &SceneId) -> Result<(), StageError>;

    fn wake(&mut self, id: &SceneId) -> Result<(), StageError>;

    fn is_sleeping(&self, id: &SceneId) -> Result<bool, StageError>;

    /// Makes the scene active and visible.
    fn run(&mut self, id: &SceneId) -> Result<(), StageError>;
}

/// Resident asset caches.
pub trait ResourceCache {
    fn is_resident(&self, cache: CacheKind, key: &str) -> bool;

    /// Registers an inline image payload directly as a texture.
    fn add_inline_texture(&mut self, key: &str, payload: &InlinePayload);
}

/// Per-scene asset loader.
pub trait LoadQueue {
    fn enqueue(&mut self, scene: &SceneId, request: LoadRequest) -> Result<(), StageError>;

    /// Starts loading the queue. An empty queue completes immediately.
    fn start_load(&mut self, scene: &SceneId) -> Result<(), StageError>;

    fn is_loading(&self, scene: &SceneId) -> Result<bool, StageError>;

    /// Completion resolved the next time the scene's loader finishes.
    fn on_load_complete(&mut self, scene: &SceneId) -> Result<Completion<()>, StageError>;
}

/// Scene-scoped timers.
pub trait TimerService {
    fn delayed_call(&mut self, scene: &SceneId, delay: Duration) -> Completion<()>;

    /// Cancels every pending timer owned by `scene`.
    fn remove_all_events(&mut self, scene: &SceneId);
}

/// Global sound manager.
pub trait AudioService {
    fn active_sounds(&self) -> Vec<ActiveSound>;

    fn stop_sound(&mut self, handle: SoundHandle);

    /// Creates a sound instance for a resident audio key.
    fn add_sound(&mut self, key: &str) -> Option<SoundHandle>;

    fn play(&mut self, handle: SoundHandle) -> Result<Playback, StageError>;

    /// Starts decoding an inline audio payload.
    fn decode_audio(&mut self, key: &str, payload: &InlinePayload);

    /// Receiver of keys whose decode finished.
    fn decode_notifications(&self) -> Receiver<String>;
}

/// Everything the orchestrator needs from a host engine.
pub trait Engine: SceneDirector + ResourceCache + LoadQueue + TimerService + AudioService {}

impl<T> Engine for T where
    T: SceneDirector + ResourceCache + LoadQueue + TimerService + AudioService
{
}

//=========================================================================
// Unit Tests
//=========================================================================
