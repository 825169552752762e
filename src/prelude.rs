//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use scene_conductor::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Orchestration
pub use crate::orchestrator::{LoaderScene, Orchestrator, OrchestratorBuilder};
pub use crate::config::StageConfig;
pub use crate::error::{AssetError, StageError};

// Engine contract
pub use crate::engine::{
    AudioService, Engine, HeadlessEngine, LoadQueue, ResourceCache, SceneDirector, SoundHandle,
    TimerService,
};

// Scene system
pub use crate::core::scene::{Scene, SceneContext, SceneId};
pub use crate::core::stage::Stage;

// Assets
pub use crate::core::assets::{AssetCatalog, LoadOptions, Manifest};

// Events
pub use crate::core::channel::{SceneLoading, SceneStart};

// Playback
pub use crate::core::playback::{PlaybackOptions, PlaybackProgress, SequentialPlayback};
