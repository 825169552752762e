//=========================================================================
// Orchestration Topics
//=========================================================================
//
// The two topics the orchestrator itself publishes and subscribes to.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::Topic;
use crate::core::scene::SceneId;

//=== Topics ==============================================================

/// A scene started or finished loading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneLoading {
    pub id: SceneId,
    pub is_loading: bool,
}

impl Topic for SceneLoading {
    const NAME: &'static str = "scene-loading";
}

/// `id` becomes the active scene, handed off from `from`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneStart {
    pub from: SceneId,
    pub id: SceneId,
}

impl Topic for SceneStart {
    const NAME: &'static str = "scene-start";
}
