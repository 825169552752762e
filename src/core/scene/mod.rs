//=========================================================================
// Scene System
//=========================================================================
//
// Scene identity, the `Scene` trait and the hand-off controller.
//
// Architecture:
//   SceneSet<E>
//     └─ scenes: HashMap<SceneId, Box<dyn Scene<E>>>  (registration order kept)
//   TransitionQueue
//     └─ SceneCommand::{Start, Preload}  (queued by scenes, drained per tick)
//   TransitionController
//     └─ pending hand-offs waiting on a load completion
//
// Flow:
//   Scene::start(ctx) → ctx.start("Next") → TransitionQueue
//     → Orchestrator::tick() → TransitionController::request_start()
//
//=========================================================================

//=== External Dependencies ===============================================

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

//=== Internal Dependencies ===============================================

use crate::core::assets::{LoadOptions, Manifest};
use crate::core::registry::StatusRegistry;
use crate::engine::Engine;

//=== Module Declarations =================================================

mod controller;
mod scene_set;
mod transition_queue;

//=== Public API ==========================================================

pub use controller::{TransitionController, TransitionPhase};
pub(crate) use controller::publish_loading;
pub use scene_set::SceneSet;
pub use transition_queue::{SceneCommand, TransitionQueue};

//=== Scene Id ============================================================

/// String identifier of a scene, unique within one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SceneId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&SceneId> for SceneId {
    fn from(id: &SceneId) -> Self {
        id.clone()
    }
}

impl Borrow<str> for SceneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SceneId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for SceneId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

//=== Scene Context =======================================================

/// What a scene sees while one of its hooks runs.
///
/// Scene changes are requested through the context and take effect on the
/// next orchestrator tick, never re-entrantly.
pub struct SceneContext<'a, E: Engine> {
    pub id: &'a SceneId,
    pub engine: &'a mut E,
    pub registry: &'a StatusRegistry,
    pub(crate) commands: &'a mut TransitionQueue,
}

impl<'a, E: Engine> SceneContext<'a, E> {
    pub(crate) fn new(
        id: &'a SceneId,
        engine: &'a mut E,
        registry: &'a StatusRegistry,
        commands: &'a mut TransitionQueue,
    ) -> Self {
        Self {
            id,
            engine,
            registry,
            commands,
        }
    }

    /// Requests a hand-off from this scene to `target`.
    pub fn start(&mut self, target: impl Into<SceneId>) {
        self.commands.push(SceneCommand::Start {
            from: self.id.clone(),
            to: target.into(),
        });
    }

    /// Requests background preparation of `targets`.
    pub fn preload<I, T>(&mut self, targets: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<SceneId>,
    {
        self.commands.push(SceneCommand::Preload {
            from: self.id.clone(),
            ids: targets.into_iter().map(Into::into).collect(),
        });
    }
}

//=== Scene Trait =========================================================

/// Application scene driven by the orchestrator.
///
/// Only `start()` is required. Every other hook has an empty default.
///
/// ```rust
/// # use scene_conductor::prelude::*;
/// struct Title;
///
/// impl<E: Engine> Scene<E> for Title {
///     fn start(&mut self, ctx: &mut SceneContext<'_, E>) {
///         ctx.start("Main");
///     }
/// }
/// ```
pub trait Scene<E: Engine> {
    /// Called when the scene becomes the active scene.
    fn start(&mut self, ctx: &mut SceneContext<'_, E>);

    /// Called once per tick while the scene is active.
    fn update(&mut self, _ctx: &mut SceneContext<'_, E>) {}

    /// Called when the scene hands off to another one.
    ///
    /// Sounds and timed callbacks are already cleared by the controller.
    fn dispose(&mut self) {}

    /// Extra assets this scene needs beyond the catalog's scoped entries.
    fn manifests_for(&self, _id: &SceneId) -> Option<Manifest> {
        None
    }

    /// Overrides the configured base URLs and transport settings.
    fn load_options(&self) -> Option<LoadOptions> {
        None
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
