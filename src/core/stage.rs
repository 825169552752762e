//=========================================================================
// Stage
//=========================================================================
//
// Shared state of one orchestrator, handed to channel subscribers.
//
// Architecture:
//   Stage<E>
//     ├─ engine: E                       (host services)
//     ├─ registry: StatusRegistry        (scene → loading flag)
//     ├─ scenes: SceneSet<E>             (application scene objects)
//     ├─ loader: ResourceLoader          (batch loading, decodes)
//     ├─ catalog: AssetCatalog           (scoped / common manifests)
//     ├─ commands: TransitionQueue       (requests from scene hooks)
//     ├─ booting / creating              (launch → preload → create)
//     └─ active / previous               (hand-off bookkeeping)
//
//=========================================================================

//=== External Dependencies ===============================================

use log::{debug, info};

//=== Internal Dependencies ===============================================

use crate::config::StageConfig;
use crate::core::assets::{AssetCatalog, ResourceLoader};
use crate::core::registry::StatusRegistry;
use crate::core::scene::{SceneContext, SceneId, SceneSet, TransitionQueue};
use crate::core::signal::Completion;
use crate::engine::Engine;
use crate::error::StageError;

//=== Stage ===============================================================

/// Everything the orchestrator owns besides its channel and controller.
pub struct Stage<E: Engine> {
    pub(crate) engine: E,
    pub(crate) registry: StatusRegistry,
    pub(crate) scenes: SceneSet<E>,
    pub(crate) loader: ResourceLoader,
    pub(crate) catalog: AssetCatalog,
    pub(crate) config: StageConfig,
    pub(crate) commands: TransitionQueue,
    /// Launched or restarted scenes whose preload runs on the next tick.
    pub(crate) booting: Vec<SceneId>,
    /// Scenes whose preload batch is in flight, with its completion.
    pub(crate) creating: Vec<(SceneId, Completion<()>)>,
    pub(crate) active: Option<SceneId>,
    pub(crate) previous: Option<SceneId>,
}

impl<E: Engine> Stage<E> {
    //--- Construction -----------------------------------------------------

    pub(crate) fn new(engine: E, config: StageConfig, catalog: AssetCatalog) -> Self {
        Self {
            engine,
            registry: StatusRegistry::new(),
            scenes: SceneSet::new(),
            loader: ResourceLoader::new(config.reserved_keys.clone()),
            catalog,
            config,
            commands: TransitionQueue::new(),
            booting: Vec::new(),
            creating: Vec::new(),
            active: None,
            previous: None,
        }
    }

    //--- Accessors --------------------------------------------------------

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.registry
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn loader(&self) -> &ResourceLoader {
        &self.loader
    }

    pub fn catalog(&self) -> &AssetCatalog {
        &self.catalog
    }

    pub fn scenes(&self) -> &SceneSet<E> {
        &self.scenes
    }

    pub fn active_scene(&self) -> Option<&SceneId> {
        self.active.as_ref()
    }

    pub fn previous_scene(&self) -> Option<&SceneId> {
        self.previous.as_ref()
    }

    /// Commands queued by scene hooks, processed on the next tick.
    pub fn commands(&self) -> &TransitionQueue {
        &self.commands
    }

    //--- Lifecycle --------------------------------------------------------

    /// Launches `id` in the background and schedules its preload.
    pub(crate) fn launch(&mut self, id: &SceneId) -> Result<(), StageError> {
        self.engine.launch(id)?;
        self.schedule_boot(id);
        Ok(())
    }

    /// Restarts `id` and schedules its preload again.
    pub(crate) fn restart(&mut self, id: &SceneId) -> Result<(), StageError> {
        self.engine.restart(id)?;
        self.schedule_boot(id);
        Ok(())
    }

    fn schedule_boot(&mut self, id: &SceneId) {
        if !self.booting.contains(id) {
            debug!("Scene {} scheduled for preload", id);
            self.booting.push(id.clone());
        }
    }

    /// True while `id` has a preload scheduled or its loader is running.
    pub fn is_preparing(&self, id: &SceneId) -> Result<bool, StageError> {
        Ok(self.booting.contains(id) || self.engine.is_loading(id)?)
    }

    /// Runs the preload batch of `id`: its scoped catalog assets, the
    /// shared assets for the loader scene, and the scene's own extras.
    ///
    /// Registers a creation completion before the batch starts, so an
    /// empty batch still reports its completion.
    pub(crate) fn preload(&mut self, id: &SceneId) -> Result<Vec<String>, StageError> {
        let completion = self.engine.on_load_complete(id)?;
        self.creating.push((id.clone(), completion));

        let mut manifest = self.catalog.scoped_manifest(id);
        if *id == self.config.loader_scene {
            let mut common = self.catalog.common_manifest(&self.config.common);
            common.merge(manifest);
            manifest = common;
        }
        let scene = self.scenes.get(id);
        if let Some(extra) = scene.and_then(|scene| scene.manifests_for(id)) {
            manifest.merge(extra);
        }
        let options = scene
            .and_then(|scene| scene.load_options())
            .unwrap_or_else(|| self.config.load_options.clone());

        self.loader.load_batch(&mut self.engine, id, &manifest, &options)
    }

    /// Makes `target` the active scene after a hand-off from `from`.
    ///
    /// Sleeps `from`, wakes `target` if it was sleeping, resumes its
    /// update loop and runs its `start` hook.
    ///
    /// `from == target` is the loader's first activation: nothing is put
    /// to sleep and no previous scene is recorded.
    pub(crate) fn activate(&mut self, from: &SceneId, target: &SceneId) -> Result<(), StageError> {
        if from != target {
            if self.engine.status(from).is_ok() {
                self.engine.sleep(from)?;
            }
            self.previous = Some(from.clone());
        }
        if self.engine.is_sleeping(target)? {
            self.engine.wake(target)?;
        }
        self.engine.run(target)?;

        self.active = Some(target.clone());

        let Some(scene) = self.scenes.get_mut(target) else {
            return Err(StageError::SceneNotRegistered { id: target.clone() });
        };
        let mut ctx = SceneContext::new(target, &mut self.engine, &self.registry, &mut self.commands);
        scene.start(&mut ctx);
        info!("Scene {} active (from {})", target, from);
        Ok(())
    }

    /// Runs the active scene's `update` hook.
    pub(crate) fn update_active(&mut self) {
        let Some(id) = self.active.as_ref() else {
            return;
        };
        if let Some(scene) = self.scenes.get_mut(id) {
            let mut ctx = SceneContext::new(id, &mut self.engine, &self.registry, &mut self.commands);
            scene.update(&mut ctx);
        }
    }
}
