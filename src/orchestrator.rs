//=========================================================================
// Orchestrator
//
// Composition root: owns the stage, the event channel and the transition
// controller, and drives them from the host's frame loop.
//
// Architecture:
// ```text
//     OrchestratorBuilder ──build()──> Orchestrator ──start()──> loader launched
//         │                               │
//         ├─ with_config()                └─ tick() once per host frame
//         ├─ with_catalog()                    1. queued scene commands
//         └─ with_scene()                      2. boot launched scenes
//                                              3. inline-audio decodes
//                                              4. waiting hand-offs
//                                              5. creation hooks
//                                              6. active scene update
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::mem;

use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use crate::config::StageConfig;
use crate::core::assets::AssetCatalog;
use crate::core::channel::{Delivery, EventChannel, SceneLoading, SceneStart, SubscriptionId, Topic};
use crate::core::registry::StatusRegistry;
use crate::core::scene::{
    publish_loading, Scene, SceneCommand, SceneContext, SceneId, TransitionController,
};
use crate::core::signal::Resolution;
use crate::core::stage::Stage;
use crate::engine::Engine;
use crate::error::StageError;

//=== Loader Scene ========================================================

/// Default loader scene, registered when the application provides none.
///
/// It has no hooks of its own. The orchestrator loads the shared assets
/// while it is active and hands off to the configured next scene.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoaderScene;

impl<E: Engine> Scene<E> for LoaderScene {
    fn start(&mut self, _ctx: &mut SceneContext<'_, E>) {}
}

//=== OrchestratorBuilder =================================================

/// Builder for an [`Orchestrator`].
///
/// # Examples
///
/// ```no_run
/// use scene_conductor::prelude::*;
///
/// struct Main;
///
/// impl<E: Engine> Scene<E> for Main {
///     fn start(&mut self, _ctx: &mut SceneContext<'_, E>) {}
/// }
///
/// let mut stage = OrchestratorBuilder::new(HeadlessEngine::new())
///     .with_config(StageConfig::new().with_next_scene("Main"))
///     .with_scene("Main", Box::new(Main))
///     .build();
///
/// stage.start().unwrap();
/// loop {
///     stage.tick().unwrap();
/// #   break;
/// }
/// ```
pub struct OrchestratorBuilder<E: Engine + 'static> {
    engine: E,
    config: StageConfig,
    catalog: AssetCatalog,
    scenes: Vec<(SceneId, Box<dyn Scene<E>>)>,
}

impl<E: Engine + 'static> OrchestratorBuilder<E> {
    /// Creates a builder around `engine` with default configuration and an
    /// empty catalog.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            config: StageConfig::new(),
            catalog: AssetCatalog::new(),
            scenes: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: StageConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_catalog(mut self, catalog: AssetCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Registers a scene object.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn with_scene(mut self, id: impl Into<SceneId>, scene: Box<dyn Scene<E>>) -> Self {
        let id = id.into();
        assert!(!id.as_str().is_empty(), "Scene id must not be empty");
        self.scenes.push((id, scene));
        self
    }

    /// Builds the orchestrator and wires its internal subscriptions:
    /// `scene-loading` updates the registry and `scene-start` activates the
    /// target. Application subscribers added later run after these.
    pub fn build(self) -> Orchestrator<E> {
        let mut stage = Stage::new(self.engine, self.config, self.catalog);
        for (id, scene) in self.scenes {
            stage.scenes.register(id, scene);
        }
        let loader = stage.config.loader_scene.clone();
        if !stage.scenes.contains(&loader) {
            debug!("No scene registered as {}, using the default loader", loader);
            stage.scenes.register(loader, Box::new(LoaderScene));
        }

        let mut channel = EventChannel::new();
        channel.subscribe(|stage: &mut Stage<E>, event: &SceneLoading| {
            stage.registry.set_loading(&event.id, event.is_loading);
            Ok(())
        });
        channel.subscribe(|stage: &mut Stage<E>, event: &SceneStart| {
            stage.activate(&event.from, &event.id)
        });

        info!(
            "Built orchestrator ({} scenes, loader: {}, next: {})",
            stage.scenes.len(),
            stage.config.loader_scene,
            stage.config.next_scene
        );

        Orchestrator {
            stage,
            channel,
            controller: TransitionController::new(),
            started: false,
        }
    }
}

//=== Orchestrator ========================================================

/// Scene orchestration runtime.
///
/// Single-threaded and cooperative: nothing happens between calls to
/// [`Orchestrator::tick`].
pub struct Orchestrator<E: Engine + 'static> {
    stage: Stage<E>,
    channel: EventChannel<Stage<E>>,
    controller: TransitionController,
    started: bool,
}

impl<E: Engine + 'static> Orchestrator<E> {
    //--- Startup ----------------------------------------------------------

    /// Seeds the registry, adds every scene to the engine (loader first)
    /// and launches the loader scene, which becomes the active scene.
    ///
    /// Calling it again has no effect.
    pub fn start(&mut self) -> Result<(), StageError> {
        if self.started {
            warn!("Orchestrator already started");
            return Ok(());
        }
        let loader = self.stage.config.loader_scene.clone();

        self.stage.scenes.promote(&loader);
        let ids = self.stage.scenes.ids().to_vec();
        for id in &ids {
            self.stage.registry.seed(id, *id == loader);
            self.stage.engine.add_scene(id);
        }

        self.stage.launch(&loader)?;
        self.started = true;
        info!("Orchestrator started with {} scenes, loader {}", ids.len(), loader);

        let event = SceneStart {
            from: loader.clone(),
            id: loader,
        };
        self.channel.publish(&mut self.stage, &event).into_result()?;
        Ok(())
    }

    //--- Frame ------------------------------------------------------------

    /// Runs one frame of orchestration.
    ///
    /// Every step runs even if an earlier one failed; the first failure is
    /// returned.
    pub fn tick(&mut self) -> Result<(), StageError> {
        let mut first_error = None;
        let mut keep = |result: Result<(), StageError>| {
            if let Err(err) = result {
                error!("Orchestrator tick: {}", err);
                first_error.get_or_insert(err);
            }
        };

        //--- Step 1: Scene commands ---------------------------------------
        for command in self.stage.commands.take() {
            keep(self.run_command(command));
        }

        //--- Step 2: Boot launched scenes ---------------------------------
        for id in mem::take(&mut self.stage.booting) {
            keep(self.boot(&id));
        }

        //--- Step 3: Inline audio decodes ---------------------------------
        let decoded = self.stage.loader.pump_decodes(&mut self.stage.engine);
        if !decoded.is_empty() {
            debug!("Decoded inline audio: {:?}", decoded);
        }

        //--- Step 4: Waiting hand-offs ------------------------------------
        keep(self.controller.poll(&mut self.stage, &mut self.channel));

        //--- Step 5: Creation hooks ---------------------------------------
        keep(self.run_creation_hooks());

        //--- Step 6: Active scene -----------------------------------------
        self.stage.update_active();

        first_error.map_or(Ok(()), Err)
    }

    //--- Transitions ------------------------------------------------------

    /// Hands off from `from` to `target`. See [`TransitionController::request_start`].
    pub fn request_start(
        &mut self,
        from: impl Into<SceneId>,
        target: impl Into<SceneId>,
    ) -> Result<(), StageError> {
        self.controller
            .request_start(&mut self.stage, &mut self.channel, &from.into(), &target.into())
    }

    /// Launches every not-yet-started id in the background.
    pub fn preload_many<I, T>(&mut self, from: impl Into<SceneId>, ids: I) -> Result<(), StageError>
    where
        I: IntoIterator<Item = T>,
        T: Into<SceneId>,
    {
        let ids: Vec<SceneId> = ids.into_iter().map(Into::into).collect();
        self.controller.preload_many(&mut self.stage, &from.into(), &ids)
    }

    //--- Events -----------------------------------------------------------

    /// Subscribes an application handler to topic `T`.
    pub fn subscribe<T, F>(&mut self, handler: F) -> SubscriptionId
    where
        T: Topic,
        F: FnMut(&mut Stage<E>, &T) -> Result<(), StageError> + 'static,
    {
        self.channel.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.channel.unsubscribe(id)
    }

    /// Publishes `event` to every subscriber of `T`.
    pub fn publish<T: Topic>(&mut self, event: &T) -> Delivery {
        self.channel.publish(&mut self.stage, event)
    }

    //--- Accessors --------------------------------------------------------

    pub fn stage(&self) -> &Stage<E> {
        &self.stage
    }

    pub fn stage_mut(&mut self) -> &mut Stage<E> {
        &mut self.stage
    }

    pub fn engine(&self) -> &E {
        &self.stage.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.stage.engine
    }

    pub fn registry(&self) -> &StatusRegistry {
        &self.stage.registry
    }

    pub fn active_scene(&self) -> Option<&SceneId> {
        self.stage.active_scene()
    }

    pub fn controller(&self) -> &TransitionController {
        &self.controller
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    //--- Internal Helpers -------------------------------------------------

    fn run_command(&mut self, command: SceneCommand) -> Result<(), StageError> {
        match command {
            SceneCommand::Start { from, to } => {
                self.controller
                    .request_start(&mut self.stage, &mut self.channel, &from, &to)
            }
            SceneCommand::Preload { from, ids } => {
                self.controller.preload_many(&mut self.stage, &from, &ids)
            }
        }
    }

    /// Runs the preload of a freshly launched scene. The loader also
    /// announces its own loading and launches the next scene.
    fn boot(&mut self, id: &SceneId) -> Result<(), StageError> {
        let is_loader = *id == self.stage.config.loader_scene;
        if is_loader {
            publish_loading(&mut self.stage, &mut self.channel, id, true);
        }

        let queued = self.stage.preload(id)?;
        debug!("Scene {} preload queued {} assets", id, queued.len());

        if is_loader {
            let next = self.stage.config.next_scene.clone();
            self.controller.preload_many(&mut self.stage, id, &[next])?;
        }
        Ok(())
    }

    /// Finishes scenes whose preload batch completed: clears their
    /// loading flag and hands the loader off to the next scene.
    fn run_creation_hooks(&mut self) -> Result<(), StageError> {
        let mut created = Vec::new();
        self.stage
            .creating
            .retain_mut(|(id, completion)| match completion.poll() {
                Resolution::Pending => true,
                Resolution::Resolved(()) => {
                    created.push(id.clone());
                    false
                }
                Resolution::Abandoned => {
                    warn!("Load completion for scene {} was abandoned", id);
                    created.push(id.clone());
                    false
                }
            });

        let mut first_error = None;
        for id in created {
            if self.stage.registry.is_loading(&id) {
                publish_loading(&mut self.stage, &mut self.channel, &id, false);
            }
            debug!("Scene {} created", id);

            if id == self.stage.config.loader_scene {
                let next = self.stage.config.next_scene.clone();
                if let Err(err) =
                    self.controller
                        .request_start(&mut self.stage, &mut self.channel, &id, &next)
                {
                    error!("Loader could not hand off to {}: {}", next, err);
                    first_error.get_or_insert(err);
                }
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
