//=========================================================================
// Transition Controller
//=========================================================================
//
// Scene-to-scene hand-off.
//
// Per-target phases:
//   NotStarted ──launch──> Launching ──preload──> Loading ──complete──> Ready ──scene-start──> Active
//
// request_start(from, target):
//   1. from == target → nothing happens
//   2. teardown of `from`: stop non-persistent sounds, cancel its timers,
//      drop its pending hand-offs, run its `dispose` hook
//   3. NotStarted → launch, Sleeping → restart, unknown → SceneNotFound
//   4. still preparing? emit scene-loading:true and wait on the engine's
//      load completion; `poll()` later emits scene-start, then
//      scene-loading:false
//   5. otherwise emit scene-start immediately
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use super::SceneId;
use crate::core::channel::{EventChannel, SceneLoading, SceneStart};
use crate::core::signal::{Completion, Resolution};
use crate::core::stage::Stage;
use crate::engine::{Engine, LifecycleStatus};
use crate::error::StageError;

//=== Transition Phase ====================================================

/// Where a target scene is in its hand-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionPhase {
    NotStarted,
    Launching,
    Loading,
    Ready,
    Active,
}

//=== Pending Transition ==================================================

#[derive(Debug)]
struct PendingTransition {
    from: SceneId,
    target: SceneId,
    completion: Completion<()>,
}

//=== Transition Controller ===============================================

/// Drives scene hand-offs and background preloads.
#[derive(Debug, Default)]
pub struct TransitionController {
    pending: Vec<PendingTransition>,
    phases: HashMap<SceneId, TransitionPhase>,
}

impl TransitionController {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        Self::default()
    }

    //--- Hand-off ---------------------------------------------------------

    /// Hands off from `from` to `target`.
    ///
    /// Either activates `target` right away or leaves a pending hand-off
    /// that [`TransitionController::poll`] completes once the target's
    /// load finishes.
    pub fn request_start<E: Engine + 'static>(
        &mut self,
        stage: &mut Stage<E>,
        channel: &mut EventChannel<Stage<E>>,
        from: &SceneId,
        target: &SceneId,
    ) -> Result<(), StageError> {
        if from == target {
            debug!("Scene {} asked to start itself, ignoring", target);
            return Ok(());
        }
        info!("Scene {} start requested from {}", target, from);

        self.teardown(stage, from);

        let issued = match stage.engine.status(target)? {
            LifecycleStatus::NotStarted => {
                debug!("Scene {} not started, launching", target);
                stage.launch(target)?;
                true
            }
            LifecycleStatus::Sleeping => {
                debug!("Scene {} sleeping, restarting", target);
                stage.restart(target)?;
                true
            }
            _ => false,
        };
        if issued {
            self.set_phase(target, TransitionPhase::Launching);
        }

        let must_wait =
            issued || stage.is_preparing(target)? || stage.registry.is_loading(target);
        if must_wait {
            publish_loading(stage, channel, target, true);
            let completion = stage.engine.on_load_complete(target)?;
            self.pending.push(PendingTransition {
                from: from.clone(),
                target: target.clone(),
                completion,
            });
            self.set_phase(target, TransitionPhase::Loading);
            debug!("Scene {} waiting for its load to complete", target);
            return Ok(());
        }

        self.set_phase(target, TransitionPhase::Ready);
        self.activate(stage, channel, from, target)
    }

    /// Launches every id that has not been started yet, without waiting.
    ///
    /// Scenes in any other state are left alone.
    pub fn preload_many<E: Engine + 'static>(
        &mut self,
        stage: &mut Stage<E>,
        from: &SceneId,
        ids: &[SceneId],
    ) -> Result<(), StageError> {
        for id in ids {
            match stage.engine.status(id)? {
                LifecycleStatus::NotStarted => {
                    debug!("Scene {} preloading {} in the background", from, id);
                    stage.launch(id)?;
                    self.set_phase(id, TransitionPhase::Launching);
                }
                status => debug!("Scene {} already {:?}, not preloading", id, status),
            }
        }
        Ok(())
    }

    //--- Tick -------------------------------------------------------------

    /// Completes every pending hand-off whose load has finished.
    ///
    /// Emits `scene-start` and then `scene-loading:false` for each. A
    /// hand-off whose completion was abandoned is dropped with a warning.
    /// All ready hand-offs are processed; the first failure is returned.
    pub fn poll<E: Engine + 'static>(
        &mut self,
        stage: &mut Stage<E>,
        channel: &mut EventChannel<Stage<E>>,
    ) -> Result<(), StageError> {
        let mut ready = Vec::new();
        let mut abandoned = Vec::new();
        self.pending.retain_mut(|pending| match pending.completion.poll() {
            Resolution::Pending => true,
            Resolution::Resolved(()) => {
                ready.push((pending.from.clone(), pending.target.clone()));
                false
            }
            Resolution::Abandoned => {
                abandoned.push(pending.target.clone());
                false
            }
        });

        for target in abandoned {
            warn!("Load completion for scene {} was abandoned, hand-off dropped", target);
            self.phases.remove(&target);
            publish_loading(stage, channel, &target, false);
        }

        let mut first_error = None;
        for (from, target) in ready {
            self.set_phase(&target, TransitionPhase::Ready);
            if let Err(err) = self.activate(stage, channel, &from, &target) {
                error!("Hand-off from {} to {} failed: {}", from, target, err);
                first_error.get_or_insert(err);
            }
            publish_loading(stage, channel, &target, false);
        }
        first_error.map_or(Ok(()), Err)
    }

    //--- Inspection -------------------------------------------------------

    /// Current phase of `id`.
    pub fn phase(&self, id: &SceneId) -> TransitionPhase {
        self.phases
            .get(id)
            .copied()
            .unwrap_or(TransitionPhase::NotStarted)
    }

    /// Pending hand-offs as `(from, target)` pairs, oldest first.
    pub fn pending(&self) -> impl Iterator<Item = (&SceneId, &SceneId)> {
        self.pending.iter().map(|p| (&p.from, &p.target))
    }

    //--- Internal Helpers -------------------------------------------------

    fn teardown<E: Engine + 'static>(&mut self, stage: &mut Stage<E>, from: &SceneId) {
        for sound in stage.engine.active_sounds() {
            if stage.config.persistent_sounds.contains(&sound.key) {
                continue;
            }
            debug!("Stopping sound '{}' on leaving {}", sound.key, from);
            stage.engine.stop_sound(sound.handle);
        }

        stage.engine.remove_all_events(from);

        let before = self.pending.len();
        self.pending.retain(|pending| pending.from != *from);
        if self.pending.len() != before {
            debug!("Dropped {} pending hand-offs from {}", before - self.pending.len(), from);
        }

        if let Some(scene) = stage.scenes.get_mut(from) {
            debug!("Scene {} dispose", from);
            scene.dispose();
        }
        self.phases.remove(from);
    }

    fn activate<E: Engine + 'static>(
        &mut self,
        stage: &mut Stage<E>,
        channel: &mut EventChannel<Stage<E>>,
        from: &SceneId,
        target: &SceneId,
    ) -> Result<(), StageError> {
        let event = SceneStart {
            from: from.clone(),
            id: target.clone(),
        };
        channel.publish(stage, &event).into_result()?;
        self.set_phase(target, TransitionPhase::Active);
        Ok(())
    }

    fn set_phase(&mut self, id: &SceneId, phase: TransitionPhase) {
        self.phases.insert(id.clone(), phase);
    }
}

/// Emits `scene-loading`. Subscriber failures are logged by the channel.
pub(crate) fn publish_loading<E: Engine + 'static>(
    stage: &mut Stage<E>,
    channel: &mut EventChannel<Stage<E>>,
    id: &SceneId,
    is_loading: bool,
) {
    let event = SceneLoading {
        id: id.clone(),
        is_loading,
    };
    channel.publish(stage, &event);
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StageConfig;
    use crate::core::assets::AssetCatalog;
    use crate::core::scene::{Scene, SceneContext};
    use crate::engine::{AudioService, EngineCall, HeadlessEngine, SceneDirector, TimerService};
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    type Events = Rc<RefCell<Vec<String>>>;

    struct Probe {
        disposed: Rc<RefCell<u32>>,
    }

    impl Scene<HeadlessEngine> for Probe {
        fn start(&mut self, _ctx: &mut SceneContext<'_, HeadlessEngine>) {}

        fn dispose(&mut self) {
            *self.disposed.borrow_mut() += 1;
        }
    }

    struct Harness {
        stage: Stage<HeadlessEngine>,
        channel: EventChannel<Stage<HeadlessEngine>>,
        controller: TransitionController,
        events: Events,
        disposed: Rc<RefCell<u32>>,
    }

    fn harness() -> Harness {
        let mut engine = HeadlessEngine::new();
        for id in ["A", "B"] {
            engine.register(&id.into());
        }
        let mut stage = Stage::new(engine, StageConfig::new(), AssetCatalog::new());
        let disposed = Rc::new(RefCell::new(0));
        for id in ["A", "B"] {
            stage.scenes.register(
                id.into(),
                Box::new(Probe {
                    disposed: Rc::clone(&disposed),
                }),
            );
        }

        let events: Events = Rc::default();
        let mut channel = EventChannel::new();
        let sink = Rc::clone(&events);
        channel.subscribe(move |stage: &mut Stage<HeadlessEngine>, event: &SceneLoading| {
            stage.registry.set_loading(&event.id, event.is_loading);
            sink.borrow_mut()
                .push(format!("loading {} {}", event.id, event.is_loading));
            Ok(())
        });
        let sink = Rc::clone(&events);
        channel.subscribe(move |stage: &mut Stage<HeadlessEngine>, event: &SceneStart| {
            sink.borrow_mut().push(format!("start {}", event.id));
            stage.activate(&event.from, &event.id)
        });

        Harness {
            stage,
            channel,
            controller: TransitionController::new(),
            events,
            disposed,
        }
    }

    impl Harness {
        fn request(&mut self, from: &str, to: &str) -> Result<(), StageError> {
            self.controller
                .request_start(&mut self.stage, &mut self.channel, &from.into(), &to.into())
        }

        fn poll(&mut self) -> Result<(), StageError> {
            self.controller.poll(&mut self.stage, &mut self.channel)
        }

        fn events(&self) -> Vec<String> {
            self.events.borrow().clone()
        }
    }

    #[test]
    fn self_transition_does_nothing() {
        let mut h = harness();
        h.stage.engine.set_status(&"A".into(), LifecycleStatus::Running);
        h.stage.engine.start_sound("se");

        h.request("A", "A").unwrap();

        assert!(h.events().is_empty());
        assert!(h.stage.engine.calls().is_empty());
        assert_eq!(h.stage.engine.active_sounds().len(), 1);
        assert_eq!(*h.disposed.borrow(), 0);
    }

    #[test]
    fn running_target_starts_immediately() {
        let mut h = harness();
        h.stage.engine.set_status(&"A".into(), LifecycleStatus::Running);
        h.stage.engine.set_status(&"B".into(), LifecycleStatus::Running);

        h.request("A", "B").unwrap();

        assert_eq!(h.events(), vec!["start B"]);
        assert_eq!(h.controller.phase(&"B".into()), TransitionPhase::Active);
        assert_eq!(h.stage.active_scene(), Some(&SceneId::from("B")));
        assert_eq!(h.stage.previous_scene(), Some(&SceneId::from("A")));
        assert_eq!(*h.disposed.borrow(), 1);
        assert!(h.stage.engine.is_sleeping(&"A".into()).unwrap());
    }

    #[test]
    fn not_started_target_waits_for_its_load() {
        let mut h = harness();
        h.stage.engine.set_status(&"A".into(), LifecycleStatus::Running);

        h.request("A", "B").unwrap();
        assert_eq!(h.events(), vec!["loading B true"]);
        assert_eq!(h.controller.phase(&"B".into()), TransitionPhase::Loading);
        assert!(h.stage.engine.calls().contains(&EngineCall::Launch("B".into())));

        // Nothing fires before the engine reports completion.
        h.poll().unwrap();
        assert_eq!(h.events().len(), 1);

        // Boot the scene the way the orchestrator does, then finish it.
        h.stage.booting.clear();
        h.stage.preload(&"B".into()).unwrap();
        h.poll().unwrap();

        assert_eq!(
            h.events(),
            vec!["loading B true", "start B", "loading B false"]
        );
        assert_eq!(h.controller.phase(&"B".into()), TransitionPhase::Active);
        assert_eq!(h.controller.pending().count(), 0);
    }

    #[test]
    fn sleeping_target_is_restarted() {
        let mut h = harness();
        h.stage.engine.set_status(&"A".into(), LifecycleStatus::Running);
        h.stage.engine.set_status(&"B".into(), LifecycleStatus::Sleeping);

        h.request("A", "B").unwrap();

        assert!(h.stage.engine.calls().contains(&EngineCall::Restart("B".into())));
        assert_eq!(h.events(), vec!["loading B true"]);
    }

    #[test]
    fn unknown_target_is_fatal() {
        let mut h = harness();
        let err = h.request("A", "Nowhere").unwrap_err();
        assert!(matches!(err, StageError::SceneNotFound { id } if id == "Nowhere"));
        assert!(h.events().is_empty());
    }

    #[test]
    fn teardown_keeps_persistent_sounds_and_cancels_timers() {
        let mut h = harness();
        h.stage.engine.set_status(&"B".into(), LifecycleStatus::Running);
        h.stage.engine.start_sound("bgm");
        h.stage.engine.start_sound("voice");
        let mut timer = h.stage.engine.delayed_call(&"A".into(), Duration::from_secs(1));

        h.request("A", "B").unwrap();

        let playing: Vec<String> = h
            .stage
            .engine
            .active_sounds()
            .into_iter()
            .map(|sound| sound.key)
            .collect();
        assert_eq!(playing, vec!["bgm"]);
        assert_eq!(timer.poll(), Resolution::Abandoned);
    }

    #[test]
    fn leaving_a_scene_drops_its_pending_hand_offs() {
        let mut h = harness();
        h.stage.engine.set_status(&"A".into(), LifecycleStatus::Running);
        h.request("A", "B").unwrap();
        assert_eq!(h.controller.pending().count(), 1);

        // B finished loading elsewhere; its creation cleared the flag.
        h.stage.booting.clear();
        h.stage.engine.set_status(&"B".into(), LifecycleStatus::Running);
        h.stage.registry.set_loading(&"B".into(), false);
        h.request("A", "B").unwrap();

        assert_eq!(h.controller.pending().count(), 0);
        assert_eq!(h.events().last().map(String::as_str), Some("start B"));
    }

    #[test]
    fn abandoned_completion_clears_loading_flag() {
        let mut h = harness();
        h.stage.engine.set_status(&"A".into(), LifecycleStatus::Running);
        h.request("A", "B").unwrap();

        h.stage.engine.drop_load_listeners(&"B".into());
        h.poll().unwrap();

        assert_eq!(h.events(), vec!["loading B true", "loading B false"]);
        assert_eq!(h.controller.phase(&"B".into()), TransitionPhase::NotStarted);
        assert_eq!(h.stage.active_scene(), None);
    }

    #[test]
    fn preload_many_launches_only_unstarted_scenes() {
        let mut h = harness();
        h.stage.engine.set_status(&"A".into(), LifecycleStatus::Running);

        h.controller
            .preload_many(&mut h.stage, &"A".into(), &["A".into(), "B".into()])
            .unwrap();

        let launches: Vec<&EngineCall> = h
            .stage
            .engine
            .calls()
            .iter()
            .filter(|call| matches!(call, EngineCall::Launch(_)))
            .collect();
        assert_eq!(launches, vec![&EngineCall::Launch("B".into())]);
        assert_eq!(h.controller.phase(&"B".into()), TransitionPhase::Launching);
        assert!(h.events().is_empty());
    }

    #[test]
    fn preload_many_propagates_unknown_scene() {
        let mut h = harness();
        let err = h
            .controller
            .preload_many(&mut h.stage, &"A".into(), &["Ghost".into()])
            .unwrap_err();
        assert!(matches!(err, StageError::SceneNotFound { .. }));
    }
}
