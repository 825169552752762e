//=========================================================================
// Headless Engine
//=========================================================================
//
// Deterministic in-memory implementation of the engine contract.
//
// Nothing completes on its own. The host (or a test) drives progress:
//   complete_load(scene)  → queued requests become resident, listeners fire
//   finish_decode(key)    → decode notification sent, audio becomes resident
//   finish_sound(handle)  → `finished` completion fires
//   advance(dt)           → due timers fire, in due order
//
// Every contract call is recorded in `calls()` for assertions.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, trace};

//=== Internal Dependencies ===============================================

use super::{
    ActiveSound, AudioService, CacheKind, LifecycleStatus, LoadQueue, LoadRequest, Playback,
    ResourceCache, SceneDirector, SoundHandle, TimerService,
};
use crate::core::assets::InlinePayload;
use crate::core::scene::SceneId;
use crate::core::signal::{oneshot, Completion, Signal};
use crate::error::StageError;

//=== Engine Call =========================================================

/// A recorded contract call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    AddScene(SceneId),
    Launch(SceneId),
    Restart(SceneId),
    Sleep(SceneId),
    Wake(SceneId),
    Run(SceneId),
    Enqueue { scene: SceneId, key: String },
    StartLoad(SceneId),
    AddInlineTexture(String),
    DecodeAudio(String),
    AddSound(String),
    Play(SoundHandle),
    StopSound(SoundHandle),
    DelayedCall { scene: SceneId, delay: Duration },
    RemoveAllEvents(SceneId),
}

//=== Internal State ======================================================

#[derive(Debug)]
struct SceneSlot {
    status: LifecycleStatus,
    queue: Vec<LoadRequest>,
    loading: bool,
    listeners: Vec<Signal<()>>,
}

impl SceneSlot {
    fn new() -> Self {
        Self {
            status: LifecycleStatus::NotStarted,
            queue: Vec::new(),
            loading: false,
            listeners: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct SoundSlot {
    key: String,
    playing: bool,
    finished: Option<Signal<()>>,
}

#[derive(Debug)]
struct Timer {
    scene: SceneId,
    due: Duration,
    signal: Signal<()>,
}

//=== Headless Engine =====================================================

/// In-memory engine for tests and tooling.
#[derive(Debug)]
pub struct HeadlessEngine {
    scenes: HashMap<SceneId, SceneSlot>,
    caches: HashMap<CacheKind, HashSet<String>>,
    sounds: BTreeMap<SoundHandle, SoundSlot>,
    next_sound: u64,
    timers: Vec<Timer>,
    clock: Duration,
    decoding: Vec<String>,
    decoded_tx: Sender<String>,
    decoded_rx: Receiver<String>,
    calls: Vec<EngineCall>,
}

impl Default for HeadlessEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessEngine {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        let (decoded_tx, decoded_rx) = unbounded();
        Self {
            scenes: HashMap::new(),
            caches: HashMap::new(),
            sounds: BTreeMap::new(),
            next_sound: 0,
            timers: Vec::new(),
            clock: Duration::ZERO,
            decoding: Vec::new(),
            decoded_tx,
            decoded_rx,
            calls: Vec::new(),
        }
    }

    //--- Setup ------------------------------------------------------------

    /// Makes a scene known without recording a call.
    pub fn register(&mut self, id: &SceneId) {
        self.scenes.entry(id.clone()).or_insert_with(SceneSlot::new);
    }

    /// Forces a scene's lifecycle status.
    pub fn set_status(&mut self, id: &SceneId, status: LifecycleStatus) {
        self.scenes.entry(id.clone()).or_insert_with(SceneSlot::new).status = status;
    }

    /// Marks a key resident without loading it.
    pub fn mark_resident(&mut self, cache: CacheKind, key: &str) {
        self.caches.entry(cache).or_default().insert(key.to_owned());
    }

    /// Starts a playing sound for `key` without recording calls.
    pub fn start_sound(&mut self, key: &str) -> SoundHandle {
        self.mark_resident(CacheKind::Audio, key);
        let handle = self.allocate_sound(key);
        if let Some(slot) = self.sounds.get_mut(&handle) {
            slot.playing = true;
        }
        handle
    }

    //--- Driving Progress -------------------------------------------------

    /// Finishes a scene's in-flight load.
    ///
    /// Moves its queue into the resident caches, marks the scene running
    /// and resolves every load-complete listener. Returns false if the
    /// scene was not loading.
    pub fn complete_load(&mut self, id: &SceneId) -> bool {
        let Some(slot) = self.scenes.get_mut(id) else {
            return false;
        };
        if !slot.loading {
            return false;
        }
        let queue = std::mem::take(&mut slot.queue);
        for request in &queue {
            self.caches
                .entry(request.cache())
                .or_default()
                .insert(request.key().to_owned());
        }
        debug!("Headless load of {} finished ({} assets)", id, queue.len());
        self.finish_scene_load(id);
        true
    }

    /// Finishes every in-flight load. Returns how many completed.
    pub fn complete_loads(&mut self) -> usize {
        let mut loading: Vec<SceneId> = self
            .scenes
            .iter()
            .filter(|(_, slot)| slot.loading)
            .map(|(id, _)| id.clone())
            .collect();
        loading.sort();
        loading.iter().filter(|id| self.complete_load(id)).count()
    }

    /// Drops a scene's load-complete listeners without resolving them.
    pub fn drop_load_listeners(&mut self, id: &SceneId) {
        if let Some(slot) = self.scenes.get_mut(id) {
            slot.listeners.clear();
        }
    }

    /// Finishes decoding `key`: it becomes resident audio and a decode
    /// notification is sent.
    pub fn finish_decode(&mut self, key: &str) {
        self.decoding.retain(|pending| pending != key);
        self.mark_resident(CacheKind::Audio, key);
        // The engine keeps a receiver alive, so the send cannot fail.
        let _ = self.decoded_tx.send(key.to_owned());
    }

    /// Ends a playing sound, firing its `finished` completion.
    pub fn finish_sound(&mut self, handle: SoundHandle) -> bool {
        let Some(slot) = self.sounds.get_mut(&handle) else {
            return false;
        };
        slot.playing = false;
        match slot.finished.take() {
            Some(signal) => signal.resolve(()),
            None => false,
        }
    }

    /// Advances the virtual clock and fires due timers in due order.
    pub fn advance(&mut self, dt: Duration) {
        self.clock += dt;
        let clock = self.clock;
        let (mut due, pending): (Vec<Timer>, Vec<Timer>) =
            self.timers.drain(..).partition(|timer| timer.due <= clock);
        self.timers = pending;
        due.sort_by_key(|timer| timer.due);
        for timer in due {
            trace!("Timer for {} fired at {:?}", timer.scene, timer.due);
            timer.signal.resolve(());
        }
    }

    //--- Inspection -------------------------------------------------------

    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Requests queued on a scene's loader and not yet completed.
    pub fn queued(&self, id: &SceneId) -> &[LoadRequest] {
        self.scenes
            .get(id)
            .map(|slot| slot.queue.as_slice())
            .unwrap_or(&[])
    }

    pub fn decoding(&self) -> &[String] {
        &self.decoding
    }

    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    //--- Internal Helpers -------------------------------------------------

    fn slot(&self, id: &SceneId) -> Result<&SceneSlot, StageError> {
        self.scenes
            .get(id)
            .ok_or_else(|| StageError::SceneNotFound { id: id.clone() })
    }

    fn slot_mut(&mut self, id: &SceneId) -> Result<&mut SceneSlot, StageError> {
        self.scenes
            .get_mut(id)
            .ok_or_else(|| StageError::SceneNotFound { id: id.clone() })
    }

    fn finish_scene_load(&mut self, id: &SceneId) {
        if let Some(slot) = self.scenes.get_mut(id) {
            slot.loading = false;
            if slot.status != LifecycleStatus::Sleeping {
                slot.status = LifecycleStatus::Running;
            }
            for listener in slot.listeners.drain(..) {
                listener.resolve(());
            }
        }
    }

    fn allocate_sound(&mut self, key: &str) -> SoundHandle {
        let handle = SoundHandle(self.next_sound);
        self.next_sound += 1;
        self.sounds.insert(
            handle,
            SoundSlot {
                key: key.to_owned(),
                playing: false,
                finished: None,
            },
        );
        handle
    }
}

//=== Scene Director ======================================================

impl SceneDirector for HeadlessEngine {
    fn add_scene(&mut self, id: &SceneId) {
        self.calls.push(EngineCall::AddScene(id.clone()));
        self.register(id);
    }

    fn launch(&mut self, id: &SceneId) -> Result<(), StageError> {
        self.slot_mut(id)?.status = LifecycleStatus::Starting;
        self.calls.push(EngineCall::Launch(id.clone()));
        Ok(())
    }

    fn restart(&mut self, id: &SceneId) -> Result<(), StageError> {
        self.slot_mut(id)?.status = LifecycleStatus::Starting;
        self.calls.push(EngineCall::Restart(id.clone()));
        Ok(())
    }

    fn status(&self, id: &SceneId) -> Result<LifecycleStatus, StageError> {
        Ok(self.slot(id)?.status)
    }

    fn sleep(&mut self, id: &SceneId) -> Result<(), StageError> {
        self.slot_mut(id)?.status = LifecycleStatus::Sleeping;
        self.calls.push(EngineCall::Sleep(id.clone()));
        Ok(())
    }

    fn wake(&mut self, id: &SceneId) -> Result<(), StageError> {
        self.slot_mut(id)?.status = LifecycleStatus::Running;
        self.calls.push(EngineCall::Wake(id.clone()));
        Ok(())
    }

    fn is_sleeping(&self, id: &SceneId) -> Result<bool, StageError> {
        Ok(self.slot(id)?.status == LifecycleStatus::Sleeping)
    }

    fn run(&mut self, id: &SceneId) -> Result<(), StageError> {
        self.slot_mut(id)?.status = LifecycleStatus::Running;
        self.calls.push(EngineCall::Run(id.clone()));
        Ok(())
    }
}

//=== Resource Cache ======================================================

impl ResourceCache for HeadlessEngine {
    fn is_resident(&self, cache: CacheKind, key: &str) -> bool {
        self.caches
            .get(&cache)
            .is_some_and(|keys| keys.contains(key))
    }

    fn add_inline_texture(&mut self, key: &str, payload: &InlinePayload) {
        trace!("Inline texture '{}' ({}, {} bytes encoded)", key, payload.mime, payload.body().len());
        self.calls.push(EngineCall::AddInlineTexture(key.to_owned()));
        self.mark_resident(CacheKind::Texture, key);
    }
}

//=== Load Queue ==========================================================

impl LoadQueue for HeadlessEngine {
    fn enqueue(&mut self, scene: &SceneId, request: LoadRequest) -> Result<(), StageError> {
        let key = request.key().to_owned();
        self.slot_mut(scene)?.queue.push(request);
        self.calls.push(EngineCall::Enqueue {
            scene: scene.clone(),
            key,
        });
        Ok(())
    }

    fn start_load(&mut self, scene: &SceneId) -> Result<(), StageError> {
        let slot = self.slot_mut(scene)?;
        let empty = slot.queue.is_empty();
        if !empty {
            slot.loading = true;
            slot.status = LifecycleStatus::Loading;
        }
        self.calls.push(EngineCall::StartLoad(scene.clone()));
        if empty {
            self.finish_scene_load(scene);
        }
        Ok(())
    }

    fn is_loading(&self, scene: &SceneId) -> Result<bool, StageError> {
        Ok(self.slot(scene)?.loading)
    }

    fn on_load_complete(&mut self, scene: &SceneId) -> Result<Completion<()>, StageError> {
        let (signal, completion) = oneshot();
        self.slot_mut(scene)?.listeners.push(signal);
        Ok(completion)
    }
}

//=== Timer Service =======================================================

impl TimerService for HeadlessEngine {
    fn delayed_call(&mut self, scene: &SceneId, delay: Duration) -> Completion<()> {
        let (signal, completion) = oneshot();
        self.timers.push(Timer {
            scene: scene.clone(),
            due: self.clock + delay,
            signal,
        });
        self.calls.push(EngineCall::DelayedCall {
            scene: scene.clone(),
            delay,
        });
        completion
    }

    fn remove_all_events(&mut self, scene: &SceneId) {
        self.timers.retain(|timer| timer.scene != *scene);
        self.calls.push(EngineCall::RemoveAllEvents(scene.clone()));
    }
}

//=== Audio Service =======================================================

impl AudioService for HeadlessEngine {
    fn active_sounds(&self) -> Vec<ActiveSound> {
        self.sounds
            .iter()
            .filter(|(_, slot)| slot.playing)
            .map(|(handle, slot)| ActiveSound {
                handle: *handle,
                key: slot.key.clone(),
            })
            .collect()
    }

    fn stop_sound(&mut self, handle: SoundHandle) {
        if let Some(slot) = self.sounds.get_mut(&handle) {
            slot.playing = false;
            slot.finished = None;
        }
        self.calls.push(EngineCall::StopSound(handle));
    }

    fn add_sound(&mut self, key: &str) -> Option<SoundHandle> {
        self.calls.push(EngineCall::AddSound(key.to_owned()));
        if !self.is_resident(CacheKind::Audio, key) {
            return None;
        }
        Some(self.allocate_sound(key))
    }

    fn play(&mut self, handle: SoundHandle) -> Result<Playback, StageError> {
        self.calls.push(EngineCall::Play(handle));
        let Some(slot) = self.sounds.get_mut(&handle) else {
            return Err(StageError::AudioRejected {
                reason: format!("unknown sound handle {}", handle.0),
            });
        };
        let (started_signal, started) = oneshot();
        let (finished_signal, finished) = oneshot();
        slot.playing = true;
        slot.finished = Some(finished_signal);
        started_signal.resolve(());
        Ok(Playback { started, finished })
    }

    fn decode_audio(&mut self, key: &str, _payload: &InlinePayload) {
        self.calls.push(EngineCall::DecodeAudio(key.to_owned()));
        if !self.decoding.iter().any(|pending| pending == key) {
            self.decoding.push(key.to_owned());
        }
    }

    fn decode_notifications(&self) -> Receiver<String> {
        self.decoded_rx.clone()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::signal::Resolution;

    fn engine_with(ids: &[&str]) -> HeadlessEngine {
        let mut engine = HeadlessEngine::new();
        for id in ids {
            engine.register(&SceneId::from(*id));
        }
        engine
    }

    fn image(key: &str) -> LoadRequest {
        LoadRequest::Image {
            key: key.into(),
            url: format!("{key}.png"),
            transport: None,
        }
    }

    #[test]
    fn unknown_scene_is_not_found() {
        let engine = HeadlessEngine::new();
        assert!(matches!(
            engine.status(&"Ghost".into()),
            Err(StageError::SceneNotFound { .. })
        ));
    }

    #[test]
    fn lifecycle_statuses() {
        let mut engine = engine_with(&["Main"]);
        let id = SceneId::from("Main");
        assert_eq!(engine.status(&id).unwrap(), LifecycleStatus::NotStarted);

        engine.launch(&id).unwrap();
        assert_eq!(engine.status(&id).unwrap(), LifecycleStatus::Starting);

        engine.sleep(&id).unwrap();
        assert!(engine.is_sleeping(&id).unwrap());

        engine.wake(&id).unwrap();
        assert_eq!(engine.status(&id).unwrap(), LifecycleStatus::Running);
    }

    #[test]
    fn load_completion_moves_queue_into_cache() {
        let mut engine = engine_with(&["Main"]);
        let id = SceneId::from("Main");
        let mut done = engine.on_load_complete(&id).unwrap();

        engine.enqueue(&id, image("bg")).unwrap();
        engine.start_load(&id).unwrap();
        assert!(engine.is_loading(&id).unwrap());
        assert_eq!(done.poll(), Resolution::Pending);

        assert!(engine.complete_load(&id));
        assert!(!engine.complete_load(&id));
        assert_eq!(done.poll(), Resolution::Resolved(()));
        assert!(engine.is_resident(CacheKind::Texture, "bg"));
        assert_eq!(engine.status(&id).unwrap(), LifecycleStatus::Running);
        assert!(engine.queued(&id).is_empty());
    }

    #[test]
    fn empty_load_completes_immediately() {
        let mut engine = engine_with(&["Main"]);
        let id = SceneId::from("Main");
        let mut done = engine.on_load_complete(&id).unwrap();

        engine.start_load(&id).unwrap();
        assert_eq!(done.poll(), Resolution::Resolved(()));
        assert!(!engine.is_loading(&id).unwrap());
    }

    #[test]
    fn complete_loads_finishes_every_scene() {
        let mut engine = engine_with(&["A", "B", "C"]);
        for id in ["A", "B"] {
            engine.enqueue(&id.into(), image(id)).unwrap();
            engine.start_load(&id.into()).unwrap();
        }
        assert_eq!(engine.complete_loads(), 2);
        assert_eq!(engine.complete_loads(), 0);
    }

    #[test]
    fn timers_fire_when_due_and_can_be_removed() {
        let mut engine = engine_with(&["Main"]);
        let id = SceneId::from("Main");
        let mut short = engine.delayed_call(&id, Duration::from_millis(100));
        let mut long = engine.delayed_call(&id, Duration::from_millis(500));

        engine.advance(Duration::from_millis(100));
        assert_eq!(short.poll(), Resolution::Resolved(()));
        assert_eq!(long.poll(), Resolution::Pending);

        engine.remove_all_events(&id);
        assert_eq!(long.poll(), Resolution::Abandoned);
        assert_eq!(engine.pending_timers(), 0);
    }

    #[test]
    fn sounds_play_and_finish() {
        let mut engine = HeadlessEngine::new();
        assert_eq!(engine.add_sound("bgm"), None);

        engine.mark_resident(CacheKind::Audio, "bgm");
        let handle = engine.add_sound("bgm").unwrap();
        let mut playback = engine.play(handle).unwrap();

        assert_eq!(playback.started.poll(), Resolution::Resolved(()));
        assert_eq!(engine.active_sounds().len(), 1);

        assert!(engine.finish_sound(handle));
        assert_eq!(playback.finished.poll(), Resolution::Resolved(()));
        assert!(engine.active_sounds().is_empty());
    }

    #[test]
    fn stopping_a_sound_abandons_its_finish() {
        let mut engine = HeadlessEngine::new();
        let handle = engine.start_sound("voice");
        let mut playback = engine.play(handle).unwrap();

        engine.stop_sound(handle);
        assert_eq!(playback.finished.poll(), Resolution::Abandoned);
    }

    #[test]
    fn play_rejects_unknown_handle() {
        let mut engine = HeadlessEngine::new();
        assert!(matches!(
            engine.play(SoundHandle(99)),
            Err(StageError::AudioRejected { .. })
        ));
    }

    #[test]
    fn decode_notifications_are_delivered() {
        let mut engine = HeadlessEngine::new();
        let payload = InlinePayload {
            mime: "audio/ogg".into(),
            uri: "data:audio/ogg;base64,T2dnUw==".into(),
        };
        engine.decode_audio("beep", &payload);
        assert_eq!(engine.decoding(), &["beep".to_owned()]);

        let notifications = engine.decode_notifications();
        engine.finish_decode("beep");
        assert_eq!(notifications.try_recv().unwrap(), "beep");
        assert!(engine.is_resident(CacheKind::Audio, "beep"));
        assert!(engine.decoding().is_empty());
    }
}
