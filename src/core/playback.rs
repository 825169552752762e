//=========================================================================
// Sequential Playback
//=========================================================================
//
// Plays sounds strictly one after another, polled from a scene's update.
//
// Per item:
//   play ──started──> on_start(i) ──finished──> on_complete(i) ──gap──> next
//
// Gap rules:
//   hold_until_released        → wait for the item's Release
//   delay, no hold             → wait for the delay OR the Release
//   neither                    → next item right away
//
// Teardown of the owning scene cancels the sequence: stopping a sound
// abandons its `finished` completion and removing the scene's events
// abandons the gap timer. Both surface as `PlaybackProgress::Cancelled`.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::mem;
use std::time::Duration;

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::scene::SceneId;
use crate::core::signal::{release_pair, Completion, Release, Resolution};
use crate::engine::{Engine, Playback, SoundHandle};
use crate::error::StageError;

//=== Single Sound ========================================================

/// Plays one sound.
///
/// A missing handle (the engine had no such audio) is rejected right away
/// with `AudioRejected`.
pub fn play_sound<E: Engine>(
    engine: &mut E,
    sound: Option<SoundHandle>,
) -> Result<Playback, StageError> {
    let Some(handle) = sound else {
        return Err(StageError::AudioRejected {
            reason: "no sound handle to play".into(),
        });
    };
    engine.play(handle)
}

//=== Options =============================================================

/// Pacing between consecutive sounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackOptions {
    pub delay: Option<Duration>,
    pub hold_until_released: bool,
}

impl PlaybackOptions {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn held(mut self) -> Self {
        self.hold_until_released = true;
        self
    }
}

//=== Progress ============================================================

/// What a call to [`SequentialPlayback::poll`] observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackProgress {
    /// Item `index` is playing or its gap is running.
    Playing { index: usize },
    Finished,
    Cancelled,
}

//=== Internal State ======================================================

type Hook = Box<dyn FnMut(usize, &Release)>;

enum State {
    Next(usize),
    Playing {
        index: usize,
        started: Option<Completion<()>>,
        finished: Completion<()>,
        release: Release,
        gate: Completion<()>,
    },
    Gap {
        index: usize,
        timer: Option<Completion<()>>,
        gate: Completion<()>,
        // Keeps the gate from being abandoned once the hooks drop theirs.
        _release: Release,
    },
    Finished,
    Cancelled,
}

//=== Sequential Playback =================================================

/// A sequence of sounds played back to back.
pub struct SequentialPlayback {
    scene: SceneId,
    items: Vec<Option<SoundHandle>>,
    options: PlaybackOptions,
    on_start: Option<Hook>,
    on_complete: Option<Hook>,
    state: State,
}

impl SequentialPlayback {
    //--- Construction -----------------------------------------------------

    /// Creates a sequence owned by `scene`. Gap timers are scheduled on
    /// that scene, so they die with it.
    pub fn new(
        scene: impl Into<SceneId>,
        items: impl IntoIterator<Item = Option<SoundHandle>>,
        options: PlaybackOptions,
    ) -> Self {
        Self {
            scene: scene.into(),
            items: items.into_iter().collect(),
            options,
            on_start: None,
            on_complete: None,
            state: State::Next(0),
        }
    }

    /// Called with the item index once its sound has started.
    pub fn on_start(mut self, hook: impl FnMut(usize, &Release) + 'static) -> Self {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Called with the item index once its sound has finished.
    pub fn on_complete(mut self, hook: impl FnMut(usize, &Release) + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    //--- Progress ---------------------------------------------------------

    /// Advances the sequence as far as it can go without waiting.
    ///
    /// A missing handle fails with `AudioRejected` and cancels the rest of
    /// the sequence.
    pub fn poll<E: Engine>(&mut self, engine: &mut E) -> Result<PlaybackProgress, StageError> {
        loop {
            match mem::replace(&mut self.state, State::Cancelled) {
                State::Next(index) => {
                    let Some(sound) = self.items.get(index).copied() else {
                        debug!("Playback on {} finished ({} items)", self.scene, self.items.len());
                        self.state = State::Finished;
                        return Ok(PlaybackProgress::Finished);
                    };
                    let playback = play_sound(engine, sound)?;
                    let (release, gate) = release_pair();
                    self.state = State::Playing {
                        index,
                        started: Some(playback.started),
                        finished: playback.finished,
                        release,
                        gate,
                    };
                }
                State::Playing {
                    index,
                    mut started,
                    mut finished,
                    release,
                    gate,
                } => {
                    if let Some(mut pending) = started.take() {
                        match pending.poll() {
                            Resolution::Pending => started = Some(pending),
                            Resolution::Resolved(()) => {
                                if let Some(hook) = self.on_start.as_mut() {
                                    hook(index, &release);
                                }
                            }
                            Resolution::Abandoned => {}
                        }
                    }
                    match finished.poll() {
                        Resolution::Pending => {
                            self.state = State::Playing {
                                index,
                                started,
                                finished,
                                release,
                                gate,
                            };
                            return Ok(PlaybackProgress::Playing { index });
                        }
                        Resolution::Abandoned => {
                            warn!("Sound {} of playback on {} was stopped", index, self.scene);
                            return Ok(PlaybackProgress::Cancelled);
                        }
                        Resolution::Resolved(()) => {
                            if let Some(hook) = self.on_complete.as_mut() {
                                hook(index, &release);
                            }
                            self.state = self.gap(engine, index, release, gate);
                        }
                    }
                }
                State::Gap {
                    index,
                    mut timer,
                    mut gate,
                    _release,
                } => {
                    if let Resolution::Resolved(()) = gate.poll() {
                        self.state = State::Next(index + 1);
                        continue;
                    }
                    match timer.as_mut().map(Completion::poll) {
                        Some(Resolution::Resolved(())) => self.state = State::Next(index + 1),
                        Some(Resolution::Abandoned) => {
                            debug!("Playback gap timer on {} was removed", self.scene);
                            return Ok(PlaybackProgress::Cancelled);
                        }
                        Some(Resolution::Pending) | None => {
                            self.state = State::Gap {
                                index,
                                timer,
                                gate,
                                _release,
                            };
                            return Ok(PlaybackProgress::Playing { index });
                        }
                    }
                }
                State::Finished => {
                    self.state = State::Finished;
                    return Ok(PlaybackProgress::Finished);
                }
                State::Cancelled => return Ok(PlaybackProgress::Cancelled),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    //--- Internal Helpers -------------------------------------------------

    fn gap<E: Engine>(
        &self,
        engine: &mut E,
        index: usize,
        release: Release,
        gate: Completion<()>,
    ) -> State {
        let timer = match (self.options.hold_until_released, self.options.delay) {
            (true, _) => None,
            (false, Some(delay)) => Some(engine.delayed_call(&self.scene, delay)),
            (false, None) => return State::Next(index + 1),
        };
        State::Gap {
            index,
            timer,
            gate,
            _release: release,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{AudioService, CacheKind, HeadlessEngine, TimerService};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn engine_with_sounds(keys: &[&str]) -> (HeadlessEngine, Vec<Option<SoundHandle>>) {
        let mut engine = HeadlessEngine::new();
        engine.register(&"Story".into());
        let handles = keys
            .iter()
            .map(|key| {
                engine.mark_resident(CacheKind::Audio, key);
                engine.add_sound(key)
            })
            .collect();
        (engine, handles)
    }

    fn handle(items: &[Option<SoundHandle>], index: usize) -> SoundHandle {
        items[index].unwrap()
    }

    #[test]
    fn missing_handle_is_rejected() {
        let mut engine = HeadlessEngine::new();
        assert!(matches!(
            play_sound(&mut engine, None),
            Err(StageError::AudioRejected { .. })
        ));
    }

    #[test]
    fn plays_back_to_back_without_gap() {
        let (mut engine, items) = engine_with_sounds(&["na0", "na1"]);
        let started = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&started);
        let mut playback = SequentialPlayback::new("Story", items.clone(), PlaybackOptions::default())
            .on_start(move |index, _| log.borrow_mut().push(index));

        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 0 });
        engine.finish_sound(handle(&items, 0));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 1 });
        engine.finish_sound(handle(&items, 1));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Finished);
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Finished);

        assert_eq!(*started.borrow(), vec![0, 1]);
    }

    #[test]
    fn delay_separates_items() {
        let (mut engine, items) = engine_with_sounds(&["na0", "na1"]);
        let options = PlaybackOptions::default().with_delay(Duration::from_millis(500));
        let mut playback = SequentialPlayback::new("Story", items.clone(), options);

        playback.poll(&mut engine).unwrap();
        engine.finish_sound(handle(&items, 0));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 0 });

        engine.advance(Duration::from_millis(499));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 0 });

        engine.advance(Duration::from_millis(1));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 1 });
    }

    #[test]
    fn release_cuts_the_delay_short() {
        let (mut engine, items) = engine_with_sounds(&["na0", "na1"]);
        let options = PlaybackOptions::default().with_delay(Duration::from_secs(10));
        let mut playback = SequentialPlayback::new("Story", items.clone(), options)
            .on_complete(|_, release| release.release());

        playback.poll(&mut engine).unwrap();
        engine.finish_sound(handle(&items, 0));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 1 });
    }

    #[test]
    fn held_gap_waits_for_release() {
        let (mut engine, items) = engine_with_sounds(&["na0", "na1"]);
        let held: Rc<RefCell<Option<Release>>> = Rc::default();
        let slot = Rc::clone(&held);
        let options = PlaybackOptions::default()
            .with_delay(Duration::from_millis(100))
            .held();
        let mut playback = SequentialPlayback::new("Story", items.clone(), options)
            .on_complete(move |_, release| *slot.borrow_mut() = Some(release.clone()));

        playback.poll(&mut engine).unwrap();
        engine.finish_sound(handle(&items, 0));
        playback.poll(&mut engine).unwrap();

        // The delay is ignored while held.
        engine.advance(Duration::from_secs(1));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 0 });

        if let Some(release) = held.borrow().as_ref() {
            release.release();
        }
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Playing { index: 1 });
    }

    #[test]
    fn stopped_sound_cancels_sequence() {
        let (mut engine, items) = engine_with_sounds(&["na0", "na1"]);
        let mut playback = SequentialPlayback::new("Story", items.clone(), PlaybackOptions::default());

        playback.poll(&mut engine).unwrap();
        engine.stop_sound(handle(&items, 0));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Cancelled);
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Cancelled);
    }

    #[test]
    fn removed_gap_timer_cancels_sequence() {
        let (mut engine, items) = engine_with_sounds(&["na0", "na1"]);
        let options = PlaybackOptions::default().with_delay(Duration::from_secs(1));
        let mut playback = SequentialPlayback::new("Story", items.clone(), options);

        playback.poll(&mut engine).unwrap();
        engine.finish_sound(handle(&items, 0));
        playback.poll(&mut engine).unwrap();

        engine.remove_all_events(&"Story".into());
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Cancelled);
    }

    #[test]
    fn missing_item_fails_when_reached() {
        let (mut engine, mut items) = engine_with_sounds(&["na0"]);
        items.push(None);
        let mut playback = SequentialPlayback::new("Story", items.clone(), PlaybackOptions::default());

        playback.poll(&mut engine).unwrap();
        engine.finish_sound(handle(&items, 0));
        assert!(matches!(
            playback.poll(&mut engine),
            Err(StageError::AudioRejected { .. })
        ));
        assert_eq!(playback.poll(&mut engine).unwrap(), PlaybackProgress::Cancelled);
    }
}
