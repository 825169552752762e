//! End-to-end tests for scene orchestration on the headless engine.
//!
//! These drive the public API only: builder, start, tick, transitions,
//! loader batches and the event channel, the way a host frame loop would.

use std::cell::RefCell;
use std::rc::Rc;

use scene_conductor::core::assets::{CommonAssets, MediaGroup, ResourceLoader};
use scene_conductor::engine::{CacheKind, EngineCall, LoadRequest};
use scene_conductor::prelude::*;

// ===========================================================================
// Helpers
// ===========================================================================

type Events = Rc<RefCell<Vec<String>>>;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Scene with no hooks beyond `start`.
struct Plain;

impl Scene<HeadlessEngine> for Plain {
    fn start(&mut self, _ctx: &mut SceneContext<'_, HeadlessEngine>) {}
}

/// Records every `scene-loading` and `scene-start` in publish order.
fn record_events(orchestrator: &mut Orchestrator<HeadlessEngine>) -> Events {
    let events: Events = Rc::default();
    let sink = Rc::clone(&events);
    orchestrator.subscribe(move |_: &mut Stage<HeadlessEngine>, event: &SceneLoading| {
        sink.borrow_mut()
            .push(format!("loading {} {}", event.id, event.is_loading));
        Ok(())
    });
    let sink = Rc::clone(&events);
    orchestrator.subscribe(move |_: &mut Stage<HeadlessEngine>, event: &SceneStart| {
        sink.borrow_mut().push(format!("start {}", event.id));
        Ok(())
    });
    events
}

fn keys(requests: &[LoadRequest]) -> Vec<&str> {
    requests.iter().map(LoadRequest::key).collect()
}

/// Runs the loader through to `Main` with nothing to load.
fn running_main() -> (Orchestrator<HeadlessEngine>, Events) {
    let mut orchestrator = OrchestratorBuilder::new(HeadlessEngine::new())
        .with_scene("Main", Box::new(Plain))
        .with_scene("Credits", Box::new(Plain))
        .build();
    orchestrator.start().unwrap();
    orchestrator.tick().unwrap();
    orchestrator.tick().unwrap();
    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Main")));

    let events = record_events(&mut orchestrator);
    orchestrator.engine_mut().clear_calls();
    (orchestrator, events)
}

// ===========================================================================
// Loader batches
// ===========================================================================

#[test]
fn nested_manifest_loads_sprite_sheet_once() {
    init_logging();
    let mut engine = HeadlessEngine::new();
    let intro = SceneId::from("Intro");
    engine.register(&intro);
    let mut loader = ResourceLoader::new(Vec::new());
    let manifest = Manifest::from_json(r#"{"Intro": {"bg": "bg_1024x768.png"}}"#).unwrap();
    let options = LoadOptions::default();

    let queued = loader
        .load_batch(&mut engine, &intro, &manifest, &options)
        .unwrap();
    assert_eq!(queued, vec!["Intro_bg"]);
    assert_eq!(
        engine.queued(&intro),
        &[LoadRequest::SpriteSheet {
            key: "Intro_bg".into(),
            url: "bg_1024x768.png".into(),
            frame_width: 1024,
            frame_height: 768,
            transport: None,
        }]
    );

    assert!(engine.complete_load(&intro));
    assert!(engine.is_resident(CacheKind::Texture, "Intro_bg"));

    let again = loader
        .load_batch(&mut engine, &intro, &manifest, &options)
        .unwrap();
    assert!(again.is_empty());
}

#[test]
fn unsupported_entries_are_left_out() {
    init_logging();
    let mut engine = HeadlessEngine::new();
    let scene = SceneId::from("Main");
    engine.register(&scene);
    let mut loader = ResourceLoader::new(Vec::new());
    let manifest = Manifest::from_json(
        r#"{
            "notes": "readme.txt",
            "blob": "data:application/pdf;base64,JVBERi0=",
            "hero": "hero_64x32_variant.png",
            "ping": "data:audio/wav;base64,UklGRg=="
        }"#,
    )
    .unwrap();

    let queued = loader
        .load_batch(&mut engine, &scene, &manifest, &LoadOptions::default())
        .unwrap();

    assert_eq!(queued, vec!["hero", "ping"]);
    assert!(matches!(
        engine.queued(&scene),
        [LoadRequest::SpriteSheet {
            frame_width: 64,
            frame_height: 32,
            ..
        }]
    ));
    assert_eq!(engine.decoding(), &["ping".to_owned()]);
}

// ===========================================================================
// Startup and loader hand-off
// ===========================================================================
//
// Preloader (common bgm + its own logo) → background launch of Main (bg)
// → Preloader created → wait on Main → Main created → Main active.

#[test]
fn loader_preloads_shared_assets_and_hands_off() {
    init_logging();
    let catalog = AssetCatalog::new()
        .with_entry(MediaGroup::Sounds, "/common/bgm.mp3")
        .with_entry(MediaGroup::Sounds, "/common/jingle.mp3")
        .with_entry(MediaGroup::Images, "/Preloader/logo.png")
        .with_entry(MediaGroup::Images, "/Main/bg.png");
    let config = StageConfig::new().with_common_assets(CommonAssets {
        sounds: vec!["bgm".into()],
        ..CommonAssets::default()
    });
    let mut orchestrator = OrchestratorBuilder::new(HeadlessEngine::new())
        .with_config(config)
        .with_catalog(catalog)
        .with_scene("Main", Box::new(Plain))
        .build();
    let events = record_events(&mut orchestrator);
    let preloader = SceneId::from("Preloader");
    let main = SceneId::from("Main");

    orchestrator.start().unwrap();
    orchestrator.tick().unwrap();
    assert_eq!(keys(orchestrator.engine().queued(&preloader)), vec!["bgm", "logo"]);

    orchestrator.tick().unwrap();
    assert_eq!(keys(orchestrator.engine().queued(&main)), vec!["bg"]);

    orchestrator.engine_mut().complete_load(&preloader);
    orchestrator.tick().unwrap();
    assert_eq!(orchestrator.active_scene(), Some(&preloader));
    assert!(orchestrator.registry().is_loading(&main));

    orchestrator.engine_mut().complete_load(&main);
    orchestrator.tick().unwrap();

    assert_eq!(
        *events.borrow(),
        vec![
            "start Preloader",
            "loading Preloader true",
            "loading Preloader false",
            "loading Main true",
            "start Main",
            "loading Main false",
        ]
    );
    assert_eq!(orchestrator.active_scene(), Some(&main));
    assert!(orchestrator.registry().loading_scenes().is_empty());
    assert!(!orchestrator.engine().is_resident(CacheKind::Audio, "jingle"));
}

#[test]
fn next_scene_comes_from_config_file() {
    init_logging();
    let path = std::env::temp_dir().join(format!("scene_flow_{}.ini", std::process::id()));
    std::fs::write(&path, "[stage]\nnext_scene = Title\n").unwrap();
    let mut config = StageConfig::with_path(&path);
    config.load_from_file().unwrap();
    std::fs::remove_file(&path).ok();

    let mut orchestrator = OrchestratorBuilder::new(HeadlessEngine::new())
        .with_config(config)
        .with_scene("Title", Box::new(Plain))
        .build();
    orchestrator.start().unwrap();
    orchestrator.tick().unwrap();
    orchestrator.tick().unwrap();

    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Title")));
}

// ===========================================================================
// Transitions
// ===========================================================================

#[test]
fn self_transition_is_silent() {
    init_logging();
    let (mut orchestrator, events) = running_main();
    orchestrator.engine_mut().start_sound("voice");

    orchestrator.request_start("Main", "Main").unwrap();
    orchestrator.tick().unwrap();

    assert!(events.borrow().is_empty());
    assert!(orchestrator.engine().calls().is_empty());
    assert_eq!(orchestrator.engine().active_sounds().len(), 1);
}

#[test]
fn not_started_target_reports_loading_around_its_start() {
    init_logging();
    let (mut orchestrator, events) = running_main();
    let bgm = orchestrator.engine_mut().start_sound("bgm");
    orchestrator.engine_mut().start_sound("voice");

    orchestrator.request_start("Main", "Credits").unwrap();
    assert_eq!(*events.borrow(), vec!["loading Credits true"]);
    assert!(orchestrator
        .engine()
        .calls()
        .contains(&EngineCall::Launch("Credits".into())));

    let playing: Vec<SoundHandle> = orchestrator
        .engine()
        .active_sounds()
        .into_iter()
        .map(|sound| sound.handle)
        .collect();
    assert_eq!(playing, vec![bgm]);

    orchestrator.tick().unwrap();
    assert_eq!(
        *events.borrow(),
        vec!["loading Credits true", "start Credits", "loading Credits false"]
    );
    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Credits")));
    assert_eq!(orchestrator.stage().previous_scene(), Some(&SceneId::from("Main")));
    assert!(orchestrator.engine().is_sleeping(&"Main".into()).unwrap());
}

#[test]
fn sleeping_scene_is_restarted() {
    init_logging();
    let (mut orchestrator, events) = running_main();
    orchestrator.request_start("Main", "Credits").unwrap();
    orchestrator.tick().unwrap();

    orchestrator.request_start("Credits", "Main").unwrap();
    assert!(orchestrator
        .engine()
        .calls()
        .contains(&EngineCall::Restart("Main".into())));
    orchestrator.tick().unwrap();

    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Main")));
    assert_eq!(
        events.borrow().last().map(String::as_str),
        Some("loading Main false")
    );
}

#[test]
fn shared_asset_still_loading_elsewhere_holds_the_hand_off() {
    struct NeedsShared;

    impl Scene<HeadlessEngine> for NeedsShared {
        fn start(&mut self, _ctx: &mut SceneContext<'_, HeadlessEngine>) {}

        fn manifests_for(&self, _id: &SceneId) -> Option<Manifest> {
            Some(Manifest::new().with_asset("shared", "shared.png"))
        }
    }

    init_logging();
    let mut orchestrator = OrchestratorBuilder::new(HeadlessEngine::new())
        .with_scene("Main", Box::new(Plain))
        .with_scene("B", Box::new(NeedsShared))
        .with_scene("C", Box::new(NeedsShared))
        .build();
    orchestrator.start().unwrap();
    orchestrator.tick().unwrap();
    orchestrator.tick().unwrap();
    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Main")));
    let b = SceneId::from("B");
    let c = SceneId::from("C");

    orchestrator.preload_many("Main", ["B"]).unwrap();
    orchestrator.tick().unwrap();
    assert_eq!(keys(orchestrator.engine().queued(&b)), vec!["shared"]);

    orchestrator.request_start("Main", "C").unwrap();
    orchestrator.tick().unwrap();
    orchestrator.tick().unwrap();

    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Main")));
    assert_eq!(keys(orchestrator.engine().queued(&c)), vec!["shared"]);
    assert!(orchestrator.registry().is_loading(&c));

    orchestrator.engine_mut().complete_load(&c);
    orchestrator.tick().unwrap();

    assert_eq!(orchestrator.active_scene(), Some(&c));
    assert!(orchestrator.engine().is_resident(CacheKind::Texture, "shared"));
}

#[test]
fn unknown_target_fails_the_attempt() {
    init_logging();
    let (mut orchestrator, events) = running_main();

    let err = orchestrator.request_start("Main", "Nowhere").unwrap_err();

    assert!(matches!(err, StageError::SceneNotFound { .. }));
    assert!(events.borrow().is_empty());
}

// ===========================================================================
// Scene-driven commands
// ===========================================================================

#[test]
fn scene_requests_are_applied_on_the_next_tick() {
    struct Hopper;

    impl Scene<HeadlessEngine> for Hopper {
        fn start(&mut self, ctx: &mut SceneContext<'_, HeadlessEngine>) {
            ctx.start("Credits");
        }
    }

    init_logging();
    let mut orchestrator = OrchestratorBuilder::new(HeadlessEngine::new())
        .with_scene("Main", Box::new(Hopper))
        .with_scene("Credits", Box::new(Plain))
        .build();
    orchestrator.start().unwrap();
    orchestrator.tick().unwrap();
    orchestrator.tick().unwrap();
    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Main")));

    orchestrator.tick().unwrap();
    assert_eq!(orchestrator.active_scene(), Some(&SceneId::from("Credits")));
}

#[test]
fn inline_audio_is_registered_once_decoded() {
    struct Narrated;

    impl Scene<HeadlessEngine> for Narrated {
        fn start(&mut self, _ctx: &mut SceneContext<'_, HeadlessEngine>) {}

        fn manifests_for(&self, _id: &SceneId) -> Option<Manifest> {
            Some(Manifest::new().with_asset("ping", "data:audio/ogg;base64,T2dnUw=="))
        }
    }

    init_logging();
    let mut orchestrator = OrchestratorBuilder::new(HeadlessEngine::new())
        .with_scene("Main", Box::new(Narrated))
        .build();
    orchestrator.start().unwrap();
    orchestrator.tick().unwrap();
    orchestrator.tick().unwrap();
    assert_eq!(orchestrator.engine().decoding(), &["ping".to_owned()]);
    assert_eq!(orchestrator.stage().loader().pending_decodes(), &["ping".to_owned()]);

    orchestrator.engine_mut().finish_decode("ping");
    orchestrator.tick().unwrap();

    assert!(orchestrator.stage().loader().pending_decodes().is_empty());
    assert!(orchestrator
        .engine()
        .calls()
        .contains(&EngineCall::AddSound("ping".into())));
}
