//=========================================================================
// Scene Conductor — Library Root
//
// Scene orchestration for real-time engines.
//
// Responsibilities:
// - Classify asset descriptors and load them in per-scene batches
// - Track which scenes are loading
// - Hand off between scenes once the target's assets are resident
//
// The host engine is reached only through the `Engine` trait, so the
// same orchestration runs against a real renderer or `HeadlessEngine`.
//
// Typical usage:
// ```no_run
// use scene_conductor::prelude::*;
//
// let mut stage = OrchestratorBuilder::new(HeadlessEngine::new()).build();
// stage.start().unwrap();
// loop {
//     stage.tick().unwrap();
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the building blocks (assets, channel, registry, scenes).
// Most applications only need the orchestrator and the prelude.
//
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod prelude;

//--- Public Exports ------------------------------------------------------

pub use config::StageConfig;
pub use error::{AssetError, StageError};
pub use orchestrator::{LoaderScene, Orchestrator, OrchestratorBuilder};
