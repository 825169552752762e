//=========================================================================
// Core Systems
//
// Everything the orchestrator is built from.
//
// Components:
// - `assets`: classification, manifests, the catalog and the loader
// - `channel`: named-topic publish/subscribe
// - `playback`: one-after-another sound playback
// - `registry`: scene id → loading flag
// - `scene`: scene identity, the `Scene` trait and hand-off control
// - `signal`: one-shot completions polled from the host tick
// - `stage`: shared state handed to channel subscribers
//
// Notes:
// Nothing here owns a thread. Progress is made only when the host calls
// `Orchestrator::tick`, and engine completions are read on that thread.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod assets;
pub mod channel;
pub mod playback;
pub mod registry;
pub mod scene;
pub mod signal;
pub mod stage;
