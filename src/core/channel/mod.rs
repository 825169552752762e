//=========================================================================
// Event Channel
//=========================================================================
//
// Named-topic publish/subscribe used to decouple scene hand-off from the
// components reacting to it.
//
// Components:
// - `event_channel`: the channel itself and its delivery report
// - `subscriber_list`: type-erased per-topic handler storage
// - `topics`: `scene-loading` and `scene-start`
//
//=========================================================================

//=== Module Declarations =================================================

mod event_channel;
mod subscriber_list;
mod topics;

//=== Public API ==========================================================

pub use event_channel::{Delivery, EventChannel};
pub use topics::{SceneLoading, SceneStart};

/// Payload type carried on a named topic.
///
/// Each topic is its own type, so a handler can only ever receive the
/// payload shape its topic defines.
pub trait Topic: 'static {
    /// Topic name used in logs and errors.
    const NAME: &'static str;
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
