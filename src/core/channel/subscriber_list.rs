//=========================================================================
// Subscriber List Trait
//=========================================================================
//
// Type-erased trait for per-topic subscriber lists that preserves Vec
// operations while allowing storage in a HashMap without concrete topic
// knowledge.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;

//=== Internal Dependencies ===============================================

use super::{SubscriptionId, Topic};
use crate::error::StageError;

//=== Subscription ========================================================

pub(super) type Handler<C, T> = Box<dyn FnMut(&mut C, &T) -> Result<(), StageError>>;

/// One registered handler for topic `T` over context `C`.
pub(super) struct Subscription<C, T> {
    pub(super) id: SubscriptionId,
    pub(super) handler: Handler<C, T>,
}

//=== Subscriber List =====================================================

/// Type-erased storage for one topic's subscribers.
///
/// Allows removal by id and length queries without knowing the concrete
/// topic type at compile time.
pub(super) trait SubscriberList {
    /// Removes the subscription with `id`. Returns true if it was present.
    fn remove(&mut self, id: SubscriptionId) -> bool;

    /// Removes every subscription.
    fn clear_subscribers(&mut self);

    /// Returns the number of subscriptions.
    fn len(&self) -> usize;

    /// Downcasts to `&dyn Any` for topic-specific operations.
    fn as_any(&self) -> &dyn Any;

    /// Downcasts to `&mut dyn Any` for topic-specific operations.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: 'static, T: Topic> SubscriberList for Vec<Subscription<C, T>> {
    fn remove(&mut self, id: SubscriptionId) -> bool {
        let before = Vec::len(self);
        self.retain(|subscription| subscription.id != id);
        Vec::len(self) != before
    }

    fn clear_subscribers(&mut self) {
        self.clear();
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
