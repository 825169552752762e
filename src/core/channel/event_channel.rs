//=========================================================================
// Event Channel
//=========================================================================
//
// Typed synchronous publish/subscribe over a shared context.
//
// Architecture:
//   subscribe<T>(handler) → HashMap<TypeId, Vec<Subscription<C, T>>>
//                                ↓
//   publish<T>(&mut ctx, &event) → every handler, in subscription order
//                                ↓
//   Delivery { delivered, errors }
//
// Handlers run before `publish` returns. A failing handler is logged and
// does not stop delivery to the handlers after it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::TypeId;
use std::collections::HashMap;
use std::marker::PhantomData;

use log::{trace, warn};

//=== Internal Dependencies ===============================================

use super::subscriber_list::{Subscription, SubscriberList};
use super::{SubscriptionId, Topic};
use crate::error::StageError;

//=== Delivery ============================================================

/// Outcome of one publish.
#[derive(Debug, Default)]
pub struct Delivery {
    /// Handlers that returned `Ok`.
    pub delivered: usize,
    /// Errors returned by failing handlers, in subscription order.
    pub errors: Vec<StageError>,
}

impl Delivery {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turns the first handler error, if any, into an `Err`.
    pub fn into_result(self) -> Result<usize, StageError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(self.delivered),
        }
    }
}

//=== Event Channel =======================================================

/// Per-topic subscriber lists sharing one mutable context `C`.
pub struct EventChannel<C> {
    topics: HashMap<TypeId, Box<dyn SubscriberList>>,
    next_id: u64,
    _context: PhantomData<fn(&mut C)>,
}

impl<C: 'static> EventChannel<C> {
    /// Creates a channel with no subscribers.
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
            next_id: 0,
            _context: PhantomData,
        }
    }

    //--- Subscriptions ----------------------------------------------------

    /// Registers `handler` for topic `T`.
    ///
    /// Handlers of one topic run in the order they were subscribed.
    pub fn subscribe<T, F>(&mut self, handler: F) -> SubscriptionId
    where
        T: Topic,
        F: FnMut(&mut C, &T) -> Result<(), StageError> + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let list = self
            .topics
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Vec::<Subscription<C, T>>::new()));

        if let Some(list) = list.as_any_mut().downcast_mut::<Vec<Subscription<C, T>>>() {
            list.push(Subscription {
                id,
                handler: Box::new(handler),
            });
            trace!("Subscribed {:?} to '{}'", id, T::NAME);
        }
        id
    }

    /// Removes a subscription. Returns true if it existed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.topics.values_mut().any(|list| list.remove(id))
    }

    /// Removes every subscriber of topic `T`.
    pub fn clear<T: Topic>(&mut self) {
        if let Some(list) = self.topics.get_mut(&TypeId::of::<T>()) {
            list.clear_subscribers();
        }
    }

    //--- Publishing -------------------------------------------------------

    /// Delivers `event` to every subscriber of `T`, synchronously.
    pub fn publish<T: Topic>(&mut self, context: &mut C, event: &T) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(list) = self
            .topics
            .get_mut(&TypeId::of::<T>())
            .and_then(|list| list.as_any_mut().downcast_mut::<Vec<Subscription<C, T>>>())
        else {
            trace!("No subscribers for '{}'", T::NAME);
            return delivery;
        };

        for subscription in list.iter_mut() {
            match (subscription.handler)(context, event) {
                Ok(()) => delivery.delivered += 1,
                Err(err) => {
                    warn!("Subscriber {:?} for '{}' failed: {}", subscription.id, T::NAME, err);
                    delivery.errors.push(err);
                }
            }
        }
        delivery
    }

    //--- Query API --------------------------------------------------------

    /// Returns the number of subscribers of topic `T`.
    pub fn subscriber_count<T: Topic>(&self) -> usize {
        self.topics
            .get(&TypeId::of::<T>())
            .map(|list| list.len())
            .unwrap_or(0)
    }
}

impl<C: 'static> Default for EventChannel<C> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
