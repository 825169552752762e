//=========================================================================
// Status Registry
//=========================================================================
//
// Observable map of scene id → "currently loading" flag.
//
// Every known scene is seeded once when the orchestrator starts. Updates
// arrive through the `scene-loading` topic and are forwarded to
// observers synchronously, in registration order.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::BTreeMap;

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use crate::core::scene::SceneId;

//=== Status Registry =====================================================

type Observer = Box<dyn FnMut(&SceneId, bool)>;

/// Loading flag per scene, with change observers.
#[derive(Default)]
pub struct StatusRegistry {
    statuses: BTreeMap<SceneId, bool>,
    observers: Vec<Observer>,
}

impl StatusRegistry {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the initial flag for a scene without notifying observers.
    ///
    /// Seeding an already known scene keeps its current flag.
    pub fn seed(&mut self, id: &SceneId, is_loading: bool) {
        if self.statuses.contains_key(id) {
            warn!("Scene {} already seeded in status registry", id);
            return;
        }
        self.statuses.insert(id.clone(), is_loading);
    }

    //--- Updates ----------------------------------------------------------

    /// Records a loading flag and notifies observers.
    ///
    /// Setting the current value again changes nothing and notifies no
    /// one. Unknown ids are accepted and start being tracked. Returns true
    /// if the flag changed.
    pub fn set_loading(&mut self, id: &SceneId, is_loading: bool) -> bool {
        if self.statuses.get(id) == Some(&is_loading) {
            return false;
        }
        debug!("Scene {} loading = {}", id, is_loading);
        self.statuses.insert(id.clone(), is_loading);
        for observer in &mut self.observers {
            observer(id, is_loading);
        }
        true
    }

    /// Registers an observer called on every flag change.
    pub fn watch(&mut self, observer: impl FnMut(&SceneId, bool) + 'static) {
        self.observers.push(Box::new(observer));
    }

    //--- Queries ----------------------------------------------------------

    /// Flag for `id`, or `None` for a scene never seeded or reported.
    pub fn get(&self, id: &SceneId) -> Option<bool> {
        self.statuses.get(id).copied()
    }

    pub fn is_loading(&self, id: &SceneId) -> bool {
        self.get(id).unwrap_or(false)
    }

    /// Scenes currently flagged as loading, sorted by id.
    pub fn loading_scenes(&self) -> Vec<&SceneId> {
        self.statuses
            .iter()
            .filter_map(|(id, loading)| loading.then_some(id))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SceneId, bool)> {
        self.statuses.iter().map(|(id, loading)| (id, *loading))
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

impl std::fmt::Debug for StatusRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusRegistry")
            .field("statuses", &self.statuses)
            .field("observers", &self.observers.len())
            .finish()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
