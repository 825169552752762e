//=========================================================================
// Scene Set
//=========================================================================
//
// Owns the application's scene objects.
//
// Scenes are stored in a HashMap by id. Registration order is kept
// separately so the engine sees scenes added in a stable order.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;

use log::warn;

//=== Internal Dependencies ===============================================

use super::{Scene, SceneId};
use crate::engine::Engine;

//=== Scene Set ===========================================================

/// Registered scene objects keyed by id.
pub struct SceneSet<E: Engine> {
    scenes: HashMap<SceneId, Box<dyn Scene<E>>>,
    order: Vec<SceneId>,
}

impl<E: Engine> SceneSet<E> {
    //--- Construction -----------------------------------------------------

    pub fn new() -> Self {
        Self {
            scenes: HashMap::new(),
            order: Vec::new(),
        }
    }

    //--- Registration -----------------------------------------------------

    /// Registers a scene object under `id`.
    ///
    /// Re-registering an id replaces the object but keeps its original
    /// position in the registration order.
    pub fn register(&mut self, id: SceneId, scene: Box<dyn Scene<E>>) {
        if self.scenes.insert(id.clone(), scene).is_some() {
            warn!("Scene {} was already registered and has been replaced", id);
        } else {
            self.order.push(id);
        }
    }

    /// Moves `id` to the front of the registration order.
    pub(crate) fn promote(&mut self, id: &SceneId) {
        if let Some(pos) = self.order.iter().position(|known| known == id) {
            let id = self.order.remove(pos);
            self.order.insert(0, id);
        }
    }

    //--- Access -----------------------------------------------------------

    pub fn contains(&self, id: &SceneId) -> bool {
        self.scenes.contains_key(id)
    }

    pub fn get_mut(&mut self, id: &SceneId) -> Option<&mut Box<dyn Scene<E>>> {
        self.scenes.get_mut(id)
    }

    pub fn get(&self, id: &SceneId) -> Option<&dyn Scene<E>> {
        self.scenes.get(id).map(|scene| scene.as_ref())
    }

    /// Scene ids in registration order.
    pub fn ids(&self) -> &[SceneId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<E: Engine> Default for SceneSet<E> {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
