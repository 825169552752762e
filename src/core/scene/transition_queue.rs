//=========================================================================
// Transition Queue
//=========================================================================
//
// Queue for scene commands.
//
// Scenes queue commands here from their hooks. The orchestrator drains
// the queue at the start of each tick and hands every command to the
// transition controller.
//
//=========================================================================

//=== Internal Dependencies ===============================================

use super::SceneId;

//=== Scene Command =======================================================

/// A scene change requested from inside a scene hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    /// Hand off from `from` to `to`.
    Start { from: SceneId, to: SceneId },

    /// Prepare `ids` in the background without activating them.
    Preload { from: SceneId, ids: Vec<SceneId> },
}

//=== Transition Queue ====================================================

/// FIFO of scene commands processed at tick boundaries.
#[derive(Debug)]
pub struct TransitionQueue {
    queue: Vec<SceneCommand>,
}

impl TransitionQueue {
    /// Creates a new empty queue.
    pub fn new() -> Self {
        Self { queue: Vec::new() }
    }

    /// Queues a command for the next tick.
    pub fn push(&mut self, command: SceneCommand) {
        self.queue.push(command);
    }

    /// Returns an iterator over the queued commands.
    pub fn iter(&self) -> impl Iterator<Item = &SceneCommand> {
        self.queue.iter()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued commands.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Clears all queued commands.
    pub fn clear(&mut self) {
        self.queue.clear()
    }

    /// Takes all commands from the queue, leaving it empty.
    ///
    /// Commands queued while the taken batch is processed land in the
    /// fresh queue and run on the following tick.
    pub fn take(&mut self) -> Vec<SceneCommand> {
        std::mem::take(&mut self.queue)
    }
}

impl Default for TransitionQueue {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
