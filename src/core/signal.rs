//=========================================================================
// One-Shot Signals
//=========================================================================
//
// Awaitable values resolved exactly once, polled from the host tick.
//
// Architecture:
//   Signal<T> ──resolve(value)──> bounded(1) channel ──> Completion<T>
//                                                           ↓
//                                        poll() once per frame
//
// Dropping a `Completion` is how a waiter cancels. Dropping a `Signal`
// without resolving it abandons the completion, which the waiter sees as
// `Resolution::Abandoned`.
//
//=========================================================================

//=== External Dependencies ===============================================

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

//=== Construction ========================================================

/// Creates a connected signal/completion pair.
pub fn oneshot<T>() -> (Signal<T>, Completion<T>) {
    let (tx, rx) = bounded(1);
    (Signal { tx }, Completion { rx, finished: false })
}

/// Creates a release handle and the completion it resolves.
///
/// Unlike [`Signal`], a [`Release`] can be cloned and fired from several
/// places; only the first release counts.
pub fn release_pair() -> (Release, Completion<()>) {
    let (tx, rx) = bounded(1);
    (Release { tx }, Completion { rx, finished: false })
}

//=== Signal ==============================================================

/// Producer side of a one-shot completion.
#[derive(Debug)]
pub struct Signal<T> {
    tx: Sender<T>,
}

impl<T> Signal<T> {
    /// Resolves the paired completion.
    ///
    /// Consumes the signal, so a completion can never be resolved twice.
    /// Returns `false` if the waiter already dropped its completion.
    pub fn resolve(self, value: T) -> bool {
        self.tx.try_send(value).is_ok()
    }
}

//=== Release =============================================================

/// Cloneable trigger for a `Completion<()>`.
#[derive(Debug, Clone)]
pub struct Release {
    tx: Sender<()>,
}

impl Release {
    /// Fires the release. Later calls are ignored.
    pub fn release(&self) {
        let _ = self.tx.try_send(());
    }
}

//=== Completion ==========================================================

/// Result of polling a [`Completion`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<T> {
    /// Not resolved yet.
    Pending,
    /// Resolved with a value. Reported once; later polls see `Abandoned`.
    Resolved(T),
    /// The producer went away without resolving, or the value was taken.
    Abandoned,
}

/// Consumer side of a one-shot signal.
#[derive(Debug)]
pub struct Completion<T> {
    rx: Receiver<T>,
    finished: bool,
}

impl<T> Completion<T> {
    /// Polls without blocking.
    pub fn poll(&mut self) -> Resolution<T> {
        if self.finished {
            return Resolution::Abandoned;
        }
        match self.rx.try_recv() {
            Ok(value) => {
                self.finished = true;
                Resolution::Resolved(value)
            }
            Err(TryRecvError::Empty) => Resolution::Pending,
            Err(TryRecvError::Disconnected) => {
                self.finished = true;
                Resolution::Abandoned
            }
        }
    }

    /// Returns true once the completion has been resolved or abandoned
    /// and observed through [`Completion::poll`].
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
