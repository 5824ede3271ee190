//! Run event stream: the single serialization point between workers and
//! whatever renders the batch.
//!
//! Workers run concurrently, but every state mutation and every raw tool
//! output line goes through one mpsc channel, so the consumer never sees a
//! torn update and needs no locking of its own.

use tokio::sync::mpsc;

use crate::item::ItemUpdate;

/// One event produced during a run.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// A state mutation of the item at `index` in the run's collection.
    Item { index: usize, update: ItemUpdate },
    /// A raw output line from a subprocess, or an engine notice, verbatim.
    Log(String),
}

/// Producer handle for the run's event channel. Cheap to clone; safe to use
/// from any number of worker tasks at once.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<RunEvent>,
}

impl EventSink {
    /// Creates the channel. The receiver is the run's single consumer.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Emits an item mutation. A gone consumer is not an error; the run
    /// keeps going and the event is dropped.
    pub fn item(&self, index: usize, update: ItemUpdate) {
        let _ = self.tx.send(RunEvent::Item { index, update });
    }

    /// Emits one log line.
    pub fn log(&self, line: impl Into<String>) {
        let _ = self.tx.send(RunEvent::Log(line.into()));
    }
}
