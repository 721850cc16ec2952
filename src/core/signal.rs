//! Update signal between modules and the aggregator.
//!
//! The signal carries no payload: it only records that at least one slot
//! changed since the aggregator last drained it. It is backed by a
//! capacity-1 channel, so any number of notifications sent while one is
//! already pending collapse into that single pending wakeup.

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

/// Creates a connected signal/listener pair.
pub fn update_channel() -> (UpdateSignal, UpdateListener) {
    let (tx, rx) = mpsc::channel(1);
    (UpdateSignal { tx }, UpdateListener { rx })
}

/// Sending half, cloned into every module handle.
#[derive(Debug, Clone)]
pub struct UpdateSignal {
    tx: mpsc::Sender<()>,
}

impl UpdateSignal {
    /// Marks the status line dirty. Never blocks.
    pub fn notify(&self) {
        match self.tx.try_send(()) {
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => trace!("Update listener is gone, dropping signal"),
        }
    }
}

/// Receiving half, owned by the aggregator.
#[derive(Debug)]
pub struct UpdateListener {
    rx: mpsc::Receiver<()>,
}

impl UpdateListener {
    /// Waits for the next pending signal. Returns `false` once every
    /// `UpdateSignal` has been dropped and nothing is pending.
    pub async fn wait(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }

    /// Consumes every pending signal without blocking and returns how many
    /// were consumed.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while self.rx.try_recv().is_ok() {
            drained += 1;
        }
        drained
    }
}
