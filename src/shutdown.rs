//! Shutdown fan-out and the run-wide cancellation flag.
use tokio::sync::{broadcast, watch};

pub type ShutdownSender = broadcast::Sender<()>;
pub type ShutdownReceiver = broadcast::Receiver<()>;

/// Broadcast channel size for shutdown notifications (single signal fan-out).
const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;

#[must_use]
pub fn shutdown_channel() -> (ShutdownSender, ShutdownReceiver) {
    broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY)
}

/// Raises the cancellation flag observed by every [`CancelToken`].
///
/// Backed by a `watch` channel so tokens cloned after the flag was raised
/// still see it.
#[derive(Debug, Clone)]
pub struct CancelTrigger {
    tx: watch::Sender<bool>,
}

impl CancelTrigger {
    /// A lowered flag with no tokens yet.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Raises the flag. Returns `true` if this call was the one that raised it.
    pub fn cancel(&self) -> bool {
        !self.tx.send_replace(true)
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the flag is raised, or when the trigger is gone.
    pub async fn cancelled(&mut self) {
        if self.rx.wait_for(|cancelled| *cancelled).await.is_err() {
            tracing::debug!("Cancel trigger dropped; treating as cancelled");
        }
    }
}

impl Default for CancelTrigger {
    fn default() -> Self {
        Self::new()
    }
}
