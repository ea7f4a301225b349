//! Process-wide cancellation signal.
//!
//! One [`Shutdown`] is created at startup and cloned into the HTTP server
//! and the refresh loop. Triggering any clone stops both. A refresh in
//! flight is abandoned, but a source request it already started on the
//! blocking pool runs on until the source timeout ends it.

use std::sync::Arc;

use tokio::sync::watch;

/// Shared cancellation signal.
#[derive(Clone, Debug)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    /// Create an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Cancel everything waiting on this signal. Idempotent.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has fired.
    #[must_use]
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the signal fires.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of `self`, so this only
        // returns once the value flips to `true`.
        let _ = rx.wait_for(|&stopped| stopped).await;
    }
}
