//! Shutdown coordination for the lookup service.
//!
//! # Data Flow
//! ```text
//! SIGINT/SIGTERM → trigger_on_signal → trigger → every subscriber's recv()
//!                                              → HttpServer stops accepting, drains
//! ```

use tokio::sync::broadcast;

use crate::lifecycle::signals;

/// Coordinator for graceful shutdown.
///
/// The HTTP server subscribes before it starts serving. A trigger reaches
/// every receiver that exists at that moment; receivers created afterwards
/// miss it.
pub struct Shutdown {
    /// Broadcast channel sender. Capacity 1: the only message is "stop".
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a coordinator with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Tell every subscriber to stop and return how many were notified.
    ///
    /// Safe to call more than once and with nobody listening.
    pub fn trigger(&self) -> usize {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(subscribers = notified, "Shutdown triggered");
        notified
    }

    /// Wait for SIGINT or SIGTERM, then [`trigger`](Self::trigger).
    ///
    /// Meant to sit in a `select!` next to the server future.
    pub async fn trigger_on_signal(&self) {
        signals::wait_for_shutdown_signal().await;
        self.trigger();
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
