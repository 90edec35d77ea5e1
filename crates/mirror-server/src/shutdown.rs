//! Graceful shutdown coordination.
//!
//! The controller fans a single shutdown signal out to the HTTP server and
//! anything else that subscribes. Shutdown can be triggered programmatically
//! or by SIGINT via the signal listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

/// Controller for coordinating graceful shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownController {
    inner: Arc<ShutdownInner>,
}

#[derive(Debug)]
struct ShutdownInner {
    /// Whether shutdown has been initiated.
    initiated: AtomicBool,
    /// Sender for the shutdown signal.
    tx: watch::Sender<bool>,
    /// Kept so subscribe works after all external receivers drop.
    rx: watch::Receiver<bool>,
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownController {
    /// Create a new shutdown controller.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            inner: Arc::new(ShutdownInner {
                initiated: AtomicBool::new(false),
                tx,
                rx,
            }),
        }
    }

    /// Subscribe to shutdown notifications.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.rx.clone()
    }

    /// Whether shutdown has been initiated.
    pub fn is_initiated(&self) -> bool {
        self.inner.initiated.load(Ordering::SeqCst)
    }

    /// Initiate shutdown. Idempotent.
    pub fn trigger(&self) {
        if self.inner.initiated.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("shutdown initiated");
        let _ = self.inner.tx.send(true);
    }

    /// Spawn a task that triggers shutdown on ctrl-c.
    pub fn spawn_signal_listener(&self) {
        let controller = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controller.trigger();
            }
        });
    }
}
