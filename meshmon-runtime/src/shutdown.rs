//! Shutdown signalling
//!
//! A watch channel carrying `true` once shutdown begins. Loops hold a
//! receiver and stop at their next suspension point.

use tokio::sync::watch;
use tracing::{info, warn};

/// Owner side of the shutdown signal
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// A receiver for a loop to watch
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Begin shutdown. Idempotent.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            info!("Shutdown initiated");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

/// True once the signal is raised or its owner is gone
pub async fn shutdown_requested(rx: &mut watch::Receiver<bool>) -> bool {
    if *rx.borrow_and_update() {
        return true;
    }
    match rx.changed().await {
        Ok(()) => *rx.borrow_and_update(),
        Err(_) => true,
    }
}

/// Wait for Ctrl-C or SIGTERM
pub async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(e) = result {
                            warn!("Failed to listen for Ctrl-C: {}", e);
                        }
                        info!("Received SIGINT (Ctrl-C)");
                    }
                    _ = sigterm.recv() => {
                        info!("Received SIGTERM");
                    }
                }
                return;
            }
            Err(e) => warn!("Failed to install SIGTERM handler: {}", e),
        }
    }

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl-C"),
        Err(e) => {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
