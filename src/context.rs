//! Process-wide application state.

use tokio::sync::broadcast;
use tracing::{info, warn};

/// Shared state handed to the long-running loops.
///
/// Currently this only carries the shutdown signal.
#[derive(Debug, Clone)]
pub struct AppContext {
    shutdown: broadcast::Sender<()>,
}

impl AppContext {
    /// Create a context with no shutdown requested.
    pub fn new() -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self { shutdown }
    }

    /// A receiver that resolves once shutdown is requested.
    pub fn shutdown_signal(&self) -> broadcast::Receiver<()> {
        self.shutdown.subscribe()
    }

    /// Ask every loop holding a shutdown signal to stop.
    pub fn request_shutdown(&self) {
        // No receivers means nothing is running yet.
        let _ = self.shutdown.send(());
    }

    /// Request shutdown on Ctrl-C.
    pub fn install_ctrl_c_handler(&self) {
        let context = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupted, shutting down");
                    context.request_shutdown();
                }
                Err(e) => warn!("Unable to listen for Ctrl-C: {}", e),
            }
        });
    }
}

impl Default for AppContext {
    fn default() -> Self {
        Self::new()
    }
}
