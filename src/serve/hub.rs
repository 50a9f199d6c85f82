// src/serve/hub.rs

use tokio::sync::broadcast;
use tracing::debug;

/// Message pushed to every connected browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadMessage {
    /// Refresh the page.
    Reload,
    /// Show a short banner, e.g. "Running jekyll build".
    Notify(String),
}

/// Broadcast point between tasks (build, reload) and browser connections.
///
/// The hub exists before the server starts, so a reload that happens first
/// simply reaches nobody.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<ReloadMessage>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self { tx }
    }

    /// Ask all connected browsers to refresh. Returns how many were reached.
    pub fn reload(&self) -> usize {
        self.send(ReloadMessage::Reload)
    }

    /// Show `message` in all connected browsers. Returns how many were reached.
    pub fn notify(&self, message: impl Into<String>) -> usize {
        self.send(ReloadMessage::Notify(message.into()))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    fn send(&self, message: ReloadMessage) -> usize {
        // `send` only fails when nobody is subscribed.
        match self.tx.send(message.clone()) {
            Ok(n) => {
                debug!(?message, clients = n, "pushed message to browsers");
                n
            }
            Err(_) => {
                debug!(?message, "no browsers connected");
                0
            }
        }
    }
}
