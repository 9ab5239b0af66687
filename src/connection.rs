//! Connection-status register shared between the push channel and its readers.
//!
//! Only the connection manager writes it. Everything else reads, e.g. to decide
//! whether a like must adjust its counter locally.

use once_cell::sync::Lazy;
use tokio::sync::watch;

static GLOBAL_STATUS: Lazy<ConnectionStatus> = Lazy::new(ConnectionStatus::new);

#[derive(Clone, Debug)]
pub struct ConnectionStatus {
    tx: std::sync::Arc<watch::Sender<bool>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatus {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            tx: std::sync::Arc::new(tx),
        }
    }

    /// Process-wide register used when no dedicated one is passed around.
    pub fn global() -> ConnectionStatus {
        GLOBAL_STATUS.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.tx.borrow()
    }

    /// Receiver that wakes on every connect/disconnect transition.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.tx.send_if_modified(|current| {
            let changed = *current != connected;
            *current = connected;
            changed
        });
    }
}
