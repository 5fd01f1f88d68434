use tokio::sync::watch;
use tracing::info;

use crate::source::NetworkProperties;

/// Process-wide current network selection.
///
/// Backed by `watch` channels: new observers immediately see the latest
/// value, and every change notifies all of them. An empty identifier means
/// no network is selected.
#[derive(Debug, Clone)]
pub struct NetworkService {
    current: watch::Sender<String>,
    properties: watch::Sender<Option<NetworkProperties>>,
}

impl Default for NetworkService {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkService {
    pub fn new() -> Self {
        let (current, _) = watch::channel(String::new());
        let (properties, _) = watch::channel(None);
        Self {
            current,
            properties,
        }
    }

    /// Select `network`. Observers are only notified when the identifier changes.
    pub fn set_network(&self, network: &str, properties: Option<NetworkProperties>) {
        let changed = self.current.send_if_modified(|current| {
            if current == network {
                false
            } else {
                *current = network.to_string();
                true
            }
        });

        if changed {
            info!(network, "network selected");
            self.properties.send_replace(properties);
        }
    }

    pub fn clear(&self) {
        self.set_network("", None);
    }

    /// Snapshot of the current network identifier
    pub fn network(&self) -> String {
        self.current.borrow().clone()
    }

    pub fn properties(&self) -> Option<NetworkProperties> {
        self.properties.borrow().clone()
    }

    pub fn current_network(&self) -> watch::Receiver<String> {
        self.current.subscribe()
    }

    pub fn current_properties(&self) -> watch::Receiver<Option<NetworkProperties>> {
        self.properties.subscribe()
    }
}
