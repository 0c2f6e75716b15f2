//! Connectivity flag shared between the platform and the HTTP client.
//!
//! The platform pushes connection-type changes in through
//! [`Connectivity::set_connection_type`]; requests read the flag
//! synchronously before going out.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    None,
    Wifi,
    Mobile,
    Ethernet,
    Bluetooth,
    Vpn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionState {
    pub connected: bool,
    pub connection_type: ConnectionType,
}

#[derive(Debug, Clone)]
pub struct Connectivity {
    state: Arc<watch::Sender<ConnectionState>>,
}

impl Connectivity {
    /// Starts disconnected until the platform reports a connection type.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(ConnectionState::default());
        Self { state: Arc::new(tx) }
    }

    /// A flag that is already marked as connected, for hosts without a
    /// connectivity callback.
    pub fn always_online() -> Self {
        let connectivity = Self::new();
        connectivity.set_connection_type(ConnectionType::Ethernet);
        connectivity
    }

    /// Platform callback. Subscribers are only woken when the type changes.
    pub fn set_connection_type(&self, connection_type: ConnectionType) {
        let changed = self.state.send_if_modified(|state| {
            if state.connection_type == connection_type {
                return false;
            }
            state.connection_type = connection_type;
            state.connected = connection_type != ConnectionType::None;
            true
        });

        if changed {
            debug!(?connection_type, "connection type changed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.borrow().connected
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.state.borrow().connection_type
    }

    /// Receiver that observes every connection-type change from now on.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}
