//! Connectivity snapshot shared by the scheduler and its tasks.
//!
//! The network monitor overwrites the snapshot on every connectivity event;
//! tasks read it when deciding whether their configuration can run now.

use std::sync::{PoisonError, RwLock};

use crate::error::RegistrationError;
use crate::observer::{EventCallback, ManualSource};

/// Bearer type of the active network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkType {
    #[default]
    Invalid,
    Wifi,
    Cellular,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkInfo {
    pub network_type: NetworkType,
    pub is_metered: bool,
    pub is_roaming: bool,
}

/// Link technology reported by the connectivity source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bearer {
    Wifi,
    Cellular,
    /// Ethernet, VPN, and anything else with internet capability.
    Other,
}

/// "Has internet capability" change on the default network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Available {
        bearer: Bearer,
        /// Roaming state of the default cellular slot; ignored for other bearers.
        roaming: bool,
    },
    Lost,
}

impl NetworkInfo {
    /// Cellular is treated as metered; Wi-Fi is not.
    pub fn from_bearer(bearer: Bearer, roaming: bool) -> Self {
        match bearer {
            Bearer::Wifi => Self {
                network_type: NetworkType::Wifi,
                is_metered: false,
                is_roaming: false,
            },
            Bearer::Cellular => Self {
                network_type: NetworkType::Cellular,
                is_metered: true,
                is_roaming: roaming,
            },
            Bearer::Other => Self::default(),
        }
    }
}

pub type NetworkCallback = EventCallback<ConnectivityEvent>;

/// Source of connectivity change notifications.
pub trait NetworkObserver: Send + Sync {
    fn register_on_network_change(&self, callback: NetworkCallback)
        -> Result<(), RegistrationError>;
}

/// In-process connectivity source; `emit` fans out to every registered callback.
pub type ManualNetworkObserver = ManualSource<ConnectivityEvent>;

impl NetworkObserver for ManualSource<ConnectivityEvent> {
    fn register_on_network_change(
        &self,
        callback: NetworkCallback,
    ) -> Result<(), RegistrationError> {
        self.register(callback)
    }
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    online: bool,
    info: NetworkInfo,
}

/// Process-wide current network snapshot.
///
/// Starts online with an unknown (`Invalid`) bearer so unrestricted tasks can
/// run even when no connectivity source is attached.
#[derive(Debug)]
pub struct NetworkState {
    snapshot: RwLock<Snapshot>,
}

impl Default for NetworkState {
    fn default() -> Self {
        Self {
            snapshot: RwLock::new(Snapshot {
                online: true,
                info: NetworkInfo::default(),
            }),
        }
    }
}

impl NetworkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.read().online
    }

    pub fn current(&self) -> NetworkInfo {
        self.read().info
    }

    pub fn set_available(&self, info: NetworkInfo) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Snapshot {
            online: true,
            info,
        };
    }

    pub fn set_lost(&self) {
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Snapshot {
            online: false,
            info: NetworkInfo::default(),
        };
    }

    fn read(&self) -> Snapshot {
        *self.snapshot.read().unwrap_or_else(PoisonError::into_inner)
    }
}
