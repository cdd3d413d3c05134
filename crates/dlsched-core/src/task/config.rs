//! Per-task download configuration and network policy.

use serde::Serialize;
use std::collections::HashMap;
use std::path::PathBuf;

use crate::network::{NetworkInfo, NetworkType};

/// Which bearers a task may transfer over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedNetwork {
    /// No restriction at all; metered and roaming permissions are not consulted.
    #[default]
    Unrestricted,
    Wifi,
    Cellular,
    WifiOrCellular,
}

impl AllowedNetwork {
    pub fn permits(self, network_type: NetworkType) -> bool {
        match (self, network_type) {
            (AllowedNetwork::Unrestricted, _) => true,
            (_, NetworkType::Invalid) => false,
            (AllowedNetwork::Wifi, NetworkType::Wifi) => true,
            (AllowedNetwork::Cellular, NetworkType::Cellular) => true,
            (AllowedNetwork::WifiOrCellular, _) => true,
            _ => false,
        }
    }
}

/// Everything needed to create a download task.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub url: String,
    /// Destination file; partial content is appended and resumed.
    pub file_path: PathBuf,
    pub headers: HashMap<String, String>,
    pub title: String,
    pub description: String,
    pub network: AllowedNetwork,
    /// Allow transfers over metered networks.
    pub metered: bool,
    /// Allow transfers while roaming.
    pub roaming: bool,
    pub owner_uid: u32,
    pub owner_bundle_name: String,
}

impl DownloadConfig {
    pub fn new(url: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            file_path: file_path.into(),
            headers: HashMap::new(),
            title: String::new(),
            description: String::new(),
            network: AllowedNetwork::Unrestricted,
            metered: false,
            roaming: false,
            owner_uid: 0,
            owner_bundle_name: String::new(),
        }
    }

    pub fn owned_by(mut self, bundle_name: impl Into<String>, uid: u32) -> Self {
        self.owner_bundle_name = bundle_name.into();
        self.owner_uid = uid;
        self
    }

    pub fn with_network(mut self, network: AllowedNetwork, metered: bool, roaming: bool) -> Self {
        self.network = network;
        self.metered = metered;
        self.roaming = roaming;
        self
    }

    /// Whether the current network allows this configuration to transfer.
    pub fn is_satisfied_by(&self, info: &NetworkInfo) -> bool {
        if self.network == AllowedNetwork::Unrestricted {
            return true;
        }
        if info.is_roaming && !self.roaming {
            return false;
        }
        if info.is_metered && !self.metered {
            return false;
        }
        self.network.permits(info.network_type)
    }
}
