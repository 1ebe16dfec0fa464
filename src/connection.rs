//! Minimal VPN connection record passed through editor plugins.
//!
//! The full connection data model lives elsewhere; plugins only see the
//! VPN service type and its flat data and secret maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// VPN connection as exchanged with editor plugins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpnConnection {
    /// Connection UUID
    pub uuid: Uuid,
    /// Connection display name
    pub id: String,
    /// VPN service type (D-Bus service name of the VPN plugin)
    pub service_type: String,
    /// Plugin-specific settings
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    /// Plugin-specific secrets
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
}

impl VpnConnection {
    pub fn new(id: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            id: id.into(),
            service_type: service_type.into(),
            data: BTreeMap::new(),
            secrets: BTreeMap::new(),
        }
    }

    pub fn data_item(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    pub fn set_data_item(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.data.insert(key.into(), value.into());
    }
}
