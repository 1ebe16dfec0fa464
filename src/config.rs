//! Configuration management for the VPN editor plugin host

use crate::error::{EditorPluginError, EditorPluginResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Overrides `paths.plugin_dir`
pub const ENV_PLUGIN_DIR: &str = "NETCTL_VPN_PLUGIN_DIR";
/// Overrides `paths.plugin_info_dir`
pub const ENV_PLUGIN_INFO_DIR: &str = "NETCTL_VPN_INFO_DIR";

/// Main editor configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Directory locations
    #[serde(default)]
    pub paths: EditorPaths,
    /// Loader policy
    #[serde(default)]
    pub loader: LoaderSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPaths {
    /// Directory bare editor library names are resolved in
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: PathBuf,
    /// Directory holding the `*.toml` plugin descriptions
    #[serde(default = "default_plugin_info_dir")]
    pub plugin_info_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// Require editor libraries to be owned by the current user or root
    #[serde(default = "default_check_owner")]
    pub check_owner: bool,
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from("/usr/lib/netctl/vpn")
}

fn default_plugin_info_dir() -> PathBuf {
    PathBuf::from("/etc/netctl/vpn")
}

fn default_check_owner() -> bool {
    true
}

impl Default for EditorPaths {
    fn default() -> Self {
        Self {
            plugin_dir: default_plugin_dir(),
            plugin_info_dir: default_plugin_info_dir(),
        }
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            check_owner: default_check_owner(),
        }
    }
}

impl EditorConfig {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> EditorPluginResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| EditorPluginError::ConfigError(format!("Failed to read config: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| EditorPluginError::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> EditorPluginResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EditorPluginError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| EditorPluginError::ConfigError(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Apply directory overrides from the environment
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(dir) = std::env::var_os(ENV_PLUGIN_DIR).filter(|v| !v.is_empty()) {
            debug!("{} overrides the plugin directory", ENV_PLUGIN_DIR);
            self.paths.plugin_dir = PathBuf::from(dir);
        }
        if let Some(dir) = std::env::var_os(ENV_PLUGIN_INFO_DIR).filter(|v| !v.is_empty()) {
            debug!("{} overrides the plugin info directory", ENV_PLUGIN_INFO_DIR);
            self.paths.plugin_info_dir = PathBuf::from(dir);
        }
        self
    }

    /// Owner editor libraries must belong to, if ownership is checked
    pub fn required_owner(&self) -> Option<u32> {
        self.loader
            .check_owner
            .then(crate::plugin::security::current_uid)
    }
}
