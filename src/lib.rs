//! vpn-editor - VPN editor plugin host for netctl
//!
//! Loads VPN editor plugins from shared libraries and talks to them:
//! - Trust checks on plugin files (owner, permissions, caller policy)
//! - Dynamic loading with explicit library residency
//! - Plugin descriptions (`*.toml`) linked weakly to loaded instances
//! - Signature-checked named calls (`get-service-info` and friends)
//!
//! Plugins are written against [`plugin::VpnEditorPlugin`] and export their
//! constructor with [`export_editor_plugin!`].

pub mod config;
pub mod connection;
pub mod error;
pub mod plugin;

// Re-export commonly used types
pub use config::EditorConfig;
pub use connection::VpnConnection;
pub use error::{EditorPluginError, EditorPluginResult};
pub use plugin::{
    CallSignature, CallValue, EditorCapabilities, EditorPlugin, LoadOptions, PluginCall, PluginInfo,
    PluginInfoStore, PluginLoader, Residency, TypeTag, VpnEditor, VpnEditorPlugin,
};

#[cfg(feature = "plugins")]
pub use plugin::LibLoader;
