//! Plugin trait definitions

use super::info::PluginInfo;
use super::value::{CallSignature, CallValue};
use crate::connection::VpnConnection;
use bitflags::bitflags;
use std::path::Path;

bitflags! {
    /// Optional high-level operations a plugin declares support for
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EditorCapabilities: u32 {
        const NONE = 0x00;
        /// Plugin can import connections from files
        const IMPORT = 0x01;
        /// Plugin can export connections to files
        const EXPORT = 0x02;
        /// Plugin supports IPv6 configuration
        const IPV6 = 0x04;
    }
}

/// Configuration editor returned by a plugin for one connection
pub trait VpnEditor: Send {
    /// Write the editor's current state into `connection`
    fn update_connection(&self, connection: &mut VpnConnection) -> Result<(), String>;
}

/// Generic named-call entry points of a plugin.
///
/// A plugin either provides both signature negotiation and invocation or
/// neither of them.
pub trait CallHandler: Send + Sync {
    /// Declared signature of `call_name`, or `None` if the plugin does not
    /// know the call
    fn signature(&self, call_name: &str) -> Option<CallSignature>;

    /// Run `call_name`. Inputs and output slots have already been checked
    /// against [`CallHandler::signature`]. `Err(None)` means failure without
    /// detail.
    fn call(
        &self,
        call_name: &str,
        args_in: &[CallValue],
        args_out: &mut [CallValue],
    ) -> Result<(), Option<String>>;
}

/// Contract every VPN editor plugin implements.
///
/// Methods returning `Option` model optional members: `None` means the
/// plugin does not implement them.
pub trait VpnEditorPlugin: Send + Sync {
    /// Short display name
    fn name(&self) -> &str;

    /// Longer description
    fn description(&self) -> &str;

    /// D-Bus service name of the plugin's VPN service
    fn service(&self) -> &str;

    fn capabilities(&self) -> EditorCapabilities;

    /// Create an editor, pre-filled from `connection` if given
    fn get_editor(&self, connection: Option<&VpnConnection>) -> Result<Box<dyn VpnEditor>, String>;

    fn import_from_file(&self, _path: &Path) -> Option<Result<VpnConnection, String>> {
        None
    }

    fn export_to_file(&self, _path: &Path, _connection: &VpnConnection) -> Option<Result<(), String>> {
        None
    }

    fn suggested_filename(&self, _connection: &VpnConnection) -> Option<String> {
        None
    }

    fn call_handler(&self) -> Option<&dyn CallHandler> {
        None
    }

    /// Invoked once each time a different plugin-info record is linked
    fn notify_plugin_info_set(&self, _info: &PluginInfo) {}
}
