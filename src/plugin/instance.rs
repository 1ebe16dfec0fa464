//! Host-side handle around a constructed plugin instance

use super::bridge::{self, PluginCall};
use super::calls::{self, AddDetail, ServiceInfo};
use super::info::PluginInfo;
use super::registry::WeakLink;
use super::traits::{EditorCapabilities, VpnEditor, VpnEditorPlugin};
use super::value::CallValue;
use crate::connection::VpnConnection;
use crate::error::{EditorPluginError, EditorPluginResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// What the loader did with its reference to the library mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Residency {
    /// The library is kept mapped for the lifetime of the process
    KeptResident,
    /// The library was already mapped; the loader's own reference was released
    Released,
    /// The instance was not created from a library
    Builtin,
}

/// A validated plugin instance together with its load provenance and its
/// link to plugin-info metadata
pub struct EditorPlugin {
    inner: Box<dyn VpnEditorPlugin>,
    filename: Option<PathBuf>,
    residency: Residency,
    plugin_info: WeakLink<PluginInfo>,
}

impl EditorPlugin {
    pub(crate) fn from_library(
        inner: Box<dyn VpnEditorPlugin>,
        filename: PathBuf,
        residency: Residency,
    ) -> Self {
        Self {
            inner,
            filename: Some(filename),
            residency,
            plugin_info: WeakLink::empty(),
        }
    }

    /// Wrap an instance that was constructed in-process
    pub fn builtin(inner: Box<dyn VpnEditorPlugin>) -> Self {
        Self {
            inner,
            filename: None,
            residency: Residency::Builtin,
            plugin_info: WeakLink::empty(),
        }
    }

    pub fn plugin(&self) -> &dyn VpnEditorPlugin {
        self.inner.as_ref()
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn description(&self) -> &str {
        self.inner.description()
    }

    pub fn service(&self) -> &str {
        self.inner.service()
    }

    pub fn capabilities(&self) -> EditorCapabilities {
        self.inner.capabilities()
    }

    /// File the instance was loaded from, as passed to the OS loader
    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn residency(&self) -> Residency {
        self.residency
    }

    pub fn get_editor(&self, connection: Option<&VpnConnection>) -> EditorPluginResult<Box<dyn VpnEditor>> {
        self.inner.get_editor(connection).map_err(EditorPluginError::Failed)
    }

    /// Import a connection. Requires the IMPORT capability.
    pub fn import(&self, path: &Path) -> EditorPluginResult<VpnConnection> {
        if !self.capabilities().contains(EditorCapabilities::IMPORT) {
            return Err(EditorPluginError::Failed(
                "the plugin does not support import capability".to_string(),
            ));
        }
        match self.inner.import_from_file(path) {
            Some(result) => result.map_err(EditorPluginError::Failed),
            None => Err(EditorPluginError::Unsupported("import".to_string())),
        }
    }

    /// Export a connection. Requires the EXPORT capability.
    pub fn export(&self, path: &Path, connection: &VpnConnection) -> EditorPluginResult<()> {
        if !self.capabilities().contains(EditorCapabilities::EXPORT) {
            return Err(EditorPluginError::Failed(
                "the plugin does not support export capability".to_string(),
            ));
        }
        match self.inner.export_to_file(path, connection) {
            Some(result) => result.map_err(EditorPluginError::Failed),
            None => Err(EditorPluginError::Unsupported("export".to_string())),
        }
    }

    pub fn suggested_filename(&self, connection: &VpnConnection) -> Option<String> {
        self.inner.suggested_filename(connection)
    }

    /// Vector form of the call bridge
    pub fn callv(
        &self,
        call_name: &str,
        args_in: &[CallValue],
        args_out: &mut [CallValue],
    ) -> EditorPluginResult<()> {
        bridge::callv(self.plugin(), call_name, args_in, args_out)
    }

    /// Start a typed call; see [`PluginCall`]
    pub fn call<'p>(&'p self, call_name: &str) -> EditorPluginResult<PluginCall<'p>> {
        PluginCall::new(self.plugin(), call_name)
    }

    pub fn service_info(&self, service_type: &str) -> EditorPluginResult<ServiceInfo> {
        calls::get_service_info(self.plugin(), service_type)
    }

    pub fn service_add_details(&self, service_type: &str) -> EditorPluginResult<Vec<String>> {
        calls::get_service_add_details(self.plugin(), service_type)
    }

    pub fn service_add_detail(&self, service_type: &str, add_detail: &str) -> EditorPluginResult<AddDetail> {
        calls::get_service_add_detail(self.plugin(), service_type, add_detail)
    }

    /// Linked plugin-info record, if it is still alive
    pub fn plugin_info(&self) -> Option<Arc<PluginInfo>> {
        self.plugin_info.get()
    }

    /// Set or clear the plugin-info link. The plugin is notified once per
    /// newly linked record; re-linking the same record does nothing.
    pub fn set_plugin_info(&mut self, info: Option<&Arc<PluginInfo>>) {
        if !self.plugin_info.set(info) {
            return;
        }
        if let Some(info) = info {
            debug!("Linked plugin {} to plugin info {}", self.name(), info.name());
            self.inner.notify_plugin_info_set(info);
        }
    }
}

impl fmt::Debug for EditorPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorPlugin")
            .field("name", &self.name())
            .field("service", &self.service())
            .field("filename", &self.filename)
            .field("residency", &self.residency)
            .field("plugin_info", &self.plugin_info)
            .finish()
    }
}
