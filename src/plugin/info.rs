//! Declarative plugin descriptions
//!
//! Every VPN plugin ships a small TOML file naming the service it handles and
//! the editor library implementing it:
//!
//! ```toml
//! name = "openvpn"
//! service = "org.freedesktop.NetworkManager.openvpn"
//! plugin = "libnm-vpn-plugin-openvpn-editor.so"
//! program = "/usr/libexec/nm-openvpn-service"
//! aliases = ["openvpn"]
//! ```

use super::instance::EditorPlugin;
use super::loader::{DynamicLoader, PluginLoader};
use super::security::current_uid;
use crate::error::{EditorPluginError, EditorPluginResult};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tracing::{debug, info, warn};

/// On-disk content of a plugin description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Short plugin name
    pub name: String,
    /// D-Bus service of the VPN daemon
    pub service: String,
    /// Editor library, a bare name inside the plugin directory or an absolute path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
    /// Auxiliary service program
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    /// Additional service types handled by the same plugin
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    /// Whether the daemon can run several connections at once
    #[serde(default)]
    pub supports_multiple: bool,
}

/// A loaded plugin description, optionally caching its editor plugin
#[derive(Debug)]
pub struct PluginInfo {
    descriptor: PluginDescriptor,
    filename: Option<PathBuf>,
    editor_plugin: Mutex<Option<Arc<EditorPlugin>>>,
}

impl PluginInfo {
    pub fn new(descriptor: PluginDescriptor) -> EditorPluginResult<Self> {
        Self::with_filename(descriptor, None)
    }

    fn with_filename(descriptor: PluginDescriptor, filename: Option<PathBuf>) -> EditorPluginResult<Self> {
        if descriptor.name.trim().is_empty() {
            return Err(EditorPluginError::ParseError("plugin info has no name".to_string()));
        }
        if descriptor.service.trim().is_empty() {
            return Err(EditorPluginError::ParseError(format!(
                "plugin info {} has no service",
                descriptor.name
            )));
        }
        Ok(Self {
            descriptor,
            filename,
            editor_plugin: Mutex::new(None),
        })
    }

    /// Parse a description; `filename` is recorded for diagnostics only
    pub fn parse(contents: &str, filename: Option<&Path>) -> EditorPluginResult<Self> {
        let descriptor: PluginDescriptor = toml::from_str(contents)?;
        Self::with_filename(descriptor, filename.map(Path::to_path_buf))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> EditorPluginResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, Some(path))
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn service(&self) -> &str {
        &self.descriptor.service
    }

    pub fn plugin(&self) -> Option<&str> {
        self.descriptor.plugin.as_deref()
    }

    pub fn program(&self) -> Option<&Path> {
        self.descriptor.program.as_deref()
    }

    pub fn aliases(&self) -> &[String] {
        &self.descriptor.aliases
    }

    pub fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    pub fn supports_service_type(&self, service_type: &str) -> bool {
        self.descriptor.service == service_type || self.descriptor.aliases.iter().any(|a| a == service_type)
    }

    /// Editor plugin loaded earlier through this record, if any
    pub fn editor_plugin(&self) -> Option<Arc<EditorPlugin>> {
        self.editor_plugin
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Load the editor plugin, requiring the library to be owned by the
    /// current user (or root)
    pub fn load_editor_plugin<L: DynamicLoader>(
        self: &Arc<Self>,
        loader: &PluginLoader<L>,
    ) -> EditorPluginResult<Arc<EditorPlugin>> {
        self.load_editor_plugin_with_owner(loader, Some(current_uid()))
    }

    /// Load the editor plugin named by this record and link it back here.
    /// The instance is cached; later calls return the same one.
    ///
    /// No lock is held while the library is loaded or while the plugin's
    /// link notification runs, so the hook may read this record. Two threads
    /// loading the same record concurrently may both run the factory; the
    /// first instance stored wins and both callers receive it.
    pub fn load_editor_plugin_with_owner<L: DynamicLoader>(
        self: &Arc<Self>,
        loader: &PluginLoader<L>,
        required_owner: Option<u32>,
    ) -> EditorPluginResult<Arc<EditorPlugin>> {
        if let Some(plugin) = self.editor_plugin() {
            return Ok(plugin);
        }

        let library = self.plugin().ok_or_else(|| {
            EditorPluginError::Failed(format!("plugin info {} does not name an editor plugin", self.name()))
        })?;

        let mut plugin = loader.load_from_file(library, Some(self.service()), required_owner, None)?;
        plugin.set_plugin_info(Some(self));
        let plugin = Arc::new(plugin);

        let mut cached = self.editor_plugin.lock().unwrap_or_else(|e| e.into_inner());
        match cached.as_ref() {
            Some(existing) => {
                debug!("Plugin info {} was loaded concurrently, keeping the first instance", self.name());
                Ok(existing.clone())
            }
            None => {
                *cached = Some(plugin.clone());
                Ok(plugin)
            }
        }
    }
}

/// Collection of plugin descriptions read from one directory
#[derive(Debug, Default)]
pub struct PluginInfoStore {
    plugins: Vec<Arc<PluginInfo>>,
}

impl PluginInfoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every `*.toml` description in `dir`, in file name order.
    ///
    /// A missing directory yields an empty store. Unreadable files and
    /// records repeating an earlier name or service are skipped.
    pub async fn scan<P: AsRef<Path>>(dir: P) -> EditorPluginResult<Self> {
        let dir = dir.as_ref();
        let mut store = Self::new();

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Plugin info directory {} does not exist", dir.display());
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            match Self::load_file(&path).await {
                Ok(info) => {
                    if let Err(e) = store.add(info) {
                        warn!("Skipping plugin info {}: {}", path.display(), e);
                    }
                }
                Err(e) => warn!("Failed to load plugin info {}: {}", path.display(), e),
            }
        }

        info!("Loaded {} VPN plugin descriptions from {}", store.plugins.len(), dir.display());
        Ok(store)
    }

    async fn load_file(path: &Path) -> EditorPluginResult<PluginInfo> {
        let contents = fs::read_to_string(path).await?;
        PluginInfo::parse(&contents, Some(path))
    }

    /// Register a description; names and services must be unique
    pub fn add(&mut self, info: PluginInfo) -> EditorPluginResult<Arc<PluginInfo>> {
        if let Some(existing) = self
            .plugins
            .iter()
            .find(|p| p.name() == info.name() || p.service() == info.service())
        {
            return Err(EditorPluginError::Failed(format!(
                "plugin {} ({}) is already registered as {} ({})",
                info.name(),
                info.service(),
                existing.name(),
                existing.service()
            )));
        }
        let info = Arc::new(info);
        self.plugins.push(info.clone());
        Ok(info)
    }

    pub fn list(&self) -> &[Arc<PluginInfo>] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&Arc<PluginInfo>> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    /// Find the plugin handling `service_type`, through its service or an alias
    pub fn find_by_service(&self, service_type: &str) -> Option<&Arc<PluginInfo>> {
        self.plugins
            .iter()
            .find(|p| p.service() == service_type)
            .or_else(|| self.plugins.iter().find(|p| p.supports_service_type(service_type)))
    }
}
