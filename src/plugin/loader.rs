//! Dynamic plugin loader - loads editor plugins from shared libraries (.so files)
//!
//! Loading follows a fixed order: resolve the name, check whether the library
//! is already mapped, validate the file (only for resolved names that are not
//! yet resident), map it, run the factory, decide what happens to the
//! loader's reference, and finally validate the instance's identity.

use super::abi::FactoryOutcome;
use super::instance::{EditorPlugin, Residency};
use super::security::{FilePredicate, SecurityValidator};
use crate::error::{EditorPluginError, EditorPluginResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffix of libtool archives, which the OS loader would treat specially
const LEGACY_ARCHIVE_SUFFIX: &str = ".la";

/// A library mapped by a [`DynamicLoader`]
pub trait LoadedModule {
    /// Resolve the factory entry point and run it. `Err` means the symbol
    /// could not be resolved.
    fn create_plugin(&self) -> Result<FactoryOutcome, String>;

    /// Drop this reference to the mapping
    fn release(self: Box<Self>);

    /// Keep the mapping for the lifetime of the process
    fn keep_resident(self: Box<Self>);
}

/// Access to the OS dynamic loader
#[cfg_attr(test, mockall::automock)]
pub trait DynamicLoader {
    /// Return a new reference to `filename` if it is already mapped into the
    /// process, without loading it otherwise
    fn open_resident(&self, filename: &Path) -> Option<Box<dyn LoadedModule>>;

    /// Map `filename`, running its static initialisers
    fn open(&self, filename: &Path) -> Result<Box<dyn LoadedModule>, String>;
}

/// Constraints applied while loading one plugin
#[derive(Clone, Copy, Default)]
pub struct LoadOptions<'a> {
    /// Resolve bare names inside the plugin directory and validate the file
    pub do_path_resolution: bool,
    /// Service the instance must advertise
    pub required_service: Option<&'a str>,
    /// Owner the file must belong to (besides root)
    pub required_owner: Option<u32>,
    /// Extra policy check run on the file
    pub predicate: Option<&'a FilePredicate>,
}

impl<'a> LoadOptions<'a> {
    /// Options for names that may point at untrusted files
    pub fn checked() -> Self {
        Self {
            do_path_resolution: true,
            ..Self::default()
        }
    }

    /// Options that pass the name straight to the OS loader
    pub fn unchecked() -> Self {
        Self::default()
    }

    pub fn service(mut self, service: &'a str) -> Self {
        self.required_service = Some(service);
        self
    }

    pub fn owner(mut self, uid: u32) -> Self {
        self.required_owner = Some(uid);
        self
    }

    pub fn predicate(mut self, predicate: &'a FilePredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

/// Plugin loader handles dynamic loading of editor plugin modules
pub struct PluginLoader<L> {
    /// Directory bare plugin names are resolved in
    plugin_dir: PathBuf,
    backend: L,
}

#[cfg(feature = "plugins")]
impl PluginLoader<LibLoader> {
    /// Create a loader backed by the OS dynamic loader
    pub fn new<P: AsRef<Path>>(plugin_dir: P) -> Self {
        Self::with_backend(plugin_dir, LibLoader)
    }

    pub fn from_config(config: &crate::config::EditorConfig) -> Self {
        Self::new(&config.paths.plugin_dir)
    }
}

impl<L: DynamicLoader> PluginLoader<L> {
    pub fn with_backend<P: AsRef<Path>>(plugin_dir: P, backend: L) -> Self {
        Self {
            plugin_dir: plugin_dir.as_ref().to_path_buf(),
            backend,
        }
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    pub fn backend(&self) -> &L {
        &self.backend
    }

    /// File name handed to the OS loader for `name`.
    ///
    /// With resolution enabled, a name without a path separator and without
    /// the legacy archive suffix lives in the plugin directory. Everything
    /// else is used literally.
    pub fn resolve_filename(&self, name: &str, do_path_resolution: bool) -> PathBuf {
        if do_path_resolution && !name.contains('/') && !name.ends_with(LEGACY_ARCHIVE_SUFFIX) {
            self.plugin_dir.join(name)
        } else {
            PathBuf::from(name)
        }
    }

    /// Load the plugin library `name` and construct a validated instance
    pub fn load(&self, name: &str, options: &LoadOptions<'_>) -> EditorPluginResult<EditorPlugin> {
        if name.is_empty() {
            return Err(EditorPluginError::LoadError {
                plugin: String::new(),
                message: "empty plugin name".to_string(),
            });
        }

        let filename = self.resolve_filename(name, options.do_path_resolution);
        info!("Loading editor plugin {} from {}", name, filename.display());

        let (module, residency) = match self.backend.open_resident(&filename) {
            Some(module) => {
                debug!("{} is already resident, skipping file checks", filename.display());
                (module, Residency::Released)
            }
            None => {
                if options.do_path_resolution {
                    SecurityValidator::new()
                        .required_owner(options.required_owner)
                        .predicate(options.predicate)
                        .validate(&filename)?;
                }
                let module = self
                    .backend
                    .open(&filename)
                    .map_err(|message| EditorPluginError::LoadError {
                        plugin: name.to_string(),
                        message,
                    })?;
                (module, Residency::KeptResident)
            }
        };

        let outcome = match module.create_plugin() {
            Ok(outcome) => outcome,
            Err(message) => {
                module.release();
                return Err(EditorPluginError::LoadError {
                    plugin: name.to_string(),
                    message: format!("failed to resolve the plugin factory: {}", message),
                });
            }
        };

        // The factory may have registered process-global state, so a fresh
        // mapping is never unmapped
        match residency {
            Residency::Released => module.release(),
            _ => module.keep_resident(),
        }

        let plugin = outcome.map_err(|reason| match reason {
            Some(message) => EditorPluginError::FactoryFailed {
                plugin: name.to_string(),
                message,
            },
            None => EditorPluginError::UnknownInitError(name.to_string()),
        })?;

        if plugin.name().is_empty() {
            return Err(EditorPluginError::MissingName(name.to_string()));
        }
        if let Some(expected) = options.required_service {
            if plugin.service() != expected {
                return Err(EditorPluginError::ServiceMismatch {
                    plugin: name.to_string(),
                    expected: expected.to_string(),
                    found: plugin.service().to_string(),
                });
            }
        }

        info!(
            "Loaded editor plugin {} ({}) from {}",
            plugin.name(),
            plugin.service(),
            filename.display()
        );
        Ok(EditorPlugin::from_library(plugin, filename, residency))
    }

    /// Load a plugin by bare name (inside the plugin directory) or absolute
    /// path, always validating the file before it is mapped
    pub fn load_from_file(
        &self,
        name: &str,
        required_service: Option<&str>,
        required_owner: Option<u32>,
        predicate: Option<&FilePredicate>,
    ) -> EditorPluginResult<EditorPlugin> {
        self.load(
            name,
            &LoadOptions {
                do_path_resolution: true,
                required_service,
                required_owner,
                predicate,
            },
        )
    }

    /// Pass `name` directly to the OS loader without any file checks
    pub fn load_unchecked(&self, name: &str, required_service: Option<&str>) -> EditorPluginResult<EditorPlugin> {
        self.load(
            name,
            &LoadOptions {
                required_service,
                ..LoadOptions::unchecked()
            },
        )
    }
}

#[cfg(feature = "plugins")]
pub use self::os::LibLoader;

#[cfg(feature = "plugins")]
mod os {
    use super::{DynamicLoader, LoadedModule};
    use crate::plugin::abi::{invoke_factory, FactoryOutcome, RawPluginFactory, FACTORY_SYMBOL};
    use libloading::os::unix::{Library, Symbol};
    use std::path::Path;
    use tracing::warn;

    /// [`DynamicLoader`] backed by `dlopen`
    #[derive(Debug, Clone, Copy, Default)]
    pub struct LibLoader;

    impl DynamicLoader for LibLoader {
        fn open_resident(&self, filename: &Path) -> Option<Box<dyn LoadedModule>> {
            let flags = libc::RTLD_LAZY | libc::RTLD_LOCAL | libc::RTLD_NOLOAD;
            let library = unsafe { Library::open(Some(filename), flags) }.ok()?;
            Some(Box::new(LibModule { library }))
        }

        fn open(&self, filename: &Path) -> Result<Box<dyn LoadedModule>, String> {
            let flags = libc::RTLD_LAZY | libc::RTLD_LOCAL;
            let library = unsafe { Library::open(Some(filename), flags) }.map_err(|e| e.to_string())?;
            Ok(Box::new(LibModule { library }))
        }
    }

    struct LibModule {
        library: Library,
    }

    impl LoadedModule for LibModule {
        fn create_plugin(&self) -> Result<FactoryOutcome, String> {
            let factory: Symbol<RawPluginFactory> =
                unsafe { self.library.get(FACTORY_SYMBOL) }.map_err(|e| e.to_string())?;
            Ok(unsafe { invoke_factory(*factory) })
        }

        fn release(self: Box<Self>) {
            if let Err(e) = self.library.close() {
                warn!("Failed to release plugin library: {}", e);
            }
        }

        fn keep_resident(self: Box<Self>) {
            std::mem::forget(self.library);
        }
    }
}
