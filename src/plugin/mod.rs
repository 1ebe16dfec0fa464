//! VPN editor plugin system for netctl
//!
//! Editor plugins are shared libraries exporting a single factory symbol.
//! This module covers the whole path from a plugin name to a usable instance:
//! - Trust checks on the library file before it is mapped
//! - Loading through the OS dynamic loader and running the factory
//! - Identity validation (name, service)
//! - A weak link back to the declarative plugin description
//! - A signature-checked bridge for named plugin calls

pub mod abi;
pub mod bridge;
pub mod calls;
pub mod info;
pub mod instance;
pub mod loader;
pub mod registry;
pub mod security;
pub mod traits;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use abi::FACTORY_SYMBOL;
pub use bridge::{callv, CallOutputs, FromCallOutputs, PluginCall};
pub use calls::{AddDetail, ServiceFlags, ServiceInfo};
pub use info::{PluginDescriptor, PluginInfo, PluginInfoStore};
pub use instance::{EditorPlugin, Residency};
pub use loader::{DynamicLoader, LoadOptions, LoadedModule, PluginLoader};
pub use registry::WeakLink;
pub use security::{FilePredicate, SecurityValidator};
pub use traits::{CallHandler, EditorCapabilities, VpnEditor, VpnEditorPlugin};
pub use value::{CallArg, CallSignature, CallValue, IntoCallArg, TypeTag};

#[cfg(feature = "plugins")]
pub use loader::LibLoader;
