//! Binary contract between the host and a plugin library.
//!
//! A plugin exports exactly one symbol, [`FACTORY_SYMBOL`], with the
//! [`RawPluginFactory`] signature. Plugin crates normally generate it with
//! [`export_editor_plugin!`](crate::export_editor_plugin):
//!
//! ```ignore
//! fn create() -> Result<MyPlugin, String> {
//!     Ok(MyPlugin::new())
//! }
//!
//! libvpneditor::export_editor_plugin!(create);
//! ```

use super::traits::VpnEditorPlugin;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Name of the factory entry point, NUL terminated for the OS loader
pub const FACTORY_SYMBOL: &[u8] = b"netctl_vpn_editor_plugin_factory\0";

/// Factory entry point. Returns a boxed plugin instance, or null after
/// optionally storing a `CString` reason in `error`.
#[allow(improper_ctypes_definitions)]
pub type RawPluginFactory =
    unsafe extern "C" fn(error: *mut *mut c_char) -> *mut Box<dyn VpnEditorPlugin>;

/// Store a factory failure reason. An empty reason leaves the slot null so
/// the host reports an unknown initialisation error.
///
/// # Safety
///
/// `error` must be null or point to a writable pointer slot.
pub unsafe fn set_factory_error(error: *mut *mut c_char, reason: &str) {
    if error.is_null() || reason.is_empty() {
        return;
    }
    let reason = CString::new(reason.replace('\0', " ")).unwrap_or_default();
    *error = reason.into_raw();
}

/// Take ownership of a reason stored by [`set_factory_error`]
///
/// # Safety
///
/// `error` must be null or a pointer produced by `CString::into_raw`.
pub unsafe fn take_factory_error(error: *mut c_char) -> Option<String> {
    if error.is_null() {
        return None;
    }
    let reason = CString::from_raw(error).to_string_lossy().into_owned();
    if reason.is_empty() {
        None
    } else {
        Some(reason)
    }
}

/// Result of running a factory: the instance, or the reason it gave if any
pub type FactoryOutcome = Result<Box<dyn VpnEditorPlugin>, Option<String>>;

/// Run a resolved factory and take ownership of whatever it returned
///
/// # Safety
///
/// `factory` must follow the [`RawPluginFactory`] contract and must have
/// been built against the same plugin trait definition as the host.
pub unsafe fn invoke_factory(factory: RawPluginFactory) -> FactoryOutcome {
    let mut error: *mut c_char = ptr::null_mut();
    let instance = factory(&mut error);
    let reason = take_factory_error(error);
    if instance.is_null() {
        return Err(reason);
    }
    Ok(*Box::from_raw(instance))
}

/// Export `$constructor: fn() -> Result<impl VpnEditorPlugin, String>` as
/// the plugin factory of the current `cdylib`.
#[macro_export]
macro_rules! export_editor_plugin {
    ($constructor:path) => {
        #[no_mangle]
        #[allow(improper_ctypes_definitions)]
        pub unsafe extern "C" fn netctl_vpn_editor_plugin_factory(
            error: *mut *mut ::std::os::raw::c_char,
        ) -> *mut ::std::boxed::Box<dyn $crate::plugin::VpnEditorPlugin> {
            match $constructor() {
                Ok(plugin) => {
                    let plugin: ::std::boxed::Box<dyn $crate::plugin::VpnEditorPlugin> =
                        ::std::boxed::Box::new(plugin);
                    ::std::boxed::Box::into_raw(::std::boxed::Box::new(plugin))
                }
                Err(reason) => {
                    $crate::plugin::abi::set_factory_error(error, &reason);
                    ::std::ptr::null_mut()
                }
            }
        }
    };
}
