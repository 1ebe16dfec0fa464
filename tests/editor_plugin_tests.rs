//! Integration tests for the editor plugin host
//!
//! The plugin below is exported with the same macro a plugin library would
//! use; a loader backend hands its factory to the host instead of dlopen.

use libvpneditor::plugin::abi::invoke_factory;
use libvpneditor::plugin::calls::CALL_GET_SERVICE_INFO;
use libvpneditor::plugin::{
    CallHandler, CallSignature, CallValue, DynamicLoader, EditorCapabilities, LoadOptions, LoadedModule,
    PluginInfo, PluginInfoStore, PluginLoader, Residency, ServiceFlags, TypeTag, VpnEditor,
    VpnEditorPlugin,
};
use libvpneditor::{EditorPluginError, VpnConnection};
use serial_test::serial;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

const SERVICE: &str = "org.example.demo";

static FACTORY_FAILS: AtomicBool = AtomicBool::new(false);
static NOTIFIED: AtomicUsize = AtomicUsize::new(0);

struct DemoEditor;

impl VpnEditor for DemoEditor {
    fn update_connection(&self, connection: &mut VpnConnection) -> Result<(), String> {
        connection.set_data_item("gateway", "demo.example.com");
        Ok(())
    }
}

struct DemoPlugin;

impl CallHandler for DemoPlugin {
    fn signature(&self, call_name: &str) -> Option<CallSignature> {
        (call_name == CALL_GET_SERVICE_INFO).then(|| {
            CallSignature::borrowed(
                &[TypeTag::String],
                &[TypeTag::String, TypeTag::String, TypeTag::String, TypeTag::UInt],
            )
        })
    }

    fn call(&self, _call_name: &str, args_in: &[CallValue], args_out: &mut [CallValue]) -> Result<(), Option<String>> {
        if args_in[0].as_str() != Some(SERVICE) {
            return Err(Some("unknown service type".to_string()));
        }
        args_out[0] = CallValue::String("demo".to_string());
        args_out[1] = CallValue::String("Demo VPN".to_string());
        args_out[2] = CallValue::String("Demo VPN for integration tests".to_string());
        args_out[3] = CallValue::UInt(ServiceFlags::CAN_ADD.bits());
        Ok(())
    }
}

impl VpnEditorPlugin for DemoPlugin {
    fn name(&self) -> &str {
        "demo"
    }

    fn description(&self) -> &str {
        "Demo VPN editor"
    }

    fn service(&self) -> &str {
        SERVICE
    }

    fn capabilities(&self) -> EditorCapabilities {
        EditorCapabilities::IMPORT | EditorCapabilities::EXPORT
    }

    fn get_editor(&self, _connection: Option<&VpnConnection>) -> Result<Box<dyn VpnEditor>, String> {
        Ok(Box::new(DemoEditor))
    }

    fn suggested_filename(&self, connection: &VpnConnection) -> Option<String> {
        Some(format!("{}.conf", connection.id))
    }

    fn call_handler(&self) -> Option<&dyn CallHandler> {
        Some(self)
    }

    fn notify_plugin_info_set(&self, _info: &PluginInfo) {
        NOTIFIED.fetch_add(1, Ordering::SeqCst);
    }
}

fn create_demo() -> Result<DemoPlugin, String> {
    if FACTORY_FAILS.load(Ordering::SeqCst) {
        return Err("demo daemon is not installed".to_string());
    }
    Ok(DemoPlugin)
}

libvpneditor::export_editor_plugin!(create_demo);

/// Backend that "maps" every file by handing out the exported factory
#[derive(Default)]
struct StaticBackend {
    opened: Arc<AtomicUsize>,
}

struct StaticModule;

impl LoadedModule for StaticModule {
    fn create_plugin(&self) -> Result<libvpneditor::plugin::abi::FactoryOutcome, String> {
        Ok(unsafe { invoke_factory(netctl_vpn_editor_plugin_factory) })
    }

    fn release(self: Box<Self>) {}

    fn keep_resident(self: Box<Self>) {}
}

impl DynamicLoader for StaticBackend {
    fn open_resident(&self, _filename: &Path) -> Option<Box<dyn LoadedModule>> {
        None
    }

    fn open(&self, _filename: &Path) -> Result<Box<dyn LoadedModule>, String> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticModule))
    }
}

fn plugin_dir() -> (TempDir, PathBuf) {
    let dir = TempDir::new().unwrap();
    let library = dir.path().join("libvpn-demo-editor.so");
    std::fs::write(&library, b"\x7fELF").unwrap();
    std::fs::set_permissions(&library, std::fs::Permissions::from_mode(0o644)).unwrap();
    (dir, library)
}

#[test]
#[serial]
fn test_load_and_query_exported_plugin() {
    let (dir, library) = plugin_dir();
    let loader = PluginLoader::with_backend(dir.path(), StaticBackend::default());

    let plugin = loader
        .load_from_file(
            "libvpn-demo-editor.so",
            Some(SERVICE),
            Some(libvpneditor::plugin::security::current_uid()),
            None,
        )
        .unwrap();
    assert_eq!(plugin.name(), "demo");
    assert_eq!(plugin.filename(), Some(library.as_path()));
    assert_eq!(plugin.residency(), Residency::KeptResident);
    assert_eq!(loader.backend().opened.load(Ordering::SeqCst), 1);

    let info = plugin.service_info(SERVICE).unwrap();
    assert_eq!(info.pretty_name, "Demo VPN");
    assert!(info.flags.contains(ServiceFlags::CAN_ADD));

    let err = plugin.service_info("org.example.other").unwrap_err();
    assert!(matches!(err, EditorPluginError::CallFailed { .. }));

    assert!(plugin
        .service_add_details(SERVICE)
        .unwrap_err()
        .is_unsupported());

    let connection = VpnConnection::new("office", SERVICE);
    assert_eq!(plugin.suggested_filename(&connection).as_deref(), Some("office.conf"));
    assert!(plugin.export(Path::new("/tmp/office.conf"), &connection).unwrap_err().is_unsupported());
}

#[test]
#[serial]
fn test_factory_failure_reason_reaches_caller() {
    let (dir, _library) = plugin_dir();
    let loader = PluginLoader::with_backend(dir.path(), StaticBackend::default());

    FACTORY_FAILS.store(true, Ordering::SeqCst);
    let result = loader.load("libvpn-demo-editor.so", &LoadOptions::checked());
    FACTORY_FAILS.store(false, Ordering::SeqCst);

    match result.unwrap_err() {
        EditorPluginError::FactoryFailed { plugin, message } => {
            assert_eq!(plugin, "libvpn-demo-editor.so");
            assert_eq!(message, "demo daemon is not installed");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
#[serial]
fn test_service_mismatch_is_rejected() {
    let (dir, _library) = plugin_dir();
    let loader = PluginLoader::with_backend(dir.path(), StaticBackend::default());
    let err = loader
        .load("libvpn-demo-editor.so", &LoadOptions::checked().service("org.example.other"))
        .unwrap_err();
    assert!(err.to_string().contains("invalid service name"));
}

#[test]
#[serial]
fn test_missing_library_is_not_mapped() {
    let dir = TempDir::new().unwrap();
    let loader = PluginLoader::with_backend(dir.path(), StaticBackend::default());
    let err = loader
        .load("libvpn-missing.so", &LoadOptions::checked())
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(loader.backend().opened.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[serial]
async fn test_description_to_linked_plugin() {
    let (dir, _library) = plugin_dir();
    let info_dir = TempDir::new().unwrap();
    std::fs::write(
        info_dir.path().join("demo.toml"),
        format!(
            "name = \"demo\"\nservice = \"{}\"\nplugin = \"libvpn-demo-editor.so\"\naliases = [\"demo\"]\n",
            SERVICE
        ),
    )
    .unwrap();

    let store = PluginInfoStore::scan(info_dir.path()).await.unwrap();
    let info = store.find_by_service("demo").unwrap().clone();

    let loader = PluginLoader::with_backend(dir.path(), StaticBackend::default());
    let before = NOTIFIED.load(Ordering::SeqCst);
    let plugin = info.load_editor_plugin(&loader).unwrap();
    assert_eq!(NOTIFIED.load(Ordering::SeqCst), before + 1);
    assert!(Arc::ptr_eq(&plugin.plugin_info().unwrap(), &info));

    let again = info.load_editor_plugin(&loader).unwrap();
    assert!(Arc::ptr_eq(&plugin, &again));
    assert_eq!(loader.backend().opened.load(Ordering::SeqCst), 1);

    let mut connection = VpnConnection::new("office", SERVICE);
    plugin
        .get_editor(Some(&connection))
        .unwrap()
        .update_connection(&mut connection)
        .unwrap();
    assert_eq!(connection.data_item("gateway"), Some("demo.example.com"));

    drop(store);
    drop(info);
    drop(again);
    assert!(plugin.plugin_info().is_none());
}
