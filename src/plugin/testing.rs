//! In-process plugin used by the unit tests

use super::calls::{
    CALL_GET_SERVICE_ADD_DETAIL, CALL_GET_SERVICE_ADD_DETAILS, CALL_GET_SERVICE_INFO,
    GET_SERVICE_ADD_DETAILS_SIGNATURE, GET_SERVICE_ADD_DETAIL_SIGNATURE, GET_SERVICE_INFO_SIGNATURE,
};
use super::info::PluginInfo;
use super::traits::{CallHandler, EditorCapabilities, VpnEditor, VpnEditorPlugin};
use super::value::{CallSignature, CallValue, TypeTag};
use crate::connection::VpnConnection;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const SERVICE_INFO: &str = CALL_GET_SERVICE_INFO;

pub struct FakeEditor {
    remote: String,
}

impl VpnEditor for FakeEditor {
    fn update_connection(&self, connection: &mut VpnConnection) -> Result<(), String> {
        connection.set_data_item("remote", self.remote.clone());
        Ok(())
    }
}

pub struct FakePlugin {
    name: String,
    service: String,
    capabilities: EditorCapabilities,
    with_calls: bool,
    failure: Option<Option<String>>,
    corrupt_outputs: bool,
    calls: AtomicUsize,
    notifications: Arc<AtomicUsize>,
}

impl FakePlugin {
    pub fn new(name: &str, service: &str) -> Self {
        Self {
            name: name.to_string(),
            service: service.to_string(),
            capabilities: EditorCapabilities::IMPORT,
            with_calls: true,
            failure: None,
            corrupt_outputs: false,
            calls: AtomicUsize::new(0),
            notifications: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn without_calls(mut self) -> Self {
        self.with_calls = false;
        self
    }

    pub fn failing(mut self, reason: Option<&str>) -> Self {
        self.failure = Some(reason.map(str::to_string));
        self
    }

    pub fn corrupting_outputs(mut self) -> Self {
        self.corrupt_outputs = true;
        self
    }

    pub fn with_capabilities(mut self, capabilities: EditorCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn calls_made(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Counter shared with the plugin, readable after it has been boxed
    pub fn notifications(&self) -> Arc<AtomicUsize> {
        self.notifications.clone()
    }
}

fn string_arg(args: &[CallValue], index: usize) -> &str {
    args[index].as_str().unwrap_or_default()
}

impl CallHandler for FakePlugin {
    fn signature(&self, call_name: &str) -> Option<CallSignature> {
        match call_name {
            CALL_GET_SERVICE_INFO => Some(GET_SERVICE_INFO_SIGNATURE),
            CALL_GET_SERVICE_ADD_DETAILS => Some(GET_SERVICE_ADD_DETAILS_SIGNATURE),
            CALL_GET_SERVICE_ADD_DETAIL => Some(GET_SERVICE_ADD_DETAIL_SIGNATURE),
            "echo" => Some(CallSignature::owned(vec![TypeTag::Int64], vec![TypeTag::Int64])),
            _ => None,
        }
    }

    fn call(
        &self,
        call_name: &str,
        args_in: &[CallValue],
        args_out: &mut [CallValue],
    ) -> Result<(), Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.failure {
            return Err(reason.clone());
        }

        match call_name {
            CALL_GET_SERVICE_INFO => {
                let service_type = string_arg(args_in, 0);
                args_out[0] = CallValue::String(self.name.clone());
                args_out[1] = CallValue::String("Fake VPN".to_string());
                args_out[2] = CallValue::String(format!("Fake VPN for {}", service_type));
                args_out[3] = if self.corrupt_outputs {
                    CallValue::Int(1)
                } else {
                    CallValue::UInt(1)
                };
            }
            CALL_GET_SERVICE_ADD_DETAILS => {
                let service_type = string_arg(args_in, 0);
                if service_type != self.service {
                    return Err(Some(format!("unknown service type {}", service_type)));
                }
                args_out[0] = CallValue::StringList(vec!["tls".to_string(), "static-key".to_string()]);
            }
            CALL_GET_SERVICE_ADD_DETAIL => {
                let detail = string_arg(args_in, 1);
                args_out[0] = CallValue::String(format!("Fake VPN ({})", detail));
                args_out[1] = CallValue::String(format!("Fake VPN using {}", detail));
                args_out[2] = CallValue::String("connection-type".to_string());
                args_out[3] = CallValue::UInt(0);
            }
            "echo" => {
                if let CallValue::Int64(n) = args_in[0] {
                    args_out[0] = CallValue::Int64(n + 1);
                }
            }
            _ => return Err(None),
        }
        Ok(())
    }
}

impl VpnEditorPlugin for FakePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Fake VPN editor"
    }

    fn service(&self) -> &str {
        &self.service
    }

    fn capabilities(&self) -> EditorCapabilities {
        self.capabilities
    }

    fn get_editor(&self, connection: Option<&VpnConnection>) -> Result<Box<dyn VpnEditor>, String> {
        let remote = connection
            .and_then(|c| c.data_item("remote"))
            .unwrap_or("vpn.example.com")
            .to_string();
        Ok(Box::new(FakeEditor { remote }))
    }

    fn import_from_file(&self, path: &Path) -> Option<Result<VpnConnection, String>> {
        let id = path.file_stem()?.to_string_lossy().into_owned();
        Some(Ok(VpnConnection::new(id, self.service.clone())))
    }

    fn call_handler(&self) -> Option<&dyn CallHandler> {
        if self.with_calls {
            Some(self)
        } else {
            None
        }
    }

    fn notify_plugin_info_set(&self, _info: &PluginInfo) {
        self.notifications.fetch_add(1, Ordering::SeqCst);
    }
}
