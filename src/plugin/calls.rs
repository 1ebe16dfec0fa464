//! Well-known named calls understood by many VPN editor plugins.
//!
//! These are conventions between callers and plugins. The bridge only
//! enforces whatever signature a plugin declares for them.

use super::bridge::PluginCall;
use super::traits::VpnEditorPlugin;
use super::value::{CallSignature, TypeTag};
use crate::error::EditorPluginResult;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Input: service type. Output: short name, pretty name, description, flags.
pub const CALL_GET_SERVICE_INFO: &str = "get-service-info";

/// Input: service type. Output: list of add-details for multi-entry add flows.
pub const CALL_GET_SERVICE_ADD_DETAILS: &str = "get-service-add-details";

/// Input: service type, add-detail. Output: pretty name, description,
/// add-detail key, flags.
pub const CALL_GET_SERVICE_ADD_DETAIL: &str = "get-service-add-detail";

pub const GET_SERVICE_INFO_SIGNATURE: CallSignature = CallSignature::borrowed(
    &[TypeTag::String],
    &[TypeTag::String, TypeTag::String, TypeTag::String, TypeTag::UInt],
);

pub const GET_SERVICE_ADD_DETAILS_SIGNATURE: CallSignature =
    CallSignature::borrowed(&[TypeTag::String], &[TypeTag::StringList]);

pub const GET_SERVICE_ADD_DETAIL_SIGNATURE: CallSignature = CallSignature::borrowed(
    &[TypeTag::String, TypeTag::String],
    &[TypeTag::String, TypeTag::String, TypeTag::String, TypeTag::UInt],
);

bitflags! {
    /// Flags returned by `get-service-info`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ServiceFlags: u32 {
        const NONE = 0x00;
        /// The UI may offer to add connections of this service type
        const CAN_ADD = 0x01;
    }
}

/// Result of `get-service-info`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub short_name: String,
    pub pretty_name: String,
    pub description: String,
    pub flags: ServiceFlags,
}

/// Result of `get-service-add-detail`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddDetail {
    pub pretty_name: String,
    pub description: String,
    /// VPN data key to set to the add-detail when creating such a connection
    pub add_detail_key: String,
    pub flags: u32,
}

pub fn get_service_info(plugin: &dyn VpnEditorPlugin, service_type: &str) -> EditorPluginResult<ServiceInfo> {
    let (short_name, pretty_name, description, flags): (String, String, String, u32) =
        PluginCall::new(plugin, CALL_GET_SERVICE_INFO)?
            .arg(service_type)?
            .invoke()?
            .extract()?;

    Ok(ServiceInfo {
        short_name,
        pretty_name,
        description,
        flags: ServiceFlags::from_bits_retain(flags),
    })
}

pub fn get_service_add_details(plugin: &dyn VpnEditorPlugin, service_type: &str) -> EditorPluginResult<Vec<String>> {
    let (details,): (Vec<String>,) = PluginCall::new(plugin, CALL_GET_SERVICE_ADD_DETAILS)?
        .arg(service_type)?
        .invoke()?
        .extract()?;
    Ok(details)
}

pub fn get_service_add_detail(
    plugin: &dyn VpnEditorPlugin,
    service_type: &str,
    add_detail: &str,
) -> EditorPluginResult<AddDetail> {
    let (pretty_name, description, add_detail_key, flags): (String, String, String, u32) =
        PluginCall::new(plugin, CALL_GET_SERVICE_ADD_DETAIL)?
            .arg(service_type)?
            .arg(add_detail)?
            .invoke()?
            .extract()?;

    Ok(AddDetail {
        pretty_name,
        description,
        add_detail_key,
        flags,
    })
}
