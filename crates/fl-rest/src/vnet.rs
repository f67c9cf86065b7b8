//! Legacy virtual network (`/networkService/v1.1`) request types
//!
//! The controller ignores the tenant component of the path; every request
//! goes to the `default` tenant and the network name mirrors its id.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Tenant used in every virtual network path
pub const DEFAULT_TENANT: &str = "default";

/// Body of a network create/update: `{"network": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkRequest {
    pub network: NetworkSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

impl NetworkRequest {
    pub fn new(network_id: &str, gateway: Option<&str>) -> Self {
        Self {
            network: NetworkSpec {
                name: network_id.to_string(),
                gateway: gateway.map(str::to_string),
            },
        }
    }
}

/// Body of a port attachment: `{"attachment": {"id": ..., "mac": ...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentRequest {
    pub attachment: AttachmentSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttachmentSpec {
    pub id: String,
    pub mac: String,
}

impl AttachmentRequest {
    pub fn new(network_id: &str, host_mac: &str) -> Self {
        Self {
            attachment: AttachmentSpec {
                id: network_id.to_string(),
                mac: host_mac.to_string(),
            },
        }
    }
}

/// A virtual network as listed by the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualNetwork {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    /// Additional fields (attached MACs, port mapping)
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
