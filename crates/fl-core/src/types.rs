//! Controller data model shared across the workspace
//!
//! Wire names follow the Floodlight REST API. Where controller versions
//! disagree on a field name both spellings are accepted on input.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Where a host connects to the switching fabric
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentPoint {
    /// Switch DPID (colon-separated hex octets)
    #[serde(rename = "switchDPID", alias = "switch")]
    pub switch_dpid: String,
    /// Switch port number
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u32,
}

impl AttachmentPoint {
    pub fn new(switch_dpid: impl Into<String>, port: u32) -> Self {
        Self {
            switch_dpid: switch_dpid.into(),
            port,
        }
    }
}

impl fmt::Display for AttachmentPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.switch_dpid, self.port)
    }
}

/// One element of a route returned by `/wm/topology/route`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteHop {
    #[serde(rename = "switch", alias = "switchDPID")]
    pub switch_dpid: String,
    #[serde(deserialize_with = "deserialize_port")]
    pub port: u32,
}

impl RouteHop {
    pub fn new(switch_dpid: impl Into<String>, port: u32) -> Self {
        Self {
            switch_dpid: switch_dpid.into(),
            port,
        }
    }
}

/// A host tracked by the device manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Device {
    #[serde(rename = "entityClass", default, skip_serializing_if = "Option::is_none")]
    pub entity_class: Option<String>,
    #[serde(default)]
    pub mac: Vec<String>,
    #[serde(default)]
    pub ipv4: Vec<String>,
    /// VLAN ids; numbers on older controllers, hex strings on newer ones
    #[serde(default)]
    pub vlan: Vec<Value>,
    #[serde(rename = "attachmentPoint", default)]
    pub attachment_points: Vec<AttachmentPoint>,
    #[serde(rename = "lastSeen", default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<u64>,
    /// Additional fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Device {
    /// First attachment point in controller order
    pub fn first_attachment_point(&self) -> Option<&AttachmentPoint> {
        self.attachment_points.first()
    }
}

/// Query filter for `/wm/device/`
///
/// Unset fields are left out of the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub mac: Option<String>,
    pub ipv4: Option<String>,
    pub vlan: Option<u16>,
    pub dpid: Option<String>,
    pub port: Option<u32>,
}

impl DeviceFilter {
    /// Filter matching a single IPv4 address
    pub fn by_ipv4(ip: impl Into<String>) -> Self {
        Self {
            ipv4: Some(ip.into()),
            ..Self::default()
        }
    }

    /// Filter matching a single MAC address
    pub fn by_mac(mac: impl Into<String>) -> Self {
        Self {
            mac: Some(mac.into()),
            ..Self::default()
        }
    }

    /// Query parameters in wire order
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(mac) = &self.mac {
            params.push(("mac".to_string(), mac.clone()));
        }
        if let Some(ipv4) = &self.ipv4 {
            params.push(("ipv4".to_string(), ipv4.clone()));
        }
        if let Some(vlan) = self.vlan {
            params.push(("vlan".to_string(), vlan.to_string()));
        }
        if let Some(dpid) = &self.dpid {
            params.push(("dpid".to_string(), dpid.clone()));
        }
        if let Some(port) = self.port {
            params.push(("port".to_string(), port.to_string()));
        }
        params
    }
}

/// Switch summary from `/wm/core/controller/switches/json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchInfo {
    #[serde(alias = "switchDPID")]
    pub dpid: String,
    #[serde(rename = "inetAddress", default, skip_serializing_if = "Option::is_none")]
    pub inet_address: Option<String>,
    #[serde(rename = "connectedSince", default, skip_serializing_if = "Option::is_none")]
    pub connected_since: Option<u64>,
    /// Additional fields
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// An inter-switch or external link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(rename = "src-switch")]
    pub src_switch: String,
    #[serde(rename = "src-port", deserialize_with = "deserialize_port")]
    pub src_port: u32,
    #[serde(rename = "dst-switch")]
    pub dst_switch: String,
    #[serde(rename = "dst-port", deserialize_with = "deserialize_port")]
    pub dst_port: u32,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
}

/// Cluster id to member switch DPIDs
pub type SwitchClusters = BTreeMap<String, Vec<String>>;

/// Statistics category for `/wm/core/switch/...`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatType {
    Port,
    Queue,
    Flow,
    Aggregate,
    Desc,
    Table,
    Features,
}

impl StatType {
    pub const ALL: [StatType; 7] = [
        StatType::Port,
        StatType::Queue,
        StatType::Flow,
        StatType::Aggregate,
        StatType::Desc,
        StatType::Table,
        StatType::Features,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatType::Port => "port",
            StatType::Queue => "queue",
            StatType::Flow => "flow",
            StatType::Aggregate => "aggregate",
            StatType::Desc => "desc",
            StatType::Table => "table",
            StatType::Features => "features",
        }
    }
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        StatType::ALL
            .into_iter()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| {
                format!(
                    "unknown stat type '{}', expected one of: port, queue, flow, aggregate, desc, table, features",
                    s
                )
            })
    }
}

/// Decode a port given as a number, a numeric string or `{"portNumber": n}`
pub fn deserialize_port<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    port_from_value(&value).ok_or_else(|| D::Error::custom(format!("invalid port: {}", value)))
}

fn port_from_value(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("portNumber").and_then(port_from_value),
        _ => None,
    }
}
