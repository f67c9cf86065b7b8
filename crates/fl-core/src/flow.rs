//! Static flow entry model for `/wm/staticflowentrypusher`
//!
//! The static flow pusher stores entries keyed by `name`: pushing an entry
//! whose name already exists replaces it. All match values travel as JSON
//! strings, which is what the pusher's parser expects.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// EtherType value for IPv4 matches
pub const ETHER_TYPE_IPV4: &str = "0x0800";

/// Match fields of a static flow entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowMatch {
    #[serde(
        rename = "ingress-port",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_text",
        deserialize_with = "opt_from_text"
    )]
    pub ingress_port: Option<u32>,
    #[serde(rename = "src-mac", default, skip_serializing_if = "Option::is_none")]
    pub src_mac: Option<String>,
    #[serde(rename = "dst-mac", default, skip_serializing_if = "Option::is_none")]
    pub dst_mac: Option<String>,
    #[serde(
        rename = "vlan-id",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_text",
        deserialize_with = "opt_from_text"
    )]
    pub vlan_id: Option<u16>,
    #[serde(rename = "ether-type", default, skip_serializing_if = "Option::is_none")]
    pub ether_type: Option<String>,
    #[serde(
        rename = "protocol",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_text",
        deserialize_with = "opt_from_text"
    )]
    pub protocol: Option<u8>,
    #[serde(rename = "src-ip", default, skip_serializing_if = "Option::is_none")]
    pub src_ip: Option<String>,
    #[serde(rename = "dst-ip", default, skip_serializing_if = "Option::is_none")]
    pub dst_ip: Option<String>,
    #[serde(
        rename = "src-port",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_text",
        deserialize_with = "opt_from_text"
    )]
    pub src_port: Option<u16>,
    #[serde(
        rename = "dst-port",
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_text",
        deserialize_with = "opt_from_text"
    )]
    pub dst_port: Option<u16>,
}

impl FlowMatch {
    /// Match IPv4 traffic from `src_ip` to `dst_ip`
    pub fn ipv4(src_ip: impl Into<String>, dst_ip: impl Into<String>) -> Self {
        Self {
            ether_type: Some(ETHER_TYPE_IPV4.to_string()),
            src_ip: Some(src_ip.into()),
            dst_ip: Some(dst_ip.into()),
            ..Self::default()
        }
    }
}

/// One named entry in the static flow pusher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticFlowEntry {
    /// Unique key of the entry across all switches
    pub name: String,
    /// DPID of the switch the entry is installed on
    pub switch: String,
    #[serde(flatten)]
    pub flow_match: FlowMatch,
    /// Comma-separated action list, e.g. `output=2`
    #[serde(default)]
    pub actions: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_text",
        deserialize_with = "opt_from_text"
    )]
    pub priority: Option<u16>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_text",
        deserialize_with = "opt_from_text"
    )]
    pub active: Option<bool>,
}

impl StaticFlowEntry {
    pub fn new(
        name: impl Into<String>,
        switch: impl Into<String>,
        flow_match: FlowMatch,
        actions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            switch: switch.into(),
            flow_match,
            actions: actions.into(),
            priority: None,
            active: None,
        }
    }

    pub fn with_priority(mut self, priority: u16) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }
}

/// Action string forwarding out of a single port
pub fn output_action(port: u32) -> String {
    format!("output={}", port)
}

/// Acknowledgement returned by the static flow pusher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushStatus {
    pub status: String,
}

impl PushStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
        }
    }
}

impl fmt::Display for PushStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.status)
    }
}

/// Which switches a list/clear request covers
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum FlowScope {
    #[default]
    All,
    Switch(String),
}

impl FlowScope {
    /// Parse `all` (any case) or a switch DPID
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("all") {
            FlowScope::All
        } else {
            FlowScope::Switch(s.to_string())
        }
    }
}

impl fmt::Display for FlowScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowScope::All => f.write_str("all"),
            FlowScope::Switch(dpid) => f.write_str(dpid),
        }
    }
}

/// Installed entries keyed by switch DPID, then by flow name
pub type FlowTable = BTreeMap<String, BTreeMap<String, Value>>;

fn as_text<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: fmt::Display,
    S: Serializer,
{
    match value {
        Some(v) => serializer.collect_str(v),
        None => serializer.serialize_none(),
    }
}

fn opt_from_text<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: FromStr,
    T::Err: fmt::Display,
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(D::Error::custom),
        Some(other) => other.to_string().parse().map(Some).map_err(D::Error::custom),
    }
}
