//! Floodlight northbound API client
//!
//! Typed wrappers over the controller's REST endpoints. Each method is a
//! single request: build the path, send it through the [`RestTransport`],
//! decode the JSON body.
//!
//! ```no_run
//! # async fn demo() -> fl_core::Result<()> {
//! use fl_core::{ControllerConfig, DeviceFilter};
//! use fl_rest::FloodlightClient;
//!
//! let client = FloodlightClient::new(&ControllerConfig::for_controller("10.0.0.254")?)?;
//! let hosts = client.devices(&DeviceFilter::by_ipv4("10.0.0.1")).await?;
//! # Ok(()) }
//! ```

use fl_core::{
    ControllerConfig, Device, DeviceFilter, Error, FlowScope, FlowTable, Link, PushStatus,
    Result, RouteHop, StatType, StaticFlowEntry, SwitchClusters, SwitchInfo,
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tracing::info;

use crate::transport::{HttpTransport, RestTransport};
use crate::vnet::{AttachmentRequest, NetworkRequest, VirtualNetwork, DEFAULT_TENANT};

/// Static flow pusher endpoint for add/delete
pub const STATIC_FLOW_PATH: &str = "/wm/staticflowentrypusher/json";

/// Client for the Floodlight REST API
pub struct FloodlightClient<T = HttpTransport> {
    transport: T,
}

impl FloodlightClient<HttpTransport> {
    /// Create a client talking HTTP to the configured controller
    pub fn new(config: &ControllerConfig) -> Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config)?))
    }

    /// Create a client from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(&ControllerConfig::from_env()?)
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }
}

/// `/wm/device/` answers with a bare array on older controllers and
/// `{"devices": [...]}` on newer ones
#[derive(Deserialize)]
#[serde(untagged)]
enum DeviceListing {
    Plain(Vec<Device>),
    Wrapped { devices: Vec<Device> },
}

impl<T: RestTransport> FloodlightClient<T> {
    /// Create a client over any transport
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Access the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        self.transport.request(method, path, query, body).await
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R> {
        let body = self.send(Method::GET, path, &[], None).await?;
        decode(path, body)
    }

    async fn write<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Value,
    ) -> Result<R> {
        let resp = self.send(method, path, &[], Some(body)).await?;
        decode(path, resp)
    }

    // =========================================================================
    // Switches and statistics
    // =========================================================================

    /// Aggregate statistics of one type across all switches
    pub async fn aggregate_switch_stats(&self, stat: StatType) -> Result<Value> {
        self.get(&format!("/wm/core/switch/all/{}/json", stat)).await
    }

    /// Statistics of one type for a single switch
    pub async fn switch_stats(&self, dpid: &str, stat: StatType) -> Result<Value> {
        self.get(&format!("/wm/core/switch/{}/{}/json", segment(dpid), stat))
            .await
    }

    /// All switches connected to the controller
    pub async fn switches(&self) -> Result<Vec<SwitchInfo>> {
        self.get("/wm/core/controller/switches/json").await
    }

    /// DPIDs of all connected switches, in controller order
    pub async fn switch_dpids(&self) -> Result<Vec<String>> {
        Ok(self.switches().await?.into_iter().map(|s| s.dpid).collect())
    }

    /// Controller summary (# of switches, links, hosts ...)
    pub async fn controller_summary(&self) -> Result<Value> {
        self.get("/wm/core/controller/summary/json").await
    }

    /// Global traffic counters
    ///
    /// `title` is `all` or `DPID_COUNTER_NAME_SUB_CATEGORY`, e.g.
    /// `00:00:00:00:00:00:00:01_OFPacketIn_L3_ARP`.
    pub async fn global_counters(&self, title: &str) -> Result<Value> {
        self.get(&format!("/wm/core/counter/{}/json", segment(title)))
            .await
    }

    /// Traffic counters of a single switch
    pub async fn switch_counters(&self, dpid: &str, counter: &str) -> Result<Value> {
        self.get(&format!(
            "/wm/core/counter/{}/{}/json",
            segment(dpid),
            segment(counter)
        ))
        .await
    }

    /// Controller JVM memory usage
    pub async fn memory_usage(&self) -> Result<Value> {
        self.get("/wm/core/memory/json").await
    }

    /// Controller uptime
    pub async fn uptime(&self) -> Result<Value> {
        self.get("/wm/core/system/uptime/json").await
    }

    /// Controller health
    pub async fn health(&self) -> Result<Value> {
        self.get("/wm/core/health/json").await
    }

    // =========================================================================
    // Topology
    // =========================================================================

    /// Inter-switch links discovered by LLDP
    pub async fn links(&self) -> Result<Vec<Link>> {
        self.get("/wm/topology/links/json").await
    }

    /// Switch clusters (island id to member DPIDs)
    pub async fn switch_clusters(&self) -> Result<SwitchClusters> {
        self.get("/wm/topology/switchclusters/json").await
    }

    /// Links leading out of the OpenFlow domain
    pub async fn external_links(&self) -> Result<Vec<Link>> {
        self.get("/wm/topology/external-links/json").await
    }

    /// Hop sequence between two switch ports
    pub async fn route(
        &self,
        src_dpid: &str,
        src_port: u32,
        dst_dpid: &str,
        dst_port: u32,
    ) -> Result<Vec<RouteHop>> {
        let path = format!(
            "/wm/topology/route/{}/{}/{}/{}/json",
            segment(src_dpid),
            src_port,
            segment(dst_dpid),
            dst_port
        );
        let body = self.send(Method::GET, &path, &[], None).await?;
        // Controllers answer "no route" with an empty body on some versions
        match body {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => decode(&path, Some(value)),
        }
    }

    // =========================================================================
    // Devices
    // =========================================================================

    /// Tracked hosts matching the filter
    pub async fn devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>> {
        let path = "/wm/device/";
        let body = self.send(Method::GET, path, &filter.to_query(), None).await?;
        match decode::<DeviceListing>(path, body)? {
            DeviceListing::Plain(devices) | DeviceListing::Wrapped { devices } => Ok(devices),
        }
    }

    // =========================================================================
    // Static flows
    // =========================================================================

    /// Install (or replace, by name) a static flow entry
    pub async fn add_flow(&self, entry: &StaticFlowEntry) -> Result<PushStatus> {
        let body = serde_json::to_value(entry)?;
        let status = self.write(Method::POST, STATIC_FLOW_PATH, &body).await?;
        info!("Pushed flow {} to {}", entry.name, entry.switch);
        Ok(status)
    }

    /// Remove a static flow entry by name
    pub async fn delete_flow(&self, name: &str) -> Result<PushStatus> {
        let status = self
            .write(Method::DELETE, STATIC_FLOW_PATH, &json!({ "name": name }))
            .await?;
        info!("Deleted flow {}", name);
        Ok(status)
    }

    /// Static flow entries installed on one switch or all switches
    pub async fn list_flows(&self, scope: &FlowScope) -> Result<FlowTable> {
        let path = format!(
            "/wm/staticflowentrypusher/list/{}/json",
            segment(&scope.to_string())
        );
        let body = self.send(Method::GET, &path, &[], None).await?;
        match body {
            None => Ok(FlowTable::new()),
            Some(value) => flow_table_from_value(&path, value),
        }
    }

    /// Remove every static flow entry on one switch or all switches
    pub async fn clear_flows(&self, scope: &FlowScope) -> Result<()> {
        let path = format!(
            "/wm/staticflowentrypusher/clear/{}/json",
            segment(&scope.to_string())
        );
        // The controller answers 204 without a body
        self.send(Method::GET, &path, &[], None).await?;
        info!("Cleared static flows on {}", scope);
        Ok(())
    }

    // =========================================================================
    // Virtual networks (tenant is always "default")
    // =========================================================================

    /// Create a virtual network, or update it if the id exists
    pub async fn create_virtual_network(
        &self,
        network_id: &str,
        gateway: Option<&str>,
    ) -> Result<PushStatus> {
        let body = serde_json::to_value(NetworkRequest::new(network_id, gateway))?;
        self.write(Method::POST, &network_path(network_id), &body)
            .await
    }

    /// Update a virtual network (same semantics as create on current controllers)
    pub async fn update_virtual_network(
        &self,
        network_id: &str,
        gateway: Option<&str>,
    ) -> Result<PushStatus> {
        let body = serde_json::to_value(NetworkRequest::new(network_id, gateway))?;
        self.write(Method::PUT, &network_path(network_id), &body)
            .await
    }

    /// Delete a virtual network
    pub async fn delete_virtual_network(&self, network_id: &str) -> Result<PushStatus> {
        let path = network_path(network_id);
        let body = self.send(Method::DELETE, &path, &[], None).await?;
        decode(&path, body)
    }

    /// Attach a host MAC to a logical port of a virtual network
    ///
    /// Only the logical port identifies the attachment, so use a distinct
    /// port per host.
    pub async fn attach_host(
        &self,
        network_id: &str,
        logical_port: u32,
        host_mac: &str,
    ) -> Result<PushStatus> {
        let body = serde_json::to_value(AttachmentRequest::new(network_id, host_mac))?;
        self.write(Method::PUT, &attachment_path(network_id, logical_port), &body)
            .await
    }

    /// Detach whatever host is attached to a logical port
    pub async fn detach_host(&self, network_id: &str, logical_port: u32) -> Result<PushStatus> {
        let path = attachment_path(network_id, logical_port);
        let body = self.send(Method::DELETE, &path, &[], None).await?;
        decode(&path, body)
    }

    /// All virtual networks of the default tenant
    pub async fn virtual_networks(&self) -> Result<Vec<VirtualNetwork>> {
        self.get(&format!(
            "/networkService/v1.1/tenants/{}/networks",
            DEFAULT_TENANT
        ))
        .await
    }
}

fn network_path(network_id: &str) -> String {
    format!(
        "/networkService/v1.1/tenants/{}/networks/{}",
        DEFAULT_TENANT,
        segment(network_id)
    )
}

fn attachment_path(network_id: &str, logical_port: u32) -> String {
    format!("{}/ports/{}/attachment", network_path(network_id), logical_port)
}

fn decode<R: DeserializeOwned>(path: &str, body: Option<Value>) -> Result<R> {
    let value = body.ok_or_else(|| Error::malformed(path, "empty response body"))?;
    serde_json::from_value(value).map_err(|e| Error::malformed(path, e.to_string()))
}

/// Normalize a list response into switch -> name -> entry.
///
/// Older controllers return `{dpid: {name: entry}}`, newer ones
/// `{dpid: [{name: entry}, ...]}`.
fn flow_table_from_value(path: &str, value: Value) -> Result<FlowTable> {
    let switches = match value {
        Value::Object(map) => map,
        other => {
            return Err(Error::malformed(
                path,
                format!("expected object keyed by switch, got {}", other),
            ))
        }
    };

    let mut table = FlowTable::new();
    for (dpid, flows) in switches {
        let mut entries = BTreeMap::new();
        match flows {
            Value::Object(map) => entries.extend(map),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::Object(map) => entries.extend(map),
                        other => {
                            return Err(Error::malformed(
                                path,
                                format!("unexpected flow entry for {}: {}", dpid, other),
                            ))
                        }
                    }
                }
            }
            Value::Null => {}
            other => {
                return Err(Error::malformed(
                    path,
                    format!("unexpected flows for {}: {}", dpid, other),
                ))
            }
        }
        table.insert(dpid, entries);
    }
    Ok(table)
}

/// Percent-encode a caller-supplied path segment, keeping DPID colons intact
fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b':' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}
