//! In-memory controller shared by the circuit tests

#![allow(dead_code)]

use async_trait::async_trait;
use fl_circuit::{DeviceDirectory, FlowInstaller, RouteResolver};
use fl_core::{
    AttachmentPoint, Device, DeviceFilter, Error, FlowScope, FlowTable, PushStatus, Result,
    RouteHop, StaticFlowEntry,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const S1: &str = "00:00:00:00:00:00:00:01";
pub const S2: &str = "00:00:00:00:00:00:00:02";
pub const H1: &str = "10.0.0.1";
pub const H2: &str = "10.0.0.2";

/// Devices, a fixed route and a name-keyed flow store
#[derive(Default)]
pub struct InMemoryController {
    hosts: HashMap<String, Vec<Device>>,
    route: Vec<RouteHop>,
    route_requests: Mutex<Vec<(AttachmentPoint, AttachmentPoint)>>,
    flows: Mutex<BTreeMap<String, StaticFlowEntry>>,
    pub device_calls: AtomicUsize,
    pub route_calls: AtomicUsize,
    pub install_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    /// 1-based install call that fails with a transport error
    fail_install: Option<usize>,
    fail_delete: bool,
}

impl InMemoryController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(self, ip: &str, dpid: &str, port: u32) -> Self {
        self.with_multihomed_host(ip, &[(dpid, port)])
    }

    /// Device with several attachment points, in controller order
    pub fn with_multihomed_host(mut self, ip: &str, points: &[(&str, u32)]) -> Self {
        self.hosts.entry(ip.to_string()).or_default().push(Device {
            ipv4: vec![ip.to_string()],
            attachment_points: points
                .iter()
                .map(|(dpid, port)| AttachmentPoint::new(*dpid, *port))
                .collect(),
            ..Default::default()
        });
        self
    }

    /// Host that is tracked but not attached to any switch
    pub fn with_detached_host(mut self, ip: &str) -> Self {
        self.hosts.entry(ip.to_string()).or_default().push(Device {
            ipv4: vec![ip.to_string()],
            ..Default::default()
        });
        self
    }

    pub fn with_route(mut self, hops: &[(&str, u32)]) -> Self {
        self.route = hops
            .iter()
            .map(|(dpid, port)| RouteHop::new(*dpid, *port))
            .collect();
        self
    }

    pub fn failing_install(mut self, call: usize) -> Self {
        self.fail_install = Some(call);
        self
    }

    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    /// Seed a flow without counting it as an install
    pub fn seed_flow(&self, entry: StaticFlowEntry) {
        self.flows.lock().unwrap().insert(entry.name.clone(), entry);
    }

    pub fn flow(&self, name: &str) -> Option<StaticFlowEntry> {
        self.flows.lock().unwrap().get(name).cloned()
    }

    pub fn flow_names(&self) -> Vec<String> {
        self.flows.lock().unwrap().keys().cloned().collect()
    }

    pub fn flow_count(&self) -> usize {
        self.flows.lock().unwrap().len()
    }

    pub fn installs(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }

    /// Endpoints of every route lookup, in call order
    pub fn route_requests(&self) -> Vec<(AttachmentPoint, AttachmentPoint)> {
        self.route_requests.lock().unwrap().clone()
    }

    pub fn route_lookups(&self) -> usize {
        self.route_calls.load(Ordering::SeqCst)
    }

    pub fn device_lookups(&self) -> usize {
        self.device_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceDirectory for InMemoryController {
    async fn devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>> {
        self.device_calls.fetch_add(1, Ordering::SeqCst);
        Ok(filter
            .ipv4
            .as_ref()
            .and_then(|ip| self.hosts.get(ip))
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl RouteResolver for InMemoryController {
    async fn route(&self, src: &AttachmentPoint, dst: &AttachmentPoint) -> Result<Vec<RouteHop>> {
        self.route_calls.fetch_add(1, Ordering::SeqCst);
        self.route_requests
            .lock()
            .unwrap()
            .push((src.clone(), dst.clone()));
        Ok(self.route.clone())
    }
}

#[async_trait]
impl FlowInstaller for InMemoryController {
    async fn install(&self, entry: &StaticFlowEntry) -> Result<PushStatus> {
        let call = self.install_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_install == Some(call) {
            return Err(Error::transport("connection reset by peer"));
        }
        self.flows
            .lock()
            .unwrap()
            .insert(entry.name.clone(), entry.clone());
        Ok(PushStatus::new("Entry pushed"))
    }

    async fn delete(&self, name: &str) -> Result<PushStatus> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete {
            return Err(Error::transport("connection refused"));
        }
        self.flows.lock().unwrap().remove(name);
        Ok(PushStatus::new(format!("Entry {} deleted", name)))
    }

    async fn list(&self, scope: &FlowScope) -> Result<FlowTable> {
        let mut table = FlowTable::new();
        for entry in self.flows.lock().unwrap().values() {
            if let FlowScope::Switch(dpid) = scope {
                if *dpid != entry.switch {
                    continue;
                }
            }
            table.entry(entry.switch.clone()).or_default().insert(
                entry.name.clone(),
                serde_json::to_value(entry).unwrap_or_default(),
            );
        }
        Ok(table)
    }

    async fn clear(&self, scope: &FlowScope) -> Result<()> {
        self.flows.lock().unwrap().retain(|_, entry| match scope {
            FlowScope::All => false,
            FlowScope::Switch(dpid) => *dpid != entry.switch,
        });
        Ok(())
    }
}
