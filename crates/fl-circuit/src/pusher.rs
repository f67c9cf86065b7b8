//! Circuit Pusher
//!
//! Installs a bidirectional path of static flows between two hosts:
//!
//! 1. Resolve source and destination IPs to attachment points (first device,
//!    first attachment point)
//! 2. Ask the controller for a route between the two attachment points
//! 3. Walk the route in hop pairs `(hops[2i], hops[2i+1])`, installing a
//!    forward rule on the second hop's switch and a reverse rule on the
//!    first hop's switch
//!
//! Flows are named `circuit_<prefix>_<dpid>_<forward|reverse>`, so pushing
//! the same circuit twice replaces its flows instead of duplicating them.
//!
//! Installs are not transactional. If one fails, the flows installed before
//! it stay on the switches and the error is returned. Callers clean up with
//! [`CircuitPusher::remove_circuit`] or a scoped clear, or opt into
//! [`CircuitPusher::with_rollback`].

use fl_core::{
    output_action, AttachmentPoint, DeviceFilter, Error, FlowMatch, FlowScope, PushStatus,
    Result, RouteHop, StaticFlowEntry,
};
use fl_rest::{FloodlightClient, RestTransport};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::directory::{DeviceDirectory, FlowInstaller, RouteResolver};

/// Prefix shared by every circuit flow name
pub const CIRCUIT_FLOW_PREFIX: &str = "circuit";

/// Traffic direction of one circuit flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Source host to destination host
    Forward,
    /// Destination host back to source host
    Reverse,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Reverse => "reverse",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flow name for one direction of a circuit on one switch
pub fn flow_name(name_prefix: &str, switch_dpid: &str, direction: Direction) -> String {
    format!(
        "{}_{}_{}_{}",
        CIRCUIT_FLOW_PREFIX, name_prefix, switch_dpid, direction
    )
}

/// Input to [`CircuitPusher::push_circuit`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitRequest {
    pub name_prefix: String,
    pub source_ip: String,
    pub destination_ip: String,
}

impl CircuitRequest {
    pub fn new(
        name_prefix: impl Into<String>,
        source_ip: impl Into<String>,
        destination_ip: impl Into<String>,
    ) -> Self {
        Self {
            name_prefix: name_prefix.into(),
            source_ip: source_ip.into(),
            destination_ip: destination_ip.into(),
        }
    }
}

/// One flow installed by a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledFlow {
    pub flow_name: String,
    pub switch_dpid: String,
    pub direction: Direction,
    pub outcome: PushStatus,
}

/// Flows installed by one push, forward then reverse per route segment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitResult {
    pub flows: Vec<InstalledFlow>,
}

impl CircuitResult {
    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    /// Flow names in installation order
    pub fn flow_names(&self) -> Vec<&str> {
        self.flows.iter().map(|f| f.flow_name.as_str()).collect()
    }
}

/// A circuit flow found on the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitFlow {
    pub switch_dpid: String,
    pub flow_name: String,
    pub direction: Direction,
}

/// Build the ordered flow entries for a circuit over `hops`.
///
/// `hops` must have even length; each pair yields the forward entry (on the
/// pair's second hop) followed by the reverse entry (on the first hop).
pub fn plan_circuit(
    request: &CircuitRequest,
    hops: &[RouteHop],
) -> Vec<(Direction, StaticFlowEntry)> {
    let mut plan = Vec::with_capacity(hops.len());
    for pair in hops.chunks_exact(2) {
        let (reverse_hop, forward_hop) = (&pair[0], &pair[1]);

        plan.push((
            Direction::Forward,
            StaticFlowEntry::new(
                flow_name(&request.name_prefix, &forward_hop.switch_dpid, Direction::Forward),
                forward_hop.switch_dpid.clone(),
                FlowMatch::ipv4(&request.source_ip, &request.destination_ip),
                output_action(forward_hop.port),
            ),
        ));
        plan.push((
            Direction::Reverse,
            StaticFlowEntry::new(
                flow_name(&request.name_prefix, &reverse_hop.switch_dpid, Direction::Reverse),
                reverse_hop.switch_dpid.clone(),
                FlowMatch::ipv4(&request.destination_ip, &request.source_ip),
                output_action(reverse_hop.port),
            ),
        ));
    }
    plan
}

/// Orchestrates host resolution, routing and flow installation
pub struct CircuitPusher {
    directory: Arc<dyn DeviceDirectory>,
    routes: Arc<dyn RouteResolver>,
    installer: Arc<dyn FlowInstaller>,
    rollback: bool,
}

impl CircuitPusher {
    pub fn new(
        directory: Arc<dyn DeviceDirectory>,
        routes: Arc<dyn RouteResolver>,
        installer: Arc<dyn FlowInstaller>,
    ) -> Self {
        Self {
            directory,
            routes,
            installer,
            rollback: false,
        }
    }

    /// Use one controller client for all three services
    pub fn from_client<T: RestTransport + 'static>(client: Arc<FloodlightClient<T>>) -> Self {
        Self::new(client.clone(), client.clone(), client)
    }

    /// Delete flows installed earlier in the same push when a later install
    /// fails. Off by default.
    ///
    /// Installing replaces flows by name, so a failed re-push of an existing
    /// circuit also removes the earlier copies of the flows it had already
    /// rewritten. Those switches lose the circuit until it is pushed again.
    pub fn with_rollback(mut self, rollback: bool) -> Self {
        self.rollback = rollback;
        self
    }

    /// Install a bidirectional circuit between two hosts
    pub async fn push_circuit(&self, request: &CircuitRequest) -> Result<CircuitResult> {
        let src = self.resolve_host(&request.source_ip).await?;
        let dst = self.resolve_host(&request.destination_ip).await?;
        debug!(
            "Circuit {}: {} at {}, {} at {}",
            request.name_prefix, request.source_ip, src, request.destination_ip, dst
        );

        let hops = self.routes.route(&src, &dst).await?;
        if hops.is_empty() || hops.len() % 2 != 0 {
            return Err(Error::RouteNotFound {
                src: src.to_string(),
                dst: dst.to_string(),
                hops: hops.len(),
            });
        }

        let mut result = CircuitResult::default();
        for (direction, entry) in plan_circuit(request, &hops) {
            let outcome = match self.installer.install(&entry).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    if self.rollback {
                        self.roll_back(&result).await;
                    }
                    return Err(e);
                }
            };
            info!("Installed {} on {}: {}", entry.name, entry.switch, outcome);
            result.flows.push(InstalledFlow {
                flow_name: entry.name,
                switch_dpid: entry.switch,
                direction,
                outcome,
            });
        }

        info!(
            "Circuit {} pushed: {} flows over {} switches",
            request.name_prefix,
            result.len(),
            hops.len() / 2
        );
        Ok(result)
    }

    /// Circuit flows currently installed for `name_prefix`
    pub async fn circuit_flows(&self, name_prefix: &str) -> Result<Vec<CircuitFlow>> {
        let table = self.installer.list(&FlowScope::All).await?;

        let mut flows = Vec::new();
        for (switch_dpid, entries) in table {
            for name in entries.keys() {
                let direction = [Direction::Forward, Direction::Reverse]
                    .into_iter()
                    .find(|d| *name == flow_name(name_prefix, &switch_dpid, *d));
                if let Some(direction) = direction {
                    flows.push(CircuitFlow {
                        switch_dpid: switch_dpid.clone(),
                        flow_name: name.clone(),
                        direction,
                    });
                }
            }
        }
        Ok(flows)
    }

    /// Delete every installed flow of a circuit. Returns the deleted names.
    pub async fn remove_circuit(&self, name_prefix: &str) -> Result<Vec<String>> {
        let mut removed = Vec::new();
        for flow in self.circuit_flows(name_prefix).await? {
            self.installer.delete(&flow.flow_name).await?;
            info!("Removed {} from {}", flow.flow_name, flow.switch_dpid);
            removed.push(flow.flow_name);
        }
        Ok(removed)
    }

    /// First attachment point of the first device with this IPv4 address
    async fn resolve_host(&self, ip: &str) -> Result<AttachmentPoint> {
        let devices = self.directory.devices(&DeviceFilter::by_ipv4(ip)).await?;
        let device = devices
            .first()
            .ok_or_else(|| Error::HostNotFound(ip.to_string()))?;
        device
            .first_attachment_point()
            .cloned()
            .ok_or_else(|| Error::AttachmentPointMissing(ip.to_string()))
    }

    async fn roll_back(&self, installed: &CircuitResult) {
        for flow in installed.flows.iter().rev() {
            match self.installer.delete(&flow.flow_name).await {
                Ok(_) => info!("Rolled back {}", flow.flow_name),
                Err(e) => warn!("Failed to roll back {}: {}", flow.flow_name, e),
            }
        }
    }
}
