//! fl-rest: Floodlight northbound REST client
//!
//! This crate provides:
//! - A transport seam ([`RestTransport`]) with a reqwest implementation
//! - [`FloodlightClient`], typed methods for switch statistics, topology,
//!   device tracking, static flows and legacy virtual networks

pub mod client;
pub mod transport;
pub mod vnet;

pub use client::{FloodlightClient, STATIC_FLOW_PATH};
pub use transport::{HttpTransport, RestTransport};
pub use vnet::{VirtualNetwork, DEFAULT_TENANT};

/// Re-exported so transport implementors need no direct reqwest dependency
pub use reqwest::Method;

/// Prelude for convenient imports
pub mod prelude {
    pub use super::client::FloodlightClient;
    pub use super::transport::{HttpTransport, RestTransport};
    pub use fl_core::{DeviceFilter, FlowScope, StatType, StaticFlowEntry};
}
