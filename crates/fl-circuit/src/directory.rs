//! Controller services the circuit pusher builds on
//!
//! Each trait is one narrow slice of the controller API. [`FloodlightClient`]
//! implements all three; tests substitute in-memory doubles.

use async_trait::async_trait;
use fl_core::{
    AttachmentPoint, Device, DeviceFilter, FlowScope, FlowTable, PushStatus, Result, RouteHop,
    StaticFlowEntry,
};
use fl_rest::{FloodlightClient, RestTransport};

/// Looks up tracked hosts
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    /// Devices matching the filter, in controller order
    async fn devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>>;
}

/// Computes paths through the switching fabric
#[async_trait]
pub trait RouteResolver: Send + Sync {
    /// Hop sequence from `src` to `dst`; empty when no path exists
    async fn route(&self, src: &AttachmentPoint, dst: &AttachmentPoint) -> Result<Vec<RouteHop>>;
}

/// Named static flow store. Installing an existing name replaces it.
#[async_trait]
pub trait FlowInstaller: Send + Sync {
    async fn install(&self, entry: &StaticFlowEntry) -> Result<PushStatus>;

    async fn delete(&self, name: &str) -> Result<PushStatus>;

    async fn list(&self, scope: &FlowScope) -> Result<FlowTable>;

    async fn clear(&self, scope: &FlowScope) -> Result<()>;
}

#[async_trait]
impl<T: RestTransport> DeviceDirectory for FloodlightClient<T> {
    async fn devices(&self, filter: &DeviceFilter) -> Result<Vec<Device>> {
        FloodlightClient::devices(self, filter).await
    }
}

#[async_trait]
impl<T: RestTransport> RouteResolver for FloodlightClient<T> {
    async fn route(&self, src: &AttachmentPoint, dst: &AttachmentPoint) -> Result<Vec<RouteHop>> {
        FloodlightClient::route(self, &src.switch_dpid, src.port, &dst.switch_dpid, dst.port).await
    }
}

#[async_trait]
impl<T: RestTransport> FlowInstaller for FloodlightClient<T> {
    async fn install(&self, entry: &StaticFlowEntry) -> Result<PushStatus> {
        self.add_flow(entry).await
    }

    async fn delete(&self, name: &str) -> Result<PushStatus> {
        self.delete_flow(name).await
    }

    async fn list(&self, scope: &FlowScope) -> Result<FlowTable> {
        self.list_flows(scope).await
    }

    async fn clear(&self, scope: &FlowScope) -> Result<()> {
        self.clear_flows(scope).await
    }
}
