//! fl-circuit: bidirectional IPv4 circuits over static flows
//!
//! [`CircuitPusher`] resolves two hosts to their attachment points, asks the
//! controller for a route between them and installs one forward and one
//! reverse flow per route segment. The controller services it needs are
//! behind the traits in [`directory`].

pub mod directory;
pub mod pusher;

pub use directory::{DeviceDirectory, FlowInstaller, RouteResolver};
pub use pusher::{
    flow_name, plan_circuit, CircuitFlow, CircuitPusher, CircuitRequest, CircuitResult,
    Direction, InstalledFlow, CIRCUIT_FLOW_PREFIX,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::directory::{DeviceDirectory, FlowInstaller, RouteResolver};
    pub use super::pusher::{CircuitPusher, CircuitRequest, CircuitResult, Direction};
}
