//! Core types and utilities for the Floodlight REST client
//!
//! # Modules
//!
//! - `config`: Controller address and timeout resolution
//! - `error`: Error types and Result alias
//! - `flow`: Static flow entry model
//! - `types`: Devices, attachment points, routes, links and switches

pub mod config;
pub mod error;
pub mod flow;
pub mod types;

// Re-exports
pub use config::ControllerConfig;
pub use error::{Error, ErrorKind, Result};
pub use flow::{
    output_action, FlowMatch, FlowScope, FlowTable, PushStatus, StaticFlowEntry, ETHER_TYPE_IPV4,
};
pub use types::*;
