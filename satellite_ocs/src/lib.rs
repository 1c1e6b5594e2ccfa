//! On-board side of the uplink: validates every received telecommand and
//! records one security event per decision.

pub mod commands;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod firewall;
pub mod net;
pub mod telemetry;

pub use firewall::{FirewallPolicy, FirewallStats, RejectReason, SpaceFirewall, ValidationOutcome};
