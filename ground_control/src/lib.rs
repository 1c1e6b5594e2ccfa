//! Ground segment: signing and rogue stations, the lossy uplink model, and
//! the tools behind the `ground_control` binary.

pub mod channel;
pub mod config;
pub mod report;
pub mod sim;
pub mod station;
pub mod uplink;
pub mod watch;
