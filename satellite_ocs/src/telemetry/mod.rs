pub mod event_log;

pub use event_log::{load_events, EventLog};

use crate::errors::SinkError;
use shared_protocol::SecurityEvent;

/// Append-only destination for security events.
///
/// The firewall calls `append` exactly once per packet decision and hands
/// any failure back to its own caller.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn append(&self, event: SecurityEvent) -> Result<(), SinkError>;
}
