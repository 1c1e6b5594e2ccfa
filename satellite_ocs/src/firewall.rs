//! Receive-side uplink guard.
//!
//! Every datagram goes through the same fixed sequence of checks and stops at
//! the first failure:
//!
//! ```text
//! RECEIVED -> length -> tag -> freshness -> decode -> ACCEPTED
//!                |        |        |           |
//!                +--------+--------+-----------+--> REJECTED[reason]
//! ```
//!
//! Each decision bumps one counter and produces exactly one [`SecurityEvent`].
//! Nothing is retried and no state is kept between packets apart from the
//! counters, so a resent packet that is still inside the freshness window is
//! accepted again.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use shared_protocol::{
    decode, read_timestamp, split_tag, unix_now, Authenticator, DecodedPacket, EventType,
    SecurityEvent, Severity, FRESHNESS_WINDOW_SECS, MIN_PACKET_LEN,
};
use tracing::{error, info, warn};

use crate::errors::SinkError;
use crate::telemetry::EventSink;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirewallPolicy {
    /// Buffers shorter than this are dropped before the tag is looked at.
    pub min_packet_len: usize,
    /// Largest accepted |now - packet timestamp|, in seconds.
    pub freshness_window_secs: f64,
}

impl Default for FirewallPolicy {
    fn default() -> Self {
        Self {
            min_packet_len: MIN_PACKET_LEN,
            freshness_window_secs: FRESHNESS_WINDOW_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    PacketTooShort,
    InvalidSignature,
    StaleTimestamp,
    ParsingError,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::PacketTooShort => "PACKET_TOO_SHORT",
            RejectReason::InvalidSignature => "INVALID_SIGNATURE",
            RejectReason::StaleTimestamp => "STALE_TIMESTAMP",
            RejectReason::ParsingError => "PARSING_ERROR",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            RejectReason::PacketTooShort => Severity::High,
            RejectReason::InvalidSignature => Severity::Critical,
            RejectReason::StaleTimestamp => Severity::Medium,
            RejectReason::ParsingError => Severity::High,
        }
    }

    pub fn event_type(&self) -> EventType {
        match self {
            RejectReason::PacketTooShort | RejectReason::StaleTimestamp => EventType::PacketRejected,
            RejectReason::InvalidSignature => EventType::SecurityViolation,
            RejectReason::ParsingError => EventType::ParsingError,
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted { command: String },
    Rejected { reason: RejectReason, severity: Severity },
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted { .. })
    }

    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            ValidationOutcome::Accepted { .. } => None,
            ValidationOutcome::Rejected { reason, .. } => Some(*reason),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FirewallStats {
    pub accepted: u64,
    pub rejected: u64,
}

struct Rejection {
    reason: RejectReason,
    details: Vec<(&'static str, String)>,
}

impl Rejection {
    fn new(reason: RejectReason) -> Self {
        Self { reason, details: Vec::new() }
    }

    fn detail(mut self, key: &'static str, value: impl ToString) -> Self {
        self.details.push((key, value.to_string()));
        self
    }
}

pub struct SpaceFirewall {
    auth: Arc<Authenticator>,
    sink: Arc<dyn EventSink>,
    policy: FirewallPolicy,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

impl SpaceFirewall {
    pub fn new(auth: Arc<Authenticator>, sink: Arc<dyn EventSink>, policy: FirewallPolicy) -> Self {
        Self {
            auth,
            sink,
            policy,
            accepted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> &FirewallPolicy {
        &self.policy
    }

    pub fn stats(&self) -> FirewallStats {
        FirewallStats {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Validate one received buffer against the current wall clock.
    pub fn process_packet(&self, raw: &[u8]) -> Result<ValidationOutcome, SinkError> {
        self.process_packet_at(raw, unix_now())
    }

    /// Same as [`process_packet`](Self::process_packet) with an explicit
    /// "now" in seconds since the Unix epoch.
    pub fn process_packet_at(&self, raw: &[u8], now: f64) -> Result<ValidationOutcome, SinkError> {
        match self.evaluate(raw, now) {
            Ok(packet) => self.execute(packet),
            Err(rejection) => self.reject(rejection),
        }
    }

    /// Channel output for one cycle. A dropped transmission (`None`) is not a
    /// rejection: nothing is counted and no event is emitted.
    pub fn process_delivery(&self, delivered: Option<&[u8]>) -> Result<Option<ValidationOutcome>, SinkError> {
        delivered.map(|raw| self.process_packet(raw)).transpose()
    }

    fn evaluate(&self, raw: &[u8], now: f64) -> Result<DecodedPacket, Rejection> {
        // 1. size
        if raw.len() < self.policy.min_packet_len {
            return Err(Rejection::new(RejectReason::PacketTooShort).detail("size", raw.len()));
        }
        let Some((data, tag)) = split_tag(raw) else {
            return Err(Rejection::new(RejectReason::PacketTooShort).detail("size", raw.len()));
        };

        // 2. authenticity; the trailing 32 bytes are the tag whatever the header says
        if !self.auth.verify(data, tag) {
            return Err(Rejection::new(RejectReason::InvalidSignature)
                .detail("signature_received", format!("{}...", hex::encode(&tag[..4])))
                .detail("size", raw.len()));
        }

        // 3. freshness
        let packet_time = read_timestamp(data)
            .map_err(|e| Rejection::new(RejectReason::ParsingError).detail("error", e))?;
        let skew = (now - packet_time).abs();
        if skew.is_nan() || skew > self.policy.freshness_window_secs {
            return Err(Rejection::new(RejectReason::StaleTimestamp)
                .detail("packet_time", packet_time)
                .detail("current_time", now)
                .detail("skew_secs", format!("{skew:.3}")));
        }

        // 4. structure
        decode(data).map_err(|e| Rejection::new(RejectReason::ParsingError).detail("error", e))
    }

    // Actuation is out of scope; accepting a command means counting and reporting it.
    fn execute(&self, packet: DecodedPacket) -> Result<ValidationOutcome, SinkError> {
        self.accepted.fetch_add(1, Ordering::Relaxed);
        info!(
            command = %packet.command,
            apid = packet.header.apid,
            seq = packet.header.sequence_count,
            "executing command"
        );

        let event = SecurityEvent::new(EventType::CommandExecuted, Severity::Info)
            .with_detail("command", &packet.command)
            .with_detail("apid", format!("{:#05x}", packet.header.apid))
            .with_detail("sequence_count", packet.header.sequence_count);
        self.sink.append(event)?;

        Ok(ValidationOutcome::Accepted { command: packet.command })
    }

    fn reject(&self, rejection: Rejection) -> Result<ValidationOutcome, SinkError> {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        let reason = rejection.reason;
        let severity = reason.severity();
        match reason {
            RejectReason::InvalidSignature => error!(%reason, "uplink packet failed authentication"),
            _ => warn!(%reason, %severity, "uplink packet rejected"),
        }

        let mut event = SecurityEvent::new(reason.event_type(), severity).with_detail("reason", reason.code());
        for (key, value) in rejection.details {
            event = event.with_detail(key, value);
        }
        self.sink.append(event)?;

        Ok(ValidationOutcome::Rejected { reason, severity })
    }
}
