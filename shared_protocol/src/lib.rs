// lib.rs: shared uplink protocol (CCSDS telecommand codec + HMAC-SHA256 tags)

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

// =============================== Common =====================================

pub type Timestamp = DateTime<Utc>;

pub const PRIMARY_HEADER_LEN: usize = 6;
pub const SECONDARY_HEADER_LEN: usize = 8;
pub const HEADER_REGION_LEN: usize = PRIMARY_HEADER_LEN + SECONDARY_HEADER_LEN; // 14
pub const TAG_LEN: usize = 32; // HMAC-SHA256

pub const CCSDS_VERSION: u8 = 0;
pub const APID_MASK: u16 = 0x07FF;
pub const SEQUENCE_COUNT_MASK: u16 = 0x3FFF;
pub const SEQUENCE_COUNT_MODULO: u16 = 16384;
pub const SEQUENCE_FLAGS_UNSEGMENTED: u8 = 0b11;

/// Largest packet data field the 16-bit length word can describe.
pub const MAX_DATA_FIELD_LEN: usize = u16::MAX as usize + 1;

pub const DEFAULT_APID: u16 = 0x100;
pub const DEFAULT_UPLINK_PORT: u16 = 7890;
/// Development key ("TOP_SECRET_SATELLITE_KEY_2024"). Real keys are provisioned out of band.
pub const DEFAULT_KEY_HEX: &str = "544f505f5345435245545f534154454c4c4954455f4b45595f32303234";

/// Receiver drops anything shorter than this before looking at the tag.
pub const MIN_PACKET_LEN: usize = 38;
pub const FRESHNESS_WINDOW_SECS: f64 = 60.0;

/// Wall clock as fractional seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

// =============================== Enums ======================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CommandExecuted,
    PacketRejected,
    SecurityViolation,
    ParsingError,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CommandExecuted => "COMMAND_EXECUTED",
            EventType::PacketRejected => "PACKET_REJECTED",
            EventType::SecurityViolation => "SECURITY_VIOLATION",
            EventType::ParsingError => "PARSING_ERROR",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PacketType {
    Telemetry = 0,
    Telecommand = 1,
}

// ============================ Security events ===============================

/// Immutable record handed to an event sink. Sinks only ever append these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_id: Uuid,
    pub timestamp: Timestamp,
    pub event_type: EventType,
    pub severity: Severity,
    pub details: BTreeMap<String, String>,
}

impl SecurityEvent {
    pub fn new(event_type: EventType, severity: Severity) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event_type,
            severity,
            details: BTreeMap::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

// ============================== CCSDS codec =================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("packet data field would be empty (no secondary header, no payload)")]
    EmptyDataField,
    #[error("packet data field of {len} bytes exceeds 65536")]
    DataFieldTooLarge { len: usize },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet too short: need at least {required} bytes, got {actual}")]
    TooShort { required: usize, actual: usize },
    #[error("payload is not valid UTF-8: {0}")]
    InvalidPayloadEncoding(#[from] std::str::Utf8Error),
}

/// The 6-byte CCSDS primary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryHeader {
    pub version: u8,
    pub packet_type: PacketType,
    pub secondary_header: bool,
    pub apid: u16,
    pub sequence_flags: u8,
    pub sequence_count: u16,
    /// Octets in the packet data field minus one.
    pub data_length: u16,
}

impl PrimaryHeader {
    pub fn telecommand(apid: u16, sequence_count: u16, secondary_header: bool, data_length: u16) -> Self {
        Self {
            version: CCSDS_VERSION,
            packet_type: PacketType::Telecommand,
            secondary_header,
            apid: apid & APID_MASK,
            sequence_flags: SEQUENCE_FLAGS_UNSEGMENTED,
            sequence_count: sequence_count & SEQUENCE_COUNT_MASK,
            data_length,
        }
    }

    pub fn to_bytes(&self) -> [u8; PRIMARY_HEADER_LEN] {
        let ident = (u16::from(self.version & 0x07) << 13)
            | ((self.packet_type as u16) << 12)
            | (u16::from(self.secondary_header) << 11)
            | (self.apid & APID_MASK);
        let sequence = (u16::from(self.sequence_flags & 0x03) << 14)
            | (self.sequence_count & SEQUENCE_COUNT_MASK);

        let mut out = [0u8; PRIMARY_HEADER_LEN];
        out[0..2].copy_from_slice(&ident.to_be_bytes());
        out[2..4].copy_from_slice(&sequence.to_be_bytes());
        out[4..6].copy_from_slice(&self.data_length.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; PRIMARY_HEADER_LEN]) -> Self {
        let ident = u16::from_be_bytes([bytes[0], bytes[1]]);
        let sequence = u16::from_be_bytes([bytes[2], bytes[3]]);
        Self {
            version: (ident >> 13) as u8 & 0x07,
            packet_type: if ident & 0x1000 != 0 {
                PacketType::Telecommand
            } else {
                PacketType::Telemetry
            },
            secondary_header: ident & 0x0800 != 0,
            apid: ident & APID_MASK,
            sequence_flags: (sequence >> 14) as u8,
            sequence_count: sequence & SEQUENCE_COUNT_MASK,
            data_length: u16::from_be_bytes([bytes[4], bytes[5]]),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPacket {
    pub header: PrimaryHeader,
    /// Secondary header: seconds since the Unix epoch.
    pub timestamp: f64,
    pub command: String,
}

/// Build primary header + optional secondary header + UTF-8 command (no tag).
///
/// Stateless: the caller owns the sequence counter (see [`SequenceCounter`]).
/// `apid` and `sequence_count` are masked to 11 and 14 bits.
pub fn encode(
    command: &str,
    apid: u16,
    sequence_count: u16,
    timestamp: f64,
    include_secondary_header: bool,
) -> Result<Vec<u8>, EncodeError> {
    let payload = command.as_bytes();
    let secondary_len = if include_secondary_header { SECONDARY_HEADER_LEN } else { 0 };
    let data_field_len = secondary_len + payload.len();

    if data_field_len == 0 {
        return Err(EncodeError::EmptyDataField);
    }
    let data_length = u16::try_from(data_field_len - 1)
        .map_err(|_| EncodeError::DataFieldTooLarge { len: data_field_len })?;

    let header =
        PrimaryHeader::telecommand(apid, sequence_count, include_secondary_header, data_length);

    let mut out = Vec::with_capacity(PRIMARY_HEADER_LEN + data_field_len + TAG_LEN);
    out.extend_from_slice(&header.to_bytes());
    if include_secondary_header {
        out.extend_from_slice(&timestamp.to_be_bytes());
    }
    out.extend_from_slice(payload);
    Ok(out)
}

/// Parse a tagless packet. The secondary header is assumed present.
pub fn decode(raw: &[u8]) -> Result<DecodedPacket, DecodeError> {
    if raw.len() < HEADER_REGION_LEN {
        return Err(DecodeError::TooShort {
            required: HEADER_REGION_LEN,
            actual: raw.len(),
        });
    }

    let mut primary = [0u8; PRIMARY_HEADER_LEN];
    primary.copy_from_slice(&raw[..PRIMARY_HEADER_LEN]);
    let header = PrimaryHeader::from_bytes(&primary);
    let timestamp = read_timestamp(raw)?;
    let command = std::str::from_utf8(&raw[HEADER_REGION_LEN..])?.to_owned();

    Ok(DecodedPacket {
        header,
        timestamp,
        command,
    })
}

/// Read only the secondary-header timestamp (bytes 6..14, big-endian f64).
pub fn read_timestamp(raw: &[u8]) -> Result<f64, DecodeError> {
    let bytes = raw
        .get(PRIMARY_HEADER_LEN..HEADER_REGION_LEN)
        .and_then(|s| <[u8; SECONDARY_HEADER_LEN]>::try_from(s).ok())
        .ok_or(DecodeError::TooShort {
            required: HEADER_REGION_LEN,
            actual: raw.len(),
        })?;
    Ok(f64::from_be_bytes(bytes))
}

/// Split a received buffer into (data, tag). The tag is always the last
/// [`TAG_LEN`] bytes, whatever the header's length field claims.
pub fn split_tag(raw: &[u8]) -> Option<(&[u8], &[u8])> {
    raw.len()
        .checked_sub(TAG_LEN)
        .map(|data_len| raw.split_at(data_len))
}

/// Per-sender packet sequence count, wrapping at 16384.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    next: u16,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(value: u16) -> Self {
        Self {
            next: value % SEQUENCE_COUNT_MODULO,
        }
    }

    pub fn peek(&self) -> u16 {
        self.next
    }

    /// Returns the count for the packet being built and moves on.
    pub fn advance(&mut self) -> u16 {
        let current = self.next;
        self.next = (current + 1) % SEQUENCE_COUNT_MODULO;
        current
    }
}

// ============================= Authenticator ================================

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication key is empty")]
    EmptyKey,
    #[error("authentication key rejected by HMAC")]
    InvalidKeyLength,
    #[error("invalid key hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// HMAC-SHA256 signer/verifier over a shared secret.
///
/// Holds a keyed MAC state that is cloned per call, so a single instance can be
/// shared (`Arc<Authenticator>`) between any number of concurrent validators.
#[derive(Clone)]
pub struct Authenticator {
    mac: HmacSha256,
}

impl Authenticator {
    pub fn new(key: &[u8]) -> Result<Self, AuthError> {
        if key.is_empty() {
            return Err(AuthError::EmptyKey);
        }
        // HMAC pads or pre-hashes keys of any length, so for SHA-256 this
        // error path is never taken; `KeyInit` is fallible for other MACs.
        let mac = HmacSha256::new_from_slice(key).map_err(|_| AuthError::InvalidKeyLength)?;
        Ok(Self { mac })
    }

    pub fn from_hex(key_hex: &str) -> Result<Self, AuthError> {
        let key = hex::decode(key_hex.trim())?;
        Self::new(&key)
    }

    pub fn sign(&self, message: &[u8]) -> [u8; TAG_LEN] {
        let mut mac = self.mac.clone();
        mac.update(message);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        tag
    }

    /// Constant-time check of `tag` against the MAC of `message`.
    /// A tag of the wrong length is simply invalid.
    pub fn verify(&self, message: &[u8], tag: &[u8]) -> bool {
        if tag.len() != TAG_LEN {
            debug!(len = tag.len(), "tag has unexpected length");
            return false;
        }
        let mut mac = self.mac.clone();
        mac.update(message);
        mac.verify_slice(tag).is_ok()
    }

    /// `packet || sign(packet)`, ready to transmit.
    pub fn seal(&self, packet: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(packet.len() + TAG_LEN);
        out.extend_from_slice(packet);
        out.extend_from_slice(&self.sign(packet));
        out
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("algorithm", &"HMAC-SHA256")
            .finish_non_exhaustive()
    }
}

// ================================ Tests =====================================
