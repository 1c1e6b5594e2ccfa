//! Sender side of the uplink: the keyed ground station and a keyless rogue.

use clap::ValueEnum;
use rand::{rngs::StdRng, RngCore, SeedableRng};
use shared_protocol::{encode, unix_now, Authenticator, EncodeError, SequenceCounter, TAG_LEN};
use tracing::{info, warn};

/// Length of the truncated tag a [`AttackKind::ShortTag`] packet carries.
pub const SHORT_TAG_LEN: usize = 10;

/// Station that holds the shared key and signs everything it sends.
pub struct GroundStation {
    id: String,
    apid: u16,
    auth: Authenticator,
    seq: SequenceCounter,
}

impl GroundStation {
    pub fn new(id: impl Into<String>, apid: u16, auth: Authenticator) -> Self {
        Self {
            id: id.into(),
            apid,
            auth,
            seq: SequenceCounter::new(),
        }
    }

    pub fn with_sequence(mut self, seq: SequenceCounter) -> Self {
        self.seq = seq;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sequence count the next packet will carry.
    pub fn next_sequence(&self) -> u16 {
        self.seq.peek()
    }

    pub fn create_command(&mut self, command: &str) -> Result<Vec<u8>, EncodeError> {
        self.create_command_at(command, unix_now())
    }

    /// Build and sign one telecommand stamped with `timestamp`. The sequence
    /// count only moves on when a packet was actually produced.
    pub fn create_command_at(&mut self, command: &str, timestamp: f64) -> Result<Vec<u8>, EncodeError> {
        let raw = encode(command, self.apid, self.seq.peek(), timestamp, true)?;
        let seq = self.seq.advance();
        let packet = self.auth.seal(&raw);
        info!(
            station = %self.id,
            command,
            seq,
            len = packet.len(),
            tag = %format!("{}...", hex::encode(&packet[raw.len()..raw.len() + 4])),
            "command signed"
        );
        Ok(packet)
    }
}

/// How a rogue station finishes a well-formed but unsigned packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum AttackKind {
    /// 32 random bytes in place of the tag.
    BadTag,
    /// Nothing appended.
    NoTag,
    /// 10 random bytes.
    ShortTag,
    /// Same as `BadTag`.
    Default,
}

impl AttackKind {
    pub fn apply<R: RngCore + ?Sized>(self, packet: Vec<u8>, rng: &mut R) -> Vec<u8> {
        match self {
            AttackKind::BadTag | AttackKind::Default => forge_bad_tag(packet, rng),
            AttackKind::NoTag => strip_tag(packet),
            AttackKind::ShortTag => truncate_tag(packet, rng),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttackKind::BadTag => "BAD_TAG",
            AttackKind::NoTag => "NO_TAG",
            AttackKind::ShortTag => "SHORT_TAG",
            AttackKind::Default => "DEFAULT",
        }
    }
}

fn append_random<R: RngCore + ?Sized>(mut packet: Vec<u8>, len: usize, rng: &mut R) -> Vec<u8> {
    let start = packet.len();
    packet.resize(start + len, 0);
    rng.fill_bytes(&mut packet[start..]);
    packet
}

pub fn forge_bad_tag<R: RngCore + ?Sized>(packet: Vec<u8>, rng: &mut R) -> Vec<u8> {
    append_random(packet, TAG_LEN, rng)
}

pub fn strip_tag(packet: Vec<u8>) -> Vec<u8> {
    packet
}

pub fn truncate_tag<R: RngCore + ?Sized>(packet: Vec<u8>, rng: &mut R) -> Vec<u8> {
    append_random(packet, SHORT_TAG_LEN, rng)
}

/// Station without the key: builds valid CCSDS framing and fakes the tag.
pub struct RogueStation {
    apid: u16,
    seq: SequenceCounter,
    rng: StdRng,
}

impl RogueStation {
    pub fn new(apid: u16) -> Self {
        Self::with_rng(apid, StdRng::from_os_rng())
    }

    pub fn seeded(apid: u16, seed: u64) -> Self {
        Self::with_rng(apid, StdRng::seed_from_u64(seed))
    }

    fn with_rng(apid: u16, rng: StdRng) -> Self {
        Self {
            apid,
            seq: SequenceCounter::new(),
            rng,
        }
    }

    pub fn create_attack_packet(&mut self, command: &str, kind: AttackKind) -> Result<Vec<u8>, EncodeError> {
        self.create_attack_packet_at(command, kind, unix_now())
    }

    pub fn create_attack_packet_at(
        &mut self,
        command: &str,
        kind: AttackKind,
        timestamp: f64,
    ) -> Result<Vec<u8>, EncodeError> {
        let raw = encode(command, self.apid, self.seq.peek(), timestamp, true)?;
        self.seq.advance();
        let packet = kind.apply(raw, &mut self.rng);
        warn!(command, attack = kind.as_str(), len = packet.len(), "attack packet built");
        Ok(packet)
    }
}
