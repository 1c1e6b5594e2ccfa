use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChannelError {
    #[error("loss probability must be within [0, 1], got {0}")]
    InvalidLossProbability(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// RF uplink model: every transmission is either delivered unchanged or lost.
#[derive(Debug)]
pub struct UplinkChannel {
    loss_probability: f64,
    rng: StdRng,
    stats: ChannelStats,
}

impl UplinkChannel {
    pub fn new(loss_probability: f64) -> Result<Self, ChannelError> {
        Self::with_rng(loss_probability, StdRng::from_os_rng())
    }

    pub fn seeded(loss_probability: f64, seed: u64) -> Result<Self, ChannelError> {
        Self::with_rng(loss_probability, StdRng::seed_from_u64(seed))
    }

    /// Lossless channel.
    pub fn perfect() -> Self {
        Self {
            loss_probability: 0.0,
            rng: StdRng::seed_from_u64(0),
            stats: ChannelStats::default(),
        }
    }

    fn with_rng(loss_probability: f64, rng: StdRng) -> Result<Self, ChannelError> {
        // NaN fails the range check as well
        if !(0.0..=1.0).contains(&loss_probability) {
            return Err(ChannelError::InvalidLossProbability(loss_probability));
        }
        Ok(Self {
            loss_probability,
            rng,
            stats: ChannelStats::default(),
        })
    }

    pub fn loss_probability(&self) -> f64 {
        self.loss_probability
    }

    pub fn stats(&self) -> ChannelStats {
        self.stats
    }

    /// `None` means nothing arrived this cycle.
    pub fn transmit(&mut self, packet: Vec<u8>) -> Option<Vec<u8>> {
        if self.loss_probability > 0.0 && self.rng.random_bool(self.loss_probability) {
            self.stats.dropped += 1;
            warn!(len = packet.len(), "packet lost in transmission");
            return None;
        }
        self.stats.delivered += 1;
        debug!(len = packet.len(), "packet delivered");
        Some(packet)
    }
}
