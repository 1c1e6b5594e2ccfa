//! In-process end-to-end run: stations, lossy channel and firewall in one
//! address space, no sockets.

use satellite_ocs::errors::SinkError;
use satellite_ocs::firewall::{FirewallStats, SpaceFirewall, ValidationOutcome};
use shared_protocol::EncodeError;
use thiserror::Error;
use tracing::info;

use crate::channel::{ChannelStats, UplinkChannel};
use crate::station::{AttackKind, GroundStation, RogueStation};

pub const LEGIT_COMMANDS: [&str; 3] = ["ADJUST_THRUST", "UPDATE_ORBIT_PARAMETERS", "DEPLOY_SOLAR_PANEL"];

pub const ATTACKS: [(&str, AttackKind); 3] = [
    ("SHUTDOWN_REACTOR", AttackKind::BadTag),
    ("DISABLE_ATTITUDE_CONTROL", AttackKind::NoTag),
    ("CHANGE_ORBIT", AttackKind::ShortTag),
];

#[derive(Debug, Error)]
pub enum SimError {
    #[error("building packet: {0}")]
    Encode(#[from] EncodeError),
    #[error("recording event: {0}")]
    Sink(#[from] SinkError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Legit,
    Rogue(AttackKind),
}

#[derive(Debug, Clone)]
pub struct Step {
    pub origin: Origin,
    pub command: String,
    /// `None` when the channel lost the packet.
    pub outcome: Option<ValidationOutcome>,
}

#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub steps: Vec<Step>,
    pub firewall: FirewallStats,
    pub channel: ChannelStats,
}

pub struct Simulation<'a> {
    pub firewall: &'a SpaceFirewall,
    pub legit: GroundStation,
    pub rogue: RogueStation,
    pub channel: UplinkChannel,
}

impl Simulation<'_> {
    pub fn send_legit(&mut self, command: &str) -> Result<Step, SimError> {
        let packet = self.legit.create_command(command)?;
        self.deliver(Origin::Legit, command, packet)
    }

    pub fn send_attack(&mut self, command: &str, kind: AttackKind) -> Result<Step, SimError> {
        let packet = self.rogue.create_attack_packet(command, kind)?;
        self.deliver(Origin::Rogue(kind), command, packet)
    }

    fn deliver(&mut self, origin: Origin, command: &str, packet: Vec<u8>) -> Result<Step, SimError> {
        let received = self.channel.transmit(packet);
        let outcome = self.firewall.process_delivery(received.as_deref())?;
        Ok(Step {
            origin,
            command: command.to_owned(),
            outcome,
        })
    }

    /// Three legitimate commands followed by one attack of each kind.
    pub fn run_default(mut self) -> Result<SimulationReport, SimError> {
        let mut steps = Vec::with_capacity(LEGIT_COMMANDS.len() + ATTACKS.len());
        for cmd in LEGIT_COMMANDS {
            steps.push(self.send_legit(cmd)?);
        }
        for (cmd, kind) in ATTACKS {
            steps.push(self.send_attack(cmd, kind)?);
        }

        let report = SimulationReport {
            steps,
            firewall: self.firewall.stats(),
            channel: self.channel.stats(),
        };
        info!(
            accepted = report.firewall.accepted,
            rejected = report.firewall.rejected,
            dropped = report.channel.dropped,
            "simulation finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use satellite_ocs::firewall::{FirewallPolicy, RejectReason};
    use satellite_ocs::telemetry::EventLog;
    use shared_protocol::{Authenticator, DEFAULT_APID};
    use std::sync::Arc;

    fn sim(fw: &SpaceFirewall, channel: UplinkChannel) -> Simulation<'_> {
        Simulation {
            firewall: fw,
            legit: GroundStation::new("STATION_ALPHA", DEFAULT_APID, Authenticator::new(b"SIM_KEY").unwrap()),
            rogue: RogueStation::seeded(DEFAULT_APID, 5),
            channel,
        }
    }

    fn firewall() -> (SpaceFirewall, Arc<EventLog>) {
        let log = Arc::new(EventLog::in_memory());
        let auth = Arc::new(Authenticator::new(b"SIM_KEY").unwrap());
        (SpaceFirewall::new(auth, log.clone(), FirewallPolicy::default()), log)
    }

    #[test]
    fn default_scenario_outcomes() {
        let (fw, log) = firewall();
        let report = sim(&fw, UplinkChannel::perfect()).run_default().unwrap();

        assert_eq!(report.firewall, FirewallStats { accepted: 3, rejected: 3 });
        let reasons: Vec<_> = report.steps.iter().map(|s| s.outcome.as_ref().unwrap().reason()).collect();
        assert_eq!(
            reasons,
            vec![
                None,
                None,
                None,
                Some(RejectReason::InvalidSignature),
                // 14 + 24 bytes: exactly at the threshold, so the tag check runs and fails
                Some(RejectReason::InvalidSignature),
                Some(RejectReason::PacketTooShort),
            ]
        );
        assert_eq!(log.len(), 6);
    }

    #[test]
    fn lossy_channel_drops_without_events() {
        let (fw, log) = firewall();
        let report = sim(&fw, UplinkChannel::seeded(1.0, 0).unwrap()).run_default().unwrap();

        assert!(report.steps.iter().all(|s| s.outcome.is_none()));
        assert_eq!(report.channel.dropped, 6);
        assert_eq!(report.firewall, FirewallStats::default());
        assert!(log.is_empty());
    }
}
