// Command line interface for the ground segment
use clap::{Args, Parser, Subcommand, ValueEnum};
use shared_protocol::{DEFAULT_APID, DEFAULT_KEY_HEX};
use std::path::PathBuf;

use crate::station::AttackKind;

#[derive(Parser, Debug)]
#[command(name = "ground_control", about = "Ground segment uplink tools")]
pub struct Cli {
    /// Shared uplink key, hex encoded.
    #[arg(long, global = true, default_value = DEFAULT_KEY_HEX)]
    pub key_hex: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build packets and send them to a running satellite_ocs over UDP.
    Send(SendArgs),
    /// Run the default scenario against an in-process firewall.
    Simulate(SimulateArgs),
    /// Print the security event report from a JSON Lines event file.
    Report(ReportArgs),
    /// Print the tail of the newest satellite_ocs text log.
    Watch(WatchArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StationKind {
    Legit,
    Rogue,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[arg(long)]                                       pub station: StationKind,
    #[arg(long)]                                       pub cmd: String,
    #[arg(long, value_enum, default_value = "bad-tag")] pub attack: AttackKind,
    #[arg(long, default_value_t = 1)]                  pub count: u32,
    #[arg(long, default_value_t = 0.0)]                pub loss: f64,
    #[arg(long, default_value = "127.0.0.1:7890")]     pub target: String,
    #[arg(long, default_value_t = DEFAULT_APID)]       pub apid: u16,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Also mirror events to this JSON Lines file.
    #[arg(long)]                        pub events_path: Option<PathBuf>,
    #[arg(long, default_value_t = 0.0)] pub loss: f64,
    /// Fixed RNG seed for the channel and rogue station.
    #[arg(long)]                        pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(long, default_value = "logs/security_events.jsonl")] pub events_path: PathBuf,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[arg(long, default_value = "logs")]  pub log_dir: PathBuf,
    #[arg(long, default_value_t = 50)]    pub lines: usize,
}
