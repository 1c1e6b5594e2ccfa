// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use ground_control::{
    channel::UplinkChannel,
    config::{Cli, Command, ReportArgs, SendArgs, SimulateArgs, StationKind, WatchArgs},
    report::render_report,
    sim::Simulation,
    station::{GroundStation, RogueStation},
    uplink::send_packets,
    watch,
};
use satellite_ocs::{
    firewall::{FirewallPolicy, SpaceFirewall},
    telemetry::{load_events, EventLog},
};
use shared_protocol::{Authenticator, DEFAULT_APID};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // -------- logging ----------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ground_control=info,satellite_ocs=info,shared_protocol=info")),
        )
        .compact()
        .init();

    let cli = Cli::parse();
    let key_hex = cli.key_hex;
    match cli.command {
        Command::Send(args) => send(&key_hex, args).await,
        Command::Simulate(args) => simulate(&key_hex, args),
        Command::Report(args) => report(args),
        Command::Watch(args) => watch_log(args),
    }
}

async fn send(key_hex: &str, args: SendArgs) -> Result<()> {
    let mut packets = Vec::with_capacity(args.count as usize);
    match args.station {
        StationKind::Legit => {
            let auth = Authenticator::from_hex(key_hex).context("invalid --key-hex")?;
            let mut gs = GroundStation::new("STATION_ALPHA", args.apid, auth);
            info!(station = gs.id(), cmd = %args.cmd, count = args.count, "legit uplink");
            for _ in 0..args.count {
                packets.push(gs.create_command(&args.cmd)?);
            }
        }
        StationKind::Rogue => {
            let mut rogue = RogueStation::new(args.apid);
            info!(cmd = %args.cmd, attack = args.attack.as_str(), count = args.count, "rogue uplink");
            for _ in 0..args.count {
                packets.push(rogue.create_attack_packet(&args.cmd, args.attack)?);
            }
        }
    }

    let mut channel = UplinkChannel::new(args.loss)?;
    let summary = send_packets(&args.target, packets, &mut channel).await?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn simulate(key_hex: &str, args: SimulateArgs) -> Result<()> {
    let auth = Authenticator::from_hex(key_hex).context("invalid --key-hex")?;
    let log = match &args.events_path {
        Some(path) => EventLog::with_file(path).with_context(|| format!("opening {}", path.display()))?,
        None => EventLog::in_memory(),
    };
    let log = Arc::new(log);
    let firewall = SpaceFirewall::new(Arc::new(auth.clone()), log.clone(), FirewallPolicy::default());

    let (rogue, channel) = match args.seed {
        Some(seed) => (RogueStation::seeded(DEFAULT_APID, seed), UplinkChannel::seeded(args.loss, seed)?),
        None => (RogueStation::new(DEFAULT_APID), UplinkChannel::new(args.loss)?),
    };
    let sim = Simulation {
        firewall: &firewall,
        legit: GroundStation::new("STATION_ALPHA", DEFAULT_APID, auth),
        rogue,
        channel,
    };
    let result = sim.run_default()?;

    print!("{}", render_report(&log.events()));
    println!(
        "{}",
        serde_json::json!({ "firewall": result.firewall, "channel": result.channel })
    );
    Ok(())
}

fn report(args: ReportArgs) -> Result<()> {
    let events = load_events(&args.events_path)
        .with_context(|| format!("reading {}", args.events_path.display()))?;
    print!("{}", render_report(&events));
    Ok(())
}

fn watch_log(args: WatchArgs) -> Result<()> {
    let latest = watch::latest_log(&args.log_dir)
        .with_context(|| format!("listing {}", args.log_dir.display()))?;
    let Some(path) = latest else {
        println!("No satellite_ocs log in {}", args.log_dir.display());
        return Ok(());
    };
    println!("--- {} ---", path.display());
    for line in watch::tail(&path, args.lines).with_context(|| format!("reading {}", path.display()))? {
        println!("{line}");
    }
    Ok(())
}
