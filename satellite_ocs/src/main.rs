// src/main.rs
use anyhow::{Context, Result};
use satellite_ocs::{commands, config, crypto, firewall::SpaceFirewall, net, telemetry::EventLog};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = config::Cli::parse_and_build_config()?;

    // -------- logging ----------
    // console + daily rolling file; the guard flushes the file writer on exit
    let file_appender = tracing_appender::rolling::daily(&cfg.log_dir, config::LOG_FILE_PREFIX);
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("satellite_ocs=info,shared_protocol=info,tokio=warn"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().compact())
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    // -------- key + event log ----------
    info!(?cfg, "Satellite OCS starting");
    let auth = crypto::load_authenticator(&cfg)?;
    let events = EventLog::with_file(&cfg.events_path)
        .with_context(|| format!("opening {}", cfg.events_path.display()))?;
    let firewall = Arc::new(SpaceFirewall::new(auth, Arc::new(events), cfg.policy));

    // -------- uplink ----------
    let sock = Arc::new(net::udp::bind(&cfg).await?);
    let mut receiver = commands::spawn_receiver(firewall.clone(), sock);

    info!("OCS running. Press Ctrl+C to stop");

    // -------- shutdown ----------
    tokio::select! {
        res = &mut receiver => match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("uplink receiver stopped: {e}"),
            Err(e) => error!("uplink receiver task failed: {e}"),
        },
        sig = tokio::signal::ctrl_c() => {
            if let Err(e) = sig {
                warn!(?e, "failed to install Ctrl+C handler");
            }
            info!("shutdown signal received");
            receiver.abort();
        }
    }

    let stats = firewall.stats();
    info!(accepted = stats.accepted, rejected = stats.rejected, "final firewall statistics");
    Ok(())
}
