use crate::config::Config;
use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tracing::info;

/// Bind the uplink socket. Each datagram carries exactly one packet.
pub async fn bind(cfg: &Config) -> Result<UdpSocket> {
    let sock = UdpSocket::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding uplink socket on {}", cfg.bind_addr))?;
    info!(addr = %sock.local_addr()?, "uplink socket bound");
    Ok(sock)
}
