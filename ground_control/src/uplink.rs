use anyhow::{Context, Result};
use serde::Serialize;
use tokio::net::UdpSocket;
use tracing::info;

use crate::channel::UplinkChannel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UplinkSummary {
    pub sent: usize,
    pub dropped: usize,
}

/// Push packets through the channel model and send every survivor to
/// `target` as its own datagram.
pub async fn send_packets(
    target: &str,
    packets: Vec<Vec<u8>>,
    channel: &mut UplinkChannel,
) -> Result<UplinkSummary> {
    let sock = UdpSocket::bind("0.0.0.0:0").await.context("binding uplink sender")?;
    let mut summary = UplinkSummary::default();

    for packet in packets {
        let Some(datagram) = channel.transmit(packet) else {
            summary.dropped += 1;
            continue;
        };
        sock.send_to(&datagram, target)
            .await
            .with_context(|| format!("sending to {target}"))?;
        summary.sent += 1;
    }

    info!(sent = summary.sent, dropped = summary.dropped, %target, "uplink pass complete");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_survivors_as_single_datagrams() {
        let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target = rx.local_addr().unwrap().to_string();

        let mut ch = UplinkChannel::perfect();
        let summary = send_packets(&target, vec![vec![1; 40], vec![2; 50]], &mut ch).await.unwrap();
        assert_eq!(summary, UplinkSummary { sent: 2, dropped: 0 });

        let mut buf = [0u8; 128];
        let (n, _) = rx.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], &[1u8; 40][..]);
        let (n, _) = rx.recv_from(&mut buf).await.unwrap();
        assert_eq!(n, 50);
    }

    #[tokio::test]
    async fn lost_packets_are_not_sent() {
        let mut ch = UplinkChannel::seeded(1.0, 1).unwrap();
        let summary = send_packets("127.0.0.1:9", vec![vec![0; 40]; 3], &mut ch).await.unwrap();
        assert_eq!(summary, UplinkSummary { sent: 0, dropped: 3 });
    }
}
