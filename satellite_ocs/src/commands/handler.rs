use crate::{errors::OcsError, firewall::SpaceFirewall};
use std::sync::Arc;
use tokio::{net::UdpSocket, task::JoinHandle};
use tracing::{debug, error, warn};

// largest CCSDS packet: 6-byte header + 65536-byte data field + tag
const RECV_BUF_LEN: usize = 6 + 65_536 + shared_protocol::TAG_LEN;

/// Feed every received datagram to the firewall, one packet per datagram.
///
/// Socket errors are logged and skipped. The loop only ends if the event
/// sink fails, since a decision that cannot be recorded must not go unnoticed.
pub async fn run_receiver(firewall: Arc<SpaceFirewall>, sock: Arc<UdpSocket>) -> Result<(), OcsError> {
    let mut buf = vec![0u8; RECV_BUF_LEN];
    loop {
        match sock.recv_from(&mut buf).await {
            Ok((n, from)) => {
                debug!(%from, len = n, "uplink datagram");
                if let Err(e) = firewall.process_packet(&buf[..n]) {
                    error!("security event sink failed: {e}");
                    return Err(e.into());
                }
            }
            Err(e) => warn!("recv error: {e}"),
        }
    }
}

pub fn spawn_receiver(firewall: Arc<SpaceFirewall>, sock: Arc<UdpSocket>) -> JoinHandle<Result<(), OcsError>> {
    tokio::spawn(run_receiver(firewall, sock))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SinkError;
    use crate::firewall::{FirewallPolicy, FirewallStats};
    use crate::telemetry::{EventLog, MockEventSink};
    use shared_protocol::{encode, unix_now, Authenticator, EventType, DEFAULT_APID};
    use std::time::Duration;

    fn auth() -> Arc<Authenticator> {
        Arc::new(Authenticator::new(b"RECEIVER_TEST_KEY").unwrap())
    }

    async fn wait_for(log: &EventLog, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while log.len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("receiver did not record events in time");
    }

    #[tokio::test]
    async fn validates_each_datagram() {
        let log = Arc::new(EventLog::in_memory());
        let fw = Arc::new(SpaceFirewall::new(auth(), log.clone(), FirewallPolicy::default()));
        let rx = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = rx.local_addr().unwrap();
        let task = spawn_receiver(fw.clone(), rx);

        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let good = auth().seal(&encode("PING", DEFAULT_APID, 1, unix_now(), true).unwrap());
        tx.send_to(&good, addr).await.unwrap();
        tx.send_to(b"SHORT", addr).await.unwrap();

        wait_for(&log, 2).await;
        assert_eq!(fw.stats(), FirewallStats { accepted: 1, rejected: 1 });
        assert_eq!(log.count_by_type(EventType::CommandExecuted), 1);
        assert_eq!(log.count_by_type(EventType::PacketRejected), 1);

        task.abort();
    }

    #[tokio::test]
    async fn stops_when_sink_fails() {
        let mut sink = MockEventSink::new();
        sink.expect_append()
            .returning(|_| Err(SinkError::Io(std::io::Error::other("read-only filesystem"))));
        let fw = Arc::new(SpaceFirewall::new(auth(), Arc::new(sink), FirewallPolicy::default()));
        let rx = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let addr = rx.local_addr().unwrap();
        let task = spawn_receiver(fw, rx);

        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        tx.send_to(b"SHORT", addr).await.unwrap();

        let res = tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
        assert!(matches!(res, Err(OcsError::Sink(SinkError::Io(_)))));
    }
}
