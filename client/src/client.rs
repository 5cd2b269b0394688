use bytes::Bytes;
use log::{debug, error, info, warn};
use punch_stun::attrs::address_attr::MappedAddress;
use punch_stun::behavior::MappingBehavior;
use punch_stun::error::StunError;
use punch_stun::session::{Event, Session, SessionConfig};
use punch_stun::util::print_bytes;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time;

use crate::resolve::resolve_v4;

pub const DEFAULT_DETECT_PAUSE: Duration = Duration::from_secs(2);

//--------------------------------------
pub struct BehaviorReport {
    pub observed: Vec<(String, MappedAddress)>,
    pub behavior: MappingBehavior,
}

/// One binding exchange on an already bound socket.
///
/// Datagrams that are not the matching response are skipped until the
/// deadline passes.
pub async fn query_mapped_address(
    sock: &UdpSocket,
    server: SocketAddr,
    timeout: Duration,
) -> Result<MappedAddress, StunError> {
    let mut session = Session::new(SessionConfig {
        response_timeout: timeout,
        ..SessionConfig::default()
    });
    let mut recv_buf = vec![0u8; 32 * 1024];

    let buf = session.start_refresh(Instant::now())?;
    debug!(
        "{:?} --> {}\n{}",
        sock.local_addr(),
        server,
        print_bytes(&buf, " ", 8)
    );
    let sent = sock.send_to(&buf, server).await?;
    debug!("sent: {}", sent);

    let deadline = time::Instant::now() + timeout;
    loop {
        let (len, remote_addr) = match time::timeout_at(deadline, sock.recv_from(&mut recv_buf)).await {
            Ok(v) => v?,
            Err(_) => return Err(StunError::Timeout(timeout)),
        };
        let buf = Bytes::copy_from_slice(&recv_buf[..len]);
        debug!(
            "{:?} <-- {}\n{}",
            sock.local_addr(),
            remote_addr,
            print_bytes(&buf, " ", 8)
        );

        match session.handle_datagram(remote_addr, buf, Instant::now()) {
            Some(Event::MappingChanged { new, .. }) => return Ok(new),
            Some(Event::MappingRefreshed(v)) => return Ok(v),
            Some(Event::RefreshFailed(e)) => return Err(e),
            Some(Event::ApplicationData { from, .. }) => {
                debug!("skip application data from {}", from);
            }
            // 迟到或损坏的响应, 继续等
            None => {}
        }
    }
}

/// Queries every server from the same socket and compares what they saw.
pub async fn detect_mapping_behavior(
    sock: &UdpSocket,
    servers: &[(String, u16)],
    timeout: Duration,
    pause: Duration,
) -> BehaviorReport {
    let mut observed = vec![];

    for (i, (host, port)) in servers.iter().enumerate() {
        if i > 0 {
            // 等一会, 避免 nat 映射快速变化
            time::sleep(pause).await;
        }

        let name = format!("{}:{}", host, port);
        info!("query {} ...", name);

        let server = match resolve_v4(host, *port).await {
            Ok(v) => v,
            Err(e) => {
                warn!("skip {}, {}", name, e);
                continue;
            }
        };

        match query_mapped_address(sock, server, timeout).await {
            Ok(v) => {
                info!("  public address: {}", v);
                observed.push((name, v));
            }
            Err(e) => {
                error!("  failed, {}", e);
            }
        }
    }

    let addrs: Vec<MappedAddress> = observed.iter().map(|v| v.1).collect();
    let behavior = MappingBehavior::from_observations(&addrs);

    BehaviorReport { observed, behavior }
}
