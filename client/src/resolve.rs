use log::debug;
use punch_stun::constants::DEFAULT_STUN_PORT;
use punch_stun::error::StunError;
use std::net::SocketAddr;
use tokio::net::lookup_host;

/// Resolves a STUN server to its first IPv4 address.
pub async fn resolve_v4(host: &str, port: u16) -> Result<SocketAddr, StunError> {
    let addrs = lookup_host((host, port))
        .await
        .map_err(|e| StunError::ResolutionFailure(format!("{}:{}, {}", host, port, e)))?;

    let mut addrs = addrs.filter(|v| v.is_ipv4());
    match addrs.next() {
        Some(v) => {
            debug!("resolve {} -> {}", host, v);
            Ok(v)
        }
        None => Err(StunError::ResolutionFailure(format!(
            "{}:{}, no ipv4 address",
            host, port
        ))),
    }
}

/// Parses `host` or `host:port`, defaulting to port 3478.
pub fn parse_server(s: &str) -> Result<(String, u16), String> {
    let (host, port) = match s.rsplit_once(':') {
        None => (s, DEFAULT_STUN_PORT),
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|e| format!("bad port in {}, {}", s, e))?;
            (host, port)
        }
    };

    if host.is_empty() {
        return Err(format!("empty host in {}", s));
    }

    Ok((host.to_string(), port))
}
