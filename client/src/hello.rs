use log::{error, info};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::watch::Receiver as WatchReceiver;
use tokio::time;

pub const DEFAULT_HELLO_INTERVAL: Duration = Duration::from_secs(2);

pub fn hello_message(seq: u64, name: &str) -> String {
    format!("HELLO #{} from {}", seq, name)
}

/// Sends numbered HELLO datagrams to `target` until the shutdown signal.
/// Returns how many were sent.
pub async fn send_hello(
    sock: &UdpSocket,
    target: SocketAddr,
    name: &str,
    interval: Duration,
    mut signal_rx: WatchReceiver<u8>,
) -> u64 {
    let mut tick = time::interval(interval);
    let mut seq = 0_u64;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let msg = hello_message(seq, name);
                seq += 1;
                match sock.send_to(msg.as_bytes(), target).await {
                    Ok(_) => info!("sent: {}", msg),
                    Err(e) => error!("error, send_to {}, {}", target, e),
                }
            },
            _ = signal_rx.changed() => {
                info!("recv signal, stop sending hello.");
                break;
            }
        }
    }

    seq
}
