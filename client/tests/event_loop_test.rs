use bytes::Bytes;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use punch_client::client::query_mapped_address;
use punch_client::config::Config;
use punch_client::event_loop::{EventLoop, LookupFuture, Resolver};
use punch_client::handler::EventHandler;
use punch_stun::attrs::address_attr::MappedAddress;
use punch_stun::attrs::xor_address::XorMappedAddress;
use punch_stun::classify::Payload;
use punch_stun::constants::*;
use punch_stun::error::StunError;
use punch_stun::header::Header;
use punch_stun::packet::Packet;

#[derive(Debug, PartialEq)]
enum Note {
    Changed(Option<MappedAddress>, MappedAddress),
    Refreshed(MappedAddress),
    Failed(String),
    Data(SocketAddr, Payload),
}

struct RecordingHandler(UnboundedSender<Note>);

impl EventHandler for RecordingHandler {
    fn on_mapping_changed(&mut self, old: Option<MappedAddress>, new: MappedAddress) {
        let _ = self.0.send(Note::Changed(old, new));
    }

    fn on_mapping_refreshed(&mut self, address: MappedAddress) {
        let _ = self.0.send(Note::Refreshed(address));
    }

    fn on_mapping_refresh_failed(&mut self, reason: &StunError) {
        let _ = self.0.send(Note::Failed(format!("{:?}", reason)));
    }

    fn on_application_data(&mut self, from: SocketAddr, payload: Payload) {
        let _ = self.0.send(Note::Data(from, payload));
    }
}

fn external() -> MappedAddress {
    MappedAddress::new(Ipv4Addr::new(203, 0, 113, 5), 54321)
}

fn response_for(header: &Header, trans_id_flip: bool) -> Bytes {
    let mut trans_id = header.trans_id;
    if trans_id_flip {
        trans_id[0] ^= 0xff;
    }
    let header = Header::new(MESSAGE_TYPE_BIND_RES, 0, trans_id);
    let mut packet = Packet::new(header, vec![]).unwrap();
    packet
        .add_attr(XorMappedAddress::new(external()).into())
        .unwrap();
    packet.pack()
}

struct Responder {
    addr: SocketAddr,
    requests: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

// 收到 binding request 就回一个固定的 xor-mapped-address
// stray_first: 先回一个 trans_id 不对的
async fn spawn_responder(stray_first: bool) -> Responder {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = sock.local_addr().unwrap();
    let requests = Arc::new(AtomicUsize::new(0));
    let counter = requests.clone();

    let handle = tokio::spawn(async move {
        let mut buf = vec![0u8; 2048];
        loop {
            let (len, remote_addr) = match sock.recv_from(&mut buf).await {
                Ok(v) => v,
                Err(_) => return,
            };
            let header = match Header::unpack(&buf[..len]) {
                Ok(v) if v.msg_type == MESSAGE_TYPE_BIND_REQ => v,
                _ => continue,
            };
            counter.fetch_add(1, Ordering::SeqCst);
            if stray_first {
                let _ = sock.send_to(&response_for(&header, true), remote_addr).await;
            }
            let _ = sock.send_to(&response_for(&header, false), remote_addr).await;
        }
    });

    Responder {
        addr,
        requests,
        handle,
    }
}

fn loop_config(server: SocketAddr) -> Config {
    Config {
        stun_server: server.ip().to_string(),
        stun_port: server.port(),
        local_port: 0,
        refresh_interval: Duration::from_secs(60),
        response_timeout: Duration::from_millis(300),
        poll_interval: Duration::from_millis(10),
    }
}

async fn next_note(rx: &mut UnboundedReceiver<Note>) -> Note {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no event in time")
        .expect("handler dropped")
}

#[tokio::test]
async fn test_discovers_mapping_and_passes_peer_data() {
    let responder = spawn_responder(false).await;
    let server = responder.addr;
    let (note_tx, mut note_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = watch::channel(0_u8);

    let event_loop = EventLoop::bind(loop_config(server), RecordingHandler(note_tx), signal_rx)
        .await
        .unwrap();
    let local_port = event_loop.local_addr().unwrap().port();
    let handle = tokio::spawn(event_loop.run());

    assert_eq!(
        next_note(&mut note_rx).await,
        Note::Changed(None, external())
    );

    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    peer.send_to(b"HELLO", ("127.0.0.1", local_port)).await.unwrap();
    assert_eq!(
        next_note(&mut note_rx).await,
        Note::Data(peer.local_addr().unwrap(), Payload::Text("HELLO".to_string()))
    );

    signal_tx.send(1).unwrap();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
    responder.handle.abort();
}

#[tokio::test]
async fn test_stray_response_does_not_resend() {
    let responder = spawn_responder(true).await;
    let (note_tx, mut note_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = watch::channel(0_u8);

    let event_loop = EventLoop::bind(
        loop_config(responder.addr),
        RecordingHandler(note_tx),
        signal_rx,
    )
    .await
    .unwrap();
    let handle = tokio::spawn(event_loop.run());

    // 先到的错 id 响应被丢掉, 同一个请求等到正确的响应
    assert_eq!(
        next_note(&mut note_rx).await,
        Note::Changed(None, external())
    );

    // 几个 tick 之后仍然只发过一次, 也没有失败事件
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(responder.requests.load(Ordering::SeqCst), 1);
    assert!(note_rx.try_recv().is_err());

    signal_tx.send(1).unwrap();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
    responder.handle.abort();
}

#[tokio::test]
async fn test_slow_lookup_does_not_block_peer_data() {
    let responder = spawn_responder(false).await;
    let server = responder.addr;
    let (note_tx, mut note_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = watch::channel(0_u8);

    let lookups = Arc::new(AtomicUsize::new(0));
    let counter = lookups.clone();
    let resolver: Resolver = Arc::new(move |_host: String, _port: u16| -> LookupFuture {
        counter.fetch_add(1, Ordering::SeqCst);
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            Ok::<_, StunError>(server)
        })
    });

    let mut config = loop_config(server);
    config.stun_server = "stun.example.test".to_string();
    config.response_timeout = Duration::from_secs(3);

    let event_loop = EventLoop::bind(config, RecordingHandler(note_tx), signal_rx)
        .await
        .unwrap()
        .with_resolver(resolver);
    let local_port = event_loop.local_addr().unwrap().port();
    let handle = tokio::spawn(event_loop.run());

    // 解析还没结束, 对端数据照样送到
    tokio::time::sleep(Duration::from_millis(200)).await;
    let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    peer.send_to(b"HELLO", ("127.0.0.1", local_port)).await.unwrap();
    assert_eq!(
        next_note(&mut note_rx).await,
        Note::Data(peer.local_addr().unwrap(), Payload::Text("HELLO".to_string()))
    );
    assert_eq!(responder.requests.load(Ordering::SeqCst), 0);

    assert_eq!(
        next_note(&mut note_rx).await,
        Note::Changed(None, external())
    );
    // 每个 tick 都想刷新, 但只解析一次
    assert_eq!(lookups.load(Ordering::SeqCst), 1);

    signal_tx.send(1).unwrap();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
    responder.handle.abort();
}

#[tokio::test]
async fn test_silent_server_times_out() {
    // 只绑定, 不回复
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let (note_tx, mut note_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = watch::channel(0_u8);

    let event_loop = EventLoop::bind(
        loop_config(silent.local_addr().unwrap()),
        RecordingHandler(note_tx),
        signal_rx,
    )
    .await
    .unwrap();
    let handle = tokio::spawn(event_loop.run());

    match next_note(&mut note_rx).await {
        Note::Failed(reason) => assert!(reason.starts_with("Timeout"), "{}", reason),
        other => panic!("unexpected note: {:?}", other),
    }

    signal_tx.send(1).unwrap();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_unresolvable_server_is_a_failed_refresh() {
    let (note_tx, mut note_rx) = mpsc::unbounded_channel();
    let (signal_tx, signal_rx) = watch::channel(0_u8);

    let mut config = loop_config("127.0.0.1:3478".parse().unwrap());
    config.stun_server = "no-such-host.invalid".to_string();
    config.response_timeout = Duration::from_secs(3);

    let event_loop = EventLoop::bind(config, RecordingHandler(note_tx), signal_rx)
        .await
        .unwrap();
    let handle = tokio::spawn(event_loop.run());

    match next_note(&mut note_rx).await {
        Note::Failed(reason) => assert!(reason.starts_with("ResolutionFailure"), "{}", reason),
        other => panic!("unexpected note: {:?}", other),
    }

    signal_tx.send(1).unwrap();
    let _ = timeout(Duration::from_secs(5), handle).await;
}

#[tokio::test]
async fn test_query_skips_stray_response() {
    let responder = spawn_responder(true).await;
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let mapped = query_mapped_address(&sock, responder.addr, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(mapped, external());
    responder.handle.abort();
}

#[tokio::test]
async fn test_query_times_out() {
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();

    let result = query_mapped_address(
        &sock,
        silent.local_addr().unwrap(),
        Duration::from_millis(200),
    )
    .await;
    assert!(matches!(result, Err(StunError::Timeout(_))));
}
