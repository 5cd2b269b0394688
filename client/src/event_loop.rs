/*
一个 socket 同时收 stun 响应和对端数据
每个 tick: 检查是否需要刷新映射, 检查请求是否超时
dns 解析在单独的 task 里跑, 结果作为 select 的一个分支, 不挡住收包
解析到的地址缓存下来, 刷新失败后重新解析
收到退出信号就结束, socket 随 EventLoop 一起释放
*/

use std::future::{self, Future};
use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use log::{debug, error, info};
use punch_stun::error::StunError;
use punch_stun::session::{Event, Session};
use punch_stun::util::print_bytes;
use tokio::net::UdpSocket;
use tokio::sync::watch::Receiver as WatchReceiver;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::config::Config;
use crate::handler::{dispatch, EventHandler};
use crate::resolve::resolve_v4;

const RECV_BUF_LEN: usize = 32 * 1024;

pub type LookupFuture = Pin<Box<dyn Future<Output = Result<SocketAddr, StunError>> + Send>>;

/// Turns `(host, port)` into the STUN server address.
pub type Resolver = Arc<dyn Fn(String, u16) -> LookupFuture + Send + Sync>;

type LookupTask = JoinHandle<Result<SocketAddr, StunError>>;

pub fn dns_resolver() -> Resolver {
    Arc::new(|host: String, port: u16| -> LookupFuture {
        Box::pin(async move { resolve_v4(&host, port).await })
    })
}

pub struct EventLoop<H> {
    config: Config,
    socket: UdpSocket,
    session: Session,
    handler: H,
    signal_rx: WatchReceiver<u8>,
    resolver: Resolver,
    server: Option<SocketAddr>,
    lookup: Option<LookupTask>,
}

impl<H: EventHandler> EventLoop<H> {
    /// Binds the fixed local port. This is the only fatal failure.
    pub async fn bind(config: Config, handler: H, signal_rx: WatchReceiver<u8>) -> io::Result<Self> {
        let local = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), config.local_port);
        let socket = UdpSocket::bind(local).await?;
        debug!("listening: {:?}", socket.local_addr());

        let session = Session::new(config.session_config());
        Ok(Self {
            config,
            socket,
            session,
            handler,
            signal_rx,
            resolver: dns_resolver(),
            server: None,
            lookup: None,
        })
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Runs until the shutdown signal fires, then hands the handler back.
    pub async fn run(mut self) -> H {
        let mut buf = vec![0u8; RECV_BUF_LEN];
        let mut tick = time::interval(self.config.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                res = self.socket.recv_from(&mut buf) => {
                    match res {
                        Ok((len, remote_addr)) => {
                            // 拷贝一份, handler 拿不到 buf
                            let data = Bytes::copy_from_slice(&buf[..len]);
                            self.on_datagram(remote_addr, data);
                        }
                        Err(e) => {
                            error!("error, recv_from, {}", e);
                        }
                    }
                },
                res = wait_lookup(&mut self.lookup) => {
                    self.lookup = None;
                    self.on_lookup(res);
                },
                _ = tick.tick() => {
                    self.on_tick();
                },
                _ = self.signal_rx.changed() => {
                    info!("recv signal, event loop will exit.");
                    break;
                }
            }
        }

        if let Some(lookup) = self.lookup.take() {
            lookup.abort();
        }
        self.handler
    }

    fn on_datagram(&mut self, remote_addr: SocketAddr, data: Bytes) {
        debug!("<--- {}, len: {}\n{}", remote_addr, data.len(), print_bytes(&data, " ", 8));

        if let Some(event) = self.session.handle_datagram(remote_addr, data, Instant::now()) {
            self.emit(event);
        }
    }

    fn on_tick(&mut self) {
        if self.session.wants_refresh(Instant::now()) {
            match self.server {
                Some(server) => self.send_request(server),
                None => self.start_lookup(),
            }
        }

        if let Some(event) = self.session.handle_timeout(Instant::now()) {
            self.emit(event);
        }
    }

    fn start_lookup(&mut self) {
        if self.lookup.is_some() {
            return;
        }

        let host = self.config.stun_server.clone();
        let lookup = (self.resolver)(host.clone(), self.config.stun_port);
        let limit = self.config.response_timeout;

        self.lookup = Some(tokio::spawn(async move {
            match time::timeout(limit, lookup).await {
                Ok(v) => v,
                Err(_) => Err(StunError::ResolutionFailure(format!(
                    "{}, lookup timed out",
                    host
                ))),
            }
        }));
    }

    fn on_lookup(&mut self, res: Result<SocketAddr, StunError>) {
        match res {
            Ok(server) => {
                debug!("stun server: {}", server);
                self.server = Some(server);
                if self.session.wants_refresh(Instant::now()) {
                    self.send_request(server);
                }
            }
            Err(e) => {
                let event = self.session.abort_refresh(Instant::now(), e);
                self.emit(event);
            }
        }
    }

    fn send_request(&mut self, server: SocketAddr) {
        let request = match self.session.start_refresh(Instant::now()) {
            Ok(v) => v,
            Err(e) => {
                let event = self.session.abort_refresh(Instant::now(), e);
                self.emit(event);
                return;
            }
        };

        match self.socket.try_send_to(&request, server) {
            Ok(_) => {
                debug!("---> {}\n{}", server, print_bytes(&request, " ", 8));
            }
            Err(e) => {
                error!("error, send_to {}, {}", server, e);
                let event = self.session.abort_refresh(Instant::now(), e.into());
                self.emit(event);
            }
        }
    }

    fn emit(&mut self, event: Event) {
        // 刷新失败后下一轮重新解析
        if let Event::RefreshFailed(_) = &event {
            self.server = None;
        }
        dispatch(&mut self.handler, event);
    }
}

async fn wait_lookup(lookup: &mut Option<LookupTask>) -> Result<SocketAddr, StunError> {
    match lookup {
        Some(handle) => match handle.await {
            Ok(v) => v,
            Err(e) => Err(StunError::ResolutionFailure(format!("lookup task, {}", e))),
        },
        None => future::pending().await,
    }
}
