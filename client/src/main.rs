// ./punch-client listen --stun-server stun.miwifi.com --local-port 56862
// ./punch-client detect --servers stun.voipbuster.com:3478 stun.miwifi.com:3478
// ./punch-client hello --target 27.38.213.25:2646

use std::net::{Ipv4Addr, SocketAddr};
use std::process;
use std::time::Duration;

use clap::builder::ValueParser;
use clap::{Arg, ArgMatches, Command};
use log::{error, info};
use tokio::net::UdpSocket;

use punch_client::client::{detect_mapping_behavior, DEFAULT_DETECT_PAUSE};
use punch_client::config::{Config, DEFAULT_LOCAL_PORT};
use punch_client::event_loop::EventLoop;
use punch_client::handler::LogHandler;
use punch_client::hello::{send_hello, DEFAULT_HELLO_INTERVAL};
use punch_client::resolve::parse_server;
use punch_client::signal::shutdown_channel;

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

fn parse_addr(s: &str) -> Result<SocketAddr, String> {
    let addr = match s.parse::<SocketAddr>() {
        Ok(v) => v,
        Err(e) => {
            return Err(format!("{}", e));
        }
    };
    // 不能是 0.0.0.0
    match addr {
        SocketAddr::V4(addr_v4) => {
            if addr_v4.ip().is_unspecified() {
                return Err("0.0.0.0 not allow".to_string());
            }
        }
        SocketAddr::V6(_) => {
            return Err("ipv6 not support".to_string());
        }
    }

    Ok(addr)
}

fn local_port_arg() -> Arg<'static> {
    Arg::new("local_port")
        .long("local-port")
        .takes_value(true)
        .help("fixed local udp port")
        .value_parser(clap::value_parser!(u16))
}

fn stun_args() -> [Arg<'static>; 4] {
    [
        Arg::new("stun_server")
            .long("stun-server")
            .takes_value(true)
            .help("stun server, host[:port]")
            .value_parser(ValueParser::new(parse_server)),
        Arg::new("refresh_interval")
            .long("refresh-interval")
            .takes_value(true)
            .default_value("25")
            .help("seconds between mapping refreshes")
            .value_parser(clap::value_parser!(u32).range(1..)),
        Arg::new("response_timeout")
            .long("response-timeout")
            .takes_value(true)
            .default_value("3")
            .help("seconds to wait for a stun response")
            .value_parser(clap::value_parser!(u32).range(1..)),
        local_port_arg(),
    ]
}

fn build_config(app: &ArgMatches) -> Config {
    let mut config = Config::default();

    if let Some((host, port)) = app.get_one::<(String, u16)>("stun_server") {
        config.stun_server = host.clone();
        config.stun_port = *port;
    }
    if let Some(port) = app.get_one::<u16>("local_port") {
        config.local_port = *port;
    }
    if let Some(v) = app.get_one::<u32>("refresh_interval") {
        config.refresh_interval = Duration::from_secs(*v as u64);
    }
    if let Some(v) = app.get_one::<u32>("response_timeout") {
        config.response_timeout = Duration::from_secs(*v as u64);
    }

    config
}

async fn bind_local(port: u16) -> UdpSocket {
    let local = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), port);
    match UdpSocket::bind(local).await {
        Ok(v) => v,
        Err(e) => {
            error!("error, can't bind {}, {}", local, e);
            process::exit(1);
        }
    }
}

async fn listen(app: &ArgMatches) {
    let config = build_config(app);
    info!(
        "local port: {}, stun server: {}:{}",
        config.local_port, config.stun_server, config.stun_port
    );

    let signal_rx = shutdown_channel();
    let event_loop = match EventLoop::bind(config, LogHandler, signal_rx).await {
        Ok(v) => v,
        Err(e) => {
            error!("error, bind, {}", e);
            process::exit(1);
        }
    };

    event_loop.run().await;
}

async fn detect(app: &ArgMatches) {
    let servers: Vec<(String, u16)> = app
        .get_many::<(String, u16)>("servers")
        .map(|v| v.cloned().collect())
        .unwrap_or_default();
    let port = *app.get_one::<u16>("local_port").unwrap_or(&DEFAULT_LOCAL_PORT);
    let timeout = *app.get_one::<u32>("response_timeout").expect("wrong response_timeout");

    let sock = bind_local(port).await;
    let report = detect_mapping_behavior(
        &sock,
        &servers,
        Duration::from_secs(timeout as u64),
        DEFAULT_DETECT_PAUSE,
    )
    .await;

    for (server, addr) in report.observed.iter() {
        println!("{} -> {}", server, addr);
    }
    println!("mapping behavior: {}", report.behavior);
    if report.behavior.punch_friendly() {
        println!("same public port for every server, udp hole punching likely works.");
    }
}

async fn hello(app: &ArgMatches) {
    let target: SocketAddr = *app.get_one("target").expect("wrong target");
    let name: &String = app.get_one("name").expect("wrong name");
    // 不指定就用随机端口
    let port = *app.get_one::<u16>("local_port").unwrap_or(&0);

    let sock = bind_local(port).await;
    info!("send hello to {}, from {:?}", target, sock.local_addr());

    let signal_rx = shutdown_channel();
    let sent = send_hello(&sock, target, name, DEFAULT_HELLO_INTERVAL, signal_rx).await;
    info!("sent {} hello", sent);
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let app = Command::new(APP_NAME)
        .version(APP_VERSION)
        .about("keeps a stun mapping fresh on one udp port shared with peer traffic")
        .subcommand_required(true)
        .subcommand(
            Command::new("listen")
                .about("discover and refresh the public address, print peer datagrams")
                .args(stun_args()),
        )
        .subcommand(
            Command::new("detect")
                .about("compare the public address seen by several stun servers")
                .arg(
                    Arg::new("servers")
                        .long("servers")
                        .takes_value(true)
                        .multiple_values(true)
                        .default_values(&["stun.voipbuster.com:3478", "stun.miwifi.com:3478"])
                        .help("stun servers, host[:port]")
                        .value_parser(ValueParser::new(parse_server)),
                )
                .arg(
                    Arg::new("response_timeout")
                        .long("response-timeout")
                        .takes_value(true)
                        .default_value("3")
                        .value_parser(clap::value_parser!(u32).range(1..)),
                )
                .arg(local_port_arg()),
        )
        .subcommand(
            Command::new("hello")
                .about("send HELLO datagrams to a peer every 2 seconds")
                .arg(
                    Arg::new("target")
                        .long("target")
                        .takes_value(true)
                        .required(true)
                        .help("peer public address")
                        .value_parser(ValueParser::new(parse_addr)),
                )
                .arg(
                    Arg::new("name")
                        .long("name")
                        .takes_value(true)
                        .default_value("OLD")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(local_port_arg()),
        )
        .get_matches();

    match app.subcommand() {
        Some(("listen", sub)) => listen(sub).await,
        Some(("detect", sub)) => detect(sub).await,
        Some(("hello", sub)) => hello(sub).await,
        _ => unreachable!("subcommand required"),
    }

    println!("end.");
}
