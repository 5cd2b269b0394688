use punch_stun::constants::DEFAULT_STUN_PORT;
use punch_stun::session::{SessionConfig, DEFAULT_RESPONSE_TIMEOUT};
use punch_stun::tracker::DEFAULT_REFRESH_INTERVAL;
use std::time::Duration;

pub const DEFAULT_STUN_SERVER: &str = "stun.voipbuster.com";

// 0xde1e, 打洞期间本地端口不能变
pub const DEFAULT_LOCAL_PORT: u16 = 0xde1e;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct Config {
    pub stun_server: String,
    pub stun_port: u16,
    pub local_port: u16,
    pub refresh_interval: Duration,
    pub response_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stun_server: DEFAULT_STUN_SERVER.to_string(),
            stun_port: DEFAULT_STUN_PORT,
            local_port: DEFAULT_LOCAL_PORT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            refresh_interval: self.refresh_interval,
            response_timeout: self.response_timeout,
        }
    }
}
