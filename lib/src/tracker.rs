use crate::attrs::address_attr::MappedAddress;
use log::debug;
use std::time::{Duration, Instant};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEvent {
    Changed {
        old: Option<MappedAddress>,
        new: MappedAddress,
    },
    Unchanged,
}

/// Last known external endpoint and when it should next be refreshed.
#[derive(Debug, Clone)]
pub struct NatMapping {
    current: Option<MappedAddress>,
    last_refreshed_at: Option<Instant>,
    // 失败后的下一次尝试时间
    retry_at: Option<Instant>,
    refresh_interval: Duration,
}

impl Default for NatMapping {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl NatMapping {
    pub fn new(refresh_interval: Duration) -> Self {
        Self {
            current: None,
            last_refreshed_at: None,
            retry_at: None,
            refresh_interval,
        }
    }

    pub fn current(&self) -> Option<MappedAddress> {
        self.current
    }

    pub fn last_refreshed_at(&self) -> Option<Instant> {
        self.last_refreshed_at
    }

    pub fn is_refresh_due(&self, now: Instant) -> bool {
        if let Some(retry_at) = self.retry_at {
            return now >= retry_at;
        }

        match (self.current, self.last_refreshed_at) {
            (Some(_), Some(last)) => now.saturating_duration_since(last) >= self.refresh_interval,
            _ => true,
        }
    }

    pub fn record_success(&mut self, address: MappedAddress, now: Instant) -> ChangeEvent {
        self.last_refreshed_at = Some(now);
        self.retry_at = None;

        if self.current == Some(address) {
            return ChangeEvent::Unchanged;
        }

        let old = self.current.replace(address);
        debug!("mapping changed: {:?} -> {}", old, address);
        ChangeEvent::Changed { old, new: address }
    }

    /// Keeps the current mapping and pushes the next attempt one interval out.
    pub fn record_failure(&mut self, now: Instant) {
        self.retry_at = Some(now + self.refresh_interval);
    }
}
