//! Refresh state machine shared by every driver of the socket.
//!
//! `Session` never touches I/O. The owner of the UDP socket feeds it received
//! datagrams and the current time, sends whatever request it hands back, and
//! dispatches the returned [`Event`]s.

use crate::attrs::address_attr::MappedAddress;
use crate::classify::{classify, Datagram, Payload};
use crate::error::StunError;
use crate::mapped::extract_mapped_address;
use crate::packet::{decode_message, encode_binding_request};
use crate::tracker::{ChangeEvent, NatMapping, DEFAULT_REFRESH_INTERVAL};
use crate::transaction::{new_trans_id, PendingRequest};
use bytes::Bytes;
use log::{debug, warn};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub refresh_interval: Duration,
    pub response_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    Idle,
    AwaitingResponse(PendingRequest),
}

#[derive(Debug)]
pub enum Event {
    MappingChanged {
        old: Option<MappedAddress>,
        new: MappedAddress,
    },
    MappingRefreshed(MappedAddress),
    RefreshFailed(StunError),
    ApplicationData {
        from: SocketAddr,
        payload: Payload,
    },
}

#[derive(Debug)]
pub struct Session {
    state: State,
    mapping: NatMapping,
    response_timeout: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            state: State::Idle,
            mapping: NatMapping::new(config.refresh_interval),
            response_timeout: config.response_timeout,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn mapping(&self) -> &NatMapping {
        &self.mapping
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        match &self.state {
            State::Idle => None,
            State::AwaitingResponse(pending) => Some(pending),
        }
    }

    /// True when idle and the mapping is due for a refresh.
    pub fn wants_refresh(&self, now: Instant) -> bool {
        self.state == State::Idle && self.mapping.is_refresh_due(now)
    }

    /// Builds a fresh binding request and starts waiting for its response.
    pub fn start_refresh(&mut self, now: Instant) -> Result<Bytes, StunError> {
        let trans_id = new_trans_id();
        let request = encode_binding_request(&trans_id)?;

        self.state = State::AwaitingResponse(PendingRequest::new(trans_id, now));
        Ok(request)
    }

    /// Gives up on the current refresh cycle (lookup or send failed).
    pub fn abort_refresh(&mut self, now: Instant, reason: StunError) -> Event {
        self.fail(now, reason)
    }

    pub fn handle_timeout(&mut self, now: Instant) -> Option<Event> {
        let pending = self.pending()?;
        if now.saturating_duration_since(pending.sent_at) < self.response_timeout {
            return None;
        }

        Some(self.fail(now, StunError::Timeout(self.response_timeout)))
    }

    pub fn handle_datagram(&mut self, from: SocketAddr, data: Bytes, now: Instant) -> Option<Event> {
        match classify(data) {
            Datagram::ApplicationData(data) => Some(Event::ApplicationData {
                from,
                payload: data.into(),
            }),
            Datagram::StunResponse(data) => self.handle_response(from, data, now),
        }
    }

    fn handle_response(&mut self, from: SocketAddr, data: Bytes, now: Instant) -> Option<Event> {
        let pending = match self.pending() {
            Some(v) => v.clone(),
            None => {
                debug!("stun response from {} with nothing pending, dropped", from);
                return None;
            }
        };

        let (header, attrs) = match decode_message(data) {
            Ok(v) => v,
            Err(e) => {
                warn!("bad stun response from {}, {}", from, e);
                return None;
            }
        };

        // 不匹配的响应不改变状态, 继续等真正的响应或超时
        if !pending.matches(&header) {
            debug!("{} from {}, dropped", StunError::StrayResponse, from);
            return None;
        }

        self.state = State::Idle;

        match extract_mapped_address(attrs) {
            Ok(address) => Some(match self.mapping.record_success(address, now) {
                ChangeEvent::Changed { old, new } => Event::MappingChanged { old, new },
                ChangeEvent::Unchanged => Event::MappingRefreshed(address),
            }),
            Err(e) => Some(self.fail(now, e)),
        }
    }

    fn fail(&mut self, now: Instant, reason: StunError) -> Event {
        self.state = State::Idle;
        self.mapping.record_failure(now);
        Event::RefreshFailed(reason)
    }
}
