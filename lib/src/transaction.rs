use crate::constants::TRANS_ID_LEN;
use crate::header::{Header, TransId};
use rand::prelude::*;
use std::time::Instant;

pub fn new_trans_id() -> TransId {
    let mut trans_id = [0u8; TRANS_ID_LEN];
    rand::thread_rng().fill_bytes(&mut trans_id);
    trans_id
}

/// The single binding request currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub trans_id: TransId,
    pub sent_at: Instant,
}

impl PendingRequest {
    pub fn new(trans_id: TransId, sent_at: Instant) -> Self {
        Self { trans_id, sent_at }
    }

    pub fn matches(&self, header: &Header) -> bool {
        self.trans_id == header.trans_id
    }
}
