use crate::constants::*;
use bytes::Bytes;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datagram {
    StunResponse(Bytes),
    ApplicationData(Bytes),
}

/// Peer payload as handed to the application: UTF-8 text when it decodes,
/// raw bytes otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Text(String),
    Binary(Bytes),
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        match std::str::from_utf8(&data) {
            Ok(v) => Payload::Text(v.to_string()),
            Err(_) => Payload::Binary(data),
        }
    }
}

// 只看前 8 个字节: type == 0x0101 && magic cookie
// 恰好长得像 stun 的应用数据会被误判, session 会再检查是否有 pending 请求
pub fn is_stun_response(buf: &[u8]) -> bool {
    buf.len() >= HEADER_LEN
        && buf[..2] == MESSAGE_TYPE_BIND_RES.to_be_bytes()
        && buf[4..8] == MAGIC_COOKIE_BYTES
}

pub fn classify(buf: Bytes) -> Datagram {
    if is_stun_response(&buf) {
        Datagram::StunResponse(buf)
    } else {
        Datagram::ApplicationData(buf)
    }
}
