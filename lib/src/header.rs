#![allow(clippy::len_without_is_empty)]

use crate::constants::*;
use bytes::{BufMut, Bytes, BytesMut};

use crate::error::StunError;

pub type TransId = [u8; TRANS_ID_LEN];

// rfc 5389, 6
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub msg_type: u16,

    // 不包括header的20字节
    pub msg_len: u16,

    pub magic_cookie: u32,

    pub trans_id: TransId,
}

impl Header {
    pub fn new(msg_type: u16, msg_len: u16, trans_id: TransId) -> Self {
        Self {
            msg_type,
            msg_len,
            magic_cookie: MAGIC_COOKIE,
            trans_id,
        }
    }

    pub fn len(&self) -> usize {
        HEADER_LEN
    }

    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN);
        buf.put_u16(self.msg_type);
        buf.put_u16(self.msg_len);
        buf.put_u32(self.magic_cookie);
        buf.put_slice(&self.trans_id);
        buf.freeze()
    }

    pub fn unpack(buf: &[u8]) -> Result<Self, StunError> {
        // 只检查长度，不检查有效性
        if buf.len() < HEADER_LEN {
            return Err(StunError::malformed(format!(
                "header buf len:{} < {}",
                buf.len(),
                HEADER_LEN
            )));
        }

        let mut index = 0_usize;
        let msg_type = u16::from_be_bytes([buf[index], buf[index + 1]]);

        index += 2;
        let msg_len = u16::from_be_bytes([buf[index], buf[index + 1]]);

        index += 2;
        let magic_cookie = u32::from_be_bytes([
            buf[index],
            buf[index + 1],
            buf[index + 2],
            buf[index + 3],
        ]);

        index += 4;
        let mut trans_id = [0_u8; TRANS_ID_LEN];
        trans_id.copy_from_slice(&buf[index..HEADER_LEN]);

        Ok(Self {
            msg_type,
            msg_len,
            magic_cookie,
            trans_id,
        })
    }

    /// Accepts only a binding success response carrying the fixed cookie.
    pub fn validate_response(&self) -> Result<(), StunError> {
        if self.msg_type != MESSAGE_TYPE_BIND_RES {
            return Err(StunError::malformed(format!(
                "not a binding success response, msg_type: 0x{:04x}",
                self.msg_type
            )));
        }

        if self.magic_cookie != MAGIC_COOKIE {
            return Err(StunError::malformed(format!(
                "magic cookie mismatch: 0x{:08x}",
                self.magic_cookie
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_rejects_19_bytes() {
        let buf = [0_u8; 19];
        assert!(matches!(
            Header::unpack(&buf),
            Err(StunError::MalformedMessage(_))
        ));
    }

    #[test]
    fn error_response_is_not_valid() {
        let header = Header::new(MESSAGE_TYPE_BIND_ERR_RES, 0, [1; TRANS_ID_LEN]);
        assert!(header.validate_response().is_err());

        let header = Header::new(MESSAGE_TYPE_BIND_RES, 0, [1; TRANS_ID_LEN]);
        assert!(header.validate_response().is_ok());
    }
}
