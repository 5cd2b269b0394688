use crate::attrs::{AttrIter, RawAttr};
use crate::constants::*;
use crate::error::StunError;
use crate::header::{Header, TransId};
use bytes::{BufMut, Bytes, BytesMut};

// 一个正确的 binding response:
// 长度 >= 20
// message_type == 0x0101
// magic cookie
// message length 不超过剩余的 buf

#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub attrs: Vec<RawAttr>,
}

impl Packet {
    /// Fails when the attributes, padding included, do not fit the 16-bit
    /// message length.
    pub fn new(header: Header, attrs: Vec<RawAttr>) -> Result<Self, StunError> {
        let mut packet = Self { header, attrs };
        packet.update_header_len()?;
        Ok(packet)
    }

    fn update_header_len(&mut self) -> Result<(), StunError> {
        let total = self.attrs.iter().fold(0_usize, |acc, x| acc + x.len());
        self.header.msg_len = u16::try_from(total).map_err(|_| {
            StunError::InvalidArgument(format!("message len:{} > {}", total, u16::MAX))
        })?;
        Ok(())
    }

    // 超长时 attr 不会留在 packet 里
    pub fn add_attr(&mut self, attr: RawAttr) -> Result<(), StunError> {
        self.attrs.push(attr);
        if let Err(e) = self.update_header_len() {
            self.attrs.pop();
            return Err(e);
        }
        Ok(())
    }

    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.header.msg_len as usize);
        buf.put_slice(&self.header.pack());
        for v in self.attrs.iter() {
            buf.put_slice(&v.pack());
        }

        buf.freeze()
    }
}

/// Builds a 20-byte binding request with no attributes.
pub fn encode_binding_request(trans_id: &[u8]) -> Result<Bytes, StunError> {
    let trans_id: TransId = trans_id.try_into().map_err(|_| {
        StunError::InvalidArgument(format!(
            "trans_id len:{} != {}",
            trans_id.len(),
            TRANS_ID_LEN
        ))
    })?;

    Ok(Header::new(MESSAGE_TYPE_BIND_REQ, 0, trans_id).pack())
}

/// Decodes a binding success response into its header and a lazy walk over
/// its attribute section.
pub fn decode_message(buf: Bytes) -> Result<(Header, AttrIter), StunError> {
    let header = Header::unpack(&buf)?;
    header.validate_response()?;

    let body_len = buf.len() - HEADER_LEN;
    if header.msg_len as usize > body_len {
        return Err(StunError::malformed(format!(
            "header len:{} > remaining:{}",
            header.msg_len, body_len
        )));
    }

    let attrs = buf.slice(HEADER_LEN..HEADER_LEN + header.msg_len as usize);
    Ok((header, AttrIter::new(attrs)))
}
