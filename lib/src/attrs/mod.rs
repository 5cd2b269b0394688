#![allow(clippy::len_without_is_empty)]

use crate::constants::ATTR_HEADER_LEN;
use crate::error::StunError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::debug;

pub mod address_attr;
pub mod xor_address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttr {
    pub attr_type: u16,
    pub attr_len: u16,
    pub value: Bytes,
}

// value 按4字节对齐后的长度
pub fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

impl RawAttr {
    /// # Panics
    ///
    /// If `value` is longer than `u16::MAX` bytes. Use [`RawAttr::try_new`]
    /// for values of unknown size.
    pub fn new(attr_type: u16, value: Bytes) -> Self {
        assert!(
            value.len() <= u16::MAX as usize,
            "attr value len:{} > {}",
            value.len(),
            u16::MAX
        );
        Self {
            attr_type,
            attr_len: value.len() as u16,
            value,
        }
    }

    pub fn try_new(attr_type: u16, value: Bytes) -> Result<Self, StunError> {
        let attr_len = u16::try_from(value.len()).map_err(|_| {
            StunError::InvalidArgument(format!("attr value len:{} > {}", value.len(), u16::MAX))
        })?;
        Ok(Self {
            attr_type,
            attr_len,
            value,
        })
    }

    // 包括 4 字节 header 和 padding
    pub fn len(&self) -> usize {
        ATTR_HEADER_LEN + padded_len(self.attr_len as usize)
    }

    pub fn pack(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());

        buf.put_u16(self.attr_type);
        buf.put_u16(self.attr_len);
        buf.put_slice(&self.value);
        buf.put_bytes(0, padded_len(self.value.len()) - self.value.len());

        buf.freeze()
    }
}

/// Walks a TLV attribute section lazily.
///
/// A value whose declared length runs past the end of the buffer is clamped to
/// what is left. Iteration stops once fewer than 4 bytes remain.
#[derive(Debug, Clone)]
pub struct AttrIter {
    buf: Bytes,
}

impl AttrIter {
    pub fn new(buf: Bytes) -> Self {
        Self { buf }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len()
    }
}

impl Iterator for AttrIter {
    type Item = RawAttr;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buf.len() < ATTR_HEADER_LEN {
            return None;
        }

        let attr_type = self.buf.get_u16();
        let declared = self.buf.get_u16();

        let value_len = (declared as usize).min(self.buf.len());
        if value_len < declared as usize {
            debug!(
                "attr 0x{:04x} len:{} > remaining:{}, clamped",
                attr_type, declared, value_len
            );
        }
        let value = self.buf.split_to(value_len);

        // padding 不要求为0, 直接跳过
        let padding = (padded_len(value_len) - value_len).min(self.buf.len());
        self.buf.advance(padding);

        Some(RawAttr {
            attr_type,
            attr_len: value_len as u16,
            value,
        })
    }
}
