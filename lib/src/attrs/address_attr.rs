use crate::attrs::RawAttr;
use crate::constants::*;
use crate::error::StunError;
use bytes::{BufMut, BytesMut};
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

// 地址类的attribute: mapped-address, xor-mapped-address
//
//  0                   1                   2                   3
// |0 0 0 0 0 0 0 0|    Family     |           Port                |
// |                 Address (32 bits)                             |
//
// 只支持 ipv4: family 0x01, 4 bytes

/// The externally visible endpoint reported by a STUN server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappedAddress {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl MappedAddress {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }
}

impl fmt::Display for MappedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl From<MappedAddress> for SocketAddrV4 {
    fn from(addr: MappedAddress) -> Self {
        SocketAddrV4::new(addr.ip, addr.port)
    }
}

impl From<MappedAddress> for SocketAddr {
    fn from(addr: MappedAddress) -> Self {
        SocketAddr::V4(addr.into())
    }
}

/// Plain MAPPED-ADDRESS attribute.
#[derive(Debug, Clone)]
pub struct AddressAttr {
    pub attr_type: u16,
    pub address: MappedAddress,
}

impl AddressAttr {
    pub fn new(attr_type: u16, address: MappedAddress) -> Self {
        Self { attr_type, address }
    }

    pub fn mapped(address: MappedAddress) -> Self {
        Self::new(ATTR_MAPPED_ADDRESS, address)
    }
}

pub(crate) fn pack_address_value(family: u8, port: u16, octets: &[u8]) -> bytes::Bytes {
    let mut bytes_buf = BytesMut::with_capacity(4 + octets.len());

    bytes_buf.put_u8(0);
    bytes_buf.put_u8(family);
    bytes_buf.put_u16(port);
    bytes_buf.put_slice(octets);
    bytes_buf.freeze()
}

/// Reads `(port, ip)` exactly as stored on the wire, without any XOR.
///
/// Short values are rejected whole; a family other than IPv4 yields
/// `UnsupportedFamily`.
pub fn unpack_address_value(value: &[u8]) -> Result<MappedAddress, StunError> {
    if value.len() < 4 {
        return Err(StunError::malformed(format!(
            "address attr buf len:{} < 4",
            value.len()
        )));
    }

    // value[0] 保留
    let family = value[1];
    if family != ATTR_FAMILY_IPV4 {
        return Err(StunError::UnsupportedFamily(family));
    }

    let port = u16::from_be_bytes([value[2], value[3]]);

    if value.len() < 8 {
        return Err(StunError::malformed(format!(
            "ipv4 address attr buf len:{} < 8",
            value.len()
        )));
    }
    let ip = Ipv4Addr::new(value[4], value[5], value[6], value[7]);

    Ok(MappedAddress::new(ip, port))
}

impl From<AddressAttr> for RawAttr {
    fn from(attr: AddressAttr) -> Self {
        let value = pack_address_value(
            ATTR_FAMILY_IPV4,
            attr.address.port,
            &attr.address.ip.octets(),
        );
        RawAttr::new(attr.attr_type, value)
    }
}

impl TryFrom<RawAttr> for AddressAttr {
    type Error = StunError;

    fn try_from(base_attr: RawAttr) -> Result<Self, Self::Error> {
        let address = unpack_address_value(&base_attr.value)?;
        Ok(Self {
            attr_type: base_attr.attr_type,
            address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn decode_encoded_mapped_address() {
        for (ip, port) in [
            (Ipv4Addr::new(0, 0, 0, 0), 0),
            (Ipv4Addr::new(192, 168, 8, 100), 5678),
            (Ipv4Addr::new(255, 255, 255, 255), 65535),
        ] {
            let raw: RawAttr = AddressAttr::mapped(MappedAddress::new(ip, port)).into();
            assert_eq!(raw.attr_type, ATTR_MAPPED_ADDRESS);
            assert_eq!(raw.attr_len, 8);

            let attr = AddressAttr::try_from(raw).unwrap();
            assert_eq!(attr.address, MappedAddress::new(ip, port));
        }
    }

    #[test]
    fn short_values_are_rejected() {
        assert!(matches!(
            unpack_address_value(&[0, 1, 0]),
            Err(StunError::MalformedMessage(_))
        ));
        assert!(matches!(
            unpack_address_value(&[0, 1, 0x1f, 0x90, 10, 20, 30]),
            Err(StunError::MalformedMessage(_))
        ));
    }

    #[test]
    fn ipv6_family_is_unsupported() {
        let raw = RawAttr::new(ATTR_MAPPED_ADDRESS, Bytes::from(vec![0_u8, 2, 0, 80, 0, 0, 0, 0]));
        assert!(matches!(
            AddressAttr::try_from(raw),
            Err(StunError::UnsupportedFamily(2))
        ));
    }
}
