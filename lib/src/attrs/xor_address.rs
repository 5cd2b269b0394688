use crate::attrs::address_attr::{pack_address_value, unpack_address_value, MappedAddress};
use crate::attrs::RawAttr;
use crate::constants::*;
use crate::error::StunError;
use crate::util;

// xor-mapped-address 端口和ip需要混淆
// port 和 magic cookie 高16位 做 xor
// address(ipv4) 和 magic cookie做xor

#[derive(Debug, Clone)]
pub struct XorMappedAddress {
    pub address: MappedAddress,
}

impl XorMappedAddress {
    pub fn new(address: MappedAddress) -> Self {
        Self { address }
    }
}

impl From<XorMappedAddress> for RawAttr {
    fn from(attr: XorMappedAddress) -> Self {
        let xor_addr = util::xor_address_v4(attr.address);
        let value = pack_address_value(ATTR_FAMILY_IPV4, xor_addr.port, &xor_addr.ip.octets());

        RawAttr::new(ATTR_XOR_MAPPED_ADDRESS, value)
    }
}

impl TryFrom<RawAttr> for XorMappedAddress {
    type Error = StunError;

    fn try_from(base_attr: RawAttr) -> Result<Self, Self::Error> {
        let encoded = unpack_address_value(&base_attr.value)?;

        Ok(Self {
            address: util::xor_address_v4(encoded),
        })
    }
}
