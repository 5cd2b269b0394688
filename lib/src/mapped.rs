use crate::attrs::address_attr::{AddressAttr, MappedAddress};
use crate::attrs::xor_address::XorMappedAddress;
use crate::attrs::RawAttr;
use crate::constants::*;
use crate::error::StunError;
use log::debug;

/// Resolves the external endpoint from a response's attributes.
///
/// The first MAPPED-ADDRESS or XOR-MAPPED-ADDRESS that decodes as IPv4 wins,
/// in wire order. Malformed or non-IPv4 candidates are skipped. When nothing
/// usable turns up, `UnsupportedFamily` is returned if every candidate that
/// carried a family was non-IPv4, otherwise `NoMappedAddress`.
pub fn extract_mapped_address<I>(attrs: I) -> Result<MappedAddress, StunError>
where
    I: IntoIterator<Item = RawAttr>,
{
    let mut unsupported = None;
    let mut malformed_ipv4 = false;

    for attr in attrs {
        let attr_type = attr.attr_type;
        // 长度不足 4 的没有 family
        let bears_family = attr.value.len() >= 4;
        let decoded = match attr_type {
            ATTR_MAPPED_ADDRESS => AddressAttr::try_from(attr).map(|a| a.address),
            ATTR_XOR_MAPPED_ADDRESS => XorMappedAddress::try_from(attr).map(|a| a.address),
            _ => continue,
        };

        match decoded {
            Ok(address) => return Ok(address),
            Err(StunError::UnsupportedFamily(family)) => {
                debug!("skip attr 0x{:04x}, family: {}", attr_type, family);
                unsupported.get_or_insert(family);
            }
            Err(e) => {
                debug!("skip attr 0x{:04x}, {}", attr_type, e);
                if bears_family {
                    malformed_ipv4 = true;
                }
            }
        }
    }

    match unsupported {
        Some(family) if !malformed_ipv4 => Err(StunError::UnsupportedFamily(family)),
        _ => Err(StunError::NoMappedAddress),
    }
}
