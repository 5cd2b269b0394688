use crate::attrs::address_attr::MappedAddress;
use crate::constants::MAGIC_COOKIE;
use std::fmt::Write as _;
use std::net::Ipv4Addr;

pub fn print_bytes(buf: &[u8], separator: &str, row_width: usize) -> String {
    let mut hex = String::new();
    buf.iter().enumerate().for_each(|(x, y)| {
        let _ = write!(hex, "{:02X}", y);
        if (x + 1) % row_width == 0 {
            hex.push('\n');
        } else {
            hex.push_str(separator);
        }
    });

    hex
}

// xor 是对称的, 编码和解码都用它
pub fn xor_address_v4(addr: MappedAddress) -> MappedAddress {
    let magic_prefix = (MAGIC_COOKIE >> 16) as u16;
    let port = addr.port ^ magic_prefix;

    let ip = u32::from(addr.ip) ^ MAGIC_COOKIE;

    MappedAddress::new(Ipv4Addr::from(ip), port)
}
