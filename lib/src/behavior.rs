use crate::attrs::address_attr::MappedAddress;
use std::fmt;

// 同一个本地端口, 对不同的 stun server 得到的映射是否一致

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingBehavior {
    // 锥型 nat, 打洞容易
    EndpointIndependent,
    // 可能是对称 nat
    EndpointDependent,
    // 结果少于 2 个
    Incomplete,
}

impl MappingBehavior {
    pub fn from_observations(observed: &[MappedAddress]) -> Self {
        let (first, rest) = match observed.split_first() {
            Some(v) if !v.1.is_empty() => v,
            _ => return MappingBehavior::Incomplete,
        };

        if rest.iter().all(|v| v == first) {
            MappingBehavior::EndpointIndependent
        } else {
            MappingBehavior::EndpointDependent
        }
    }

    pub fn punch_friendly(&self) -> bool {
        matches!(self, MappingBehavior::EndpointIndependent)
    }
}

impl fmt::Display for MappingBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MappingBehavior::EndpointIndependent => "endpoint independent",
            MappingBehavior::EndpointDependent => "endpoint dependent",
            MappingBehavior::Incomplete => "incomplete",
        };
        f.write_str(s)
    }
}
