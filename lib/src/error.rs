use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StunError {
    // 参数不合规, 例如 trans_id 长度不对
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // header 太短, magic cookie 或 message type 不对
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("no usable mapped address attribute")]
    NoMappedAddress,

    #[error("unsupported address family: {0}")]
    UnsupportedFamily(u8),

    #[error("can't resolve {0}")]
    ResolutionFailure(String),

    #[error("no response within {0:?}")]
    Timeout(std::time::Duration),

    // trans_id 不匹配
    #[error("stray response")]
    StrayResponse,

    #[error("socket error, {0}")]
    Socket(#[from] io::Error),
}

impl StunError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        StunError::MalformedMessage(msg.into())
    }
}
