pub mod attrs;
pub mod behavior;
pub mod classify;
pub mod constants;
pub mod error;
pub mod header;
pub mod mapped;
pub mod packet;
pub mod session;
pub mod tracker;
pub mod transaction;
pub mod util;
