pub mod client;
pub mod config;
pub mod event_loop;
pub mod handler;
pub mod hello;
pub mod resolve;
pub mod signal;
