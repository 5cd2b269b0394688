use log::{info, warn};
use punch_stun::attrs::address_attr::MappedAddress;
use punch_stun::classify::Payload;
use punch_stun::error::StunError;
use punch_stun::session::Event;
use std::net::SocketAddr;

/// Receives everything the event loop reports, synchronously, from inside
/// the iteration that produced it.
pub trait EventHandler {
    fn on_mapping_changed(&mut self, old: Option<MappedAddress>, new: MappedAddress);

    fn on_mapping_refreshed(&mut self, _address: MappedAddress) {}

    fn on_mapping_refresh_failed(&mut self, reason: &StunError);

    fn on_application_data(&mut self, from: SocketAddr, payload: Payload);
}

pub fn dispatch<H: EventHandler + ?Sized>(handler: &mut H, event: Event) {
    match event {
        Event::MappingChanged { old, new } => handler.on_mapping_changed(old, new),
        Event::MappingRefreshed(address) => handler.on_mapping_refreshed(address),
        Event::RefreshFailed(reason) => handler.on_mapping_refresh_failed(&reason),
        Event::ApplicationData { from, payload } => handler.on_application_data(from, payload),
    }
}

/// Prints status lines through `log`.
#[derive(Debug, Default)]
pub struct LogHandler;

impl EventHandler for LogHandler {
    fn on_mapping_changed(&mut self, old: Option<MappedAddress>, new: MappedAddress) {
        match old {
            None => info!("public address: {}", new),
            Some(old) => info!("public address changed: {} -> {}", old, new),
        }
    }

    fn on_mapping_refreshed(&mut self, address: MappedAddress) {
        info!("stun refresh ok, {}", address);
    }

    fn on_mapping_refresh_failed(&mut self, reason: &StunError) {
        warn!("stun refresh failed, {}", reason);
    }

    fn on_application_data(&mut self, from: SocketAddr, payload: Payload) {
        match payload {
            Payload::Text(v) => info!("recv from {}: {}", from, v),
            Payload::Binary(v) => info!("recv from {}: {:?}", from, v),
        }
    }
}
