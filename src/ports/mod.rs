//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by transport adapters into the relay
//! - Outbound: Called by the relay into persistence and receivers

pub mod inbound;
pub mod outbound;

pub use inbound::RelayInbound;
pub use outbound::{ChatStore, ReceiverPort};
