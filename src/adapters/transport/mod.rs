//! Transport adapters. Carry wire events between clients and the relay.

pub mod tcp;

pub use tcp::TcpGateway;
