//! Infrastructure adapters. Implement outbound ports and drive the inbound one.
//!
//! Chat stores and the TCP transport. Map errors to DomainError.

pub mod persistence;
pub mod transport;
