//! Core domain layer. No external I/O dependencies.
//!
//! Entities, the prefix-code codec and its errors live here. Dependencies flow inward.

pub mod codec;
pub mod entities;
pub mod errors;

pub use codec::{CodeTable, DecodingTrie, FrequencyTable, Node};
pub use entities::{ChatRecord, ClientEvent, ClientId, EncodedMessage, ServerEvent};
pub use errors::{CodecError, DomainError};
