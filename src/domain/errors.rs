//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

/// Failures of the per-message prefix-code codec.
///
/// Positions are counted in characters for plaintext and in bits for
/// bitstrings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Empty messages have no frequency table and cannot be encoded.
    #[error("cannot encode an empty message")]
    EmptyInput,

    /// The plaintext contains a character its own code table does not cover.
    #[error("character {symbol:?} at position {position} has no code")]
    UnknownCharacter { symbol: char, position: usize },

    /// The next bit has no matching edge in the decoding trie.
    #[error("bit at position {position} does not continue any code")]
    MalformedCode { position: usize },

    /// The bitstring ended in the middle of a code.
    #[error("bitstring ends mid-code: {dangling} trailing bit(s) after position {position}")]
    IncompleteTrailingCode { position: usize, dangling: usize },

    /// The bitstring contains something other than '0' or '1'.
    #[error("invalid symbol {found:?} at bit position {position}")]
    InvalidSymbol { position: usize, found: char },

    /// The received code table cannot form a prefix-free trie.
    #[error("invalid code for {symbol:?}: {reason}")]
    InvalidCodeTable { symbol: char, reason: String },
}

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Transport error: {0}")]
    Transport(String),

    /// The relay task has stopped and no longer accepts events.
    #[error("Relay is not running")]
    RelayClosed,

    #[error("Configuration error: {0}")]
    Config(String),
}
