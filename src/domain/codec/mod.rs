//! Per-message prefix-code codec.
//!
//! Pipeline: `FrequencyTable` -> `Node` tree -> `CodeTable` -> bitstring.
//! Only the code table and the bitstring leave the sender; receivers rebuild a
//! `DecodingTrie` from the table.

pub mod code_table;
pub mod decoder;
pub mod encoder;
pub mod frequency;
pub mod tree;

pub use code_table::{CodeTable, SINGLE_SYMBOL_CODE};
pub use decoder::DecodingTrie;
pub use encoder::encode;
pub use frequency::FrequencyTable;
pub use tree::Node;

use crate::domain::CodecError;

/// Build a fresh code table for `text` and encode it.
///
/// The tree is private to this call and dropped before returning.
pub fn encode_message(text: &str) -> Result<(CodeTable, String), CodecError> {
    let freq = FrequencyTable::analyze(text)?;
    let root = Node::build(&freq).ok_or(CodecError::EmptyInput)?;
    let table = CodeTable::from_tree(&root);
    let bits = encode(text, &table)?;
    Ok((table, bits))
}

/// Rebuild the trie from `table` and decode `bits` against it.
pub fn decode_message(table: &CodeTable, bits: &str) -> Result<String, CodecError> {
    DecodingTrie::from_code_table(table)?.decode(bits)
}
