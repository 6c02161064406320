//! Receiver-side decoding.
//!
//! The trie is rebuilt from the received `CodeTable` alone. It never needs to
//! match the sender's tree shape, only to accept exactly the table's codes.

use super::CodeTable;
use crate::domain::CodecError;

const ROOT: usize = 0;

#[derive(Debug, Default, Clone)]
struct TrieNode {
    children: [Option<usize>; 2],
    symbol: Option<char>,
}

impl TrieNode {
    fn is_branch(&self) -> bool {
        self.children.iter().any(Option::is_some)
    }
}

/// Arena-backed binary trie. Index 0 is the root.
#[derive(Debug, Clone)]
pub struct DecodingTrie {
    nodes: Vec<TrieNode>,
}

fn bit_index(position: usize, found: char) -> Result<usize, CodecError> {
    match found {
        '0' => Ok(0),
        '1' => Ok(1),
        _ => Err(CodecError::InvalidSymbol { position, found }),
    }
}

impl DecodingTrie {
    /// Insert every `(symbol, code)` pair as a path and mark its end.
    ///
    /// # Errors
    /// `CodecError::InvalidCodeTable` when a code is empty, contains a symbol
    /// other than '0'/'1', or collides with another code (equal to it, a
    /// prefix of it, or extending it).
    pub fn from_code_table(table: &CodeTable) -> Result<Self, CodecError> {
        let mut nodes = vec![TrieNode::default()];

        for (symbol, code) in table.iter() {
            let invalid = |reason: &str| CodecError::InvalidCodeTable {
                symbol,
                reason: reason.to_string(),
            };
            if code.is_empty() {
                return Err(invalid("empty code"));
            }

            let mut cursor = ROOT;
            for (position, ch) in code.chars().enumerate() {
                let bit = bit_index(position, ch).map_err(|_| invalid("code is not binary"))?;
                if nodes[cursor].symbol.is_some() {
                    return Err(invalid("extends another code"));
                }
                cursor = match nodes[cursor].children[bit] {
                    Some(next) => next,
                    None => {
                        nodes.push(TrieNode::default());
                        let next = nodes.len() - 1;
                        nodes[cursor].children[bit] = Some(next);
                        next
                    }
                };
            }

            let end = &mut nodes[cursor];
            if end.symbol.is_some() {
                return Err(invalid("duplicates another code"));
            }
            if end.is_branch() {
                return Err(invalid("is a prefix of another code"));
            }
            end.symbol = Some(symbol);
        }

        Ok(Self { nodes })
    }

    /// Number of characters the trie can emit.
    pub fn symbol_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.symbol.is_some()).count()
    }

    /// Replay `bits` from the root, emitting a character at each marked node.
    ///
    /// # Errors
    /// - `InvalidSymbol` for anything other than '0'/'1'
    /// - `MalformedCode` when a bit has no matching edge
    /// - `IncompleteTrailingCode` when the input stops mid-code
    pub fn decode(&self, bits: &str) -> Result<String, CodecError> {
        let mut out = String::new();
        let mut cursor = ROOT;
        let mut code_start = 0;

        for (position, ch) in bits.chars().enumerate() {
            let bit = bit_index(position, ch)?;
            cursor = self.nodes[cursor].children[bit].ok_or(CodecError::MalformedCode { position })?;
            if let Some(symbol) = self.nodes[cursor].symbol {
                out.push(symbol);
                cursor = ROOT;
                code_start = position + 1;
            }
        }

        if cursor != ROOT {
            return Err(CodecError::IncompleteTrailingCode {
                position: code_start,
                dangling: bits.chars().count() - code_start,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(char, &str)]) -> CodeTable {
        entries.iter().map(|&(c, s)| (c, s.to_string())).collect()
    }

    fn trie(entries: &[(char, &str)]) -> DecodingTrie {
        DecodingTrie::from_code_table(&table(entries)).unwrap()
    }

    #[test]
    fn decodes_concatenated_codes() {
        let t = trie(&[('a', "0"), ('b', "10"), ('c', "11")]);
        assert_eq!(t.decode("0101100").unwrap(), "abcaa");
        assert_eq!(t.symbol_count(), 3);
    }

    #[test]
    fn single_symbol_table() {
        let t = trie(&[('a', "0")]);
        assert_eq!(t.decode("0000").unwrap(), "aaaa");
    }

    #[test]
    fn missing_edge_is_malformed() {
        let t = trie(&[('a', "0"), ('b', "10")]);
        assert_eq!(t.decode("11"), Err(CodecError::MalformedCode { position: 1 }));
    }

    #[test]
    fn missing_edge_at_root_is_malformed() {
        let t = trie(&[('a', "0")]);
        assert_eq!(t.decode("01"), Err(CodecError::MalformedCode { position: 1 }));
    }

    #[test]
    fn trailing_partial_code_is_reported() {
        let t = trie(&[('a', "0"), ('b', "10"), ('c', "11")]);
        assert_eq!(
            t.decode("0101"),
            Err(CodecError::IncompleteTrailingCode {
                position: 3,
                dangling: 1
            })
        );
    }

    #[test]
    fn non_binary_bit_is_rejected() {
        let t = trie(&[('a', "0"), ('b', "1")]);
        assert_eq!(
            t.decode("01x"),
            Err(CodecError::InvalidSymbol {
                position: 2,
                found: 'x'
            })
        );
    }

    #[test]
    fn empty_bitstring_decodes_to_empty_text() {
        let t = trie(&[('a', "0")]);
        assert_eq!(t.decode("").unwrap(), "");
    }

    #[test]
    fn rejects_empty_code() {
        let err = DecodingTrie::from_code_table(&table(&[('a', "")])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidCodeTable { symbol: 'a', .. }));
    }

    #[test]
    fn rejects_non_binary_code() {
        let err = DecodingTrie::from_code_table(&table(&[('a', "02")])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidCodeTable { symbol: 'a', .. }));
    }

    #[test]
    fn rejects_prefix_conflicts_in_either_order() {
        // 'a' is inserted first (BTreeMap order): "0" then "01" extends it.
        let err = DecodingTrie::from_code_table(&table(&[('a', "0"), ('b', "01")])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidCodeTable { symbol: 'b', .. }));

        // Longer code first: "0" lands on an existing branch.
        let err = DecodingTrie::from_code_table(&table(&[('a', "01"), ('b', "0")])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidCodeTable { symbol: 'b', .. }));
    }

    #[test]
    fn rejects_duplicate_codes() {
        let err = DecodingTrie::from_code_table(&table(&[('a', "1"), ('b', "1")])).unwrap_err();
        assert!(matches!(err, CodecError::InvalidCodeTable { symbol: 'b', .. }));
    }
}
