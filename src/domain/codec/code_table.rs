//! Flattening a prefix tree into the character -> bitstring table that
//! actually goes on the wire.

use super::Node;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code assigned to the only character of a single-symbol message.
pub const SINGLE_SYMBOL_CODE: &str = "0";

/// Character -> code mapping over the alphabet `{'0', '1'}`.
///
/// Serialized as a plain JSON object (`{"a": "10", ...}`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeTable {
    codes: BTreeMap<char, String>,
}

impl CodeTable {
    /// Walk the tree depth-first, '0' to the left and '1' to the right.
    pub fn from_tree(root: &Node) -> Self {
        let mut codes = BTreeMap::new();

        if let Node::Leaf { symbol, .. } = root {
            codes.insert(*symbol, SINGLE_SYMBOL_CODE.to_string());
            return Self { codes };
        }

        let mut stack: Vec<(&Node, String)> = vec![(root, String::new())];
        while let Some((node, path)) = stack.pop() {
            match node {
                Node::Leaf { symbol, .. } => {
                    codes.insert(*symbol, path);
                }
                Node::Internal { left, right, .. } => {
                    let mut right_path = path.clone();
                    right_path.push('1');
                    let mut left_path = path;
                    left_path.push('0');
                    stack.push((&**right, right_path));
                    stack.push((&**left, left_path));
                }
            }
        }

        Self { codes }
    }

    pub fn get(&self, symbol: char) -> Option<&str> {
        self.codes.get(&symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &str)> + '_ {
        self.codes.iter().map(|(&c, code)| (c, code.as_str()))
    }

    /// True when no code is a prefix of (or equal to) another.
    pub fn is_prefix_free(&self) -> bool {
        // In sorted order a prefix always sorts directly before some code it
        // prefixes, so checking neighbours is enough.
        let mut codes: Vec<&str> = self.codes.values().map(String::as_str).collect();
        codes.sort_unstable();
        codes.windows(2).all(|w| !w[1].starts_with(w[0]))
    }
}

impl FromIterator<(char, String)> for CodeTable {
    fn from_iter<I: IntoIterator<Item = (char, String)>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::codec::FrequencyTable;

    fn table_for(text: &str) -> CodeTable {
        let freq = FrequencyTable::analyze(text).unwrap();
        CodeTable::from_tree(&Node::build(&freq).unwrap())
    }

    #[test]
    fn single_symbol_gets_one_bit() {
        let table = table_for("aaaa");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get('a'), Some("0"));
    }

    #[test]
    fn aab_is_deterministic() {
        let expected: CodeTable = [('a', "1".to_string()), ('b', "0".to_string())]
            .into_iter()
            .collect();
        for _ in 0..10 {
            assert_eq!(table_for("aab"), expected);
        }
    }

    #[test]
    fn frequent_symbols_get_shorter_codes() {
        let table = table_for("aaaaaaaabbbbccd");
        let len = |c| table.get(c).unwrap().len();
        assert!(len('a') <= len('b'));
        assert!(len('b') <= len('c'));
        assert!(len('c') <= len('d'));
    }

    #[test]
    fn generated_tables_are_prefix_free() {
        for text in ["ab", "hello world", "aaaaabbbbcccdde", "ünïcödé ✓✓✓"] {
            let table = table_for(text);
            assert!(table.is_prefix_free(), "{text:?} -> {table:?}");
            assert!(table.iter().all(|(_, code)| !code.is_empty()));
        }
    }

    #[test]
    fn detects_prefix_conflicts() {
        let table: CodeTable = [('a', "0".to_string()), ('b', "01".to_string())]
            .into_iter()
            .collect();
        assert!(!table.is_prefix_free());
    }

    #[test]
    fn serializes_as_plain_object() {
        let table = table_for("aab");
        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"{"a":"1","b":"0"}"#);
        let back: CodeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
