//! Plaintext -> bitstring.

use super::CodeTable;
use crate::domain::CodecError;

/// Concatenate the code of every character of `text`.
///
/// # Errors
/// `CodecError::UnknownCharacter` if `table` has no code for a character.
/// Characters are never skipped.
pub fn encode(text: &str, table: &CodeTable) -> Result<String, CodecError> {
    let mut bits = String::with_capacity(text.len() * 4);
    for (position, symbol) in text.chars().enumerate() {
        let code = table
            .get(symbol)
            .ok_or(CodecError::UnknownCharacter { symbol, position })?;
        bits.push_str(code);
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(char, &str)]) -> CodeTable {
        entries.iter().map(|&(c, s)| (c, s.to_string())).collect()
    }

    #[test]
    fn concatenates_codes() {
        let t = table(&[('a', "1"), ('b', "0")]);
        assert_eq!(encode("aab", &t).unwrap(), "110");
    }

    #[test]
    fn single_symbol_repeats_its_bit() {
        let t = table(&[('a', "0")]);
        assert_eq!(encode("aaaa", &t).unwrap(), "0000");
    }

    #[test]
    fn missing_character_is_an_error() {
        let t = table(&[('a', "0"), ('b', "1")]);
        assert_eq!(
            encode("abc", &t),
            Err(CodecError::UnknownCharacter {
                symbol: 'c',
                position: 2
            })
        );
    }
}
