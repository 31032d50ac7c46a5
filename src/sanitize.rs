//! Identifier sanitizing.
//!
//! Applied to identifiers taken from declarations (table names, declared
//! types, foreign-key targets). Data values never pass through here: they
//! are checked by the binder and sent as bound parameters.

const STRIPPED: &[char] = &['\\', ';', '"', '\'', '\n'];

/// Return `s` with every backslash, semicolon, quote and newline removed.
pub fn clear_identifier(s: &str) -> String {
    s.chars().filter(|c| !STRIPPED.contains(c)).collect()
}
