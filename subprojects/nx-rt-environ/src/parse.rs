//! Environment block parsing.

use alloc::{string::String, vec::Vec};

use crate::block::{ENTRY_DELIMITER, PAIR_DELIMITER};

/// Splits a block into `(name, value)` pairs in a single pass.
///
/// * Empty entries (including the one after the final delimiter) are skipped.
/// * An entry without a pair delimiter carries no value and is skipped.
/// * The name ends at the *first* pair delimiter, so values may contain `=`.
/// * Surrounding whitespace is trimmed from names and values.
pub fn parse_block(block: &str) -> Vec<(String, String)> {
    let mut vars = Vec::new();

    for entry in block.split(char::from(ENTRY_DELIMITER)) {
        if entry.trim().is_empty() {
            continue;
        }

        let Some((name, value)) = entry.split_once(char::from(PAIR_DELIMITER)) else {
            log::debug!("[environ] skipping entry without a value: {entry:?}");
            continue;
        };

        vars.push((String::from(name.trim()), String::from(value.trim())));
    }

    vars
}
