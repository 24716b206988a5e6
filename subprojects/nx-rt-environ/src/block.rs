//! Delimited environment block format.
//!
//! The native side flattens the environment into a single byte buffer:
//!
//! ```text
//! HOME=/home/nx;LANG=C.UTF-8;PATH=/bin:/usr/bin;
//! └──┬─┘└───┬──┘
//!   name  value       entries end with ENTRY_DELIMITER
//! ```
//!
//! The writer never reports how large the full block is. It fills the buffer
//! it is given and returns the number of bytes written; a return value equal
//! to the buffer length means the block may have been truncated.

/// Terminates every `name=value` entry.
pub const ENTRY_DELIMITER: u8 = b';';

/// Separates a variable name from its value.
pub const PAIR_DELIMITER: u8 = b'=';

/// Whether `name=value` reads back unchanged after a trip through the block.
///
/// Names must be non-empty and free of both delimiters, values must not
/// contain an entry delimiter, and neither may carry surrounding whitespace
/// since parsing trims it.
pub fn is_encodable(name: &str, value: &str) -> bool {
    let entry = char::from(ENTRY_DELIMITER);
    let pair = char::from(PAIR_DELIMITER);

    !name.is_empty()
        && !name.contains([entry, pair])
        && !value.contains(entry)
        && name.trim() == name
        && value.trim() == value
}

/// Writes `pairs` into `buf` as `name=value;` entries.
///
/// Stops as soon as `buf` is full and returns the number of bytes written.
pub fn encode_block<'a, I>(pairs: I, buf: &mut [u8]) -> usize
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut written = 0;

    for (name, value) in pairs {
        let entry = name
            .bytes()
            .chain([PAIR_DELIMITER])
            .chain(value.bytes())
            .chain([ENTRY_DELIMITER]);

        for byte in entry {
            let Some(dst) = buf.get_mut(written) else {
                return written;
            };
            *dst = byte;
            written += 1;
        }
    }

    written
}
