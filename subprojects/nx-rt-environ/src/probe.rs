//! Reading the whole environment block.
//!
//! The writer gives no size hint, so the block is read with a growing
//! buffer: start at [`INITIAL_BLOCK_SIZE`] bytes and double until the writer
//! leaves part of the buffer unused.

use alloc::{string::String, vec::Vec};

use crate::{EnvironError, source::EnvironSource};

/// First buffer size tried.
pub const INITIAL_BLOCK_SIZE: usize = 1024;

/// Largest buffer tried before giving up.
pub const MAX_BLOCK_SIZE: usize = 16 * 1024 * 1024;

/// Reads the complete environment block from `source`.
pub fn read_block<S>(source: &S) -> Result<String, EnvironError>
where
    S: EnvironSource + ?Sized,
{
    let mut size = INITIAL_BLOCK_SIZE;

    loop {
        let mut buf = zeroed(size)?;
        let written = source.write_block(&mut buf);

        if written < buf.len() {
            buf.truncate(written);
            return String::from_utf8(buf).map_err(|err| EnvironError::InvalidUtf8 {
                offset: err.utf8_error().valid_up_to(),
            });
        }

        if size >= MAX_BLOCK_SIZE {
            log::warn!("[environ] environment block exceeds {MAX_BLOCK_SIZE} bytes");
            return Err(EnvironError::BlockTooLarge { limit: MAX_BLOCK_SIZE });
        }

        log::trace!("[environ] block filled {size} bytes, retrying with {}", size * 2);
        size *= 2;
    }
}

fn zeroed(size: usize) -> Result<Vec<u8>, EnvironError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| EnvironError::OutOfMemory { size })?;
    buf.resize(size, 0);
    Ok(buf)
}
