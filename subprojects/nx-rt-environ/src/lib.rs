//! # Environment Variable Enumeration
//!
//! This crate reads the process environment through the runtime's native
//! environment block: one buffer holding every variable as `name=value`
//! entries separated by `;` (see [`block`]).
//!
//! Reading happens in two steps:
//!
//! 1. [`probe::read_block`] asks the native side for the block with a buffer
//!    that doubles until the whole block fits.
//! 2. [`parse::parse_block`] splits the block into `(name, value)` pairs in a
//!    single pass.
//!
//! Setting variables is not supported.

#![no_std]

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod block;
pub mod parse;
pub mod probe;
mod source;

use alloc::{string::String, vec::Vec};

#[cfg(feature = "std")]
pub use source::ProcessEnviron;
pub use source::EnvironSource;

/// Returns an iterator over all environment variables of `source`.
pub fn vars<S>(source: &S) -> Result<Vars, EnvironError>
where
    S: EnvironSource + ?Sized,
{
    let block = probe::read_block(source)?;
    Ok(Vars {
        inner: parse::parse_block(&block).into_iter(),
    })
}

/// Returns the value of the variable `name`, if set.
pub fn var<S>(source: &S, name: &str) -> Option<String>
where
    S: EnvironSource + ?Sized,
{
    source.var(name)
}

/// Iterator over `(name, value)` pairs (like `std::env::Vars`).
#[derive(Debug)]
pub struct Vars {
    inner: alloc::vec::IntoIter<(String, String)>,
}

impl Vars {
    /// Collects the remaining variables.
    pub fn into_vec(self) -> Vec<(String, String)> {
        self.inner.collect()
    }
}

impl Iterator for Vars {
    type Item = (String, String);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Vars {}

/// Failure to read the environment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvironError {
    /// The probe buffer could not be allocated.
    #[error("no memory for a {size} byte environment buffer")]
    OutOfMemory { size: usize },

    /// The block did not fit in the largest buffer tried.
    #[error("environment block larger than {limit} bytes")]
    BlockTooLarge { limit: usize },

    /// The block is not valid UTF-8.
    #[error("environment block is not valid UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },
}
