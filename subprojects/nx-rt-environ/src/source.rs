//! Environment sources.

use alloc::string::String;

/// Native provider of the environment block.
pub trait EnvironSource {
    /// Writes as much of the delimited environment block as fits in `buf`.
    ///
    /// Returns the number of bytes written. See [`crate::block`] for the format.
    fn write_block(&self, buf: &mut [u8]) -> usize;

    /// Looks up a single variable.
    fn var(&self, name: &str) -> Option<String>;
}

impl<S: EnvironSource + ?Sized> EnvironSource for &S {
    fn write_block(&self, buf: &mut [u8]) -> usize {
        (**self).write_block(buf)
    }

    fn var(&self, name: &str) -> Option<String> {
        (**self).var(name)
    }
}

/// Environment of the current process, read through `std::env`.
///
/// Variables that would not read back unchanged are left out of the block:
/// names or values that are not valid Unicode, and anything rejected by
/// [`block::is_encodable`](crate::block::is_encodable).
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnviron;

#[cfg(feature = "std")]
impl EnvironSource for ProcessEnviron {
    fn write_block(&self, buf: &mut [u8]) -> usize {
        write_os_vars(std::env::vars_os(), buf)
    }

    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

#[cfg(feature = "std")]
fn write_os_vars<I>(vars: I, buf: &mut [u8]) -> usize
where
    I: IntoIterator<Item = (std::ffi::OsString, std::ffi::OsString)>,
{
    use std::vec::Vec;

    let vars: Vec<(String, String)> = vars
        .into_iter()
        .filter_map(|(name, value)| {
            let (Ok(name), Ok(value)) = (name.into_string(), value.into_string()) else {
                log::debug!("[environ] skipping variable that is not valid Unicode");
                return None;
            };
            if !crate::block::is_encodable(&name, &value) {
                log::debug!("[environ] skipping variable {name:?} that cannot be encoded");
                return None;
            }
            Some((name, value))
        })
        .collect();

    crate::block::encode_block(
        vars.iter().map(|(name, value)| (name.as_str(), value.as_str())),
        buf,
    )
}
