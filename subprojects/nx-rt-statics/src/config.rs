//! Engine configuration.

/// Largest type-local index accepted by default.
///
/// Compiled code stores indices as `i32` and the table for index `i` needs
/// `i + 1` slots, which must itself be a valid `i32` length.
pub const DEFAULT_MAX_TYPE_INDEX: u32 = i32::MAX as u32 - 1;

/// Configuration of a [`ThreadStatics`](crate::ThreadStatics) engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    max_type_index: u32,
    check_descriptors: bool,
}

impl Config {
    /// Default configuration: descriptor checks follow `debug_assertions`.
    pub const fn new() -> Self {
        Self {
            max_type_index: DEFAULT_MAX_TYPE_INDEX,
            check_descriptors: cfg!(debug_assertions),
        }
    }

    /// Sets the largest type-local index accepted when descriptors are checked.
    pub const fn with_max_type_index(mut self, max: u32) -> Self {
        self.max_type_index = max;
        self
    }

    /// Turns descriptor checks on or off.
    pub const fn with_descriptor_checks(mut self, enabled: bool) -> Self {
        self.check_descriptors = enabled;
        self
    }

    /// Largest accepted type-local index.
    pub const fn max_type_index(&self) -> u32 {
        self.max_type_index
    }

    /// Whether descriptors are bound-checked before use.
    pub const fn check_descriptors(&self) -> bool {
        self.check_descriptors
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
