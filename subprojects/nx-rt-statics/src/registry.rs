//! Native registry of thread-static slot tables.
//!
//! The registry is the process-wide map from `(thread, module)` to the slot
//! table published for that pair. Compiled code reads the published table
//! directly, so a grown table only becomes visible through a successful
//! [`StorageRegistry::set`].
//!
//! The engine is generic over the registry so the runtime can plug in its own
//! native implementation, and tests a substitute. Hosted targets get
//! [`ThreadLocalRegistry`] with the `std` feature.

use core::fmt;

use crate::{descriptor::ModuleIndex, table::SlotTable};

#[cfg(feature = "std")]
mod local;

#[cfg(feature = "std")]
pub use local::ThreadLocalRegistry;

/// Identity of a thread as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadKey(u64);

impl ThreadKey {
    /// Wraps a raw thread identity.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw thread identity.
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

/// Registry of published slot tables, keyed by thread and module.
pub trait StorageRegistry {
    /// Identity of the calling thread.
    fn current_thread(&self) -> ThreadKey;

    /// Returns the table published for `(thread, module)`, if any.
    fn get(&self, thread: ThreadKey, module: ModuleIndex) -> Option<SlotTable>;

    /// Publishes `table` as the table of `(thread, module)`.
    ///
    /// On success every later [`get`] for the same pair on the same thread
    /// returns `table`. On failure the previously published table stays in
    /// place.
    ///
    /// [`get`]: StorageRegistry::get
    fn set(
        &self,
        thread: ThreadKey,
        module: ModuleIndex,
        table: SlotTable,
    ) -> Result<(), RegistrationError>;
}

impl<R: StorageRegistry + ?Sized> StorageRegistry for &R {
    #[inline]
    fn current_thread(&self) -> ThreadKey {
        (**self).current_thread()
    }

    #[inline]
    fn get(&self, thread: ThreadKey, module: ModuleIndex) -> Option<SlotTable> {
        (**self).get(thread, module)
    }

    #[inline]
    fn set(
        &self,
        thread: ThreadKey,
        module: ModuleIndex,
        table: SlotTable,
    ) -> Result<(), RegistrationError> {
        (**self).set(thread, module, table)
    }
}

/// The registry refused to publish a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Thread-specific registry storage could not be extended to hold the module.
    #[error("no memory to register thread-static storage for {module}")]
    OutOfMemory { module: ModuleIndex },

    /// The calling thread is tearing down its thread-local state.
    #[error("thread is exiting")]
    ThreadExiting,

    /// The table was published on behalf of a thread other than the caller.
    #[error("{thread} is not the calling thread")]
    ForeignThread { thread: ThreadKey },

    /// The table is shorter than the one already published.
    #[error("refusing to shrink {module} table from {current} to {proposed} slots")]
    Shrink {
        module: ModuleIndex,
        current: usize,
        proposed: usize,
    },
}
