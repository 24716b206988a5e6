//! # Thread-static storage
//!
//! Storage for the *thread-static* fields of managed types: fields with one
//! independent value per thread. Compiled code reaches a type's thread-static
//! fields through a per-thread **storage block**; this crate finds or creates
//! that block.
//!
//! ## Storage model
//!
//! ```text
//!  thread T                       module 0 slot table        storage blocks
//! ┌──────────────┐               ┌───────────────────┐
//! │ registry     │──(T, mod 0)──▶│ 0: ─────────────────────▶ [ type A fields ]
//! │              │               │ 1: empty          │
//! │              │               │ 2: ─────────────────────▶ [ type C fields ]
//! │              │               └───────────────────┘
//! │              │──(T, mod 1)──▶ ...
//! └──────────────┘
//! ```
//!
//! * Every module owns an index space; each type with thread statics gets a
//!   type-local index in its module.
//! * Each thread has one [`SlotTable`] per module, published in the native
//!   [`StorageRegistry`] so other code can read it directly. A table grows to
//!   exactly `index + 1` slots the first time an index beyond its end is
//!   touched, and never shrinks.
//! * Each populated slot references a storage block, a zeroed collector-managed
//!   object shaped by the type's [`StorageLayout`] so the collector can trace
//!   its reference fields. Blocks are never replaced or freed by this crate;
//!   they die with their thread.
//!
//! ## Threading
//!
//! A table is only ever touched by the thread that owns it, so the engine
//! takes no locks. [`SlotTable`] is `!Send` to keep it that way.
//!
//! ## Failure
//!
//! Thread-static access is assumed to always succeed. Allocation and
//! registration failures surface as [`ThreadStaticError`] from the `try_`
//! entry points and as an out-of-memory panic from the others.

#![no_std]

extern crate alloc;
#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod config;
pub mod descriptor;
pub mod layout;
pub mod object;
pub mod registry;
mod statics;
pub mod table;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use descriptor::{
    InvalidIndexError, ModuleIndex, ModuleMetadata, ModuleSlot, TypeDescriptor, TypeTlsIndex,
    TypeTlsRecord,
};
pub use layout::{LayoutHandle, StorageLayout};
pub use object::{AllocError, ObjectAllocator, ObjectRef};
#[cfg(feature = "std")]
pub use registry::ThreadLocalRegistry;
pub use registry::{RegistrationError, StorageRegistry, ThreadKey};
pub use statics::*;
pub use table::SlotTable;
