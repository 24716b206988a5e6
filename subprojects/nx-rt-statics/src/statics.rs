//! Thread-static base lookup.
//!
//! [`ThreadStatics`] answers the question compiled code asks on every access
//! to a thread-static field: "where is this type's storage block on the
//! current thread?". The first access for a `(thread, module, type)` triple
//! grows the thread's slot table for the module, publishes it through the
//! registry, allocates the block and stores it. Every later access is a
//! registry read plus a slot read.
//!
//! ```text
//! get ── registry.get(thread, module) ── slot populated? ──yes──▶ block
//!                                              │ no
//!                                              ▼
//!                         ensure_len(index + 1) ── grown? ──▶ registry.set
//!                                              │
//!                                              ▼
//!                         allocator.new_object(layout) ──▶ fill slot ──▶ block
//! ```
//!
//! Any failure on the slow path is fatal for the caller: dependent code
//! assumes thread-static access never fails. [`ThreadStatics::get_thread_static_base`]
//! turns failures into an out-of-memory panic; the `try_` variants expose
//! the error for runtimes that want to raise it their own way.

use crate::{
    config::Config,
    descriptor::{InvalidIndexError, ModuleIndex, ModuleMetadata, TypeDescriptor, TypeTlsRecord},
    object::{AllocError, ObjectAllocator, ObjectRef},
    registry::{RegistrationError, StorageRegistry, ThreadKey},
    table::{self, Growth, SlotTable},
};

/// Thread-static storage engine.
pub struct ThreadStatics<R, A> {
    registry: R,
    allocator: A,
    config: Config,
}

impl<R, A> ThreadStatics<R, A>
where
    R: StorageRegistry,
    A: ObjectAllocator,
{
    /// Creates an engine with the default [`Config`].
    pub const fn new(registry: R, allocator: A) -> Self {
        Self::with_config(registry, allocator, Config::new())
    }

    /// Creates an engine with an explicit configuration.
    pub const fn with_config(registry: R, allocator: A, config: Config) -> Self {
        Self {
            registry,
            allocator,
            config,
        }
    }

    /// The registry tables are published to.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The allocator storage blocks come from.
    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// The engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the storage block of `desc` on the calling thread, creating it
    /// on first access.
    ///
    /// # Panics
    ///
    /// Panics if the block cannot be created. Callers of thread-static
    /// storage have no way to recover, so the failure is reported as an
    /// out-of-memory condition.
    pub fn get_thread_static_base(&self, desc: &TypeDescriptor) -> ObjectRef {
        match self.try_get_thread_static_base(desc) {
            Ok(block) => block,
            Err(err) => fatal(desc, err),
        }
    }

    /// Returns the storage block of `desc` on the calling thread, creating it
    /// on first access.
    ///
    /// Once this returns `Ok(block)`, every later call for the same module
    /// and type on the same thread returns the same `block`.
    ///
    /// On error the slot is left empty. Table growth that completed before
    /// the failure stays published. If the table was released or replaced by
    /// a shorter one while the block was being allocated, it is published
    /// again before the block is stored.
    pub fn try_get_thread_static_base(
        &self,
        desc: &TypeDescriptor,
    ) -> Result<ObjectRef, ThreadStaticError> {
        let required = self.required_len(desc)?;
        let thread = self.registry.current_thread();
        let module = desc.module();
        let index = desc.index();

        let existing = self.registry.get(thread, module);
        if let Some(block) = existing.as_ref().and_then(|table| table.get(index)) {
            return Ok(block);
        }

        log::trace!("[thread_statics] first access to {module} {index} on {thread}");

        let published = self.ensure_storage(thread, module, existing, required)?;
        let block = self.allocator.new_object(desc.layout())?;

        // The allocator may have run managed code that touched this module's
        // thread statics, so store into whatever table is published now. A
        // block is only ever stored in a registered table.
        let table = match self.registry.get(thread, module) {
            Some(table) if table.len() >= required => table,
            Some(shorter) => self.ensure_storage(thread, module, Some(shorter), required)?,
            None => {
                log::debug!("[thread_statics] {module} table released during allocation on {thread}");
                self.registry.set(thread, module, published.clone())?;
                published
            }
        };

        if let Some(winner) = table.get(index) {
            log::debug!("[thread_statics] {module} {index} populated during allocation on {thread}");
            return Ok(winner);
        }

        table.fill(index, block);
        log::debug!(
            "[thread_statics] allocated {module} {index} on {thread}: {block:?} ({} bytes)",
            desc.layout().layout().size()
        );

        Ok(block)
    }

    /// Returns the storage block of `desc` on the calling thread if it was
    /// already created. Never allocates.
    pub fn existing(&self, desc: &TypeDescriptor) -> Option<ObjectRef> {
        let thread = self.registry.current_thread();
        self.registry
            .get(thread, desc.module())
            .and_then(|table| table.get(desc.index()))
    }

    /// [`get_thread_static_base`](Self::get_thread_static_base) for a
    /// compiled-code record resolved through `metadata`.
    ///
    /// # Panics
    ///
    /// Panics if the record is malformed or the block cannot be created.
    pub fn get_for_record<M>(&self, record: &TypeTlsRecord, metadata: &M) -> ObjectRef
    where
        M: ModuleMetadata + ?Sized,
    {
        match record.resolve(metadata) {
            Ok(desc) => self.get_thread_static_base(&desc),
            Err(err) => {
                log::error!("[thread_statics] malformed record {record:?}: {err}");
                panic!("invalid thread-static record: {err}");
            }
        }
    }

    /// [`try_get_thread_static_base`](Self::try_get_thread_static_base) for a
    /// compiled-code record resolved through `metadata`.
    pub fn try_get_for_record<M>(
        &self,
        record: &TypeTlsRecord,
        metadata: &M,
    ) -> Result<ObjectRef, ThreadStaticError>
    where
        M: ModuleMetadata + ?Sized,
    {
        let desc = record.resolve(metadata)?;
        self.try_get_thread_static_base(&desc)
    }

    /// Grows the `(thread, module)` table to `required` slots if needed and
    /// publishes the grown table.
    fn ensure_storage(
        &self,
        thread: ThreadKey,
        module: ModuleIndex,
        existing: Option<SlotTable>,
        required: usize,
    ) -> Result<SlotTable, ThreadStaticError> {
        match table::ensure_len(existing, required)? {
            Growth::Unchanged(table) => Ok(table),
            Growth::Grown {
                table,
                previous_len,
            } => {
                self.registry.set(thread, module, table.clone())?;
                log::debug!(
                    "[thread_statics] grew {module} table on {thread}: {previous_len} -> {} slots",
                    table.len()
                );
                Ok(table)
            }
        }
    }

    fn required_len(&self, desc: &TypeDescriptor) -> Result<usize, InvalidIndexError> {
        let index = desc.index().get();
        let max = self.config.max_type_index();
        if self.config.check_descriptors() && index > max {
            return Err(InvalidIndexError::IndexTooLarge { index, max });
        }

        desc.index()
            .required_len()
            .ok_or(InvalidIndexError::IndexTooLarge { index, max })
    }
}

#[cold]
#[inline(never)]
fn fatal(desc: &TypeDescriptor, err: ThreadStaticError) -> ! {
    log::error!(
        "[thread_statics] cannot provide storage for {} {}: {err}",
        desc.module(),
        desc.index()
    );

    if err.is_out_of_memory() {
        panic!("out of memory: {err}");
    }
    panic!("invalid thread-static descriptor: {err}");
}

/// Failure to provide thread-static storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ThreadStaticError {
    /// The storage block or the grown slot table could not be allocated.
    #[error("allocation failed: {0}")]
    AllocationFailure(#[from] AllocError),

    /// The registry refused to publish a grown slot table.
    #[error("registration failed: {0}")]
    RegistrationFailure(#[from] RegistrationError),

    /// The type descriptor is malformed.
    #[error("invalid descriptor: {0}")]
    InvalidIndex(#[from] InvalidIndexError),
}

impl ThreadStaticError {
    /// Whether the failure belongs to the out-of-memory class.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(
            self,
            Self::AllocationFailure(_) | Self::RegistrationFailure(_)
        )
    }
}
