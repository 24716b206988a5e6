//! Thread-local native registry for hosted targets.
//!
//! Each thread keeps its published tables in a `thread_local!` vector indexed
//! by module. The vector lives and dies with the thread, so tables (and with
//! them the last references to the thread's storage blocks) are released at
//! thread teardown without any help from the engine.
//!
//! Thread keys are handed out lazily from a process-wide counter the first
//! time a thread touches the registry. Key `0` is never handed out; it is
//! reported for a thread whose thread-local state has already been destroyed.

use core::{
    cell::RefCell,
    mem,
    sync::atomic::{AtomicU64, Ordering},
};
use std::{thread_local, vec::Vec};

use super::{RegistrationError, StorageRegistry, ThreadKey};
use crate::{
    descriptor::{ModuleIndex, TypeTlsIndex},
    object::ObjectRef,
    table::SlotTable,
};

/// Key reported for a thread whose registry state is gone.
const EXITED_THREAD: ThreadKey = ThreadKey::from_raw(0);

static NEXT_THREAD_KEY: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_TABLES: RefCell<ThreadTables> = RefCell::new(ThreadTables::new());
}

struct ThreadTables {
    key: ThreadKey,
    modules: Vec<Option<SlotTable>>,
}

impl ThreadTables {
    fn new() -> Self {
        Self {
            key: ThreadKey::from_raw(NEXT_THREAD_KEY.fetch_add(1, Ordering::Relaxed)),
            modules: Vec::new(),
        }
    }

    fn publish(&mut self, module: ModuleIndex, table: SlotTable) -> Result<(), RegistrationError> {
        let slot = module.as_usize();
        if slot >= self.modules.len() {
            let additional = slot + 1 - self.modules.len();
            self.modules
                .try_reserve(additional)
                .map_err(|_| RegistrationError::OutOfMemory { module })?;
            self.modules.resize_with(slot + 1, || None);
        }

        let entry = &mut self.modules[slot];
        if let Some(current) = entry.as_ref() {
            if current.len() > table.len() {
                return Err(RegistrationError::Shrink {
                    module,
                    current: current.len(),
                    proposed: table.len(),
                });
            }
        }

        *entry = Some(table);
        Ok(())
    }
}

/// Native registry storing every thread's tables in its own thread-local state.
///
/// Only the calling thread's tables are reachable: [`get`] for another
/// thread's key returns `None` and [`set`] fails with
/// [`RegistrationError::ForeignThread`].
///
/// [`get`]: StorageRegistry::get
/// [`set`]: StorageRegistry::set
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadLocalRegistry;

impl ThreadLocalRegistry {
    /// Creates a handle to the registry.
    pub const fn new() -> Self {
        Self
    }

    /// Number of modules with a table published on the calling thread.
    pub fn module_count(&self) -> usize {
        THREAD_TABLES
            .try_with(|tables| tables.borrow().modules.iter().flatten().count())
            .unwrap_or(0)
    }

    /// Calls `f` for every storage block published on the calling thread.
    ///
    /// This is the root set the collector has to trace for the thread. The
    /// tables are snapshotted first, so `f` may itself use the registry.
    pub fn for_each_root<F>(&self, mut f: F)
    where
        F: FnMut(ModuleIndex, TypeTlsIndex, ObjectRef),
    {
        let Ok(snapshot) = THREAD_TABLES.try_with(|tables| tables.borrow().modules.clone()) else {
            return;
        };

        for (module, table) in snapshot.iter().enumerate() {
            let Some(table) = table else {
                continue;
            };
            for (index, block) in table.iter() {
                f(ModuleIndex::new(module as u32), index, block);
            }
        }
    }

    /// Drops every table published on the calling thread.
    ///
    /// Called by thread teardown before the thread's managed state is
    /// abandoned. Returns the number of tables released. The blocks
    /// themselves are reclaimed by the collector once unreachable.
    pub fn release_current_thread(&self) -> usize {
        let released = THREAD_TABLES
            .try_with(|tables| mem::take(&mut tables.borrow_mut().modules))
            .unwrap_or_default();

        let count = released.iter().flatten().count();
        log::debug!("[thread_statics] released {count} module tables");
        count
    }
}

impl StorageRegistry for ThreadLocalRegistry {
    fn current_thread(&self) -> ThreadKey {
        THREAD_TABLES
            .try_with(|tables| tables.borrow().key)
            .unwrap_or(EXITED_THREAD)
    }

    fn get(&self, thread: ThreadKey, module: ModuleIndex) -> Option<SlotTable> {
        THREAD_TABLES
            .try_with(|tables| {
                let tables = tables.borrow();
                if tables.key != thread {
                    return None;
                }
                tables.modules.get(module.as_usize()).cloned().flatten()
            })
            .ok()
            .flatten()
    }

    fn set(
        &self,
        thread: ThreadKey,
        module: ModuleIndex,
        table: SlotTable,
    ) -> Result<(), RegistrationError> {
        let result = THREAD_TABLES
            .try_with(|tables| {
                let mut tables = tables.borrow_mut();
                if tables.key != thread {
                    return Err(RegistrationError::ForeignThread { thread });
                }
                tables.publish(module, table)
            })
            .unwrap_or(Err(RegistrationError::ThreadExiting));

        if let Err(err) = &result {
            log::warn!("[thread_statics] registration rejected for {thread}: {err}");
        }
        result
    }
}
