//! Substitute collaborators for unit tests.

use core::{cell::Cell, cell::RefCell, num::NonZeroUsize};
use std::{collections::HashMap, sync::Mutex, vec, vec::Vec};

use crate::{
    descriptor::ModuleIndex,
    layout::LayoutHandle,
    object::{AllocError, ObjectAllocator, ObjectRef},
    registry::{RegistrationError, StorageRegistry, ThreadKey},
    table::SlotTable,
};

/// Distance between fake object addresses.
const OBJECT_GRANULE: usize = 16;

/// Managed heap stand-in: every object is a zeroed byte buffer.
#[derive(Default)]
pub struct FakeHeap {
    state: Mutex<HeapState>,
}

#[derive(Default)]
struct HeapState {
    objects: Vec<HeapObject>,
    failing: Vec<LayoutHandle>,
}

struct HeapObject {
    layout: LayoutHandle,
    bytes: Vec<u8>,
}

impl FakeHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects allocated so far.
    pub fn allocations(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    /// Makes every later allocation with `layout` fail.
    pub fn fail_for(&self, layout: LayoutHandle) {
        self.state.lock().unwrap().failing.push(layout);
    }

    pub fn layout_of(&self, obj: ObjectRef) -> LayoutHandle {
        self.with_object(obj, |object| object.layout)
    }

    pub fn is_zeroed(&self, obj: ObjectRef) -> bool {
        self.with_object(obj, |object| object.bytes.iter().all(|b| *b == 0))
    }

    pub fn read_u64(&self, obj: ObjectRef, offset: usize) -> u64 {
        self.with_object(obj, |object| {
            let bytes = object.bytes[offset..offset + 8].try_into().unwrap();
            u64::from_ne_bytes(bytes)
        })
    }

    pub fn write_u64(&self, obj: ObjectRef, offset: usize, value: u64) {
        let mut state = self.state.lock().unwrap();
        let object = &mut state.objects[Self::slot(obj)];
        object.bytes[offset..offset + 8].copy_from_slice(&value.to_ne_bytes());
    }

    fn with_object<T>(&self, obj: ObjectRef, f: impl FnOnce(&HeapObject) -> T) -> T {
        let state = self.state.lock().unwrap();
        f(&state.objects[Self::slot(obj)])
    }

    fn slot(obj: ObjectRef) -> usize {
        obj.to_raw().get() / OBJECT_GRANULE - 1
    }
}

impl ObjectAllocator for FakeHeap {
    fn new_object(&self, layout: LayoutHandle) -> Result<ObjectRef, AllocError> {
        let mut state = self.state.lock().unwrap();
        if state.failing.contains(&layout) {
            return Err(AllocError::HeapExhausted {
                size: layout.layout().size(),
            });
        }

        state.objects.push(HeapObject {
            layout,
            bytes: vec![0; layout.layout().size().max(8)],
        });
        let addr = state.objects.len() * OBJECT_GRANULE;
        Ok(ObjectRef::from_raw(NonZeroUsize::new(addr).unwrap()))
    }
}

/// Registry stand-in keyed by `(thread, module)` with a switchable current thread.
pub struct FakeRegistry {
    current: Cell<ThreadKey>,
    tables: RefCell<HashMap<(ThreadKey, ModuleIndex), SlotTable>>,
    publishes: Cell<usize>,
    failing: Cell<bool>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self {
            current: Cell::new(ThreadKey::from_raw(1)),
            tables: RefCell::default(),
            publishes: Cell::new(0),
            failing: Cell::new(false),
        }
    }

    /// Pretends the following calls come from `thread`.
    pub fn switch_to(&self, thread: ThreadKey) {
        self.current.set(thread);
    }

    /// Number of successful publishes.
    pub fn publishes(&self) -> usize {
        self.publishes.get()
    }

    pub fn fail_publishes(&self, fail: bool) {
        self.failing.set(fail);
    }

    pub fn table(&self, thread: ThreadKey, module: ModuleIndex) -> Option<SlotTable> {
        self.tables.borrow().get(&(thread, module)).cloned()
    }

    /// Forgets every table of `thread`, as thread teardown does.
    pub fn release(&self, thread: ThreadKey) {
        self.tables.borrow_mut().retain(|(owner, _), _| *owner != thread);
    }
}

impl StorageRegistry for FakeRegistry {
    fn current_thread(&self) -> ThreadKey {
        self.current.get()
    }

    fn get(&self, thread: ThreadKey, module: ModuleIndex) -> Option<SlotTable> {
        assert_eq!(thread, self.current.get(), "cross-thread registry read");
        self.table(thread, module)
    }

    fn set(
        &self,
        thread: ThreadKey,
        module: ModuleIndex,
        table: SlotTable,
    ) -> Result<(), RegistrationError> {
        if self.failing.get() {
            return Err(RegistrationError::OutOfMemory { module });
        }

        let mut tables = self.tables.borrow_mut();
        if let Some(current) = tables.get(&(thread, module)) {
            assert!(current.len() <= table.len(), "published a shorter table");
        }
        tables.insert((thread, module), table);
        self.publishes.set(self.publishes.get() + 1);
        Ok(())
    }
}
