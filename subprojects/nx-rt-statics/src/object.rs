//! Collector-managed objects and the allocator seam.

use core::{fmt, num::NonZeroUsize};

use crate::layout::LayoutHandle;

/// Handle to a collector-managed object.
///
/// The engine never dereferences the handle; it only stores it and hands it
/// back. Handle equality is object identity.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ObjectRef(NonZeroUsize);

impl ObjectRef {
    /// Wraps a raw object address produced by the allocator.
    #[inline]
    pub const fn from_raw(raw: NonZeroUsize) -> Self {
        Self(raw)
    }

    /// Returns the raw object address.
    #[inline]
    pub const fn to_raw(self) -> NonZeroUsize {
        self.0
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.0.get())
    }
}

/// Native object allocator.
///
/// # Contract
///
/// Every object returned by [`new_object`] must be:
/// * zero-initialized over the whole `layout.size()` bytes;
/// * aligned to at least `layout.align()`;
/// * registered with the collector using the layout's reference map, so
///   reference-valued fields are traced and updated on relocation.
///
/// [`new_object`]: ObjectAllocator::new_object
pub trait ObjectAllocator {
    /// Allocates a zeroed, collector-managed object shaped by `layout`.
    fn new_object(&self, layout: LayoutHandle) -> Result<ObjectRef, AllocError>;
}

impl<A: ObjectAllocator + ?Sized> ObjectAllocator for &A {
    #[inline]
    fn new_object(&self, layout: LayoutHandle) -> Result<ObjectRef, AllocError> {
        (**self).new_object(layout)
    }
}

/// Allocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    /// The managed heap could not provide a storage block.
    #[error("managed heap exhausted allocating {size} bytes")]
    HeapExhausted { size: usize },

    /// A slot table of the requested length could not be allocated.
    #[error("slot table of {len} entries could not be allocated")]
    TableExhausted { len: usize },
}
