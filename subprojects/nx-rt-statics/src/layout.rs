//! Storage-block layouts.
//!
//! A [`StorageLayout`] is the memory map of one type's thread-static fields:
//! the block size and alignment plus the offsets of every reference-valued
//! field. The collector uses the reference map to scan and relocate the block
//! exactly as it would any other managed object, so the allocator must shape
//! every block after its layout.
//!
//! Layouts are emitted by the code generator as `static` items. The engine
//! never looks inside them; it only hands the [`LayoutHandle`] to the
//! allocator.
//!
//! ```text
//! offset 0x00  ┌──────────────────────┐
//!              │ i64 counter          │
//! offset 0x08  ├──────────────────────┤
//!              │ ref  cache           │ ← gc_refs[0] = 0x08
//! offset 0x10  ├──────────────────────┤
//!              │ ref  buffer          │ ← gc_refs[1] = 0x10
//! offset 0x18  └──────────────────────┘ size = 0x18
//! ```

use core::{fmt, ptr};

/// Size in bytes of a reference-valued field.
pub const REF_SIZE: usize = size_of::<usize>();

/// Memory map of a type's thread-static storage block.
#[derive(Debug)]
pub struct StorageLayout {
    size: usize,
    align: usize,
    gc_refs: &'static [u32],
}

impl StorageLayout {
    /// Creates a layout.
    ///
    /// `gc_refs` lists the byte offsets of the reference-valued fields in
    /// strictly increasing order.
    ///
    /// # Panics
    ///
    /// Panics (at compile time when used in a `static`) if `align` is not a
    /// power of two, if a reference offset is not pointer-aligned, or if a
    /// reference field does not fit inside `size`.
    pub const fn new(size: usize, align: usize, gc_refs: &'static [u32]) -> Self {
        assert!(align.is_power_of_two(), "layout alignment must be a power of two");

        let mut i = 0;
        while i < gc_refs.len() {
            let offset = gc_refs[i] as usize;
            assert!(offset % REF_SIZE == 0, "reference field is not pointer-aligned");
            assert!(offset + REF_SIZE <= size, "reference field out of bounds");
            if i > 0 {
                assert!(gc_refs[i - 1] < gc_refs[i], "reference offsets must be increasing");
            }
            i += 1;
        }

        Self {
            size,
            align,
            gc_refs,
        }
    }

    /// Size of the storage block in bytes.
    #[inline]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Required alignment of the storage block.
    #[inline]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Byte offsets of the reference-valued fields.
    #[inline]
    pub const fn reference_offsets(&self) -> &'static [u32] {
        self.gc_refs
    }

    /// Whether the collector has anything to scan in blocks of this layout.
    #[inline]
    pub const fn has_references(&self) -> bool {
        !self.gc_refs.is_empty()
    }

    /// Whether `offset` is the start of a reference-valued field.
    pub fn is_reference_at(&self, offset: usize) -> bool {
        u32::try_from(offset)
            .map(|offset| self.gc_refs.binary_search(&offset).is_ok())
            .unwrap_or(false)
    }
}

/// Opaque handle to a [`StorageLayout`].
///
/// Two handles are equal only if they point at the same layout.
#[derive(Clone, Copy)]
pub struct LayoutHandle(&'static StorageLayout);

impl LayoutHandle {
    /// Wraps a layout emitted by the code generator.
    #[inline]
    pub const fn new(layout: &'static StorageLayout) -> Self {
        Self(layout)
    }

    /// The layout this handle refers to.
    #[inline]
    pub const fn layout(self) -> &'static StorageLayout {
        self.0
    }
}

impl PartialEq for LayoutHandle {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.0, other.0)
    }
}

impl Eq for LayoutHandle {}

impl fmt::Debug for LayoutHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LayoutHandle")
            .field("addr", &ptr::from_ref(self.0))
            .field("size", &self.0.size)
            .field("refs", &self.0.gc_refs.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static COUNTER_AND_TWO_REFS: StorageLayout =
        StorageLayout::new(3 * REF_SIZE, REF_SIZE, &[REF_SIZE as u32, 2 * REF_SIZE as u32]);
    static SAME_SHAPE: StorageLayout =
        StorageLayout::new(3 * REF_SIZE, REF_SIZE, &[REF_SIZE as u32, 2 * REF_SIZE as u32]);
    static PLAIN_DATA: StorageLayout = StorageLayout::new(12, 4, &[]);

    #[test]
    fn reference_map_lookup() {
        let layout = &COUNTER_AND_TWO_REFS;
        assert!(layout.has_references());
        assert!(!layout.is_reference_at(0));
        assert!(layout.is_reference_at(REF_SIZE));
        assert!(layout.is_reference_at(2 * REF_SIZE));
        assert!(!layout.is_reference_at(usize::MAX));

        assert!(!PLAIN_DATA.has_references());
        assert_eq!(PLAIN_DATA.size(), 12);
        assert_eq!(PLAIN_DATA.align(), 4);
    }

    #[test]
    fn handles_compare_by_identity() {
        let a = LayoutHandle::new(&COUNTER_AND_TWO_REFS);
        let b = LayoutHandle::new(&SAME_SHAPE);

        assert_eq!(a, LayoutHandle::new(&COUNTER_AND_TWO_REFS));
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "reference field out of bounds")]
    fn reference_past_the_end_is_rejected() {
        let _ = StorageLayout::new(REF_SIZE, REF_SIZE, &[REF_SIZE as u32]);
    }

    #[test]
    #[should_panic(expected = "not pointer-aligned")]
    fn misaligned_reference_is_rejected() {
        let _ = StorageLayout::new(4 * REF_SIZE, REF_SIZE, &[3]);
    }
}
