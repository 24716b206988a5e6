//! Type descriptors for thread-static storage.
//!
//! Compiled code identifies a type's thread-static storage with a record
//! holding the owning module, the type's index inside that module's
//! thread-static index space, and the layout of the storage block. The raw
//! record form ([`TypeTlsRecord`]) carries signed integers and an opaque module
//! token exactly as the code generator emits them; [`TypeDescriptor`] is the
//! validated value type the engine works with.

use core::fmt;

use crate::layout::LayoutHandle;

/// Index of a module in the process-wide module list.
///
/// Stable for the lifetime of the process. Every module owns an independent
/// thread-static index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleIndex(u32);

impl ModuleIndex {
    /// Creates a module index from its raw value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize`, suitable for indexing per-module vectors.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl TryFrom<i32> for ModuleIndex {
    type Error = InvalidIndexError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| InvalidIndexError::NegativeModuleIndex(raw))
    }
}

impl fmt::Display for ModuleIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

/// Index of a type inside its module's thread-static index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeTlsIndex(u32);

impl TypeTlsIndex {
    /// Creates a type-local index from its raw value.
    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw index value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize`, suitable for indexing a slot table.
    #[inline]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Minimum slot-table length able to hold this index (`index + 1`).
    ///
    /// Returns `None` if the length does not fit in a `usize`.
    #[inline]
    pub fn required_len(self) -> Option<usize> {
        self.as_usize().checked_add(1)
    }
}

impl TryFrom<i32> for TypeTlsIndex {
    type Error = InvalidIndexError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        u32::try_from(raw)
            .map(Self)
            .map_err(|_| InvalidIndexError::NegativeTypeIndex(raw))
    }
}

impl fmt::Display for TypeTlsIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tls#{}", self.0)
    }
}

/// Validated descriptor of one type's thread-static storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    module: ModuleIndex,
    index: TypeTlsIndex,
    layout: LayoutHandle,
}

impl TypeDescriptor {
    /// Creates a descriptor from already validated parts.
    pub const fn new(module: ModuleIndex, index: TypeTlsIndex, layout: LayoutHandle) -> Self {
        Self {
            module,
            index,
            layout,
        }
    }

    /// Creates a descriptor from the signed values emitted by compiled code.
    ///
    /// Negative indices are a code-generator bug and are rejected.
    pub fn from_raw(
        module_index: i32,
        type_tls_index: i32,
        layout: LayoutHandle,
    ) -> Result<Self, InvalidIndexError> {
        Ok(Self {
            module: ModuleIndex::try_from(module_index)?,
            index: TypeTlsIndex::try_from(type_tls_index)?,
            layout,
        })
    }

    /// The module owning the type.
    #[inline]
    pub const fn module(&self) -> ModuleIndex {
        self.module
    }

    /// The type's index in the module's thread-static index space.
    #[inline]
    pub const fn index(&self) -> TypeTlsIndex {
        self.index
    }

    /// Layout of the type's storage block.
    #[inline]
    pub const fn layout(&self) -> LayoutHandle {
        self.layout
    }
}

/// Opaque token identifying a module in compiled-code records.
///
/// The code generator emits one token per module; only the
/// [`ModuleMetadata`] accessor knows how to turn it into a [`ModuleIndex`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleSlot(usize);

impl ModuleSlot {
    /// Wraps a raw module token.
    pub const fn from_raw(raw: usize) -> Self {
        Self(raw)
    }

    /// Returns the raw module token.
    pub const fn to_raw(self) -> usize {
        self.0
    }
}

/// Accessor over the module metadata collaborator.
pub trait ModuleMetadata {
    /// Returns the module index recorded for `module`.
    ///
    /// The value is signed because that is how the module data stores it;
    /// negative values are rejected during resolution.
    fn module_index(&self, module: ModuleSlot) -> i32;
}

/// Thread-statics record as emitted into compiled code.
#[derive(Debug, Clone, Copy)]
pub struct TypeTlsRecord {
    /// Module owning the type.
    pub module: ModuleSlot,
    /// Index of the type in the module's thread-static index space.
    pub type_tls_index: i32,
    /// Memory map of the type's thread-static fields.
    pub layout: LayoutHandle,
}

impl TypeTlsRecord {
    /// Resolves the record into a [`TypeDescriptor`] through `metadata`.
    pub fn resolve<M>(&self, metadata: &M) -> Result<TypeDescriptor, InvalidIndexError>
    where
        M: ModuleMetadata + ?Sized,
    {
        TypeDescriptor::from_raw(
            metadata.module_index(self.module),
            self.type_tls_index,
            self.layout,
        )
    }
}

/// Malformed type descriptor.
///
/// Descriptors come from the code generator, so any of these indicates a
/// compiler bug rather than a runtime condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidIndexError {
    /// The module index is negative.
    #[error("negative module index: {0}")]
    NegativeModuleIndex(i32),

    /// The type-local index is negative.
    #[error("negative thread-static type index: {0}")]
    NegativeTypeIndex(i32),

    /// The type-local index is above the configured maximum.
    #[error("thread-static type index {index} exceeds the maximum of {max}")]
    IndexTooLarge { index: u32, max: u32 },
}
