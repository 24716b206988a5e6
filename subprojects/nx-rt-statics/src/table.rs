//! Per-thread, per-module slot tables.
//!
//! A slot table maps a type-local index to the storage block of that type on
//! one thread. Tables are created lazily, only ever grow, and a slot that
//! holds a block keeps it for the lifetime of the table and of every table
//! grown from it.
//!
//! [`SlotTable`] is a shared handle: the native registry and the engine both
//! hold clones of the same table, and compiled code reads the published table
//! directly. The handle is `!Send`, so a table can never be observed from a
//! thread other than the one it was created on.

use alloc::{boxed::Box, rc::Rc, vec::Vec};
use core::{cell::Cell, fmt};

use crate::{descriptor::TypeTlsIndex, object::AllocError, object::ObjectRef};

/// Shared handle to one thread's slot table for one module.
#[derive(Clone)]
pub struct SlotTable(Rc<Slots>);

struct Slots {
    cells: Box<[Cell<Option<ObjectRef>>]>,
}

impl SlotTable {
    fn from_cells(cells: Box<[Cell<Option<ObjectRef>>]>) -> Self {
        Self(Rc::new(Slots { cells }))
    }

    #[inline]
    fn cells(&self) -> &[Cell<Option<ObjectRef>>] {
        &self.0.cells
    }

    /// Number of slots in the table.
    #[inline]
    pub fn len(&self) -> usize {
        self.cells().len()
    }

    /// Whether the table has no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cells().is_empty()
    }

    /// Returns the block stored for `index`, if the slot exists and is populated.
    #[inline]
    pub fn get(&self, index: TypeTlsIndex) -> Option<ObjectRef> {
        self.cells().get(index.as_usize()).and_then(Cell::get)
    }

    /// Whether both handles refer to the same table.
    #[inline]
    pub fn ptr_eq(&self, other: &SlotTable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Iterates over the populated slots as `(index, block)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (TypeTlsIndex, ObjectRef)> + '_ {
        self.cells()
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| Some((TypeTlsIndex::new(i as u32), cell.get()?)))
    }

    /// Number of populated slots.
    pub fn populated(&self) -> usize {
        self.cells().iter().filter(|cell| cell.get().is_some()).count()
    }

    /// Stores `block` in the empty slot at `index`.
    ///
    /// The slot must exist and be empty. Callers check both before filling;
    /// a violation leaves the table untouched.
    pub(crate) fn fill(&self, index: TypeTlsIndex, block: ObjectRef) {
        let Some(cell) = self.cells().get(index.as_usize()) else {
            debug_assert!(false, "slot {index} outside a table of {} slots", self.len());
            return;
        };

        if cell.get().is_some() {
            debug_assert!(false, "slot {index} is already populated");
            return;
        }

        cell.set(Some(block));
    }
}

impl fmt::Debug for SlotTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotTable")
            .field("len", &self.len())
            .field("populated", &self.populated())
            .finish()
    }
}

/// Outcome of [`ensure_len`].
#[derive(Debug)]
pub enum Growth {
    /// The existing table was already long enough and is returned as is.
    Unchanged(SlotTable),

    /// A new, longer table was built. It has not been published yet.
    Grown {
        table: SlotTable,
        previous_len: usize,
    },
}

impl Growth {
    /// The table to use after the growth step.
    pub fn table(&self) -> &SlotTable {
        match self {
            Growth::Unchanged(table) | Growth::Grown { table, .. } => table,
        }
    }

    /// Consumes the outcome, returning the table.
    pub fn into_table(self) -> SlotTable {
        match self {
            Growth::Unchanged(table) | Growth::Grown { table, .. } => table,
        }
    }
}

/// Makes sure a table can hold `required` slots.
///
/// If `existing` already has at least `required` slots it is returned
/// unchanged, preserving its identity. Otherwise a new table of exactly
/// `required` slots is built with the existing blocks copied into its prefix.
/// The caller is responsible for publishing a grown table.
pub fn ensure_len(existing: Option<SlotTable>, required: usize) -> Result<Growth, AllocError> {
    let previous = match existing {
        Some(table) if table.len() >= required => return Ok(Growth::Unchanged(table)),
        other => other,
    };

    let mut cells = Vec::new();
    cells
        .try_reserve_exact(required)
        .map_err(|_| AllocError::TableExhausted { len: required })?;

    let previous_len = match &previous {
        Some(table) => {
            cells.extend(table.cells().iter().map(|cell| Cell::new(cell.get())));
            table.len()
        }
        None => 0,
    };
    cells.resize_with(required, || Cell::new(None));

    Ok(Growth::Grown {
        table: SlotTable::from_cells(cells.into_boxed_slice()),
        previous_len,
    })
}
