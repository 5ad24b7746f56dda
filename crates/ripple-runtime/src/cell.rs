#![forbid(unsafe_code)]

//! Value cells: creation, reads, writes, disposal and relocation.
//!
//! # Lazy diff tracking
//!
//! The first write of an update cycle snapshots the summary of the current
//! value and enqueues the cell. Later writes of the same cycle only replace
//! the value, so any number of writes settle into a single diff from the
//! pre-cycle value to the final one.
//!
//! # Invariants
//!
//! 1. Only standalone cells accept `set`/`get_mut`/`make_mut`; computed cells are
//!    written by their own recomputation.
//! 2. Disposing a cell resets every observer edge pointing at it.
//! 3. Relocating a cell re-points every edge, queue entry and owner link.

use std::any::type_name;
use std::rc::Rc;

use ripple_diff::Difference;
use smallvec::SmallVec;

use crate::error::{InvariantViolation, fail};
use crate::handle::{Cell, CellId, OwnerId};
use crate::runtime::{CellSlot, Runtime, downcast_value_mut, settle};

impl Runtime {
    /// Create a standalone cell holding `value`.
    pub fn cell<T: Difference>(&mut self, value: T) -> Cell<T> {
        Cell::from_id(self.insert_cell(value, None))
    }

    pub(crate) fn insert_cell<T: Difference>(
        &mut self,
        value: T,
        computed_by: Option<OwnerId>,
    ) -> CellId {
        self.cells.insert(CellSlot {
            value: Box::new(Rc::new(value)),
            pending: None,
            observers: SmallVec::new(),
            settle: settle::<T>,
            computed_by,
            owned_by: None,
            type_name: type_name::<T>(),
        })
    }

    /// Read the current value without subscribing.
    ///
    /// Writes of the ongoing cycle are visible immediately.
    #[must_use]
    pub fn get_once<T: 'static>(&self, cell: Cell<T>) -> &T {
        self.value_rc(cell.id())
    }

    /// Replace the value of a standalone cell.
    pub fn set<T: Difference>(&mut self, cell: Cell<T>, value: T) {
        self.ensure_writable(cell.id());
        self.write(cell.id(), value);
    }

    /// Mutable access to the value of a standalone cell.
    ///
    /// Begins a pending cycle like [`set`](Self::set). The value type needs
    /// no `Clone`: the cell must hold the only reference to it. A diff kept
    /// alive past its callback (or the cell's own delivery still running)
    /// shares the value, which fails fast; use [`make_mut`](Self::make_mut)
    /// there.
    pub fn get_mut<T: Difference>(&mut self, cell: Cell<T>) -> &mut T {
        let id = cell.id();
        let value = self.pending_value::<T>(id);
        match Rc::get_mut(value) {
            Some(value) => value,
            None => fail(InvariantViolation::SharedValue { cell: id }),
        }
    }

    /// Like [`get_mut`](Self::get_mut), but clones the value first if a
    /// diff still shares it.
    pub fn make_mut<T: Difference + Clone>(&mut self, cell: Cell<T>) -> &mut T {
        let id = cell.id();
        Rc::make_mut(self.pending_value::<T>(id))
    }

    fn pending_value<T: Difference>(&mut self, cell: CellId) -> &mut Rc<T> {
        self.ensure_writable(cell);
        self.begin_pending::<T>(cell);
        let slot = self.cell_slot_mut(cell);
        let found = slot.type_name;
        downcast_value_mut::<T>(&mut *slot.value, found)
    }

    /// Whether the cell has a write that has not settled yet.
    #[must_use]
    pub fn is_pending<T>(&self, cell: Cell<T>) -> bool {
        self.cell_slot(cell.id()).pending.is_some()
    }

    /// Whether the handle still refers to a live cell.
    #[must_use]
    pub fn contains<T>(&self, cell: Cell<T>) -> bool {
        self.cells.contains_key(cell.id())
    }

    /// Number of observer edges registered on the cell.
    #[must_use]
    pub fn observer_count<T>(&self, cell: Cell<T>) -> usize {
        self.cell_slot(cell.id()).observers.len()
    }

    /// Destroy a cell.
    ///
    /// Every observer bound to it is reset to "no source", its pending
    /// diff (if any) is dropped, and a computed cell releases its sources.
    /// Cells owned by an observer edge die with that edge instead.
    pub fn dispose<T>(&mut self, cell: Cell<T>) {
        let id = cell.id();
        if let Some(observer) = self.cell_slot(id).owned_by {
            fail(InvariantViolation::DisposeOwnedCell { cell: id, observer });
        }
        self.dispose_id(id);
    }

    pub(crate) fn dispose_id(&mut self, cell: CellId) {
        let Some(slot) = self.cells.remove(cell) else {
            fail(InvariantViolation::StaleCell { cell });
        };
        for observer in slot.observers {
            let obs = self.observer_slot_mut(observer);
            if !obs.edge.as_ref().is_some_and(|e| e.targets(cell)) {
                fail(InvariantViolation::DanglingEdge { cell, observer });
            }
            obs.edge = None;
        }
        if slot.pending.is_some() && !self.scheduler.remove(cell) {
            fail(InvariantViolation::PendingWithoutQueue { cell });
        }
        if let Some(owner) = slot.computed_by {
            self.drop_owner(owner);
        }
        tracing::trace!(cell = ?cell, ty = slot.type_name, "cell.dispose");
    }

    /// Move a cell to a fresh slot, re-pointing everything that refers to it.
    ///
    /// The old handle becomes stale. Observers, queued settles, a delivery
    /// in progress and the link to a computed cell's owner follow the cell, so no subscriber is left
    /// pointing at the old slot.
    pub fn relocate<T>(&mut self, cell: Cell<T>) -> Cell<T> {
        let old = cell.id();
        let Some(slot) = self.cells.remove(old) else {
            fail(InvariantViolation::StaleCell { cell: old });
        };
        let computed_by = slot.computed_by;
        let observers = slot.observers.clone();
        let new = self.cells.insert(slot);

        for &observer in &observers {
            let remapped = self
                .observer_slot_mut(observer)
                .edge
                .as_mut()
                .is_some_and(|edge| edge.remap(old, new));
            if !remapped {
                fail(InvariantViolation::DanglingEdge { cell: old, observer });
            }
        }
        self.scheduler.remap(old, new);
        if let Some(owner) = computed_by {
            self.owner_slot_mut(owner).computed = Some(new);
        }
        tracing::debug!(
            old = ?old,
            new = ?new,
            edges = observers.len(),
            "cell.relocate"
        );
        Cell::from_id(new)
    }

    fn ensure_writable(&self, cell: CellId) {
        if self.cell_slot(cell).computed_by.is_some() {
            fail(InvariantViolation::WriteToComputed { cell });
        }
    }
}
