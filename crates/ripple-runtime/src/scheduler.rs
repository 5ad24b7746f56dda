#![forbid(unsafe_code)]

//! Deferred, batched settle queue.
//!
//! A cell enters the queue when its first mutation of an update cycle
//! snapshots a pending summary, so the queue never holds a cell twice.
//! [`Runtime::flush`](crate::Runtime::flush) drains it in passes:
//!
//! 1. The cells queued when a pass begins are settled in queue order.
//! 2. Cells enqueued while the pass runs (computed recomputation, writes
//!    from callbacks) wait for the following pass.
//! 3. The flush ends when a pass would start empty.
//!
//! # Invariants
//!
//! 1. A cell id appears at most once across the current pass and the next.
//! 2. A cell is queued iff its slot holds a pending summary.
//! 3. Disposing or relocating a cell updates both halves of the queue, and
//!    relocating the cell whose diff is being delivered re-points the
//!    delivery.

use std::collections::VecDeque;

use crate::handle::CellId;

/// Counters of one [`Runtime::flush`](crate::Runtime::flush) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    /// Passes that settled at least one cell.
    pub passes: usize,
    /// Settle actions run, no-ops included.
    pub settled: usize,
    /// Settles short-circuited because the summary did not change.
    pub skipped: usize,
    /// Callbacks invoked.
    pub notified: usize,
    /// Deliveries swallowed by inactive owners.
    pub suppressed: usize,
}

/// Settle queue owned by one runtime.
#[derive(Debug, Default)]
pub(crate) struct Scheduler {
    current: VecDeque<CellId>,
    next: Vec<CellId>,
    flushing: bool,
    /// Cell whose diff is being handed to its observers.
    delivering: Option<CellId>,
    pub(crate) stats: FlushStats,
}

impl Scheduler {
    /// Queue a cell for the next pass.
    ///
    /// Callers enqueue only when they store a pending summary into an empty
    /// slot, which keeps ids unique. `Runtime::verify` reports a duplicate.
    pub(crate) fn enqueue(&mut self, cell: CellId) {
        self.next.push(cell);
    }

    /// Move everything queued so far into the current pass.
    ///
    /// Returns `false` when there is nothing to settle.
    pub(crate) fn begin_pass(&mut self) -> bool {
        debug_assert!(self.current.is_empty());
        self.current.extend(self.next.drain(..));
        !self.current.is_empty()
    }

    pub(crate) fn pop(&mut self) -> Option<CellId> {
        self.current.pop_front()
    }

    pub(crate) fn remove(&mut self, cell: CellId) -> bool {
        let before = self.len();
        self.current.retain(|c| *c != cell);
        self.next.retain(|c| *c != cell);
        before != self.len()
    }

    pub(crate) fn remap(&mut self, old: CellId, new: CellId) {
        for c in self.current.iter_mut().chain(self.next.iter_mut()) {
            if *c == old {
                *c = new;
            }
        }
        if self.delivering == Some(old) {
            self.delivering = Some(new);
        }
    }

    pub(crate) fn begin_delivery(&mut self, cell: CellId) {
        self.delivering = Some(cell);
    }

    /// Where the cell being delivered lives now; `cell` unless it moved.
    pub(crate) fn delivering(&self, cell: CellId) -> CellId {
        self.delivering.unwrap_or(cell)
    }

    pub(crate) fn end_delivery(&mut self) {
        self.delivering = None;
    }

    pub(crate) fn contains(&self, cell: CellId) -> bool {
        self.current.contains(&cell) || self.next.contains(&cell)
    }

    pub(crate) fn queued(&self) -> impl Iterator<Item = CellId> + '_ {
        self.current.iter().chain(self.next.iter()).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.current.len() + self.next.len()
    }

    pub(crate) fn is_flushing(&self) -> bool {
        self.flushing
    }

    pub(crate) fn start_flush(&mut self) {
        self.flushing = true;
        self.stats = FlushStats::default();
    }

    pub(crate) fn finish_flush(&mut self) -> FlushStats {
        self.flushing = false;
        std::mem::take(&mut self.stats)
    }
}
