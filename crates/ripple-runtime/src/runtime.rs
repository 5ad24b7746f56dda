#![forbid(unsafe_code)]

//! The arena holding the reactive graph, and its flush loop.
//!
//! A [`Runtime`] owns three generation-checked arenas (cells, observers,
//! owners) and the settle queue. Edges are keys, never pointers: moving a
//! node is a key remap and a stale key is detected on use.
//!
//! # Invariants
//!
//! 1. An observer whose edge targets cell `c` appears exactly once in
//!    `c`'s observer list, and every entry of that list targets `c`.
//! 2. A cell holds a pending summary iff it is queued.
//! 3. A computed cell and its owner point at each other.
//! 4. An owned cell is owned by exactly the observer whose edge is
//!    `Owned(cell)`.
//!
//! [`Runtime::verify`] audits all of them.
//!
//! # Failure Modes
//!
//! - **Contract violation**: logged as `invariant.violation` and turned into
//!   a panic. The graph is not repaired.
//! - **Panicking callback**: unwinds out of `flush` with the runtime still
//!   marked as flushing; the runtime should be dropped.

use std::any::{Any, type_name};
use std::fmt;
use std::rc::Rc;

use ripple_diff::{Difference, Summarize};
use slotmap::SlotMap;
use smallvec::SmallVec;

use crate::config::RuntimeConfig;
use crate::error::{InvariantViolation, fail};
use crate::handle::{CellId, ObserverId, OwnerId};
use crate::scheduler::{FlushStats, Scheduler};
use crate::source::{Edge, EdgeKind};

/// Monomorphized settle action of a cell.
pub(crate) type SettleFn = fn(&mut Runtime, CellId);

/// Observer callback of value type `T`.
pub(crate) type Callback<T> = Box<dyn FnMut(&mut Runtime, &<T as Difference>::Diff)>;

pub(crate) struct CellSlot {
    /// `Rc<T>` behind `dyn Any`.
    pub(crate) value: Box<dyn Any>,
    /// `T::Summary` of the value before the first write of this cycle.
    pub(crate) pending: Option<Box<dyn Any>>,
    pub(crate) observers: SmallVec<[ObserverId; 4]>,
    pub(crate) settle: SettleFn,
    /// Owner whose source edges recompute this cell.
    pub(crate) computed_by: Option<OwnerId>,
    /// Observer whose `Owned` edge keeps this cell alive.
    pub(crate) owned_by: Option<ObserverId>,
    pub(crate) type_name: &'static str,
}

pub(crate) struct ObserverSlot {
    pub(crate) owner: OwnerId,
    pub(crate) edge: Option<Edge>,
    /// `Callback<T>` behind `dyn Any`; taken out while it runs.
    pub(crate) callback: Option<Box<dyn Any>>,
    pub(crate) type_name: &'static str,
}

pub(crate) struct OwnerSlot {
    pub(crate) active: bool,
    pub(crate) observers: Vec<ObserverId>,
    pub(crate) computed: Option<CellId>,
}

/// A reactive graph: cells, observers, owners and the settle queue.
///
/// Single-threaded. Callbacks receive `&mut Runtime` and may read and write
/// cells or rewire observers; anything they enqueue settles in a later pass
/// of the same flush.
pub struct Runtime {
    pub(crate) cells: SlotMap<CellId, CellSlot>,
    pub(crate) observers: SlotMap<ObserverId, ObserverSlot>,
    pub(crate) owners: SlotMap<OwnerId, OwnerSlot>,
    pub(crate) scheduler: Scheduler,
    config: RuntimeConfig,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("cells", &self.cells.len())
            .field("observers", &self.observers.len())
            .field("owners", &self.owners.len())
            .field("pending", &self.scheduler.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Runtime {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RuntimeConfig::default())
    }

    #[must_use]
    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            cells: SlotMap::with_key(),
            observers: SlotMap::with_key(),
            owners: SlotMap::with_key(),
            scheduler: Scheduler::default(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Number of cells waiting to settle.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.scheduler.len()
    }

    // ── Flush ───────────────────────────────────────────────────────────

    /// Settle every pending cell, delivering diffs to their observers.
    ///
    /// Runs passes until one starts empty, so changes cascading through
    /// computed cells are delivered by the same call. Calling `flush` from
    /// inside a callback is a no-op: the outer flush picks the work up.
    pub fn flush(&mut self) -> FlushStats {
        if self.scheduler.is_flushing() {
            tracing::warn!(pending = self.scheduler.len(), "flush.reentrant");
            return FlushStats::default();
        }

        let span = tracing::debug_span!(
            "ripple.flush",
            passes = tracing::field::Empty,
            settled = tracing::field::Empty,
            skipped = tracing::field::Empty,
            notified = tracing::field::Empty,
            suppressed = tracing::field::Empty,
        );
        let _guard = span.enter();

        self.scheduler.start_flush();
        while self.scheduler.begin_pass() {
            self.scheduler.stats.passes += 1;
            if let Some(limit) = self.config.pass_limit
                && self.scheduler.stats.passes > limit
            {
                fail(InvariantViolation::RunawayPropagation { limit });
            }
            while let Some(cell) = self.scheduler.pop() {
                let Some(slot) = self.cells.get(cell) else {
                    fail(InvariantViolation::StaleCell { cell });
                };
                let settle = slot.settle;
                self.scheduler.stats.settled += 1;
                settle(self, cell);
            }
        }
        let stats = self.scheduler.finish_flush();

        span.record("passes", stats.passes);
        span.record("settled", stats.settled);
        span.record("skipped", stats.skipped);
        span.record("notified", stats.notified);
        span.record("suppressed", stats.suppressed);

        if self.config.verify_after_flush
            && let Err(violation) = self.verify()
        {
            fail(violation);
        }
        stats
    }

    // ── Audit ───────────────────────────────────────────────────────────

    /// Check every graph invariant, reporting the first violation found.
    pub fn verify(&self) -> Result<(), InvariantViolation> {
        let mut pending = 0;
        for (cell, slot) in &self.cells {
            for &observer in &slot.observers {
                let Some(obs) = self.observers.get(observer) else {
                    return Err(InvariantViolation::DanglingEdge { cell, observer });
                };
                if !obs.edge.as_ref().is_some_and(|e| e.targets(cell)) {
                    return Err(InvariantViolation::DanglingEdge { cell, observer });
                }
                let found = slot.observers.iter().filter(|o| **o == observer).count();
                if found != 1 {
                    return Err(InvariantViolation::EdgeCount {
                        cell,
                        observer,
                        found,
                        expected: 1,
                    });
                }
            }
            match (slot.pending.is_some(), self.scheduler.contains(cell)) {
                (true, false) => return Err(InvariantViolation::PendingWithoutQueue { cell }),
                (false, true) => return Err(InvariantViolation::QueueWithoutPending { cell }),
                (true, true) => pending += 1,
                (false, false) => {}
            }
            if let Some(owner) = slot.computed_by {
                let Some(o) = self.owners.get(owner) else {
                    return Err(InvariantViolation::StaleOwner { owner });
                };
                if o.computed != Some(cell) {
                    return Err(InvariantViolation::StaleOwner { owner });
                }
            }
            if let Some(observer) = slot.owned_by {
                let owns = self
                    .observers
                    .get(observer)
                    .is_some_and(|o| matches!(o.edge, Some(Edge::Owned(c)) if c == cell));
                if !owns {
                    return Err(InvariantViolation::DanglingEdge { cell, observer });
                }
            }
        }

        for (observer, obs) in &self.observers {
            let Some(owner) = self.owners.get(obs.owner) else {
                return Err(InvariantViolation::StaleOwner { owner: obs.owner });
            };
            if !owner.observers.contains(&observer) {
                return Err(InvariantViolation::UnlistedObserver {
                    owner: obs.owner,
                    observer,
                });
            }
            let Some(edge) = &obs.edge else {
                continue;
            };
            let Some(cell) = edge.cell() else {
                continue;
            };
            let Some(slot) = self.cells.get(cell) else {
                return Err(InvariantViolation::DanglingEdge { cell, observer });
            };
            let found = slot.observers.iter().filter(|o| **o == observer).count();
            if found != 1 {
                return Err(InvariantViolation::EdgeCount {
                    cell,
                    observer,
                    found,
                    expected: 1,
                });
            }
            if edge.kind() == EdgeKind::Owned && slot.owned_by != Some(observer) {
                return Err(InvariantViolation::DanglingEdge { cell, observer });
            }
        }

        for (owner, slot) in &self.owners {
            for &observer in &slot.observers {
                if self.observers.get(observer).is_none_or(|o| o.owner != owner) {
                    return Err(InvariantViolation::UnlistedObserver { owner, observer });
                }
            }
            if let Some(cell) = slot.computed
                && self.cells.get(cell).is_none_or(|c| c.computed_by != Some(owner))
            {
                return Err(InvariantViolation::StaleCell { cell });
            }
        }

        for cell in self.scheduler.queued() {
            if !self.cells.contains_key(cell) {
                return Err(InvariantViolation::StaleCell { cell });
            }
        }
        let queued = self.scheduler.len();
        if queued != pending {
            return Err(InvariantViolation::QueuedTwice { queued, pending });
        }
        Ok(())
    }

    // ── Typed slot access ───────────────────────────────────────────────

    pub(crate) fn cell_slot(&self, cell: CellId) -> &CellSlot {
        self.cells
            .get(cell)
            .unwrap_or_else(|| fail(InvariantViolation::StaleCell { cell }))
    }

    pub(crate) fn cell_slot_mut(&mut self, cell: CellId) -> &mut CellSlot {
        self.cells
            .get_mut(cell)
            .unwrap_or_else(|| fail(InvariantViolation::StaleCell { cell }))
    }

    pub(crate) fn observer_slot(&self, observer: ObserverId) -> &ObserverSlot {
        self.observers
            .get(observer)
            .unwrap_or_else(|| fail(InvariantViolation::StaleObserver { observer }))
    }

    pub(crate) fn observer_slot_mut(&mut self, observer: ObserverId) -> &mut ObserverSlot {
        self.observers
            .get_mut(observer)
            .unwrap_or_else(|| fail(InvariantViolation::StaleObserver { observer }))
    }

    pub(crate) fn owner_slot(&self, owner: OwnerId) -> &OwnerSlot {
        self.owners
            .get(owner)
            .unwrap_or_else(|| fail(InvariantViolation::StaleOwner { owner }))
    }

    pub(crate) fn owner_slot_mut(&mut self, owner: OwnerId) -> &mut OwnerSlot {
        self.owners
            .get_mut(owner)
            .unwrap_or_else(|| fail(InvariantViolation::StaleOwner { owner }))
    }

    /// Shared handle on the current value of a cell.
    pub(crate) fn value_rc<T: 'static>(&self, cell: CellId) -> &Rc<T> {
        let slot = self.cell_slot(cell);
        downcast_value(&*slot.value, slot.type_name)
    }

    /// Shared handle on the value an edge currently exposes.
    pub(crate) fn edge_value<T: 'static>(&self, edge: &Edge) -> Rc<T> {
        match edge {
            Edge::Target(cell) | Edge::Owned(cell) => Rc::clone(self.value_rc(*cell)),
            Edge::Fixed(value) => Rc::clone(downcast_value(&**value, "fixed value")),
        }
    }

    /// Summary of what an observer bound to `edge` has last been told.
    ///
    /// A cell with an undelivered change still reads as its pending summary.
    pub(crate) fn edge_summary<T: Difference>(&self, edge: &Edge) -> T::Summary {
        match edge {
            Edge::Target(cell) | Edge::Owned(cell) => {
                let slot = self.cell_slot(*cell);
                match &slot.pending {
                    Some(pending) => pending
                        .downcast_ref::<T::Summary>()
                        .unwrap_or_else(|| {
                            fail(InvariantViolation::TypeMismatch {
                                expected: type_name::<T::Summary>(),
                                found: slot.type_name,
                            })
                        })
                        .clone(),
                    None => downcast_value::<T>(&*slot.value, slot.type_name).summarize(),
                }
            }
            Edge::Fixed(_) => self.edge_value::<T>(edge).summarize(),
        }
    }

    // ── Pending cycle ───────────────────────────────────────────────────

    /// Snapshot the pre-write summary and enqueue, once per cycle.
    pub(crate) fn begin_pending<T: Difference>(&mut self, cell: CellId) {
        let slot = self
            .cells
            .get_mut(cell)
            .unwrap_or_else(|| fail(InvariantViolation::StaleCell { cell }));
        if slot.pending.is_some() {
            return;
        }
        let summary = downcast_value::<T>(&*slot.value, slot.type_name).summarize();
        slot.pending = Some(Box::new(summary));
        self.scheduler.enqueue(cell);
        tracing::trace!(cell = ?cell, ty = slot.type_name, "cell.enqueue");
    }

    /// Replace the value of a cell inside a pending cycle.
    pub(crate) fn write<T: Difference>(&mut self, cell: CellId, value: T) {
        self.begin_pending::<T>(cell);
        let slot = self.cell_slot_mut(cell);
        let found = slot.type_name;
        *downcast_value_mut::<T>(&mut *slot.value, found) = Rc::new(value);
    }
}

/// Settle action of a cell holding a `T`.
pub(crate) fn settle<T: Difference>(rt: &mut Runtime, cell: CellId) {
    let slot = rt.cell_slot_mut(cell);
    let found = slot.type_name;
    let Some(pending) = slot.pending.take() else {
        fail(InvariantViolation::QueueWithoutPending { cell });
    };
    let old = *pending.downcast::<T::Summary>().unwrap_or_else(|_| {
        fail(InvariantViolation::TypeMismatch {
            expected: type_name::<T::Summary>(),
            found,
        })
    });
    let current = Rc::clone(downcast_value::<T>(&*slot.value, found));
    if old == current.summarize() {
        rt.scheduler.stats.skipped += 1;
        tracing::trace!(cell = ?cell, "cell.settle.noop");
        return;
    }
    let diff = T::diff(old, &current);
    rt.deliver::<T>(cell, &diff);
}

pub(crate) fn downcast_value<'a, T: 'static>(value: &'a dyn Any, found: &'static str) -> &'a Rc<T> {
    value.downcast_ref::<Rc<T>>().unwrap_or_else(|| {
        fail(InvariantViolation::TypeMismatch {
            expected: type_name::<T>(),
            found,
        })
    })
}

pub(crate) fn downcast_value_mut<'a, T: 'static>(
    value: &'a mut dyn Any,
    found: &'static str,
) -> &'a mut Rc<T> {
    value.downcast_mut::<Rc<T>>().unwrap_or_else(|| {
        fail(InvariantViolation::TypeMismatch {
            expected: type_name::<T>(),
            found,
        })
    })
}
