#![forbid(unsafe_code)]

//! Owners, observer edges and diff delivery.
//!
//! An [`Observer`] is a typed callback plus at most one edge to a
//! [`Source`]. Observers are grouped under an [`Owner`], whose active flag
//! gates delivery for all of them.
//!
//! # Attach, rebind, detach
//!
//! - Binding an observer with no edge delivers `diff_first` of the source.
//! - Binding an observer that already has an edge delivers a single diff
//!   from what it last saw to the new source's value. Rebinding never
//!   produces a teardown/attach pair of notifications.
//! - Detaching clears the edge; the next bind starts from `diff_first`.
//!
//! # Invariants
//!
//! 1. Registering, removing or remapping an edge finds exactly the expected
//!    number of back-references, or fails fast.
//! 2. An inactive owner keeps its edges; it only suppresses delivery.
//! 3. Observers of one cell are notified in registration order.
//!
//! # Failure Modes
//!
//! - **Bind to a pending cell**: the baseline and the cell's own settle diff
//!   would describe the same change twice, so it is rejected.
//! - **Re-entrant delivery**: a callback that causes a delivery to its own
//!   observer (for example by rebinding itself) is rejected.

use std::any::{Any, type_name};
use std::rc::Rc;

use ripple_diff::Difference;
use smallvec::SmallVec;

use crate::error::{InvariantViolation, fail};
use crate::handle::{CellId, Observer, ObserverId, Owner, OwnerId};
use crate::runtime::{Callback, ObserverSlot, OwnerSlot, Runtime, downcast_value};
use crate::source::{Edge, EdgeKind, Source, SourceLike};

impl Runtime {
    // ── Owners ──────────────────────────────────────────────────────────

    /// Create an active owner with no observers.
    pub fn owner(&mut self) -> Owner {
        Owner::from_id(self.owners.insert(OwnerSlot {
            active: true,
            observers: Vec::new(),
            computed: None,
        }))
    }

    /// Gate delivery to every observer of `owner`.
    pub fn set_active(&mut self, owner: Owner, active: bool) {
        self.owner_slot_mut(owner.id()).active = active;
    }

    #[must_use]
    pub fn is_active(&self, owner: Owner) -> bool {
        self.owner_slot(owner.id()).active
    }

    /// Remove an owner, releasing every observer it holds.
    pub fn remove_owner(&mut self, owner: Owner) {
        let id = owner.id();
        if self.owner_slot(id).computed.is_some() {
            fail(InvariantViolation::RemoveComputedOwner { owner: id });
        }
        self.drop_owner(id);
    }

    pub(crate) fn drop_owner(&mut self, owner: OwnerId) {
        let Some(slot) = self.owners.remove(owner) else {
            fail(InvariantViolation::StaleOwner { owner });
        };
        for observer in slot.observers {
            self.release_edge(observer);
            self.observers.remove(observer);
        }
    }

    // ── Observers ───────────────────────────────────────────────────────

    /// Create an unbound observer under `owner`.
    pub fn observer<T, F>(&mut self, owner: Owner, callback: F) -> Observer<T>
    where
        T: Difference,
        F: FnMut(&mut Runtime, &T::Diff) + 'static,
    {
        Observer::from_id(self.insert_observer::<T>(owner.id(), Box::new(callback)))
    }

    /// Create an observer under `owner` and bind it to `source`.
    ///
    /// The callback runs immediately with `diff_first` of the source.
    pub fn observe<S, F>(&mut self, owner: Owner, source: S, callback: F) -> Observer<S::Value>
    where
        S: SourceLike,
        S::Value: Difference,
        F: FnMut(&mut Runtime, &<S::Value as Difference>::Diff) + 'static,
    {
        let observer = self.observer::<S::Value, F>(owner, callback);
        self.assign(observer, source);
        observer
    }

    pub(crate) fn insert_observer<T: Difference>(
        &mut self,
        owner: OwnerId,
        callback: Callback<T>,
    ) -> ObserverId {
        // Fail before inserting so a stale owner leaves no orphan slot.
        self.owner_slot(owner);
        let id = self.observers.insert(ObserverSlot {
            owner,
            edge: None,
            callback: Some(Box::new(callback)),
            type_name: type_name::<T>(),
        });
        self.owner_slot_mut(owner).observers.push(id);
        id
    }

    /// Bind (or rebind) an observer to `source` and deliver the diff.
    ///
    /// Without a previous edge the callback receives `diff_first`.
    /// Otherwise it receives the diff from the summary of what it last saw
    /// to the new value. A previously owned cell is disposed.
    pub fn assign<T, S>(&mut self, observer: Observer<T>, source: S)
    where
        T: Difference,
        S: SourceLike<Value = T>,
    {
        let id = observer.id();
        let (edge, value) = self.resolve_source(source.into_source());
        if let Some(cell) = edge.cell()
            && self.cell_slot(cell).pending.is_some()
        {
            fail(InvariantViolation::AttachToPendingCell { cell, observer: id });
        }

        let diff = match &self.observer_slot(id).edge {
            None => T::diff_first(&value),
            Some(previous) => T::diff(self.edge_summary::<T>(previous), &value),
        };
        self.release_edge(id);
        self.register_edge(id, edge);
        self.invoke::<T>(id, &diff);
    }

    /// Clear the observer's edge without notifying it.
    pub fn detach<T>(&mut self, observer: Observer<T>) {
        let id = observer.id();
        if self.observer_slot(id).edge.is_none() {
            fail(InvariantViolation::DetachWithoutSource { observer: id });
        }
        self.release_edge(id);
    }

    /// Detach (if bound) and destroy an observer.
    pub fn remove_observer<T>(&mut self, observer: Observer<T>) {
        let id = observer.id();
        let owner = self.observer_slot(id).owner;
        self.release_edge(id);
        self.observers.remove(id);
        let list = &mut self.owner_slot_mut(owner).observers;
        let before = list.len();
        list.retain(|o| *o != id);
        if before - list.len() != 1 {
            fail(InvariantViolation::UnlistedObserver { owner, observer: id });
        }
    }

    /// Which form the observer's edge has, or `None` when unbound.
    #[must_use]
    pub fn source_of<T>(&self, observer: Observer<T>) -> Option<EdgeKind> {
        self.observer_slot(observer.id()).edge.as_ref().map(Edge::kind)
    }

    /// The value the observer's source currently holds.
    #[must_use]
    pub fn read_source<T: 'static>(&self, observer: Observer<T>) -> Option<&T> {
        let edge = self.observer_slot(observer.id()).edge.as_ref()?;
        Some(match edge {
            Edge::Target(cell) | Edge::Owned(cell) => &**self.value_rc::<T>(*cell),
            Edge::Fixed(value) => &**downcast_value::<T>(&**value, "fixed value"),
        })
    }

    #[must_use]
    pub fn contains_observer<T>(&self, observer: Observer<T>) -> bool {
        self.observers.contains_key(observer.id())
    }

    // ── Edge bookkeeping ────────────────────────────────────────────────

    /// Turn a source into an edge and the value it exposes.
    pub(crate) fn resolve_source<T: 'static>(&self, source: Source<T>) -> (Edge, Rc<T>) {
        match source {
            Source::Target(cell) => (Edge::Target(cell.id()), Rc::clone(self.value_rc(cell.id()))),
            Source::Owned(cell) => (Edge::Owned(cell.id()), Rc::clone(self.value_rc(cell.id()))),
            Source::Fixed(value) => {
                let value = Rc::new(value);
                (Edge::fixed(Rc::clone(&value)), value)
            }
        }
    }

    /// Store `edge` on an unbound observer and register its back-reference.
    pub(crate) fn register_edge(&mut self, observer: ObserverId, edge: Edge) {
        if let Some(cell) = edge.cell() {
            let slot = self.cell_slot_mut(cell);
            let found = slot.observers.iter().filter(|o| **o == observer).count();
            if found != 0 {
                fail(InvariantViolation::EdgeCount {
                    cell,
                    observer,
                    found,
                    expected: 0,
                });
            }
            if edge.kind() == EdgeKind::Owned {
                if let Some(owner) = slot.owned_by {
                    fail(InvariantViolation::AlreadyOwned {
                        cell,
                        observer: owner,
                    });
                }
                slot.owned_by = Some(observer);
            }
            slot.observers.push(observer);
        }
        let obs = self.observer_slot_mut(observer);
        debug_assert!(obs.edge.is_none(), "register over a live edge");
        obs.edge = Some(edge);
    }

    /// Clear the observer's edge, unregistering it from its cell and
    /// disposing the cell if the edge owned it.
    pub(crate) fn release_edge(&mut self, observer: ObserverId) {
        let Some(edge) = self.observer_slot_mut(observer).edge.take() else {
            return;
        };
        let Some(cell) = edge.cell() else {
            return;
        };
        let slot = self.cell_slot_mut(cell);
        let found = slot.observers.iter().filter(|o| **o == observer).count();
        if found != 1 {
            fail(InvariantViolation::EdgeCount {
                cell,
                observer,
                found,
                expected: 1,
            });
        }
        slot.observers.retain(|o| *o != observer);
        if edge.kind() == EdgeKind::Owned {
            slot.owned_by = None;
            self.dispose_id(cell);
        }
    }

    // ── Delivery ────────────────────────────────────────────────────────

    /// Deliver `diff` to every observer registered on `cell`, in
    /// registration order.
    ///
    /// The list is snapshotted first; observers detached, rebound or removed
    /// by an earlier callback of the same delivery are skipped. If a callback
    /// relocates the cell, the rest of the snapshot is matched against the
    /// new id, so every observer still bound gets the diff.
    pub(crate) fn deliver<T: Difference>(&mut self, cell: CellId, diff: &T::Diff) {
        let targets: SmallVec<[ObserverId; 4]> = self.cell_slot(cell).observers.clone();
        self.scheduler.begin_delivery(cell);
        for observer in targets {
            let current = self.scheduler.delivering(cell);
            let still_bound = self
                .observers
                .get(observer)
                .and_then(|o| o.edge.as_ref())
                .is_some_and(|e| e.targets(current));
            if still_bound {
                self.invoke::<T>(observer, diff);
            }
        }
        self.scheduler.end_delivery();
    }

    /// Run one observer's callback, unless its owner is inactive.
    pub(crate) fn invoke<T: Difference>(&mut self, observer: ObserverId, diff: &T::Diff) {
        let owner = self.observer_slot(observer).owner;
        if !self.owner_slot(owner).active {
            self.scheduler.stats.suppressed += 1;
            tracing::trace!(observer = ?observer, owner = ?owner, "observer.suppressed");
            return;
        }

        let slot = self.observer_slot_mut(observer);
        let found = slot.type_name;
        let Some(callback) = slot.callback.take() else {
            fail(InvariantViolation::ReentrantDelivery { observer });
        };
        let mut callback = downcast_callback::<T>(callback, found);
        callback(self, diff);
        self.scheduler.stats.notified += 1;

        // The callback may have removed its own observer.
        if let Some(slot) = self.observers.get_mut(observer)
            && slot.callback.is_none()
        {
            slot.callback = Some(Box::new(callback));
        }
    }
}

fn downcast_callback<T: Difference>(callback: Box<dyn Any>, found: &'static str) -> Callback<T> {
    match callback.downcast::<Callback<T>>() {
        Ok(callback) => *callback,
        Err(_) => fail(InvariantViolation::TypeMismatch {
            expected: type_name::<T>(),
            found,
        }),
    }
}
