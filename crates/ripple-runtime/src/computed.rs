#![forbid(unsafe_code)]

//! Computed cells: values derived from one or more sources.
//!
//! A computed cell is a cell plus a hidden owner holding one observer edge
//! per source. Its value is a pure function of the sources' diffs.
//!
//! - At construction the function runs once with `diff_first` of every
//!   source.
//! - When source `k` delivers a diff, the function runs with that diff in
//!   position `k` and `diff_same` (the source's current value described as
//!   unchanged) everywhere else. The result replaces the cell's value
//!   through the ordinary pending cycle, so observers of the computed cell
//!   get a diff of their own in the next pass of the same flush.
//!
//! ```
//! use ripple_runtime::Runtime;
//!
//! let mut rt = Runtime::new();
//! let x = rt.cell(2);
//! let y = rt.cell(3);
//! let sum = rt.combine((x, y)).map(|a: &i32, b: &i32| a + b);
//! assert_eq!(*rt.get_once(sum), 5);
//!
//! rt.set(x, 5);
//! rt.flush();
//! assert_eq!(*rt.get_once(sum), 8);
//! ```
//!
//! # Invariants
//!
//! 1. The hidden owner's observer `j` is bound to source `j`.
//! 2. The cell and its owner point at each other; recomputation finds the
//!    cell through the owner, so relocating the cell is safe.
//! 3. Sources are registered without delivery, so a computed cell may be
//!    built on cells with pending writes.

use std::any::{Any, type_name};
use std::rc::Rc;

use ripple_diff::Difference;

use crate::error::{InvariantViolation, fail};
use crate::handle::{Cell, CellId, Owner, OwnerId};
use crate::runtime::{Callback, OwnerSlot, Runtime};
use crate::source::{Edge, SourceLike};

/// Sources gathered for a computed cell; finish with `map`.
#[must_use = "combine does nothing until `map` builds the cell"]
pub struct Combine<'rt, S> {
    rt: &'rt mut Runtime,
    sources: S,
}

impl Runtime {
    /// Gather a tuple of one to six sources for a computed cell.
    pub fn combine<S>(&mut self, sources: S) -> Combine<'_, S> {
        Combine { rt: self, sources }
    }

    /// Derive a cell from a single source.
    pub fn map<S, R, F>(&mut self, source: S, f: F) -> Cell<R>
    where
        S: SourceLike,
        S::Value: Difference,
        R: Difference,
        F: Fn(&<S::Value as Difference>::Diff) -> R + 'static,
    {
        self.combine((source,)).map(f)
    }

    /// The owner recomputing `cell`, if it is computed.
    ///
    /// Computed owners can be deactivated like any other owner, which
    /// freezes the cell until reactivation.
    #[must_use]
    pub fn computed_owner<T>(&self, cell: Cell<T>) -> Option<Owner> {
        self.cell_slot(cell.id()).computed_by.map(Owner::from_id)
    }

    fn insert_computed_owner(&mut self) -> OwnerId {
        self.owners.insert(OwnerSlot {
            active: true,
            observers: Vec::new(),
            computed: None,
        })
    }

    fn link_computed(&mut self, owner: OwnerId, cell: CellId) {
        self.owner_slot_mut(owner).computed = Some(cell);
    }

    /// Add source observer to a computed owner, registered without delivery.
    fn bind_source<T: Difference>(&mut self, owner: OwnerId, edge: Edge, callback: Callback<T>) {
        let observer = self.insert_observer::<T>(owner, callback);
        self.register_edge(observer, edge);
    }

    /// "Nothing changed" diff of the computed owner's `index`-th source.
    fn diff_same_at<T: Difference>(&self, owner: OwnerId, index: usize) -> T::Diff {
        let observer = self.owner_slot(owner).observers[index];
        let Some(edge) = &self.observer_slot(observer).edge else {
            fail(InvariantViolation::DetachWithoutSource { observer });
        };
        T::diff_same(&self.edge_value::<T>(edge))
    }

    /// Store a recomputed value into the computed cell of `owner`.
    fn write_computed<R: Difference>(&mut self, owner: OwnerId, value: R) {
        let Some(cell) = self.owner_slot(owner).computed else {
            fail(InvariantViolation::StaleOwner { owner });
        };
        self.write(cell, value);
    }
}

/// Argument slot of a recomputation: the diff that arrived, or a fresh
/// "nothing changed" diff.
enum Arg<'a, D> {
    Received(&'a D),
    Same(D),
}

impl<D> Arg<'_, D> {
    fn get(&self) -> &D {
        match self {
            Self::Received(diff) => *diff,
            Self::Same(diff) => diff,
        }
    }
}

fn received<D: 'static>(diff: &dyn Any) -> &D {
    diff.downcast_ref::<D>().unwrap_or_else(|| {
        fail(InvariantViolation::TypeMismatch {
            expected: type_name::<D>(),
            found: "received diff",
        })
    })
}

macro_rules! combine_arity {
    ($(($idx:tt, $S:ident, $d:ident)),+) => {
        impl<'rt, $($S),+> Combine<'rt, ($($S,)+)>
        where
            $($S: SourceLike, <$S as SourceLike>::Value: Difference,)+
        {
            /// Build the computed cell `f(sources...)`.
            pub fn map<R, F>(self, f: F) -> Cell<R>
            where
                R: Difference,
                F: Fn($(&<<$S as SourceLike>::Value as Difference>::Diff),+) -> R + 'static,
            {
                let Combine { rt, sources } = self;
                $(
                    let $d = rt.resolve_source(sources.$idx.into_source());
                )+
                let initial = f($(&<<$S as SourceLike>::Value as Difference>::diff_first(&$d.1)),+);

                let owner = rt.insert_computed_owner();
                let cell = rt.insert_cell(initial, Some(owner));
                rt.link_computed(owner, cell);

                let recompute = Rc::new(
                    move |rt: &mut Runtime, changed: usize, diff: &dyn Any| -> R {
                        $(
                            let $d = if changed == $idx {
                                Arg::Received(received(diff))
                            } else {
                                Arg::Same(
                                    rt.diff_same_at::<<$S as SourceLike>::Value>(owner, $idx),
                                )
                            };
                        )+
                        f($($d.get()),+)
                    },
                );

                $(
                    let on_change = Rc::clone(&recompute);
                    rt.bind_source::<<$S as SourceLike>::Value>(
                        owner,
                        $d.0,
                        Box::new(
                            move |rt: &mut Runtime,
                                  diff: &<<$S as SourceLike>::Value as Difference>::Diff| {
                                let value = on_change(rt, $idx, diff as &dyn Any);
                                rt.write_computed(owner, value);
                            },
                        ),
                    );
                )+
                Cell::from_id(cell)
            }
        }
    };
}

combine_arity!((0, S0, d0));
combine_arity!((0, S0, d0), (1, S1, d1));
combine_arity!((0, S0, d0), (1, S1, d1), (2, S2, d2));
combine_arity!((0, S0, d0), (1, S1, d1), (2, S2, d2), (3, S3, d3));
combine_arity!((0, S0, d0), (1, S1, d1), (2, S2, d2), (3, S3, d3), (4, S4, d4));
combine_arity!(
    (0, S0, d0),
    (1, S1, d1),
    (2, S2, d2),
    (3, S3, d3),
    (4, S4, d4),
    (5, S5, d5)
);

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::source::Source;

    #[test]
    fn map_computes_eagerly() {
        let mut rt = Runtime::new();
        let x = rt.cell(21);
        let doubled = rt.map(x, |v: &i32| v * 2);
        assert_eq!(*rt.get_once(doubled), 42);
        assert_eq!(rt.observer_count(x), 1);
        assert!(rt.computed_owner(doubled).is_some());
        assert!(rt.computed_owner(x).is_none());
        rt.verify().expect("graph consistent");
    }

    #[test]
    fn unchanged_sources_receive_same_diff() {
        let mut rt = Runtime::new();
        let seen: Rc<RefCell<Vec<(i32, i32)>>> = Rc::default();
        let log = Rc::clone(&seen);
        let a = rt.cell(1);
        let b = rt.cell(10);
        let _ = rt.combine((a, b)).map(move |x: &i32, y: &i32| {
            log.borrow_mut().push((*x, *y));
            x + y
        });
        rt.set(b, 20);
        rt.flush();
        assert_eq!(*seen.borrow(), vec![(1, 10), (1, 20)]);
    }

    #[test]
    fn fixed_sources_never_notify() {
        let mut rt = Runtime::new();
        let x = rt.cell(2u32);
        let scaled = rt
            .combine((x, Source::Fixed(100u32)))
            .map(|v: &u32, k: &u32| v * k);
        assert_eq!(*rt.get_once(scaled), 200);
        rt.set(x, 3);
        rt.flush();
        assert_eq!(*rt.get_once(scaled), 300);
    }

    #[test]
    fn owned_source_is_disposed_with_the_computed_cell() {
        let mut rt = Runtime::new();
        let inner = rt.cell(5);
        let owned = rt.map(inner, |v: &i32| v + 1);
        let outer = rt.map(Source::Owned(owned), |v: &i32| v * 10);
        assert_eq!(*rt.get_once(outer), 60);
        rt.dispose(outer);
        assert!(!rt.contains(owned));
        assert_eq!(rt.observer_count(inner), 0);
        rt.verify().expect("graph consistent");
    }

    #[test]
    #[should_panic(expected = "only its own recomputation writes it")]
    fn writing_a_computed_cell_fails_fast() {
        let mut rt = Runtime::new();
        let x = rt.cell(1);
        let y = rt.map(x, |v: &i32| *v);
        rt.set(y, 3);
    }

    #[test]
    fn six_sources() {
        let mut rt = Runtime::new();
        let cells: Vec<_> = (1..=6).map(|v| rt.cell(v)).collect();
        let total = rt
            .combine((cells[0], cells[1], cells[2], cells[3], cells[4], cells[5]))
            .map(|a: &i32, b: &i32, c: &i32, d: &i32, e: &i32, f: &i32| a + b + c + d + e + f);
        assert_eq!(*rt.get_once(total), 21);
        rt.set(cells[5], 60);
        rt.flush();
        assert_eq!(*rt.get_once(total), 75);
    }
}
