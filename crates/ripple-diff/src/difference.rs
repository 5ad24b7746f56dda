#![forbid(unsafe_code)]

//! Change descriptions delivered to observers.
//!
//! [`Difference`] pairs a type with the diff observers receive when a value
//! of that type changes. Values are shared through [`Rc`] so that a diff may
//! keep a handle on the new value (edit scripts borrow inserted elements
//! from it) without copying it.
//!
//! # Semantics
//!
//! - **Replacement** (the default shape): the diff is the summary of the new
//!   value. Scalars, strings, options, tuples and boxes use it. A box's diff
//!   is the address of its new contents.
//! - **Structural**: `Vec<T>` produces an [`EditScript`] from the old
//!   summary to the new sequence.
//!
//! Downstream types opt into replacement semantics with
//! [`impl_value_semantics!`](crate::impl_value_semantics).

use std::rc::Rc;

use crate::edit_script::EditScript;
use crate::summary::Summarize;

/// Computes the diff observers receive for a change of `Self`.
pub trait Difference: Summarize + 'static {
    /// The change description handed to observers.
    type Diff: 'static;

    /// Diff from the summary of a previous value to `new`.
    fn diff(old: Self::Summary, new: &Rc<Self>) -> Self::Diff;

    /// Diff for an observer that has never seen a value: behaves as if the
    /// previous value were empty or absent.
    fn diff_first(new: &Rc<Self>) -> Self::Diff;

    /// The "nothing changed" diff of `current` against itself.
    ///
    /// Computed cells hand it out for every source that did not trigger the
    /// recomputation.
    fn diff_same(current: &Rc<Self>) -> Self::Diff {
        Self::diff(current.summarize(), current)
    }
}

impl<T: Summarize + 'static> Difference for Vec<T> {
    type Diff = EditScript<T>;

    fn diff(old: Self::Summary, new: &Rc<Self>) -> Self::Diff {
        EditScript::compute(old, new)
    }

    fn diff_first(new: &Rc<Self>) -> Self::Diff {
        EditScript::first(new)
    }
}

impl<T: Summarize + 'static> Difference for Option<T> {
    type Diff = Option<T::Summary>;

    fn diff(_old: Self::Summary, new: &Rc<Self>) -> Self::Diff {
        new.summarize()
    }

    fn diff_first(new: &Rc<Self>) -> Self::Diff {
        new.summarize()
    }
}

impl<T: ?Sized + 'static> Difference for Box<T> {
    type Diff = *const ();

    fn diff(_old: Self::Summary, new: &Rc<Self>) -> Self::Diff {
        new.summarize()
    }

    fn diff_first(new: &Rc<Self>) -> Self::Diff {
        new.summarize()
    }
}

macro_rules! tuple_difference {
    ($(($($name:ident),+)),+ $(,)?) => {
        $(
            impl<$($name: Summarize + 'static),+> Difference for ($($name,)+) {
                type Diff = ($($name::Summary,)+);

                fn diff(_old: Self::Summary, new: &Rc<Self>) -> Self::Diff {
                    new.summarize()
                }

                fn diff_first(new: &Rc<Self>) -> Self::Diff {
                    new.summarize()
                }
            }
        )+
    };
}

tuple_difference!(
    (A),
    (A, B),
    (A, B, C),
    (A, B, C, D),
    (A, B, C, D, E),
    (A, B, C, D, E, F),
);
