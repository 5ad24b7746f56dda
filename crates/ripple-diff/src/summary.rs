#![forbid(unsafe_code)]

//! Comparable snapshots used for change detection.
//!
//! A [`Summarize`] implementation decides what "did this change" means for a
//! type. The summary is what a value cell keeps from the moment it is first
//! mutated in an update cycle until its diff has been delivered, so it must
//! be decoupled from the value itself: the value type never needs to be
//! `Clone` or `PartialEq`, only its summary does.
//!
//! # Shapes
//!
//! | Value type              | Summary type                      |
//! |-------------------------|-----------------------------------|
//! | scalars, `String`, `()` | the value itself                  |
//! | `Vec<T>`                | `Vec<T::Summary>` (element-wise)  |
//! | `Option<T>`             | `Option<T::Summary>`              |
//! | `(A, B, ..)`            | `(A::Summary, B::Summary, ..)`    |
//! | `Box<T>`                | address of the boxed value        |
//!
//! Boxes summarize to the address of what they own, so a `Vec<Box<T>>`
//! diffs by identity and `T` needs neither `Clone` nor `PartialEq`. A box
//! replaced by a new allocation counts as a change even if the contents are
//! equal. Zero-sized values share one address and never report a change.
//!
//! Handles to reactive cells summarize to their identity, not their
//! contents: changes inside a nested cell are reported through that cell's
//! own subscribers, never through the container holding the handle.
//!
//! # Invariants
//!
//! 1. `a.summarize() == b.summarize()` means an observer cannot tell `a`
//!    and `b` apart; diffing between them may be skipped entirely.
//! 2. Summaries are `'static`: they never borrow from the value.
//! 3. Summaries are `Clone`; the value type need not be.

/// Computes a comparable, decoupled snapshot of a value.
pub trait Summarize {
    /// The snapshot type. Equality on it is the change-detection predicate.
    ///
    /// Summaries are cloned when an observer rebinds away from a cell whose
    /// change it has not been told about yet, so keep them cheap.
    type Summary: Clone + PartialEq + 'static;

    /// Snapshot the current state of `self`.
    fn summarize(&self) -> Self::Summary;
}

impl<T: Summarize> Summarize for Vec<T> {
    type Summary = Vec<T::Summary>;

    fn summarize(&self) -> Self::Summary {
        self.iter().map(Summarize::summarize).collect()
    }
}

impl<T: Summarize> Summarize for Option<T> {
    type Summary = Option<T::Summary>;

    fn summarize(&self) -> Self::Summary {
        self.as_ref().map(Summarize::summarize)
    }
}

impl<T: ?Sized + 'static> Summarize for Box<T> {
    type Summary = *const ();

    fn summarize(&self) -> Self::Summary {
        (&raw const **self).cast::<()>()
    }
}

macro_rules! tuple_summary {
    ($(($($name:ident . $idx:tt),+)),+ $(,)?) => {
        $(
            impl<$($name: Summarize),+> Summarize for ($($name,)+) {
                type Summary = ($($name::Summary,)+);

                fn summarize(&self) -> Self::Summary {
                    ($(self.$idx.summarize(),)+)
                }
            }
        )+
    };
}

tuple_summary!(
    (A.0),
    (A.0, B.1),
    (A.0, B.1, C.2),
    (A.0, B.1, C.2, D.3),
    (A.0, B.1, C.2, D.3, E.4),
    (A.0, B.1, C.2, D.3, E.4, F.5),
);
