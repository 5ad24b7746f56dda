#![forbid(unsafe_code)]

//! Change detection kernel: summaries, differences, and sequence diffs.
//!
//! This crate answers two questions for every type that takes part in the
//! reactive graph:
//!
//! - **Did it change?** [`Summarize`] produces a comparable snapshot.
//! - **How did it change?** [`Difference`] turns an old snapshot and a new
//!   value into the diff observers receive.
//!
//! Ordered sequences get a structural diff ([`EditScript`]) computed by the
//! longest-common-subsequence search in [`lcs`]. Everything else is
//! replaced wholesale.

pub mod difference;
pub mod edit_script;
pub mod lcs;
pub mod summary;

pub use difference::Difference;
pub use edit_script::{Edit, EditCounts, EditKind, EditScript, Edits};
pub use lcs::diff_sequences;
pub use summary::Summarize;

/// Give types value semantics: identity summary and replacement diff.
///
/// The types must be `Clone + PartialEq + 'static`.
///
/// ```
/// use std::rc::Rc;
/// use ripple_diff::{Difference, impl_value_semantics};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Rgb(u8, u8, u8);
///
/// impl_value_semantics!(Rgb);
///
/// let new = Rc::new(Rgb(1, 2, 3));
/// assert_eq!(Rgb::diff(Rgb(0, 0, 0), &new), Rgb(1, 2, 3));
/// ```
#[macro_export]
macro_rules! impl_value_semantics {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Summarize for $ty {
                type Summary = $ty;

                #[inline]
                fn summarize(&self) -> Self::Summary {
                    ::std::clone::Clone::clone(self)
                }
            }

            impl $crate::Difference for $ty {
                type Diff = $ty;

                #[inline]
                fn diff(_old: Self::Summary, new: &::std::rc::Rc<Self>) -> Self::Diff {
                    ::std::clone::Clone::clone(&**new)
                }

                #[inline]
                fn diff_first(new: &::std::rc::Rc<Self>) -> Self::Diff {
                    ::std::clone::Clone::clone(&**new)
                }
            }
        )*
    };
}

impl_value_semantics!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
    String,
    &'static str,
);
