#![forbid(unsafe_code)]

//! Edit scripts: the diff type of ordered sequences.
//!
//! An [`EditScript`] describes how the previous contents of a `Vec<T>` turned
//! into the current ones as a sequence of [`EditKind`] tags in replay order.
//! Replaying means walking a cursor over the old sequence:
//!
//! - `Deletion` drops the element under the cursor.
//! - `Insertion` inserts the next new element at the cursor and advances.
//! - `Unchanged` keeps the element under the cursor and advances.
//!
//! # Invariants
//!
//! 1. `unchanged + deletions == old.len()`.
//! 2. `unchanged + insertions == new.len()`.
//! 3. Replaying the script over the old sequence (see [`EditScript::apply`])
//!    yields a sequence equal to the new one.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//! use ripple_diff::{Edit, EditScript, Summarize};
//!
//! let old = vec!['a', 'b', 'c'];
//! let new = Rc::new(vec!['a', 'x', 'b', 'c']);
//! let script = EditScript::compute(old.summarize(), &new);
//!
//! let edits: Vec<_> = script.iter().collect();
//! assert_eq!(
//!     edits,
//!     vec![Edit::Unchanged, Edit::Insertion(&'x'), Edit::Unchanged, Edit::Unchanged]
//! );
//!
//! let mut mirror = old.clone();
//! script.apply(&mut mirror, |c| *c);
//! assert_eq!(mirror, *new);
//! ```

use std::fmt;
use std::rc::Rc;

use crate::lcs::diff_sequences;
use crate::summary::Summarize;

/// Tag of a single step of an edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// The old element under the cursor was removed.
    Deletion,
    /// A new element was inserted at the cursor.
    Insertion,
    /// The old element under the cursor was kept.
    Unchanged,
}

/// A single step of an edit script, borrowing inserted elements from the new
/// sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edit<'a, T> {
    /// Drop the old element under the cursor.
    Deletion,
    /// Insert this element of the new sequence at the cursor.
    Insertion(&'a T),
    /// Keep the old element under the cursor and step past it.
    Unchanged,
}

impl<T> Edit<'_, T> {
    /// The tag of this step.
    #[must_use]
    pub const fn kind(&self) -> EditKind {
        match self {
            Self::Deletion => EditKind::Deletion,
            Self::Insertion(_) => EditKind::Insertion,
            Self::Unchanged => EditKind::Unchanged,
        }
    }
}

/// Per-tag totals of an edit script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditCounts {
    /// Elements present in both sequences.
    pub unchanged: usize,
    /// Elements only in the new sequence.
    pub insertions: usize,
    /// Elements only in the old sequence.
    pub deletions: usize,
}

/// Structural diff between a summarized old sequence and a new sequence.
///
/// The script keeps the old summary and a shared handle on the new sequence,
/// so consumers can inspect both sides of the change.
pub struct EditScript<T: Summarize> {
    old: Vec<T::Summary>,
    new: Rc<Vec<T>>,
    edits: Vec<EditKind>,
}

impl<T: Summarize> EditScript<T> {
    /// Diff the old summary against the new sequence.
    #[must_use]
    pub fn compute(old: Vec<T::Summary>, new: &Rc<Vec<T>>) -> Self {
        let edits = diff_sequences(&old, &new.summarize());
        Self {
            old,
            new: Rc::clone(new),
            edits,
        }
    }

    /// Script for a first observation: every element is an insertion.
    #[must_use]
    pub fn first(new: &Rc<Vec<T>>) -> Self {
        Self {
            old: Vec::new(),
            new: Rc::clone(new),
            edits: vec![EditKind::Insertion; new.len()],
        }
    }

    /// The raw tags in replay order.
    #[must_use]
    pub fn edits(&self) -> &[EditKind] {
        &self.edits
    }

    /// Iterate the steps, resolving insertions to the new elements.
    pub fn iter(&self) -> Edits<'_, T> {
        Edits {
            kinds: self.edits.iter(),
            new: &self.new,
            next_new: 0,
        }
    }

    /// Summary of the sequence before the change.
    #[must_use]
    pub fn old_summary(&self) -> &[T::Summary] {
        &self.old
    }

    /// The sequence after the change.
    #[must_use]
    pub fn new_value(&self) -> &[T] {
        &self.new
    }

    /// Number of steps, deletions included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Whether the script keeps every element (old and new are equal).
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.edits.iter().all(|e| *e == EditKind::Unchanged)
    }

    #[must_use]
    pub fn counts(&self) -> EditCounts {
        self.edits
            .iter()
            .fold(EditCounts::default(), |mut counts, edit| {
                match edit {
                    EditKind::Deletion => counts.deletions += 1,
                    EditKind::Insertion => counts.insertions += 1,
                    EditKind::Unchanged => counts.unchanged += 1,
                }
                counts
            })
    }

    /// Replay the script over `target`, a mirror of the old sequence.
    ///
    /// `insert` builds the mirrored element for each inserted one.
    ///
    /// # Panics
    ///
    /// Panics if `target` does not have the old sequence's length.
    pub fn apply<U>(&self, target: &mut Vec<U>, mut insert: impl FnMut(&T) -> U) {
        assert_eq!(
            target.len(),
            self.old.len(),
            "edit script replayed over a sequence of the wrong length"
        );
        let mut cursor = 0;
        for edit in self.iter() {
            match edit {
                Edit::Deletion => {
                    target.remove(cursor);
                }
                Edit::Insertion(value) => {
                    target.insert(cursor, insert(value));
                    cursor += 1;
                }
                Edit::Unchanged => cursor += 1,
            }
        }
        debug_assert_eq!(target.len(), self.new.len());
    }
}

impl<T: Summarize> Clone for EditScript<T> {
    fn clone(&self) -> Self {
        Self {
            old: self.old.clone(),
            new: Rc::clone(&self.new),
            edits: self.edits.clone(),
        }
    }
}

impl<T: Summarize + fmt::Debug> fmt::Debug for EditScript<T>
where
    T::Summary: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditScript")
            .field("old", &self.old)
            .field("new", &self.new)
            .field("edits", &self.edits)
            .finish()
    }
}

impl<'a, T: Summarize> IntoIterator for &'a EditScript<T> {
    type Item = Edit<'a, T>;
    type IntoIter = Edits<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the steps of an [`EditScript`].
#[derive(Debug, Clone)]
pub struct Edits<'a, T> {
    kinds: std::slice::Iter<'a, EditKind>,
    new: &'a [T],
    next_new: usize,
}

impl<'a, T> Iterator for Edits<'a, T> {
    type Item = Edit<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        let edit = match self.kinds.next()? {
            EditKind::Deletion => Edit::Deletion,
            EditKind::Insertion => {
                let value = &self.new[self.next_new];
                self.next_new += 1;
                Edit::Insertion(value)
            }
            EditKind::Unchanged => {
                self.next_new += 1;
                Edit::Unchanged
            }
        };
        Some(edit)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.kinds.size_hint()
    }
}

impl<T> ExactSizeIterator for Edits<'_, T> {}
