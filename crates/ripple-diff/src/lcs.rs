#![forbid(unsafe_code)]

//! Longest-common-subsequence sequence diff.
//!
//! [`diff_sequences`] turns an old and a new sequence of summaries into an
//! edit script that keeps as many elements as possible unchanged.
//!
//! # Algorithm
//!
//! 1. Trim the common prefix and the common suffix.
//! 2. On the remaining middle segments (sizes `m'` and `n'`), fill the table
//!    `L[i][j]` = LCS length of the first `i` old and first `j` new middle
//!    elements.
//! 3. Walk the table back from `(m', n')`: equal elements emit `Unchanged`;
//!    otherwise `Insertion` is emitted whenever `L[i][j-1] >= L[i-1][j]`
//!    (insertion wins ties), else `Deletion`.
//! 4. Surround the reversed walk with `Unchanged` markers for the trimmed
//!    prefix and suffix.
//!
//! # Invariants
//!
//! 1. Replaying the script over the old sequence reproduces the new one.
//! 2. The number of `Unchanged` markers equals the LCS length of the inputs.
//! 3. Output is deterministic: the tie-break in step 3 selects exactly one
//!    of the minimal scripts. With no common elements that script is every
//!    deletion followed by every insertion.
//!
//! # Complexity
//!
//! `O(m' * n')` time and space for the table. Identical inputs never build
//! a table and finish in `O(min(m, n))`.

use std::iter;

use crate::edit_script::EditKind;

/// Compute the edit script turning `old` into `new`.
///
/// The result holds one entry per element of `new` (`Insertion` or
/// `Unchanged`) plus one `Deletion` per old element that was dropped, in
/// replay order.
#[must_use]
pub fn diff_sequences<S: PartialEq>(old: &[S], new: &[S]) -> Vec<EditKind> {
    #[cfg(feature = "tracing")]
    let span = tracing::trace_span!(
        "lcs.diff",
        old_len = old.len(),
        new_len = new.len(),
        middle_old = tracing::field::Empty,
        middle_new = tracing::field::Empty,
    )
    .entered();

    let prefix = common_prefix(old, new);
    let suffix = common_suffix(&old[prefix..], &new[prefix..]);
    let old_mid = &old[prefix..old.len() - suffix];
    let new_mid = &new[prefix..new.len() - suffix];

    #[cfg(feature = "tracing")]
    {
        span.record("middle_old", old_mid.len());
        span.record("middle_new", new_mid.len());
    }

    let mut edits =
        Vec::with_capacity(prefix + suffix + old_mid.len() + new_mid.len());
    edits.extend(iter::repeat_n(EditKind::Unchanged, prefix));

    if old_mid.is_empty() {
        edits.extend(iter::repeat_n(EditKind::Insertion, new_mid.len()));
    } else if new_mid.is_empty() {
        edits.extend(iter::repeat_n(EditKind::Deletion, old_mid.len()));
    } else {
        let start = edits.len();
        let table = LcsTable::build(old_mid, new_mid);
        table.backtrack(old_mid, new_mid, &mut edits);
        edits[start..].reverse();
    }

    edits.extend(iter::repeat_n(EditKind::Unchanged, suffix));
    edits
}

fn common_prefix<S: PartialEq>(old: &[S], new: &[S]) -> usize {
    old.iter().zip(new).take_while(|(a, b)| a == b).count()
}

fn common_suffix<S: PartialEq>(old: &[S], new: &[S]) -> usize {
    old.iter()
        .rev()
        .zip(new.iter().rev())
        .take_while(|(a, b)| a == b)
        .count()
}

/// Dynamic-programming table of LCS lengths, row-major over old indices.
struct LcsTable {
    stride: usize,
    lengths: Vec<usize>,
}

impl LcsTable {
    fn build<S: PartialEq>(old: &[S], new: &[S]) -> Self {
        let stride = new.len() + 1;
        let mut table = Self {
            stride,
            lengths: vec![0; (old.len() + 1) * stride],
        };
        for (i, o) in old.iter().enumerate() {
            for (j, n) in new.iter().enumerate() {
                let value = if o == n {
                    table.get(i, j) + 1
                } else {
                    table.get(i, j + 1).max(table.get(i + 1, j))
                };
                table.lengths[(i + 1) * stride + j + 1] = value;
            }
        }
        table
    }

    #[inline]
    fn get(&self, i: usize, j: usize) -> usize {
        self.lengths[i * self.stride + j]
    }

    /// Push the script in reverse replay order.
    fn backtrack<S: PartialEq>(&self, old: &[S], new: &[S], out: &mut Vec<EditKind>) {
        let (mut i, mut j) = (old.len(), new.len());
        loop {
            if i > 0 && j > 0 && old[i - 1] == new[j - 1] {
                out.push(EditKind::Unchanged);
                i -= 1;
                j -= 1;
            } else if j > 0 && (i == 0 || self.get(i, j - 1) >= self.get(i - 1, j)) {
                out.push(EditKind::Insertion);
                j -= 1;
            } else if i > 0 {
                out.push(EditKind::Deletion);
                i -= 1;
            } else {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EditKind::{Deletion as D, Insertion as I, Unchanged as U};

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn diff(old: &str, new: &str) -> Vec<EditKind> {
        diff_sequences(&chars(old), &chars(new))
    }

    #[test]
    fn empty_inputs_produce_empty_script() {
        assert!(diff("", "").is_empty());
    }

    #[test]
    fn identical_inputs_are_all_unchanged() {
        assert_eq!(diff("abcd", "abcd"), vec![U, U, U, U]);
    }

    #[test]
    fn insertion_in_the_middle() {
        assert_eq!(diff("abc", "axbc"), vec![U, I, U, U]);
    }

    #[test]
    fn deletion_in_the_middle() {
        assert_eq!(diff("abc", "ac"), vec![U, D, U]);
    }

    #[test]
    fn from_empty_is_all_insertions() {
        assert_eq!(diff("", "xyz"), vec![I, I, I]);
    }

    #[test]
    fn to_empty_is_all_deletions() {
        assert_eq!(diff("xyz", ""), vec![D, D, D]);
    }

    #[test]
    fn disjoint_inputs_delete_then_insert() {
        assert_eq!(diff("ab", "xyz"), vec![D, D, I, I, I]);
    }

    #[test]
    fn replacement_of_single_element() {
        assert_eq!(diff("abc", "axc"), vec![U, D, I, U]);
    }

    #[test]
    fn tie_break_prefers_insertion_when_walking_back() {
        // "ab" -> "ba": two minimal scripts keep one element. Insertion wins
        // ties on the backward walk, so `b` is kept and `a` moves.
        assert_eq!(diff("ab", "ba"), vec![D, U, I]);
    }

    #[test]
    fn repeated_elements_keep_longest_run() {
        let edits = diff("aaab", "abaa");
        let kept = edits.iter().filter(|e| **e == U).count();
        assert_eq!(kept, 3);
    }

    #[test]
    fn table_uses_full_row_stride() {
        // Middle segments of different lengths exercise the row stride.
        let edits = diff("xabcy", "xqbrrcy");
        assert_eq!(edits, vec![U, D, I, U, I, I, U, U]);
    }

    #[test]
    fn trimming_does_not_overlap_prefix_and_suffix() {
        assert_eq!(diff("aa", "aaa"), vec![U, U, I]);
        assert_eq!(diff("aaa", "aa"), vec![U, U, D]);
    }
}
