#![forbid(unsafe_code)]

use thiserror::Error;

use crate::handle::{CellId, ObserverId, OwnerId};

/// A broken rule of the reactive graph.
///
/// Every variant is a programming error in the code building the graph.
/// None of them is recoverable: the runtime logs the violation and panics
/// (see [`fail`]). [`Runtime::verify`](crate::Runtime::verify) reports them
/// as values instead, for tests and audits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("cell {cell:?} is stale (disposed or relocated)")]
    StaleCell { cell: CellId },

    #[error("observer {observer:?} is stale (removed)")]
    StaleObserver { observer: ObserverId },

    #[error("owner {owner:?} is stale (removed)")]
    StaleOwner { owner: OwnerId },

    #[error("type mismatch: handle expects {expected}, slot holds {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("cell {cell:?} is computed and only its own recomputation writes it")]
    WriteToComputed { cell: CellId },

    #[error("observer {observer:?} attached to cell {cell:?} while it holds an undelivered diff")]
    AttachToPendingCell { cell: CellId, observer: ObserverId },

    #[error("observer {observer:?} detached without a source")]
    DetachWithoutSource { observer: ObserverId },

    #[error("cell {cell:?} lists observer {observer:?} {found} times, expected {expected}")]
    EdgeCount {
        cell: CellId,
        observer: ObserverId,
        found: usize,
        expected: usize,
    },

    #[error("observer {observer:?} and cell {cell:?} disagree about their edge")]
    DanglingEdge { cell: CellId, observer: ObserverId },

    #[error("observer {observer:?} is missing from the list of owner {owner:?}")]
    UnlistedObserver { owner: OwnerId, observer: ObserverId },

    #[error("cell {cell:?} holds a pending summary but is not queued")]
    PendingWithoutQueue { cell: CellId },

    #[error("cell {cell:?} is queued without a pending summary")]
    QueueWithoutPending { cell: CellId },

    #[error("{queued} queue entries for {pending} pending cells")]
    QueuedTwice { queued: usize, pending: usize },

    #[error("observer {observer:?} received a diff while its callback was running")]
    ReentrantDelivery { observer: ObserverId },

    #[error("cell {cell:?} value is still shared by a delivered diff; use make_mut")]
    SharedValue { cell: CellId },

    #[error("cell {cell:?} is owned by observer {observer:?} and dies with its edge")]
    DisposeOwnedCell { cell: CellId, observer: ObserverId },

    #[error("cell {cell:?} is already owned by observer {observer:?}")]
    AlreadyOwned { cell: CellId, observer: ObserverId },

    #[error("owner {owner:?} belongs to a computed cell; dispose the cell instead")]
    RemoveComputedOwner { owner: OwnerId },

    #[error("flush exceeded {limit} passes; propagation does not settle")]
    RunawayPropagation { limit: usize },
}

/// Log `violation` and abort the current operation.
#[cold]
#[track_caller]
pub(crate) fn fail(violation: InvariantViolation) -> ! {
    tracing::error!(violation = %violation, "invariant.violation");
    panic!("{violation}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn display_names_the_broken_rule() {
        let mut cells: SlotMap<CellId, ()> = SlotMap::with_key();
        let cell = cells.insert(());
        let text = InvariantViolation::WriteToComputed { cell }.to_string();
        assert!(text.contains("computed"), "{text}");

        let text = InvariantViolation::RunawayPropagation { limit: 3 }.to_string();
        assert_eq!(text, "flush exceeded 3 passes; propagation does not settle");
    }

    #[test]
    fn shared_value_points_at_make_mut() {
        let mut cells: SlotMap<CellId, ()> = SlotMap::with_key();
        let cell = cells.insert(());
        let text = InvariantViolation::SharedValue { cell }.to_string();
        assert!(text.contains("make_mut"), "{text}");
    }

    #[test]
    #[should_panic(expected = "is stale")]
    fn fail_panics_with_violation_text() {
        let mut cells: SlotMap<CellId, ()> = SlotMap::with_key();
        let cell = cells.insert(());
        fail(InvariantViolation::StaleCell { cell });
    }
}
