#![forbid(unsafe_code)]

//! Value-likes: what an observer edge can point at.
//!
//! The set of cases is closed. An edge targets a cell someone else owns,
//! owns a cell outright, or holds a fixed value that never changes. Diff
//! computation on rebind is total over these three cases.

use std::any::Any;
use std::rc::Rc;

use crate::handle::{Cell, CellId};

/// A source an observer (or a computed cell) can be bound to.
#[derive(Debug)]
pub enum Source<T> {
    /// A cell owned elsewhere; the edge only subscribes to it.
    Target(Cell<T>),
    /// A cell owned by the edge: releasing the edge disposes the cell.
    Owned(Cell<T>),
    /// An immediate value without a cell. Never notifies.
    Fixed(T),
}

impl<T> Source<T> {
    /// A non-owning copy of this source: owned cells are viewed as targets,
    /// fixed values are cloned.
    #[must_use]
    pub fn view(&self) -> Self
    where
        T: Clone,
    {
        match self {
            Self::Target(cell) | Self::Owned(cell) => Self::Target(*cell),
            Self::Fixed(value) => Self::Fixed(value.clone()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EdgeKind {
        match self {
            Self::Target(_) => EdgeKind::Target,
            Self::Owned(_) => EdgeKind::Owned,
            Self::Fixed(_) => EdgeKind::Fixed,
        }
    }

    /// The cell this source points at, if any.
    #[must_use]
    pub fn cell(&self) -> Option<Cell<T>> {
        match self {
            Self::Target(cell) | Self::Owned(cell) => Some(*cell),
            Self::Fixed(_) => None,
        }
    }
}

impl<T> From<Cell<T>> for Source<T> {
    fn from(cell: Cell<T>) -> Self {
        Self::Target(cell)
    }
}

/// Anything that converts into a [`Source`] of a known value type.
///
/// Bare cell handles convert into [`Source::Target`].
pub trait SourceLike {
    type Value: 'static;

    fn into_source(self) -> Source<Self::Value>;
}

impl<T: 'static> SourceLike for Source<T> {
    type Value = T;

    fn into_source(self) -> Source<T> {
        self
    }
}

impl<T: 'static> SourceLike for Cell<T> {
    type Value = T;

    fn into_source(self) -> Source<T> {
        Source::Target(self)
    }
}

/// Which of the three forms an edge currently has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Subscribed to a cell owned elsewhere.
    Target,
    /// Subscribed to a cell the edge owns.
    Owned,
    /// Bound to an immediate value.
    Fixed,
}

/// Type-erased edge stored in an observer slot.
///
/// `Fixed` holds an `Rc<T>` behind `dyn Any`.
pub(crate) enum Edge {
    Target(CellId),
    Owned(CellId),
    Fixed(Box<dyn Any>),
}

impl Edge {
    pub(crate) fn fixed<T: 'static>(value: Rc<T>) -> Self {
        Self::Fixed(Box::new(value))
    }

    pub(crate) fn cell(&self) -> Option<CellId> {
        match self {
            Self::Target(id) | Self::Owned(id) => Some(*id),
            Self::Fixed(_) => None,
        }
    }

    pub(crate) fn targets(&self, cell: CellId) -> bool {
        self.cell() == Some(cell)
    }

    pub(crate) fn kind(&self) -> EdgeKind {
        match self {
            Self::Target(_) => EdgeKind::Target,
            Self::Owned(_) => EdgeKind::Owned,
            Self::Fixed(_) => EdgeKind::Fixed,
        }
    }

    /// Point the edge at `new` if it currently points at `old`.
    pub(crate) fn remap(&mut self, old: CellId, new: CellId) -> bool {
        match self {
            Self::Target(id) | Self::Owned(id) if *id == old => {
                *id = new;
                true
            }
            _ => false,
        }
    }
}
