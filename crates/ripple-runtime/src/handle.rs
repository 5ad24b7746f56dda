#![forbid(unsafe_code)]

//! Typed, copyable handles into a [`Runtime`](crate::Runtime) arena.
//!
//! Handles are generation-checked keys: using a handle after its slot was
//! removed (disposed cell, removed observer, relocated cell) is detected and
//! fails fast instead of reaching an unrelated node that reused the slot.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::rc::Rc;

use ripple_diff::{Difference, Summarize};

slotmap::new_key_type! {
    /// Untyped key of a value or computed cell.
    pub struct CellId;
    /// Untyped key of an observer edge.
    pub struct ObserverId;
    /// Untyped key of an owner.
    pub struct OwnerId;
}

/// Handle to a value cell (standalone or computed) holding a `T`.
pub struct Cell<T> {
    id: CellId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Cell<T> {
    pub(crate) const fn from_id(id: CellId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn id(self) -> CellId {
        self.id
    }
}

/// Handle to an observer edge delivering diffs of `T`.
pub struct Observer<T> {
    id: ObserverId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Observer<T> {
    pub(crate) const fn from_id(id: ObserverId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    #[must_use]
    pub const fn id(self) -> ObserverId {
        self.id
    }
}

/// Handle to an owner: the delivery gate shared by a group of observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Owner {
    id: OwnerId,
}

impl Owner {
    pub(crate) const fn from_id(id: OwnerId) -> Self {
        Self { id }
    }

    #[must_use]
    pub const fn id(self) -> OwnerId {
        self.id
    }
}

macro_rules! typed_handle_impls {
    ($($handle:ident),+) => {
        $(
            impl<T> Clone for $handle<T> {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<T> Copy for $handle<T> {}

            impl<T> PartialEq for $handle<T> {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl<T> Eq for $handle<T> {}

            impl<T> Hash for $handle<T> {
                fn hash<H: Hasher>(&self, state: &mut H) {
                    self.id.hash(state);
                }
            }

            impl<T> fmt::Debug for $handle<T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_tuple(stringify!($handle)).field(&self.id).finish()
                }
            }
        )+
    };
}

typed_handle_impls!(Cell, Observer);

// Nested cells summarize to their identity: a container holding cell handles
// reports structural changes of the container only, never changes inside the
// cells it points at.
impl<T: 'static> Summarize for Cell<T> {
    type Summary = CellId;

    fn summarize(&self) -> CellId {
        self.id
    }
}

impl<T: 'static> Difference for Cell<T> {
    type Diff = Cell<T>;

    fn diff(_old: CellId, new: &Rc<Self>) -> Cell<T> {
        **new
    }

    fn diff_first(new: &Rc<Self>) -> Cell<T> {
        **new
    }
}
