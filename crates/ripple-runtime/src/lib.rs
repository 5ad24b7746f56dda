#![forbid(unsafe_code)]

//! Reactive graph runtime: value cells, observers, computed cells and the
//! batched update scheduler.
//!
//! # Model
//!
//! - A [`Cell<T>`] holds a value. The first write of an update cycle
//!   snapshots a summary of the old value and queues the cell.
//! - An [`Observer<T>`] binds a callback to one [`Source<T>`] and receives
//!   the [`Difference::Diff`](ripple_diff::Difference::Diff) of every change.
//!   Observers live under an [`Owner`] whose active flag gates delivery.
//! - Computed cells ([`Runtime::map`], [`Runtime::combine`]) observe their
//!   sources and rewrite themselves from the diffs they receive.
//! - [`Runtime::flush`] settles the queue once per external tick.
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use ripple_runtime::Runtime;
//!
//! let mut rt = Runtime::new();
//! let celsius = rt.cell(20.0_f64);
//! let fahrenheit = rt.map(celsius, |c: &f64| c * 9.0 / 5.0 + 32.0);
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let owner = rt.owner();
//! rt.observe(owner, fahrenheit, move |_, f: &f64| log.borrow_mut().push(*f));
//!
//! rt.set(celsius, 100.0);
//! rt.flush();
//! assert_eq!(*seen.borrow(), vec![68.0, 212.0]);
//! ```
//!
//! # Invariants
//!
//! 1. Observer edges and cell back-references always agree.
//! 2. A cell is queued iff it has an undelivered change.
//! 3. N writes to a cell between two flushes produce one diff per observer.
//! 4. Settling a cell whose summary did not change notifies nobody.
//!
//! Contract violations fail fast; see [`InvariantViolation`].

mod cell;
mod computed;
pub mod config;
pub mod error;
pub mod handle;
mod observer;
mod runtime;
pub mod scheduler;
pub mod source;

pub use computed::Combine;
pub use config::RuntimeConfig;
pub use error::InvariantViolation;
pub use handle::{Cell, CellId, Observer, ObserverId, Owner, OwnerId};
pub use runtime::Runtime;
pub use scheduler::FlushStats;
pub use source::{EdgeKind, Source, SourceLike};
