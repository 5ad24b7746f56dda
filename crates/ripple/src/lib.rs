#![forbid(unsafe_code)]

//! Ripple public facade crate.
//!
//! Re-exports the sequence diff kernel and, with the default `runtime`
//! feature, the reactive graph runtime.
//!
//! ```
//! # #[cfg(feature = "runtime")]
//! # {
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use ripple::prelude::*;
//!
//! let mut rt = Runtime::new();
//! let todos = rt.cell(vec!["write docs", "ship"]);
//! let count = rt.map(todos, |script: &EditScript<&'static str>| script.new_value().len());
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let log = Rc::clone(&seen);
//! let owner = rt.owner();
//! rt.observe(owner, count, move |_, n: &usize| log.borrow_mut().push(*n));
//!
//! rt.get_mut(todos).push("celebrate");
//! rt.flush();
//! assert_eq!(*seen.borrow(), vec![2, 3]);
//! # }
//! ```

pub use ripple_diff as diff;
#[cfg(feature = "runtime")]
pub use ripple_runtime as runtime;

pub mod prelude {
    pub use ripple_diff::{Difference, Edit, EditKind, EditScript, Summarize};
    #[cfg(feature = "runtime")]
    pub use ripple_runtime::{
        Cell, EdgeKind, FlushStats, Observer, Owner, Runtime, RuntimeConfig, Source,
    };
}
