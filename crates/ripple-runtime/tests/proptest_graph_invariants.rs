//! Property-based invariant tests for the reactive graph.
//!
//! Random operation sequences drive a small graph of cells, a computed cell
//! and observers under two owners. After every operation the graph must
//! pass [`Runtime::verify`]; after every flush, observers must agree with
//! their sources.
//!
//! 1. Structural consistency survives any operation sequence.
//! 2. After a flush, every continuously active observer has seen its
//!    source's current value, and the computed cell is up to date.
//! 3. Writes between two flushes coalesce into at most one notification.
//! 4. An edit-script mirror stays equal to its source across edits,
//!    flushes and rebinds.

use std::cell::RefCell;
use std::rc::Rc;

use proptest::prelude::*;
use ripple_diff::EditScript;
use ripple_runtime::{Cell, Observer, Owner, Runtime, Source};

// ── Helpers ─────────────────────────────────────────────────────────────

const CELLS: usize = 4;
const OBSERVERS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Set(usize, i32),
    Flush,
    /// Target index: a plain cell, `CELLS` for the computed cell, anything
    /// above for a fixed value.
    Bind(usize, usize),
    Detach(usize),
    /// Index `CELLS` relocates the computed cell.
    Relocate(usize),
    Toggle(usize),
    Dispose(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..CELLS, -50..50i32).prop_map(|(c, v)| Op::Set(c, v)),
        2 => Just(Op::Flush),
        3 => (0..OBSERVERS, 0..CELLS + 2).prop_map(|(o, t)| Op::Bind(o, t)),
        1 => (0..OBSERVERS).prop_map(Op::Detach),
        1 => (0..=CELLS).prop_map(Op::Relocate),
        1 => (0..2usize).prop_map(Op::Toggle),
        // The computed cell reads cells 0 and 1; only the others are disposed.
        1 => (2..CELLS).prop_map(Op::Dispose),
    ]
}

struct Graph {
    rt: Runtime,
    cells: Vec<Cell<i32>>,
    sum: Cell<i32>,
    owners: [Owner; 2],
    observers: Vec<Observer<i32>>,
    seen: Vec<Rc<RefCell<Option<i32>>>>,
    /// Cleared while an observer may have missed a delivery.
    trusted: Vec<bool>,
}

impl Graph {
    fn new() -> Self {
        let mut rt = Runtime::new();
        let cells: Vec<_> = (0..CELLS as i32).map(|v| rt.cell(v)).collect();
        let sum = rt
            .combine((cells[0], cells[1]))
            .map(|a: &i32, b: &i32| a + b);
        let owners = [rt.owner(), rt.owner()];
        let mut observers = Vec::new();
        let mut seen = Vec::new();
        for i in 0..OBSERVERS {
            let last: Rc<RefCell<Option<i32>>> = Rc::default();
            let sink = Rc::clone(&last);
            observers.push(rt.observer::<i32, _>(owners[i % 2], move |_, v: &i32| {
                *sink.borrow_mut() = Some(*v);
            }));
            seen.push(last);
        }
        Self {
            rt,
            cells,
            sum,
            owners,
            observers,
            seen,
            trusted: vec![false; OBSERVERS],
        }
    }

    fn owner_of(&self, observer: usize) -> Owner {
        self.owners[observer % 2]
    }

    fn target(&self, index: usize) -> Option<Cell<i32>> {
        match index {
            i if i < CELLS => Some(self.cells[i]),
            i if i == CELLS => Some(self.sum),
            _ => None,
        }
    }

    fn apply(&mut self, op: &Op) {
        match *op {
            Op::Set(c, v) => self.rt.set(self.cells[c], v),
            Op::Flush => {
                self.rt.flush();
            }
            Op::Bind(o, t) => {
                let obs = self.observers[o];
                match self.target(t) {
                    Some(cell) if self.rt.is_pending(cell) => return,
                    Some(cell) => self.rt.assign(obs, cell),
                    None => self.rt.assign(obs, Source::Fixed(1000 + t as i32)),
                }
                self.trusted[o] = self.rt.is_active(self.owner_of(o));
            }
            Op::Detach(o) => {
                let obs = self.observers[o];
                if self.rt.source_of(obs).is_some() {
                    self.rt.detach(obs);
                }
            }
            Op::Relocate(c) if c == CELLS => self.sum = self.rt.relocate(self.sum),
            Op::Relocate(c) => self.cells[c] = self.rt.relocate(self.cells[c]),
            Op::Toggle(k) => {
                let owner = self.owners[k];
                let active = !self.rt.is_active(owner);
                self.rt.set_active(owner, active);
                if !active {
                    for o in (0..OBSERVERS).filter(|o| o % 2 == k) {
                        self.trusted[o] = false;
                    }
                }
            }
            Op::Dispose(c) => {
                self.rt.dispose(self.cells[c]);
                self.cells[c] = self.rt.cell(0);
            }
        }
    }

    fn check_settled(&self) -> Result<(), TestCaseError> {
        prop_assert_eq!(self.rt.pending_len(), 0);
        prop_assert_eq!(
            *self.rt.get_once(self.sum),
            self.rt.get_once(self.cells[0]) + self.rt.get_once(self.cells[1])
        );
        for o in 0..OBSERVERS {
            if !self.trusted[o] {
                continue;
            }
            if let Some(value) = self.rt.read_source(self.observers[o]) {
                prop_assert_eq!(*self.seen[o].borrow(), Some(*value), "observer {}", o);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum ListOp {
    Push(usize, u8),
    Insert(usize, usize, u8),
    Remove(usize, usize),
    Replace(usize, Vec<u8>),
    Rebind(usize),
    Flush,
}

fn list_op() -> impl Strategy<Value = ListOp> {
    prop_oneof![
        (0..3usize, 0u8..5).prop_map(|(c, v)| ListOp::Push(c, v)),
        (0..3usize, any::<usize>(), 0u8..5).prop_map(|(c, i, v)| ListOp::Insert(c, i, v)),
        (0..3usize, any::<usize>()).prop_map(|(c, i)| ListOp::Remove(c, i)),
        (0..3usize, proptest::collection::vec(0u8..5, 0..8))
            .prop_map(|(c, v)| ListOp::Replace(c, v)),
        (0..3usize).prop_map(ListOp::Rebind),
        Just(ListOp::Flush),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1–2. Random operation sequences
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn graph_stays_consistent(ops in proptest::collection::vec(op(), 0..60)) {
        let mut graph = Graph::new();
        for op in &ops {
            graph.apply(op);
            if let Err(violation) = graph.rt.verify() {
                return Err(TestCaseError::fail(format!("after {op:?}: {violation}")));
            }
            if matches!(op, Op::Flush) {
                graph.check_settled()?;
            }
        }
        graph.rt.flush();
        graph.check_settled()?;
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Coalescing
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn writes_coalesce(initial in -5..5i32, writes in proptest::collection::vec(-5..5i32, 1..20)) {
        let mut rt = Runtime::new();
        let cell = rt.cell(initial);
        let seen: Rc<RefCell<Vec<i32>>> = Rc::default();
        let sink = Rc::clone(&seen);
        let owner = rt.owner();
        rt.observe(owner, cell, move |_, v: &i32| sink.borrow_mut().push(*v));
        seen.borrow_mut().clear();

        for &w in &writes {
            rt.set(cell, w);
        }
        let stats = rt.flush();
        let last = writes[writes.len() - 1];
        let changed = last != initial;

        prop_assert_eq!(stats.settled, 1);
        prop_assert_eq!(stats.notified, usize::from(changed));
        prop_assert_eq!(stats.skipped, usize::from(!changed));
        let expected = if changed { vec![last] } else { Vec::new() };
        prop_assert_eq!(&*seen.borrow(), &expected);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Edit-script mirrors
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn mirror_tracks_edits_and_rebinds(
        starts in proptest::collection::vec(proptest::collection::vec(0u8..5, 0..6), 3),
        ops in proptest::collection::vec(list_op(), 0..40),
    ) {
        let mut rt = Runtime::new();
        let lists: Vec<Cell<Vec<u8>>> = starts.into_iter().map(|v| rt.cell(v)).collect();
        let mirror: Rc<RefCell<Vec<u8>>> = Rc::default();
        let sink = Rc::clone(&mirror);
        let owner = rt.owner();
        let obs = rt.observe(owner, lists[0], move |_, script: &EditScript<u8>| {
            script.apply(&mut *sink.borrow_mut(), |v| *v);
        });

        for op in &ops {
            match op {
                ListOp::Push(c, v) => rt.get_mut(lists[*c]).push(*v),
                ListOp::Insert(c, i, v) => {
                    let list = rt.get_mut(lists[*c]);
                    let at = i % (list.len() + 1);
                    list.insert(at, *v);
                }
                ListOp::Remove(c, i) => {
                    let list = rt.get_mut(lists[*c]);
                    if !list.is_empty() {
                        let at = i % list.len();
                        list.remove(at);
                    }
                }
                ListOp::Replace(c, v) => rt.set(lists[*c], v.clone()),
                ListOp::Rebind(c) => {
                    if rt.is_pending(lists[*c]) {
                        continue;
                    }
                    rt.assign(obs, lists[*c]);
                    prop_assert_eq!(&*mirror.borrow(), rt.get_once(lists[*c]));
                }
                ListOp::Flush => {
                    rt.flush();
                    prop_assert_eq!(Some(&*mirror.borrow()), rt.read_source(obs));
                }
            }
        }
        rt.flush();
        prop_assert_eq!(Some(&*mirror.borrow()), rt.read_source(obs));
        prop_assert!(rt.verify().is_ok());
    }
}
