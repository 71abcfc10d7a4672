//! Borrow / invalidate protocol (spec §4.6): lets a `Key` share bytes owned
//! by another object (an engine page buffer) until that object is about to
//! reclaim them, at which point the `Key` copies its slice out.
//!
//! The concurrency model (spec §5) is single-threaded cooperative, so this
//! is built on `Rc`/`RefCell`/`Weak` rather than atomics. Unlike
//! `reference-snapshot/core/src/util/ivec.rs`'s intrusive-feeling manual
//! `Drop` bookkeeping, Rust's ownership rules make a truly intrusive
//! doubly-linked sink list either unsafe-heavy or dependent on a crate the
//! teacher never pulls in, so the registry below is a plain `Vec` of weak
//! references — see `DESIGN.md`'s Open Question decision.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::{Rc, Weak};

/// Capability implemented by an object that owns a byte buffer and wants to
/// let `Key`s borrow slices of it.
pub trait Source {
    fn bytes(&self) -> &[u8];
}

#[derive(Debug)]
pub(crate) enum SinkState {
    Borrowed { source: Rc<dyn Source>, range: Range<usize> },
    Invalidated(Vec<u8>),
}

pub(crate) type SinkCell = Rc<RefCell<SinkState>>;

/// Owned by a `Source` implementor; tracks every `Key` currently sharing
/// its buffer so they can be notified before it goes away.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: RefCell<Vec<Weak<RefCell<SinkState>>>>,
}

impl SinkRegistry {
    pub fn new() -> Self { Self::default() }

    pub(crate) fn listen(&self, sink: &SinkCell) { self.sinks.borrow_mut().push(Rc::downgrade(sink)); }

    pub(crate) fn cancel(&self, sink: &SinkCell) {
        self.sinks.borrow_mut().retain(|w| w.upgrade().map_or(false, |s| !Rc::ptr_eq(&s, sink)));
    }

    /// Copies every live sink's borrowed range out of the source before it
    /// is reclaimed. Idempotent: sinks already invalidated are untouched,
    /// and the list is drained either way.
    pub fn notify(&self) {
        for weak in self.sinks.borrow_mut().drain(..) {
            if let Some(sink) = weak.upgrade() {
                let mut state = sink.borrow_mut();
                if let SinkState::Borrowed { source, range } = &*state {
                    let copy = source.bytes()[range.clone()].to_vec();
                    *state = SinkState::Invalidated(copy);
                }
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize { self.sinks.borrow().len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestSource(Vec<u8>);
    impl Source for TestSource {
        fn bytes(&self) -> &[u8] { &self.0 }
    }

    #[test]
    fn notify_invalidates_all_sinks() {
        let registry = SinkRegistry::new();
        let source: Rc<dyn Source> = Rc::new(TestSource(vec![1, 2, 3, 4, 5]));

        let sink_a: SinkCell = Rc::new(RefCell::new(SinkState::Borrowed { source: source.clone(), range: 0..2 }));
        let sink_b: SinkCell = Rc::new(RefCell::new(SinkState::Borrowed { source: source.clone(), range: 2..5 }));
        registry.listen(&sink_a);
        registry.listen(&sink_b);
        assert_eq!(registry.len(), 2);

        registry.notify();

        match &*sink_a.borrow() {
            SinkState::Invalidated(bytes) => assert_eq!(bytes, &[1, 2]),
            _ => panic!("expected sink_a to be invalidated"),
        }
        match &*sink_b.borrow() {
            SinkState::Invalidated(bytes) => assert_eq!(bytes, &[3, 4, 5]),
            _ => panic!("expected sink_b to be invalidated"),
        }
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn cancel_removes_a_sink_before_notify() {
        let registry = SinkRegistry::new();
        let source: Rc<dyn Source> = Rc::new(TestSource(vec![9, 9, 9]));
        let sink: SinkCell = Rc::new(RefCell::new(SinkState::Borrowed { source, range: 0..1 }));
        registry.listen(&sink);
        registry.cancel(&sink);
        assert_eq!(registry.len(), 0);
        registry.notify();
        assert!(matches!(&*sink.borrow(), SinkState::Borrowed { .. }));
    }
}
