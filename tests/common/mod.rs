//! Shared test harness: an in-memory [`ankurah_tuplekey::Engine`] plus a
//! one-shot tracing init, in the shape of `storage/sled/tests/common.rs`'s
//! `init_tracing` helper.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Once;

use ankurah_tuplekey::Engine;

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

#[derive(Debug, thiserror::Error)]
#[error("memory engine error")]
pub struct MemoryEngineError;

/// A `BTreeMap`-backed stand-in for an embedded storage engine's cursor,
/// exercising [`ankurah_tuplekey::RangeIter`] against the public API only.
pub struct MemoryEngine {
    data: RefCell<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    pub fn new() -> Self { MemoryEngine { data: RefCell::new(BTreeMap::new()) } }

    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) { self.data.borrow_mut().insert(key, value); }
}

impl Engine for MemoryEngine {
    type Error = MemoryEngineError;

    fn iter<'a>(
        &'a self,
        start_key: &[u8],
        reverse: bool,
    ) -> Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>), Self::Error>> + 'a> {
        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = self.data.borrow().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        let start = start_key.to_vec();
        if reverse {
            Box::new(snapshot.into_iter().rev().filter(move |(k, _)| k.as_slice() <= start.as_slice()).map(Ok))
        } else {
            Box::new(snapshot.into_iter().filter(move |(k, _)| k.as_slice() >= start.as_slice()).map(Ok))
        }
    }
}
