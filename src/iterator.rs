//! Range-bounded iterator state machine (spec §4.7): wraps an engine cursor
//! and applies prefix framing plus closed/open lower and upper bounds.
//!
//! Modeled on `reference-snapshot/storage/sled/src/scan_index.rs`'s
//! `SledIndexScanner`, which wraps a `sled::Iter`/`Rev<sled::Iter>`,
//! computes an effective direction, and applies a prefix guard before
//! yielding — generalized here from `sled` specifically to any collaborator
//! implementing [`Engine`].

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::key::{Key, KeyList};

/// Minimal collaborator interface an embedding storage engine implements
/// (spec §6's "engine cursor interface").
pub trait Engine {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns an iterator over `(physical key, value)` pairs starting at
    /// or after (ascending) / at or before (descending) `start_key`.
    fn iter<'a>(
        &'a self,
        start_key: &[u8],
        reverse: bool,
    ) -> Box<dyn Iterator<Item = std::result::Result<(Vec<u8>, Vec<u8>), Self::Error>> + 'a>;
}

#[derive(Clone)]
struct Bound {
    key: Key,
    inclusive: bool,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// Spec.md's range-bounded cursor. Configure with `set_lo`/`set_hi`/
/// `set_prefix`/`set_exact`/`set_max`, prime with `forward`/`reverse`, then
/// drive with repeated calls to `next`.
pub struct RangeIter<'e, E: Engine> {
    engine: &'e E,
    prefix: Vec<u8>,
    lo: Option<Bound>,
    hi: Option<Bound>,
    max: i64,
    cursor: Option<Box<dyn Iterator<Item = std::result::Result<(Vec<u8>, Vec<u8>), E::Error>> + 'e>>,
    stop: Option<Bound>,
    direction: Direction,
    started: bool,
    done: bool,
    current: Option<(Vec<u8>, Vec<u8>)>,
    keys: Option<KeyList>,
}

impl<'e, E: Engine> RangeIter<'e, E> {
    /// `prefix` must be non-empty: `reverse()` seeks from
    /// `next_greater(prefix)`, which is undefined for an empty prefix
    /// (spec.md §9's open issue).
    pub fn new(engine: &'e E, prefix: &[u8]) -> Result<Self> {
        if prefix.is_empty() {
            return Err(Error::TypeMismatch("range iterator prefix must not be empty".into()));
        }
        Ok(RangeIter {
            engine,
            prefix: prefix.to_vec(),
            lo: None,
            hi: None,
            max: -1,
            cursor: None,
            stop: None,
            direction: Direction::Forward,
            started: false,
            done: false,
            current: None,
            keys: None,
        })
    }

    pub fn set_lo(&mut self, key: Key, closed: bool) -> &mut Self {
        self.lo = Some(Bound { key, inclusive: closed });
        self
    }

    pub fn set_hi(&mut self, key: Key, closed: bool) -> &mut Self {
        self.hi = Some(Bound { key, inclusive: closed });
        self
    }

    pub fn set_prefix(&mut self, key: Key) -> &mut Self {
        let hi = key.next_greater();
        self.lo = Some(Bound { key, inclusive: true });
        self.hi = hi.map(|k| Bound { key: k, inclusive: false });
        self
    }

    pub fn set_exact(&mut self, key: Key) -> &mut Self {
        self.hi = Some(Bound { key: key.clone(), inclusive: true });
        self.lo = Some(Bound { key, inclusive: true });
        self
    }

    pub fn set_max(&mut self, n: i64) -> &mut Self {
        self.max = n;
        self
    }

    fn passes(bound: &Bound, candidate: &Key, want_ge: bool) -> bool {
        let ord = candidate.cmp(&bound.key);
        if want_ge {
            if bound.inclusive {
                ord != std::cmp::Ordering::Less
            } else {
                ord == std::cmp::Ordering::Greater
            }
        } else if bound.inclusive {
            ord != std::cmp::Ordering::Greater
        } else {
            ord == std::cmp::Ordering::Less
        }
    }

    /// Decodes `self.prefix` stripped off the raw key, honoring any
    /// boundary reported by the underlying engine cursor.
    fn decode_current(&self, raw_key: &[u8]) -> Result<Option<Key>> {
        if !raw_key.starts_with(&self.prefix) {
            return Ok(None);
        }
        Ok(Some(Key::from_bytes_private(&raw_key[self.prefix.len()..])))
    }

    fn advance_raw(&mut self) -> Result<bool> {
        let cursor = self.cursor.as_mut().expect("primed before next");
        match cursor.next() {
            None => Ok(false),
            Some(Ok(pair)) => {
                self.current = Some(pair);
                Ok(true)
            }
            Some(Err(e)) => Err(Error::Engine(Box::new(e))),
        }
    }

    fn step_and_check(&mut self, is_first: bool) -> Result<bool> {
        if !is_first && !self.advance_raw()? {
            return Ok(false);
        }
        let (raw_key, raw_value) = self.current.clone().expect("current set");
        let Some(key) = self.decode_current(&raw_key)? else {
            debug!("range iterator left prefix, ending");
            return Ok(false);
        };
        if let Some(stop) = &self.stop {
            let want_ge = self.direction == Direction::Reverse; // stop==lo in reverse
            if !Self::passes(stop, &key, want_ge) {
                return Ok(false);
            }
        }
        match KeyList::decode_private(&self.prefix, &raw_key) {
            Ok(Some(list)) => self.keys = Some(list),
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("corrupt physical record during range scan: {e}");
                return Err(e);
            }
        }
        let _ = raw_value;
        Ok(true)
    }

    /// Primes the cursor for ascending iteration.
    pub fn forward(&mut self) -> Result<bool> {
        self.direction = Direction::Forward;
        self.stop = self.hi.clone();
        let start = self.lo.as_ref().map(|b| b.key.to_raw(&self.prefix)).unwrap_or_else(|| self.prefix.clone());
        debug!(prefix = ?self.prefix, ?start, "priming forward range scan");
        self.cursor = Some(self.engine.iter(&start, false));
        self.started = false;
        self.done = false;

        if !self.advance_raw()? {
            self.done = true;
            return Ok(false);
        }
        loop {
            let (raw_key, _) = self.current.clone().unwrap();
            let Some(key) = self.decode_current(&raw_key)? else {
                self.done = true;
                return Ok(false);
            };
            if let Some(lo) = &self.lo {
                if !Self::passes(lo, &key, true) {
                    if !self.advance_raw()? {
                        self.done = true;
                        return Ok(false);
                    }
                    continue;
                }
            }
            break;
        }
        match self.step_and_check(true)? {
            true => Ok(true),
            false => {
                self.done = true;
                Ok(false)
            }
        }
    }

    /// Primes the cursor for descending iteration.
    pub fn reverse(&mut self) -> Result<bool> {
        self.direction = Direction::Reverse;
        self.stop = self.lo.clone();
        let start = match &self.hi {
            Some(b) => b.key.to_raw(&self.prefix),
            None => match Key::from_bytes_private(&self.prefix).next_greater() {
                Some(k) => k.to_vec(),
                None => return Err(Error::TypeMismatch("prefix has no next_greater, cannot reverse".into())),
            },
        };
        debug!(prefix = ?self.prefix, ?start, "priming reverse range scan");
        self.cursor = Some(self.engine.iter(&start, true));
        self.started = false;
        self.done = false;

        loop {
            if !self.advance_raw()? {
                self.done = true;
                return Ok(false);
            }
            let (raw_key, _) = self.current.clone().unwrap();
            let Some(key) = self.decode_current(&raw_key)? else {
                continue;
            };
            if let Some(hi) = &self.hi {
                if !Self::passes(hi, &key, false) {
                    continue;
                }
            }
            break;
        }
        match self.step_and_check(true)? {
            true => Ok(true),
            false => {
                self.done = true;
                Ok(false)
            }
        }
    }

    /// Advances one step. Returns `Ok(false)` at end of range.
    pub fn next(&mut self) -> Result<bool> {
        if self.done {
            return Ok(false);
        }
        if self.max == 0 {
            self.done = true;
            return Ok(false);
        }
        if self.max > 0 {
            self.max -= 1;
        }
        if !self.started {
            self.started = true;
            // priming already populated `keys` for the first record.
            return Ok(self.keys.is_some());
        }
        let ok = self.step_and_check(false)?;
        if !ok {
            self.done = true;
        }
        Ok(ok)
    }

    pub fn keys(&self) -> Option<&KeyList> { self.keys.as_ref() }

    pub fn value(&self) -> Option<&[u8]> { self.current.as_ref().map(|(_, v)| v.as_slice()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use std::cell::RefCell;
    use std::collections::BTreeMap;

    struct MapEngine {
        data: RefCell<BTreeMap<Vec<u8>, Vec<u8>>>,
    }

    impl MapEngine {
        fn new(pairs: &[(&[u8], &[u8])]) -> Self {
            let mut map = BTreeMap::new();
            for (k, v) in pairs {
                map.insert(k.to_vec(), v.to_vec());
            }
            MapEngine { data: RefCell::new(map) }
        }
    }

    #[derive(Debug, thiserror::Error)]
    #[error("map engine error")]
    struct MapError;

    impl Engine for MapEngine {
        type Error = MapError;

        fn iter<'a>(
            &'a self,
            start_key: &[u8],
            reverse: bool,
        ) -> Box<dyn Iterator<Item = std::result::Result<(Vec<u8>, Vec<u8>), Self::Error>> + 'a> {
            let data = self.data.borrow();
            let snapshot: Vec<(Vec<u8>, Vec<u8>)> = data.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            if reverse {
                let start = start_key.to_vec();
                Box::new(snapshot.into_iter().rev().filter(move |(k, _)| k.as_slice() <= start.as_slice()).map(Ok))
            } else {
                let start = start_key.to_vec();
                Box::new(snapshot.into_iter().filter(move |(k, _)| k.as_slice() >= start.as_slice()).map(Ok))
            }
        }
    }

    fn key_of(n: i64) -> Vec<u8> {
        let mut out = b"c".to_vec();
        Element::Int(n).encode(&mut out).unwrap();
        out
    }

    fn engine_1_to_5() -> MapEngine {
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = (1..=5).map(|n| (key_of(n), vec![n as u8])).collect();
        MapEngine { data: RefCell::new(pairs.into_iter().collect()) }
    }

    fn collect_forward(it: &mut RangeIter<MapEngine>) -> Vec<i64> {
        let mut out = Vec::new();
        let mut ok = it.forward().unwrap();
        while ok {
            if let Some(list) = it.keys() {
                for k in &list.keys {
                    if let Element::Int(v) = k.get(0).unwrap() {
                        out.push(v);
                    }
                }
            }
            ok = it.next().unwrap();
        }
        out
    }

    #[test]
    fn unbounded_forward_yields_all() {
        let engine = engine_1_to_5();
        let mut it = RangeIter::new(&engine, b"c").unwrap();
        assert_eq!(collect_forward(&mut it), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn closed_lower_open_upper() {
        let engine = engine_1_to_5();
        let mut it = RangeIter::new(&engine, b"c").unwrap();
        it.set_lo(Key::from_elements(&[Element::Int(2)]).unwrap(), true);
        it.set_hi(Key::from_elements(&[Element::Int(4)]).unwrap(), false);
        assert_eq!(collect_forward(&mut it), vec![2, 3]);
    }

    #[test]
    fn open_lower_closed_upper() {
        let engine = engine_1_to_5();
        let mut it = RangeIter::new(&engine, b"c").unwrap();
        it.set_lo(Key::from_elements(&[Element::Int(2)]).unwrap(), false);
        it.set_hi(Key::from_elements(&[Element::Int(4)]).unwrap(), true);
        assert_eq!(collect_forward(&mut it), vec![3, 4]);
    }

    #[test]
    fn both_closed() {
        let engine = engine_1_to_5();
        let mut it = RangeIter::new(&engine, b"c").unwrap();
        it.set_lo(Key::from_elements(&[Element::Int(2)]).unwrap(), true);
        it.set_hi(Key::from_elements(&[Element::Int(4)]).unwrap(), true);
        assert_eq!(collect_forward(&mut it), vec![2, 3, 4]);
    }

    #[test]
    fn max_zero_yields_nothing() {
        let engine = engine_1_to_5();
        let mut it = RangeIter::new(&engine, b"c").unwrap();
        it.set_max(0);
        assert_eq!(collect_forward(&mut it), Vec::<i64>::new());
    }

    #[test]
    fn set_exact_yields_single() {
        let engine = engine_1_to_5();
        let mut it = RangeIter::new(&engine, b"c").unwrap();
        it.set_exact(Key::from_elements(&[Element::Int(3)]).unwrap());
        assert_eq!(collect_forward(&mut it), vec![3]);
    }

}
