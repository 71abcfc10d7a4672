//! The `Key` value type (spec §4.5): an immutable, hashable, orderable,
//! sliceable byte container with three storage modes.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::element::Element;
use crate::error::{Error, Result};
use crate::source::{SinkCell, SinkRegistry, SinkState, Source};

/// Inline capacity for the PRIVATE/COPIED small-buffer optimization. Chosen
/// to fit a handful of typical index-component encodings without heap
/// allocation; see `reference-snapshot/core/src/util/ivec.rs` for the
/// teacher's analogous small/large split (there generic over `T`, here
/// specialized to bytes since `u8` needs no manual `Drop`/`unsafe` dance).
const INLINE_CAP: usize = 23;

#[derive(Clone)]
enum PrivateBuf {
    Inline { buf: [u8; INLINE_CAP], len: u8 },
    Heap(Vec<u8>),
}

impl PrivateBuf {
    fn from_slice(bytes: &[u8]) -> Self {
        if bytes.len() <= INLINE_CAP {
            let mut buf = [0u8; INLINE_CAP];
            buf[..bytes.len()].copy_from_slice(bytes);
            PrivateBuf::Inline { buf, len: bytes.len() as u8 }
        } else {
            PrivateBuf::Heap(bytes.to_vec())
        }
    }

    fn as_slice(&self) -> &[u8] {
        match self {
            PrivateBuf::Inline { buf, len } => &buf[..*len as usize],
            PrivateBuf::Heap(v) => v,
        }
    }
}

enum Storage {
    Private(PrivateBuf),
    Shared(SinkCell),
}

/// Which of the three spec.md §4.5 storage modes a `Key` currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Private,
    Shared,
    Copied,
}

/// An immutable, order-preserving-encoded byte string.
pub struct Key {
    storage: Storage,
}

impl Key {
    /// Builds a PRIVATE key from already-encoded tuple elements.
    pub fn from_elements(elements: &[Element]) -> Result<Self> {
        let mut bytes = Vec::new();
        crate::tuple::pack(&mut bytes, b"", elements)?;
        Ok(Key::from_bytes_private(&bytes))
    }

    /// Wraps raw, already-encoded bytes as a PRIVATE key (no source).
    pub fn from_bytes_private(bytes: &[u8]) -> Self { Key { storage: Storage::Private(PrivateBuf::from_slice(bytes)) } }

    /// Wraps a byte range of `source`'s buffer as a SHARED key, registering
    /// with `registry` so it is invalidated (copied out) before the source
    /// reclaims its memory.
    pub fn from_source(source: Rc<dyn Source>, range: std::ops::Range<usize>, registry: &SinkRegistry) -> Self {
        let sink: SinkCell = Rc::new(RefCell::new(SinkState::Borrowed { source, range }));
        registry.listen(&sink);
        Key { storage: Storage::Shared(sink) }
    }

    pub fn mode(&self) -> StorageMode {
        match &self.storage {
            Storage::Private(_) => StorageMode::Private,
            Storage::Shared(cell) => match &*cell.borrow() {
                SinkState::Borrowed { .. } => StorageMode::Shared,
                SinkState::Invalidated(_) => StorageMode::Copied,
            },
        }
    }

    /// Exposes the raw encoded bytes. Shared storage borrows the source's
    /// buffer for the duration of the call's borrow guard; callers that
    /// need an owned copy should use `to_vec`.
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        match &self.storage {
            Storage::Private(buf) => f(buf.as_slice()),
            Storage::Shared(cell) => match &*cell.borrow() {
                SinkState::Borrowed { source, range } => f(&source.bytes()[range.clone()]),
                SinkState::Invalidated(bytes) => f(bytes),
            },
        }
    }

    pub fn to_vec(&self) -> Vec<u8> { self.with_bytes(|b| b.to_vec()) }

    pub fn len(&self) -> usize { self.with_bytes(|b| b.len()) }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    /// `prefix ‖ key bytes`.
    pub fn to_raw(&self, prefix: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(prefix.len() + self.len());
        out.extend_from_slice(prefix);
        self.with_bytes(|b| out.extend_from_slice(b));
        out
    }

    /// Decodes every element in this key, left to right.
    pub fn elements(&self) -> Result<Vec<Element>> {
        self.with_bytes(|bytes| {
            let mut out = Vec::new();
            let mut pos = 0;
            while pos < bytes.len() {
                let (el, n) = Element::decode(&bytes[pos..])?;
                out.push(el);
                pos += n;
            }
            Ok(out)
        })
    }

    /// Decodes the element at tuple index `i`. Negative indices count from
    /// the end, as in spec.md §4.5.
    pub fn get(&self, i: i64) -> Result<Element> {
        self.with_bytes(|bytes| {
            let offsets = element_offsets(bytes)?;
            let len = offsets.len();
            let idx = normalize_index(i, len)?;
            let (start, end) = offsets[idx];
            Ok(Element::decode(&bytes[start..end])?.0)
        })
    }

    /// Number of elements (skip-based, per spec.md §4.3's `skip_element`).
    pub fn tuple_len(&self) -> Result<usize> { self.with_bytes(|bytes| Ok(element_offsets(bytes)?.len())) }

    /// Slices elements `[a, b)` into a fresh PRIVATE key.
    pub fn slice(&self, a: i64, b: i64) -> Result<Key> {
        self.with_bytes(|bytes| {
            let offsets = element_offsets(bytes)?;
            let len = offsets.len();
            let start_idx = normalize_bound(a, len);
            let end_idx = normalize_bound(b, len);
            if start_idx > end_idx {
                return Ok(Key::from_bytes_private(&[]));
            }
            let start = offsets.get(start_idx).map(|(s, _)| *s).unwrap_or(bytes.len());
            let end = offsets.get(end_idx).map(|(s, _)| *s).unwrap_or(bytes.len());
            Ok(Key::from_bytes_private(&bytes[start..end]))
        })
    }

    /// Appends `tuple`'s encoding onto a copy of this key's bytes.
    pub fn concat_tuple(&self, tuple: &[Element]) -> Result<Key> {
        self.with_bytes(|bytes| {
            let mut out = bytes.to_vec();
            for el in tuple {
                el.encode(&mut out)?;
            }
            Ok(Key::from_bytes_private(&out))
        })
    }

    /// Byte-concatenates this key with another.
    pub fn concat_key(&self, other: &Key) -> Key {
        self.with_bytes(|a| other.with_bytes(|b| {
            let mut out = Vec::with_capacity(a.len() + b.len());
            out.extend_from_slice(a);
            out.extend_from_slice(b);
            Key::from_bytes_private(&out)
        }))
    }

    /// The smallest key strictly greater than `self` such that no
    /// encodable tuple extending `self` sorts between them. `None` if every
    /// byte of `self` is already `0xFF` (spec.md's `NoNextGreater`).
    pub fn next_greater(&self) -> Option<Key> {
        self.with_bytes(|bytes| {
            let mut out = bytes.to_vec();
            for i in (0..out.len()).rev() {
                if out[i] < 0xFF {
                    out[i] += 1;
                    out.truncate(i + 1);
                    return Some(Key::from_bytes_private(&out));
                }
            }
            None
        })
    }

    /// Compares against a decoded tuple by re-encoding it and streaming the
    /// byte comparison (spec.md §4.5).
    pub fn cmp_tuple(&self, tuple: &[Element]) -> Result<Ordering> {
        let mut encoded = Vec::new();
        crate::tuple::pack(&mut encoded, b"", tuple)?;
        Ok(self.with_bytes(|b| b.cmp(&encoded.as_slice())))
    }
}

impl Clone for Key {
    fn clone(&self) -> Self { Key::from_bytes_private(&self.to_vec()) }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with_bytes(|b| write!(f, "Key({b:02x?}, {:?})", self.mode()))
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool { self.with_bytes(|a| other.with_bytes(|b| a == b)) }
}
impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}
impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering { self.with_bytes(|a| other.with_bytes(|b| a.cmp(b))) }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // FNV-like multiply-and-xor over the raw bytes, per spec.md §4.5,
        // folded into the caller's Hasher so `Key` composes with any
        // standard hash-based collection.
        self.with_bytes(|bytes| {
            let mut h: u64 = 0;
            for &b in bytes {
                h = h.wrapping_mul(1_000_003) ^ b as u64;
            }
            state.write_u64(h);
        });
    }
}

/// `(start, end)` byte ranges of each top-level element in `bytes`.
fn element_offsets(bytes: &[u8]) -> Result<Vec<(usize, usize)>> {
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        let n = Element::skip(&bytes[pos..])?;
        out.push((pos, pos + n));
        pos += n;
    }
    Ok(out)
}

fn normalize_index(i: i64, len: usize) -> Result<usize> {
    let idx = if i < 0 { i + len as i64 } else { i };
    if idx < 0 || idx as usize >= len {
        return Err(Error::OutOfRange { index: i, len });
    }
    Ok(idx as usize)
}

/// Clamps a slice bound (which, unlike `get`, is allowed to equal `len`)
/// into `0..=len`.
fn normalize_bound(i: i64, len: usize) -> usize {
    let idx = if i < 0 { i + len as i64 } else { i };
    idx.clamp(0, len as i64) as usize
}

/// Decoded view over one physical record's `SEP`-framed keys (spec.md
/// §3's KeyList).
pub struct KeyList {
    pub keys: Vec<Key>,
}

impl KeyList {
    /// Decodes a PRIVATE `KeyList` from an owned buffer (no live source).
    pub fn decode_private(prefix: &[u8], bytes: &[u8]) -> Result<Option<KeyList>> {
        let Some(rest) = bytes.strip_prefix(prefix) else { return Ok(None) };
        let sep = crate::element::ElementKind::Sep as u8;
        let mut keys = Vec::new();
        let mut pos = 0;
        let mut start = 0;
        while pos < rest.len() {
            if rest[pos] == sep {
                keys.push(Key::from_bytes_private(&rest[start..pos]));
                pos += 1;
                start = pos;
                continue;
            }
            pos += Element::skip(&rest[pos..])?;
        }
        keys.push(Key::from_bytes_private(&rest[start..pos]));
        Ok(Some(KeyList { keys }))
    }

    /// Decodes a SHARED `KeyList` whose member keys borrow from `source`.
    pub fn decode_shared(prefix: &[u8], source: Rc<dyn Source>, registry: &SinkRegistry) -> Result<Option<KeyList>> {
        let full = source.bytes().to_vec();
        let Some(rest_start) = find_prefix_offset(&full, prefix) else { return Ok(None) };
        let sep = crate::element::ElementKind::Sep as u8;
        let mut keys = Vec::new();
        let mut pos = rest_start;
        let mut start = rest_start;
        while pos < full.len() {
            if full[pos] == sep {
                keys.push(Key::from_source(source.clone(), start..pos, registry));
                pos += 1;
                start = pos;
                continue;
            }
            pos += Element::skip(&full[pos..])?;
        }
        keys.push(Key::from_source(source.clone(), start..pos, registry));
        Ok(Some(KeyList { keys }))
    }
}

fn find_prefix_offset(bytes: &[u8], prefix: &[u8]) -> Option<usize> {
    if bytes.starts_with(prefix) {
        Some(prefix.len())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;

    #[test]
    fn private_roundtrip_and_ordering() {
        let a = Key::from_elements(&[Element::Int(1)]).unwrap();
        let b = Key::from_elements(&[Element::Int(2)]).unwrap();
        assert!(a < b);
        assert_eq!(a.mode(), StorageMode::Private);
    }

    #[test]
    fn get_and_tuple_len() {
        let k = Key::from_elements(&[Element::Int(1), Element::Text("hi".into())]).unwrap();
        assert_eq!(k.tuple_len().unwrap(), 2);
        assert_eq!(k.get(0).unwrap(), Element::Int(1));
        assert_eq!(k.get(-1).unwrap(), Element::Text("hi".into()));
        assert!(k.get(5).is_err());
    }

    #[test]
    fn slice_and_concat() {
        let k = Key::from_elements(&[Element::Int(1), Element::Int(2), Element::Int(3)]).unwrap();
        let mid = k.slice(1, 2).unwrap();
        assert_eq!(mid.elements().unwrap(), vec![Element::Int(2)]);
        let extended = k.concat_tuple(&[Element::Bool(true)]).unwrap();
        assert_eq!(extended.tuple_len().unwrap(), 4);
    }

    #[test]
    fn next_greater_absent_for_all_ff() {
        let k = Key::from_bytes_private(&[0xFF, 0xFF]);
        assert!(k.next_greater().is_none());
        let k2 = Key::from_bytes_private(&[0xFE, 0xFF]);
        let ng = k2.next_greater().unwrap();
        assert!(k2 < ng);
    }

    #[test]
    fn shared_key_invalidates_to_copied() {
        struct Buf(RefCell<Vec<u8>>);
        impl Source for Buf {
            fn bytes(&self) -> &[u8] {
                // SAFETY-free in tests: leak the borrow for the call's
                // duration via unsafe would be needed for a real mmap
                // source; here we just keep the buffer immutable after
                // construction.
                unsafe { &*self.0.as_ptr() }
            }
        }
        let registry = SinkRegistry::new();
        let source: Rc<dyn Source> = Rc::new(Buf(RefCell::new(vec![1, 2, 3, 4])));
        let key = Key::from_source(source, 1..3, &registry);
        assert_eq!(key.mode(), StorageMode::Shared);
        assert_eq!(key.to_vec(), vec![2, 3]);
        registry.notify();
        assert_eq!(key.mode(), StorageMode::Copied);
        assert_eq!(key.to_vec(), vec![2, 3]);
    }

    #[test]
    fn hash_matches_for_equal_keys() {
        use std::collections::hash_map::DefaultHasher;
        let a = Key::from_bytes_private(b"abc");
        let b = Key::from_bytes_private(b"abc");
        let mut ha = DefaultHasher::new();
        let mut hb = DefaultHasher::new();
        a.hash(&mut ha);
        b.hash(&mut hb);
        assert_eq!(ha.finish(), hb.finish());
    }
}
