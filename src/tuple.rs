//! Tuple and multi-tuple packing (spec §4.4): a single tuple is just its
//! elements concatenated with no separator; a list of tuples is separated
//! by `SEP` bytes.

use crate::element::{Element, ElementKind};
use crate::error::Result;

const SEP: u8 = ElementKind::Sep as u8;

/// Appends `prefix` then each element of `tuple` in order.
pub fn pack(out: &mut Vec<u8>, prefix: &[u8], tuple: &[Element]) -> Result<()> {
    out.extend_from_slice(prefix);
    for el in tuple {
        el.encode(out)?;
    }
    Ok(())
}

/// Appends `prefix` then each tuple in `tuples`, separated by `SEP`.
pub fn packs(out: &mut Vec<u8>, prefix: &[u8], tuples: &[Vec<Element>]) -> Result<()> {
    out.extend_from_slice(prefix);
    for (i, tuple) in tuples.iter().enumerate() {
        if i > 0 {
            out.push(SEP);
        }
        for el in tuple {
            el.encode(out)?;
        }
    }
    Ok(())
}

/// Strips `prefix` and decodes the remaining bytes as one tuple, stopping
/// at a `SEP` byte or end of input. Returns `None` if `bytes` does not
/// start with `prefix` (spec.md's `PrefixMismatch`, signalled as an empty
/// result rather than an error).
pub fn unpack<'b>(prefix: &[u8], bytes: &'b [u8]) -> Option<Vec<Element>> {
    let rest = bytes.strip_prefix(prefix)?;
    unpack_one(rest).ok().map(|(tuple, _)| tuple)
}

/// Decodes one SEP-terminated (or end-of-buffer-terminated) tuple from the
/// front of `bytes`, returning `(tuple, bytes consumed including any SEP)`.
fn unpack_one(bytes: &[u8]) -> Result<(Vec<Element>, usize)> {
    let mut elements = Vec::new();
    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == SEP {
            pos += 1;
            return Ok((elements, pos));
        }
        let (el, n) = Element::decode(&bytes[pos..])?;
        elements.push(el);
        pos += n;
    }
    Ok((elements, pos))
}

/// Strips `prefix` and decodes the remaining bytes as a sequence of
/// `SEP`-framed tuples until exhaustion.
pub fn unpacks(prefix: &[u8], bytes: &[u8]) -> Option<Vec<Vec<Element>>> {
    let mut rest = bytes.strip_prefix(prefix)?;
    let mut tuples = Vec::new();
    loop {
        let (tuple, consumed) = unpack_one(rest).ok()?;
        tuples.push(tuple);
        if consumed >= rest.len() {
            break;
        }
        rest = &rest[consumed..];
    }
    Some(tuples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tuple_roundtrip() {
        let mut out = Vec::new();
        pack(&mut out, b"", &[]).unwrap();
        assert_eq!(out, Vec::<u8>::new());
        assert_eq!(unpack(b"", &out), Some(vec![]));
    }

    #[test]
    fn single_tuple_roundtrip() {
        let tuple = vec![Element::Int(1), Element::Text("hi".into())];
        let mut out = Vec::new();
        pack(&mut out, b"", &tuple).unwrap();
        assert_eq!(unpack(b"", &out), Some(tuple));
    }

    #[test]
    fn multi_tuple_roundtrip() {
        let tuples = vec![vec![Element::Int(1)], vec![Element::Int(2)]];
        let mut out = Vec::new();
        packs(&mut out, b"pre", &tuples).unwrap();
        assert!(out.starts_with(b"pre"));
        assert_eq!(unpacks(b"pre", &out), Some(tuples));
    }

    #[test]
    fn prefix_mismatch_is_none() {
        let mut out = Vec::new();
        pack(&mut out, b"pre", &[Element::Int(1)]).unwrap();
        assert_eq!(unpack(b"nope", &out), None);
        assert_eq!(unpacks(b"nope", &out), None);
    }

    #[test]
    fn tuple_order_matches_byte_order() {
        let a = vec![Element::Int(1)];
        let b = vec![Element::Int(2)];
        let mut ea = Vec::new();
        let mut eb = Vec::new();
        pack(&mut ea, b"", &a).unwrap();
        pack(&mut eb, b"", &b).unwrap();
        assert!(ea < eb);
    }

    #[test]
    fn empty_tuple_sorts_first() {
        let mut empty = Vec::new();
        pack(&mut empty, b"", &[]).unwrap();
        let mut non_empty = Vec::new();
        pack(&mut non_empty, b"", &[Element::Null]).unwrap();
        assert!(empty < non_empty);
    }
}
