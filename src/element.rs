//! Tag-dispatched element codec (spec §4.3): every element is written as
//! `kind-tag ‖ body`, self-delimiting so a tuple needs no inter-element
//! separator.

use crate::bytestring;
use crate::error::{Error, Result};
use crate::timestamp::Timestamp;
use crate::varint;

/// On-disk tag byte identifying an element's type. Values are part of the
/// wire format and must never change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ElementKind {
    Null = 15,
    NegInt = 20,
    Int = 21,
    Bool = 30,
    Blob = 40,
    Text = 50,
    Uuid = 90,
    NegTime = 91,
    Time = 92,
    Sep = 102,
}

impl ElementKind {
    fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            15 => ElementKind::Null,
            20 => ElementKind::NegInt,
            21 => ElementKind::Int,
            30 => ElementKind::Bool,
            40 => ElementKind::Blob,
            50 => ElementKind::Text,
            90 => ElementKind::Uuid,
            91 => ElementKind::NegTime,
            92 => ElementKind::Time,
            102 => ElementKind::Sep,
            other => return Err(Error::Corrupt(format!("unknown element tag {other:#x}"))),
        })
    }
}

/// A decoded tuple element.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    Null,
    Bool(bool),
    Int(i64),
    Blob(Vec<u8>),
    Text(String),
    #[cfg(feature = "uuid")]
    Uuid(uuid::Uuid),
    #[cfg(not(feature = "uuid"))]
    Uuid([u8; 16]),
    Time(Timestamp),
    /// Emitted only internally by the tuple codec; never produced by
    /// `decode` at the top level (a SEP marks a tuple boundary instead).
    Sep,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Null => ElementKind::Null,
            Element::Bool(_) => ElementKind::Bool,
            Element::Int(v) if *v < 0 => ElementKind::NegInt,
            Element::Int(_) => ElementKind::Int,
            Element::Blob(_) => ElementKind::Blob,
            Element::Text(_) => ElementKind::Text,
            Element::Uuid(_) => ElementKind::Uuid,
            Element::Time(ts) => {
                if ts.millis_since_epoch < 0 {
                    ElementKind::NegTime
                } else {
                    ElementKind::Time
                }
            }
            Element::Sep => ElementKind::Sep,
        }
    }

    /// Appends this element's tag and body to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(self.kind() as u8);
        match self {
            Element::Null => {}
            Element::Bool(b) => out.push(*b as u8),
            Element::Int(v) => {
                if *v < 0 {
                    varint::encode(out, v.unsigned_abs(), true);
                } else {
                    varint::encode(out, *v as u64, false);
                }
            }
            Element::Blob(bytes) => bytestring::encode(out, bytes),
            Element::Text(s) => bytestring::encode(out, s.as_bytes()),
            #[cfg(feature = "uuid")]
            Element::Uuid(u) => out.extend_from_slice(u.as_bytes()),
            #[cfg(not(feature = "uuid"))]
            Element::Uuid(bytes) => out.extend_from_slice(bytes),
            Element::Time(ts) => {
                let (magnitude, negative) = ts.pack()?;
                varint::encode(out, magnitude, negative);
            }
            Element::Sep => {}
        }
        Ok(())
    }

    /// Decodes one element starting at `buf[0]`, returning
    /// `(element, bytes consumed)`.
    pub fn decode(buf: &[u8]) -> Result<(Element, usize)> {
        let tag = *buf.first().ok_or(Error::Truncated { needed: 1, found: 0 })?;
        let kind = ElementKind::from_tag(tag)?;
        let body = &buf[1..];
        let (el, body_len) = match kind {
            ElementKind::Null => (Element::Null, 0),
            ElementKind::Bool => {
                let b = *body.first().ok_or(Error::Truncated { needed: 1, found: 0 })?;
                (Element::Bool(b != 0), 1)
            }
            ElementKind::Int => {
                let (v, n) = varint::decode(body, false)?;
                (Element::Int(v as i64), n)
            }
            ElementKind::NegInt => {
                let (v, n) = varint::decode(body, true)?;
                (Element::Int(-(v as i64)), n)
            }
            ElementKind::Blob => {
                let (bytes, n) = bytestring::decode(body)?;
                (Element::Blob(bytes), n)
            }
            ElementKind::Text => {
                let (bytes, n) = bytestring::decode(body)?;
                let s = String::from_utf8(bytes).map_err(|e| Error::Corrupt(format!("invalid utf-8 in text element: {e}")))?;
                (Element::Text(s), n)
            }
            ElementKind::Uuid => {
                if body.len() < 16 {
                    return Err(Error::Truncated { needed: 16, found: body.len() });
                }
                let mut raw = [0u8; 16];
                raw.copy_from_slice(&body[..16]);
                #[cfg(feature = "uuid")]
                let el = Element::Uuid(uuid::Uuid::from_bytes(raw));
                #[cfg(not(feature = "uuid"))]
                let el = Element::Uuid(raw);
                (el, 16)
            }
            ElementKind::Time => {
                let (magnitude, n) = varint::decode(body, false)?;
                (Element::Time(Timestamp::unpack(magnitude, false)?), n)
            }
            ElementKind::NegTime => {
                let (magnitude, n) = varint::decode(body, true)?;
                (Element::Time(Timestamp::unpack(magnitude, true)?), n)
            }
            ElementKind::Sep => (Element::Sep, 0),
        };
        Ok((el, 1 + body_len))
    }

    /// Advances past one element without materialising its payload.
    pub fn skip(buf: &[u8]) -> Result<usize> {
        let tag = *buf.first().ok_or(Error::Truncated { needed: 1, found: 0 })?;
        let kind = ElementKind::from_tag(tag)?;
        let body = &buf[1..];
        let body_len = match kind {
            ElementKind::Null | ElementKind::Sep => 0,
            ElementKind::Bool => {
                if body.is_empty() {
                    return Err(Error::Truncated { needed: 1, found: 0 });
                }
                1
            }
            ElementKind::Int => varint::skip_with(body, false)?,
            ElementKind::NegInt => varint::skip_with(body, true)?,
            ElementKind::Blob | ElementKind::Text => skip_bytestring(body)?,
            ElementKind::Uuid => {
                if body.len() < 16 {
                    return Err(Error::Truncated { needed: 16, found: body.len() });
                }
                16
            }
            ElementKind::Time => varint::skip_with(body, false)?,
            ElementKind::NegTime => varint::skip_with(body, true)?,
        };
        Ok(1 + body_len)
    }
}

/// Advances past an escaped byte-string's body bytes (top bit set) plus its
/// `0x00` terminator, without decoding.
fn skip_bytestring(buf: &[u8]) -> Result<usize> {
    let mut i = 0;
    loop {
        match buf.get(i) {
            None => return Err(Error::Truncated { needed: i + 1, found: buf.len() }),
            Some(&b) if b == 0x00 => return Ok(i + 1),
            Some(_) => i += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(el: Element) {
        let mut out = Vec::new();
        el.encode(&mut out).unwrap();
        let (decoded, consumed) = Element::decode(&out).unwrap();
        assert_eq!(decoded, el);
        assert_eq!(consumed, out.len());
        assert_eq!(Element::skip(&out).unwrap(), out.len());
    }

    #[test]
    fn null_bool() {
        roundtrip(Element::Null);
        roundtrip(Element::Bool(true));
        roundtrip(Element::Bool(false));
    }

    #[test]
    fn integers() {
        for v in [0i64, 1, -1, 240, 241, -240, -241, i64::MAX, i64::MIN + 1] {
            roundtrip(Element::Int(v));
        }
    }

    #[test]
    fn blob_and_text() {
        roundtrip(Element::Blob(vec![]));
        roundtrip(Element::Blob(vec![0, 1, 255]));
        roundtrip(Element::Text(String::new()));
        roundtrip(Element::Text("hello".into()));
    }

    #[test]
    fn tag_order_matches_type_ordering() {
        // NULL < NEG_INT < INT < BOOL < BLOB < TEXT < UUID < NEG_TIME < TIME < SEP
        assert!(ElementKind::Null < ElementKind::NegInt);
        assert!(ElementKind::NegInt < ElementKind::Int);
        assert!(ElementKind::Int < ElementKind::Bool);
        assert!(ElementKind::Bool < ElementKind::Blob);
        assert!(ElementKind::Blob < ElementKind::Text);
        assert!(ElementKind::Text < ElementKind::Uuid);
        assert!(ElementKind::Uuid < ElementKind::NegTime);
        assert!(ElementKind::NegTime < ElementKind::Time);
        assert!(ElementKind::Time < ElementKind::Sep);
    }

    #[test]
    fn unknown_tag_is_corrupt() {
        assert!(matches!(Element::decode(&[0xAB]), Err(Error::Corrupt(_))));
    }

    #[test]
    fn negative_sorts_before_positive() {
        let mut neg = Vec::new();
        Element::Int(-5).encode(&mut neg).unwrap();
        let mut pos = Vec::new();
        Element::Int(5).encode(&mut pos).unwrap();
        assert!(neg < pos);
    }
}
