//! Index key builder (spec §4.8), ported from
//! `reference-snapshot/storage/sled/src/index.rs`'s `Index::backfill` /
//! `encode_tuple_for_sled` (`prefix ‖ encoded-value ‖ 0 ‖ entity-id`),
//! generalized from "entity id" to "parent key".

use crate::element::{Element, ElementKind};
use crate::error::Result;
use crate::key::Key;

/// Builds `prefix ‖ encode(index_value) ‖ SEP ‖ encode(parent_key)`.
pub fn build_key(prefix: &[u8], index_value: &Element, parent_key: &Key) -> Result<Vec<u8>> {
    let mut out = prefix.to_vec();
    index_value.encode(&mut out)?;
    out.push(ElementKind::Sep as u8);
    parent_key.with_bytes(|b| out.extend_from_slice(b));
    Ok(out)
}

/// Builds one index entry per value yielded by `extractor` (spec.md §4.8:
/// an extractor may produce one index-value or a list of them), preserving
/// extractor-then-input order.
pub fn build_keys(prefix: &[u8], parent_key: &Key, values: &[Element]) -> Result<Vec<Vec<u8>>> {
    values.iter().map(|v| build_key(prefix, v, parent_key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_matches_prefix_value_sep_parent() {
        let parent = Key::from_elements(&[Element::Int(7)]).unwrap();
        let key = build_key(b"idx", &Element::Text("a".into()), &parent).unwrap();
        assert!(key.starts_with(b"idx"));
        assert!(key.ends_with(&parent.to_vec()));
        assert_eq!(key[key.len() - parent.len() - 1], ElementKind::Sep as u8);
    }

    #[test]
    fn build_keys_preserves_order() {
        let parent = Key::from_elements(&[Element::Int(1)]).unwrap();
        let values = vec![Element::Int(1), Element::Int(2), Element::Int(3)];
        let keys = build_keys(b"idx", &parent, &values).unwrap();
        assert_eq!(keys.len(), 3);
        for (k, v) in keys.iter().zip(values.iter()) {
            let expected = build_key(b"idx", v, &parent).unwrap();
            assert_eq!(k, &expected);
        }
    }
}
