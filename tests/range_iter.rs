//! End-to-end exercise of the range iterator against an in-memory engine,
//! driving only the public API, in the shape of `storage/sled/tests/*.rs`.

mod common;

use ankurah_tuplekey::{index, Element, Key, RangeIter};
use common::{init_tracing, MemoryEngine};

fn seed(engine: &MemoryEngine, prefix: &[u8], rows: &[(&str, i64)]) {
    for (i, (name, score)) in rows.iter().enumerate() {
        let key = Key::from_elements(&[Element::Text((*name).into()), Element::Int(*score)]).unwrap();
        engine.put(key.to_raw(prefix), vec![i as u8]);
    }
}

fn collect_names(it: &mut RangeIter<MemoryEngine>) -> Vec<String> {
    let mut out = Vec::new();
    let mut ok = it.forward().unwrap();
    while ok {
        if let Some(list) = it.keys() {
            for k in &list.keys {
                if let Element::Text(s) = k.get(0).unwrap() {
                    out.push(s);
                }
            }
        }
        ok = it.next().unwrap();
    }
    out
}

#[test]
fn forward_scan_over_multi_element_tuples() {
    init_tracing();
    let engine = MemoryEngine::new();
    seed(&engine, b"people", &[("alice", 10), ("bob", 20), ("carol", 30)]);

    let mut it = RangeIter::new(&engine, b"people").unwrap();
    assert_eq!(collect_names(&mut it), vec!["alice", "bob", "carol"]);
}

#[test]
fn reverse_scan_yields_descending_order() {
    init_tracing();
    let engine = MemoryEngine::new();
    seed(&engine, b"people", &[("alice", 10), ("bob", 20), ("carol", 30)]);

    let mut it = RangeIter::new(&engine, b"people").unwrap();
    let mut names = Vec::new();
    let mut ok = it.reverse().unwrap();
    while ok {
        if let Some(list) = it.keys() {
            for k in &list.keys {
                if let Element::Text(s) = k.get(0).unwrap() {
                    names.push(s);
                }
            }
        }
        ok = it.next().unwrap();
    }
    assert_eq!(names, vec!["carol", "bob", "alice"]);
}

#[test]
fn set_prefix_narrows_to_a_single_tuple_component() {
    init_tracing();
    let engine = MemoryEngine::new();
    seed(&engine, b"people", &[("bob", 1), ("bob", 2), ("carol", 3)]);

    let mut it = RangeIter::new(&engine, b"people").unwrap();
    it.set_prefix(Key::from_elements(&[Element::Text("bob".into())]).unwrap());
    let mut scores = Vec::new();
    let mut ok = it.forward().unwrap();
    while ok {
        if let Some(list) = it.keys() {
            if let Element::Int(n) = list.keys[0].get(1).unwrap() {
                scores.push(n);
            }
        }
        ok = it.next().unwrap();
    }
    assert_eq!(scores, vec![1, 2]);
}

#[test]
fn set_max_limits_yielded_records() {
    init_tracing();
    let engine = MemoryEngine::new();
    seed(&engine, b"people", &[("alice", 1), ("bob", 2), ("carol", 3)]);

    let mut it = RangeIter::new(&engine, b"people").unwrap();
    it.set_max(2);
    assert_eq!(collect_names(&mut it), vec!["alice", "bob"]);
}

#[test]
fn index_key_builder_round_trips_through_a_scan() {
    init_tracing();
    let engine = MemoryEngine::new();
    let alice = Key::from_elements(&[Element::Text("alice".into())]).unwrap();
    let bob = Key::from_elements(&[Element::Text("bob".into())]).unwrap();

    for (parent, age) in [(&alice, 30i64), (&bob, 25i64)] {
        let idx_key = index::build_key(b"by_age", &Element::Int(age), parent).unwrap();
        engine.put(idx_key, Vec::new());
    }

    let mut it = RangeIter::new(&engine, b"by_age").unwrap();
    let mut ages = Vec::new();
    let mut ok = it.forward().unwrap();
    while ok {
        if let Some(list) = it.keys() {
            if let Element::Int(n) = list.keys[0].get(0).unwrap() {
                ages.push(n);
            }
        }
        ok = it.next().unwrap();
    }
    assert_eq!(ages, vec![25, 30]);
}
