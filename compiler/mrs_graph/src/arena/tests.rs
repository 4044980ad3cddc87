#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::*;

#[test]
fn test_insert_get_remove() {
    let mut arena: Arena<AttrId, &str> = Arena::new();
    let a = arena.insert("a");
    let b = arena.insert("b");
    assert_eq!(arena.len(), 2);
    assert_eq!(arena.get(a), Some(&"a"));

    assert_eq!(arena.remove(a), Some("a"));
    assert_eq!(arena.get(a), None);
    assert_eq!(arena.remove(a), None);
    assert_eq!(arena.len(), 1);
    assert_eq!(arena.get(b), Some(&"b"));
}

#[test]
fn test_stale_handle_after_slot_reuse() {
    let mut arena: Arena<ModuleId, u32> = Arena::new();
    let first = arena.insert(1);
    arena.remove(first);
    let second = arena.insert(2);

    assert_eq!(first.slot(), second.slot());
    assert_ne!(first, second);
    assert_eq!(arena.get(first), None);
    assert_eq!(arena.get(second), Some(&2));
    assert!(!arena.contains(first));
}

#[test]
fn test_iter_skips_removed() {
    let mut arena: Arena<AttrId, char> = Arena::new();
    let ids: Vec<_> = "abcd".chars().map(|c| arena.insert(c)).collect();
    arena.remove(ids[1]);
    let live: Vec<char> = arena.iter().map(|(_, c)| *c).collect();
    assert_eq!(live, vec!['a', 'c', 'd']);
    assert!(arena.iter().all(|(id, _)| arena.contains(id)));
}
