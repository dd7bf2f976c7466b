use super::*;
use crate::define_idx;
use std::sync::{Arc, Mutex};

define_idx!(pub struct TestId);

#[test]
fn push_returns_sequential_ids() {
    let mut v: IndexVec<TestId, &str> = IndexVec::new();
    let a = v.push("a");
    let b = v.push("b");
    assert_eq!(a.index(), 0);
    assert_eq!(b.index(), 1);
    assert_eq!(v.len(), 2);
}

#[test]
fn index_and_index_mut_round_trip() {
    let mut v: IndexVec<TestId, i32> = IndexVec::new();
    let id = v.push(10);
    assert_eq!(v[id], 10);
    v[id] = 20;
    assert_eq!(v[id], 20);
}

#[test]
fn get_returns_none_out_of_bounds() {
    let v: IndexVec<TestId, i32> = IndexVec::new();
    assert!(v.get(TestId::from_usize(0)).is_none());
}

#[test]
fn iter_enumerated_yields_ids_in_order() {
    let mut v: IndexVec<TestId, &str> = IndexVec::new();
    v.push("a");
    v.push("b");
    v.push("c");
    let collected: Vec<_> = v.iter_enumerated().map(|(id, s)| (id.index(), *s)).collect();
    assert_eq!(collected, vec![(0, "a"), (1, "b"), (2, "c")]);
}

#[test]
fn swap_remove_replaces_with_last() {
    let mut v: IndexVec<TestId, i32> = IndexVec::new();
    v.push(1);
    v.push(2);
    v.push(3);
    let removed = v.swap_remove(TestId::from_usize(0));
    assert_eq!(removed, 1);
    assert_eq!(v.as_slice(), &[3, 2]);
}

#[test]
fn resize_with_grows_and_fills() {
    let mut v: IndexVec<TestId, i32> = IndexVec::new();
    v.push(1);
    v.resize_with(4, || 0);
    assert_eq!(v.as_slice(), &[1, 0, 0, 0]);
}

#[test]
fn clear_empties_without_changing_capacity_invariant() {
    let mut v: IndexVec<TestId, i32> = IndexVec::new();
    v.push(1);
    v.push(2);
    v.clear();
    assert!(v.is_empty());
    assert_eq!(v.len(), 0);
}

#[test]
fn define_idx_macro_produces_distinct_types() {
    define_idx!(struct OtherId);
    let a = TestId::from_usize(3);
    let b = OtherId::from_usize(3);
    assert_eq!(a.index(), b.index());
}

#[test]
fn index_vec_is_send_and_sync_for_send_sync_elements() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<IndexVec<TestId, i32>>();
}

#[test]
fn concurrent_reads_over_shared_index_vec() {
    let mut v: IndexVec<TestId, i32> = IndexVec::new();
    for i in 0..100 {
        v.push(i);
    }
    let shared = Arc::new(Mutex::new(v));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let shared = Arc::clone(&shared);
        handles.push(std::thread::spawn(move || {
            let guard = shared.lock().unwrap();
            guard.len()
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap(), 100);
    }
}

#[test]
fn into_iter_enumerated_consumes_in_order() {
    let mut v: IndexVec<TestId, i32> = IndexVec::new();
    v.push(10);
    v.push(20);
    let collected: Vec<_> = v.into_iter_enumerated().collect();
    assert_eq!(collected[0].0.index(), 0);
    assert_eq!(collected[1].1, 20);
}
