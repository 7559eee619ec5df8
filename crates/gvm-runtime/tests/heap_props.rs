//! Allocator and collector properties checked over random workloads.

use gvm_runtime::objects::{array, primitive};
use gvm_runtime::{Heap, RuntimeError, Tag, UNASSIGNED};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Alloc(usize),
    Free(usize),
    Collect,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..40).prop_map(Op::Alloc),
        2 => any::<usize>().prop_map(Op::Free),
        1 => Just(Op::Collect),
    ]
}

proptest! {
    /// Blocks always tile the arena, free lists agree with the headers and
    /// rooted payloads are never disturbed.
    #[test]
    fn partition_survives_random_workload(ops in prop::collection::vec(op(), 1..120)) {
        let mut heap = Heap::new(1 << 12).unwrap();
        let mut live: Vec<(usize, i64)> = Vec::new();
        let mut next = 0i64;
        for op in ops {
            match op {
                Op::Alloc(words) => match heap.alloc(Tag::Bytes, words) {
                    Ok(addr) => {
                        heap.write(addr, 0, next as u64);
                        heap.push_root(addr);
                        live.push((addr, next));
                        next += 1;
                    }
                    Err(RuntimeError::OutOfMemory { .. }) => {}
                    Err(e) => panic!("unexpected error {}", e),
                },
                Op::Free(i) if !live.is_empty() => {
                    let (addr, _) = live.remove(i % live.len());
                    heap.release_roots(0);
                    for &(a, _) in &live {
                        heap.push_root(a);
                    }
                    heap.free(addr);
                }
                Op::Free(_) => {}
                Op::Collect => heap.mark_and_sweep(),
            }
            heap.check_invariants().unwrap();
            let words: usize = heap.blocks().iter().map(|b| b.words).sum();
            prop_assert_eq!(words, heap.capacity());
            for &(addr, stamp) in &live {
                prop_assert!(!heap.is_free(addr));
                prop_assert_eq!(heap.read(addr, 0), stamp as u64);
            }
        }
    }
}

#[test]
fn sentinel_occupies_first_block() {
    let heap = Heap::new(64).unwrap();
    let first = heap.blocks()[0];
    assert_eq!(first.addr, UNASSIGNED);
    assert_eq!(first.words, 1);
    assert!(!first.free);
}

#[test]
fn odd_capacity_rounds_down() {
    let heap = Heap::new(100).unwrap();
    assert_eq!(heap.capacity(), 64);
    assert_eq!(Heap::new(3).unwrap_err(), RuntimeError::InvalidCapacity(3));
}

#[test]
fn collection_reclaims_garbage_and_merges_buddies() {
    let mut heap = Heap::new(256).unwrap();
    let baseline = heap.free_words();
    for i in 0..10 {
        primitive::new_int(&mut heap, i).unwrap();
    }
    assert!(heap.free_words() < baseline);
    heap.mark_and_sweep();
    assert_eq!(heap.free_words(), baseline);
    assert_eq!(heap.stats().blocks_freed, 10);
    heap.check_invariants().unwrap();
}

#[test]
fn allocation_collects_when_full() {
    let mut heap = Heap::new(128).unwrap();
    let keep = array::create(&mut heap, 3).unwrap();
    heap.push_root(keep);
    let one = primitive::new_int(&mut heap, 1).unwrap();
    array::set(&mut heap, keep, 0, one).unwrap();
    // Far more garbage than the arena holds.
    for i in 0..200 {
        primitive::new_int(&mut heap, i).unwrap();
    }
    assert!(heap.stats().collections > 0);
    assert_eq!(primitive::int_value(&heap, array::get(&heap, keep, 0).unwrap()), 1);
}

#[test]
fn rooted_data_exhausts_memory() {
    let mut heap = Heap::new(64).unwrap();
    let mut err = None;
    for _ in 0..64 {
        match array::create(&mut heap, 6) {
            Ok(a) => heap.push_root(a),
            Err(e) => {
                err = Some(e);
                break;
            }
        }
    }
    assert!(matches!(err, Some(RuntimeError::OutOfMemory { .. })));
}
