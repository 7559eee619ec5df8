//! FIFO ring buffer of addresses.
//!
//! Layout: header + [head, len, items]
//! Bounded users (channel buffers) call `try_push`; unbounded users call
//! `push`, which doubles the backing array when full.

use crate::error::Result;
use crate::heap::{Addr, Heap, UNASSIGNED};
use crate::objects::{array, Tag};

const FIELD_HEAD: usize = 0;
const FIELD_LEN: usize = 1;
const FIELD_ITEMS: usize = 2;

pub fn create(heap: &mut Heap, capacity: usize) -> Result<Addr> {
    let items = array::create(heap, capacity)?;
    let q = heap.with_roots(&[items], |h| h.alloc(Tag::Queue, 3))?;
    heap.write_addr(q, FIELD_ITEMS, items);
    Ok(q)
}

#[inline]
pub fn len(heap: &Heap, q: Addr) -> usize {
    heap.read(q, FIELD_LEN) as usize
}

#[inline]
pub fn is_empty(heap: &Heap, q: Addr) -> bool {
    len(heap, q) == 0
}

#[inline]
fn items(heap: &Heap, q: Addr) -> Addr {
    heap.read_addr(q, FIELD_ITEMS)
}

#[inline]
pub fn capacity(heap: &Heap, q: Addr) -> usize {
    array::len(heap, items(heap, q))
}

#[inline]
pub fn is_full(heap: &Heap, q: Addr) -> bool {
    len(heap, q) == capacity(heap, q)
}

/// Append without growing. Returns false when full.
pub fn try_push(heap: &mut Heap, q: Addr, val: Addr) -> bool {
    if is_full(heap, q) {
        return false;
    }
    let cap = capacity(heap, q);
    let head = heap.read(q, FIELD_HEAD) as usize;
    let n = len(heap, q);
    let items = items(heap, q);
    array::raw_set(heap, items, (head + n) % cap, val);
    heap.write(q, FIELD_LEN, (n + 1) as u64);
    true
}

/// Append, doubling the backing array when full.
pub fn push(heap: &mut Heap, q: Addr, val: Addr) -> Result<()> {
    if is_full(heap, q) {
        let old = items_vec(heap, q);
        let new_cap = (old.len() * 2).max(4);
        let grown = heap.with_roots(&[q, val], |h| array::create(h, new_cap))?;
        for (i, &e) in old.iter().enumerate() {
            array::raw_set(heap, grown, i, e);
        }
        heap.write_addr(q, FIELD_ITEMS, grown);
        heap.write(q, FIELD_HEAD, 0);
    }
    try_push(heap, q, val);
    Ok(())
}

pub fn pop(heap: &mut Heap, q: Addr) -> Option<Addr> {
    let n = len(heap, q);
    if n == 0 {
        return None;
    }
    let head = heap.read(q, FIELD_HEAD) as usize;
    let items = items(heap, q);
    let val = array::raw_get(heap, items, head);
    array::raw_set(heap, items, head, UNASSIGNED);
    heap.write(q, FIELD_HEAD, ((head + 1) % array::len(heap, items)) as u64);
    heap.write(q, FIELD_LEN, (n - 1) as u64);
    Some(val)
}

/// Contents from oldest to newest.
pub fn items_vec(heap: &Heap, q: Addr) -> Vec<Addr> {
    let items = items(heap, q);
    let cap = array::len(heap, items);
    let head = heap.read(q, FIELD_HEAD) as usize;
    (0..len(heap, q))
        .map(|i| array::raw_get(heap, items, (head + i) % cap))
        .collect()
}

pub fn children(heap: &Heap, q: Addr) -> Vec<Addr> {
    vec![items(heap, q)]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_wraps() {
        let mut heap = Heap::new(128).unwrap();
        let q = create(&mut heap, 2).unwrap();
        assert!(try_push(&mut heap, q, 10));
        assert!(try_push(&mut heap, q, 11));
        assert!(!try_push(&mut heap, q, 12));
        assert_eq!(pop(&mut heap, q), Some(10));
        assert!(try_push(&mut heap, q, 12));
        assert_eq!(items_vec(&heap, q), vec![11, 12]);
        assert_eq!(pop(&mut heap, q), Some(11));
        assert_eq!(pop(&mut heap, q), Some(12));
        assert_eq!(pop(&mut heap, q), None);
    }

    #[test]
    fn test_zero_capacity_never_accepts() {
        let mut heap = Heap::new(64).unwrap();
        let q = create(&mut heap, 0).unwrap();
        assert!(is_full(&heap, q));
        assert!(!try_push(&mut heap, q, 1));
        assert_eq!(pop(&mut heap, q), None);
    }

    #[test]
    fn test_growable_keeps_order() {
        let mut heap = Heap::new(256).unwrap();
        let q = create(&mut heap, 0).unwrap();
        heap.push_root(q);
        // Raw addresses of the sentinel stand in for values here.
        for _ in 0..3 {
            push(&mut heap, q, UNASSIGNED).unwrap();
        }
        pop(&mut heap, q);
        for _ in 0..5 {
            push(&mut heap, q, UNASSIGNED).unwrap();
        }
        assert_eq!(len(&heap, q), 7);
        assert_eq!(capacity(&heap, q), 8);
    }
}
