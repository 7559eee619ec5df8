//! Doubly linked list of addresses, used for wait-lists.
//!
//! List layout: header + [len, head, tail]
//! Node layout: header + [value, prev, next]
//! `UNASSIGNED` terminates both directions.

use crate::error::Result;
use crate::heap::{Addr, Heap, UNASSIGNED};
use crate::objects::Tag;

const FIELD_LEN: usize = 0;
const FIELD_HEAD: usize = 1;
const FIELD_TAIL: usize = 2;

const NODE_VALUE: usize = 0;
const NODE_PREV: usize = 1;
const NODE_NEXT: usize = 2;

pub fn create(heap: &mut Heap) -> Result<Addr> {
    heap.alloc(Tag::List, 3)
}

#[inline]
pub fn len(heap: &Heap, l: Addr) -> usize {
    heap.read(l, FIELD_LEN) as usize
}

#[inline]
pub fn is_empty(heap: &Heap, l: Addr) -> bool {
    len(heap, l) == 0
}

pub fn push_back(heap: &mut Heap, l: Addr, val: Addr) -> Result<()> {
    let node = heap.with_roots(&[l, val], |h| h.alloc(Tag::ListNode, 3))?;
    let tail = heap.read_addr(l, FIELD_TAIL);
    heap.write_addr(node, NODE_VALUE, val);
    heap.write_addr(node, NODE_PREV, tail);
    if tail == UNASSIGNED {
        heap.write_addr(l, FIELD_HEAD, node);
    } else {
        heap.write_addr(tail, NODE_NEXT, node);
    }
    heap.write_addr(l, FIELD_TAIL, node);
    let n = len(heap, l);
    heap.write(l, FIELD_LEN, (n + 1) as u64);
    Ok(())
}

pub fn pop_front(heap: &mut Heap, l: Addr) -> Option<Addr> {
    let head = heap.read_addr(l, FIELD_HEAD);
    if head == UNASSIGNED {
        return None;
    }
    let val = heap.read_addr(head, NODE_VALUE);
    unlink(heap, l, head);
    Some(val)
}

/// Remove the first node holding `val`. Returns whether one was found.
pub fn remove(heap: &mut Heap, l: Addr, val: Addr) -> bool {
    let mut node = heap.read_addr(l, FIELD_HEAD);
    while node != UNASSIGNED {
        if heap.read_addr(node, NODE_VALUE) == val {
            unlink(heap, l, node);
            return true;
        }
        node = heap.read_addr(node, NODE_NEXT);
    }
    false
}

/// Remove and return the first value satisfying `pred`.
pub fn take_first(heap: &mut Heap, l: Addr, pred: impl Fn(&Heap, Addr) -> bool) -> Option<Addr> {
    let mut node = heap.read_addr(l, FIELD_HEAD);
    while node != UNASSIGNED {
        let val = heap.read_addr(node, NODE_VALUE);
        if pred(heap, val) {
            unlink(heap, l, node);
            return Some(val);
        }
        node = heap.read_addr(node, NODE_NEXT);
    }
    None
}

pub fn clear(heap: &mut Heap, l: Addr) {
    heap.write(l, FIELD_LEN, 0);
    heap.write_addr(l, FIELD_HEAD, UNASSIGNED);
    heap.write_addr(l, FIELD_TAIL, UNASSIGNED);
}

pub fn values(heap: &Heap, l: Addr) -> Vec<Addr> {
    let mut out = Vec::with_capacity(len(heap, l));
    let mut node = heap.read_addr(l, FIELD_HEAD);
    while node != UNASSIGNED {
        out.push(heap.read_addr(node, NODE_VALUE));
        node = heap.read_addr(node, NODE_NEXT);
    }
    out
}

fn unlink(heap: &mut Heap, l: Addr, node: Addr) {
    let prev = heap.read_addr(node, NODE_PREV);
    let next = heap.read_addr(node, NODE_NEXT);
    if prev == UNASSIGNED {
        heap.write_addr(l, FIELD_HEAD, next);
    } else {
        heap.write_addr(prev, NODE_NEXT, next);
    }
    if next == UNASSIGNED {
        heap.write_addr(l, FIELD_TAIL, prev);
    } else {
        heap.write_addr(next, NODE_PREV, prev);
    }
    let n = len(heap, l);
    heap.write(l, FIELD_LEN, (n - 1) as u64);
}

pub fn children(heap: &Heap, l: Addr) -> Vec<Addr> {
    vec![heap.read_addr(l, FIELD_HEAD), heap.read_addr(l, FIELD_TAIL)]
}

pub fn node_children(heap: &Heap, node: Addr) -> Vec<Addr> {
    vec![
        heap.read_addr(node, NODE_VALUE),
        heap.read_addr(node, NODE_PREV),
        heap.read_addr(node, NODE_NEXT),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::primitive;

    fn filled(heap: &mut Heap, vals: &[i64]) -> (Addr, Vec<Addr>) {
        let l = create(heap).unwrap();
        heap.push_root(l);
        let mut addrs = Vec::new();
        for &v in vals {
            let a = primitive::new_int(heap, v).unwrap();
            push_back(heap, l, a).unwrap();
            addrs.push(a);
        }
        (l, addrs)
    }

    #[test]
    fn test_fifo_order() {
        let mut heap = Heap::new(256).unwrap();
        let (l, addrs) = filled(&mut heap, &[1, 2, 3]);
        assert_eq!(values(&heap, l), addrs);
        assert_eq!(pop_front(&mut heap, l), Some(addrs[0]));
        assert_eq!(len(&heap, l), 2);
    }

    #[test]
    fn test_remove_middle_and_ends() {
        let mut heap = Heap::new(256).unwrap();
        let (l, addrs) = filled(&mut heap, &[1, 2, 3, 4]);
        assert!(remove(&mut heap, l, addrs[1]));
        assert!(remove(&mut heap, l, addrs[3]));
        assert!(!remove(&mut heap, l, addrs[3]));
        assert_eq!(values(&heap, l), vec![addrs[0], addrs[2]]);
        assert!(remove(&mut heap, l, addrs[0]));
        assert!(remove(&mut heap, l, addrs[2]));
        assert!(is_empty(&heap, l));
        assert_eq!(pop_front(&mut heap, l), None);
        // Reusable after draining.
        push_back(&mut heap, l, addrs[1]).unwrap();
        assert_eq!(values(&heap, l), vec![addrs[1]]);
    }

    #[test]
    fn test_take_first_matching() {
        let mut heap = Heap::new(256).unwrap();
        let (l, addrs) = filled(&mut heap, &[5, 6, 7]);
        let even = take_first(&mut heap, l, |h, a| primitive::int_value(h, a) % 2 == 0);
        assert_eq!(even, Some(addrs[1]));
        assert_eq!(values(&heap, l), vec![addrs[0], addrs[2]]);
        assert_eq!(take_first(&mut heap, l, |_, _| false), None);
    }

    #[test]
    fn test_nodes_survive_collection() {
        let mut heap = Heap::new(256).unwrap();
        let (l, addrs) = filled(&mut heap, &[1, 2, 3]);
        heap.mark_and_sweep();
        assert_eq!(values(&heap, l), addrs);
        assert_eq!(primitive::int_value(&heap, addrs[2]), 3);
    }
}
