//! Growable LIFO of addresses, used for operand and return stacks.
//!
//! Layout: header + [len, items]
//! `items` is an Array whose length is the current capacity.

use crate::error::{Result, RuntimeError};
use crate::heap::{Addr, Heap, UNASSIGNED};
use crate::objects::{array, Tag};

const FIELD_LEN: usize = 0;
const FIELD_ITEMS: usize = 1;
const INITIAL_CAPACITY: usize = 4;

pub fn create(heap: &mut Heap) -> Result<Addr> {
    let items = array::create(heap, INITIAL_CAPACITY)?;
    let s = heap.with_roots(&[items], |h| h.alloc(Tag::Stack, 2))?;
    heap.write_addr(s, FIELD_ITEMS, items);
    Ok(s)
}

#[inline]
pub fn len(heap: &Heap, s: Addr) -> usize {
    heap.read(s, FIELD_LEN) as usize
}

#[inline]
pub fn is_empty(heap: &Heap, s: Addr) -> bool {
    len(heap, s) == 0
}

#[inline]
fn items(heap: &Heap, s: Addr) -> Addr {
    heap.read_addr(s, FIELD_ITEMS)
}

pub fn push(heap: &mut Heap, s: Addr, val: Addr) -> Result<()> {
    let n = len(heap, s);
    let mut items = items(heap, s);
    let cap = array::len(heap, items);
    if n == cap {
        let grown = heap.with_roots(&[s, val], |h| array::create(h, cap * 2))?;
        for i in 0..n {
            let e = array::raw_get(heap, items, i);
            array::raw_set(heap, grown, i, e);
        }
        heap.write_addr(s, FIELD_ITEMS, grown);
        items = grown;
    }
    array::raw_set(heap, items, n, val);
    heap.write(s, FIELD_LEN, (n + 1) as u64);
    Ok(())
}

pub fn pop(heap: &mut Heap, s: Addr) -> Result<Addr> {
    let n = len(heap, s);
    if n == 0 {
        return Err(RuntimeError::StackUnderflow);
    }
    let items = items(heap, s);
    let val = array::raw_get(heap, items, n - 1);
    array::raw_set(heap, items, n - 1, UNASSIGNED);
    heap.write(s, FIELD_LEN, (n - 1) as u64);
    Ok(val)
}

pub fn peek(heap: &Heap, s: Addr) -> Result<Addr> {
    let n = len(heap, s);
    if n == 0 {
        return Err(RuntimeError::StackUnderflow);
    }
    Ok(array::raw_get(heap, items(heap, s), n - 1))
}

/// Contents from bottom to top.
pub fn items_vec(heap: &Heap, s: Addr) -> Vec<Addr> {
    let items = items(heap, s);
    (0..len(heap, s)).map(|i| array::raw_get(heap, items, i)).collect()
}

pub fn children(heap: &Heap, s: Addr) -> Vec<Addr> {
    vec![items(heap, s)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::primitive;

    #[test]
    fn test_push_pop_grow() {
        let mut heap = Heap::new(512).unwrap();
        let s = create(&mut heap).unwrap();
        heap.push_root(s);
        for i in 0..10 {
            let v = primitive::new_int(&mut heap, i).unwrap();
            push(&mut heap, s, v).unwrap();
        }
        assert_eq!(len(&heap, s), 10);
        assert_eq!(primitive::int_value(&heap, peek(&heap, s).unwrap()), 9);
        let vals: Vec<i64> = items_vec(&heap, s)
            .iter()
            .map(|&a| primitive::int_value(&heap, a))
            .collect();
        assert_eq!(vals, (0..10).collect::<Vec<_>>());
        for i in (0..10).rev() {
            let v = pop(&mut heap, s).unwrap();
            assert_eq!(primitive::int_value(&heap, v), i);
        }
        assert_eq!(pop(&mut heap, s).unwrap_err(), RuntimeError::StackUnderflow);
        assert_eq!(peek(&heap, s).unwrap_err(), RuntimeError::StackUnderflow);
    }

    #[test]
    fn test_contents_survive_collection() {
        let mut heap = Heap::new(256).unwrap();
        let s = create(&mut heap).unwrap();
        heap.push_root(s);
        for i in 0..6 {
            let v = primitive::new_int(&mut heap, i).unwrap();
            push(&mut heap, s, v).unwrap();
        }
        heap.mark_and_sweep();
        let top = pop(&mut heap, s).unwrap();
        assert_eq!(primitive::int_value(&heap, top), 5);
        heap.check_invariants().unwrap();
    }
}
