//! Fixed-length arrays of element addresses.
//!
//! Layout: header + [len, elem0, elem1, ...]
//! Arrays also back stacks, queues and slices.

use crate::error::Result;
use crate::heap::{Addr, Heap};
use crate::objects::{seq, Tag};

/// Array of `len` unassigned elements.
pub fn create(heap: &mut Heap, len: usize) -> Result<Addr> {
    seq::create(heap, Tag::Array, len)
}

pub fn from_elems(heap: &mut Heap, elems: &[Addr]) -> Result<Addr> {
    let arr = heap.with_roots(elems, |h| create(h, elems.len()))?;
    for (i, &e) in elems.iter().enumerate() {
        raw_set(heap, arr, i, e);
    }
    Ok(arr)
}

#[inline]
pub fn len(heap: &Heap, arr: Addr) -> usize {
    seq::len(heap, arr)
}

/// Bounds-checked element read.
pub fn get(heap: &Heap, arr: Addr, index: i64) -> Result<Addr> {
    let i = seq::check(heap, arr, index)?;
    Ok(seq::raw_get(heap, arr, i))
}

/// Bounds-checked element write.
pub fn set(heap: &mut Heap, arr: Addr, index: i64, val: Addr) -> Result<()> {
    let i = seq::check(heap, arr, index)?;
    seq::raw_set(heap, arr, i, val);
    Ok(())
}

#[inline]
pub fn raw_get(heap: &Heap, arr: Addr, i: usize) -> Addr {
    seq::raw_get(heap, arr, i)
}

#[inline]
pub fn raw_set(heap: &mut Heap, arr: Addr, i: usize, val: Addr) {
    seq::raw_set(heap, arr, i, val)
}

pub fn elems(heap: &Heap, arr: Addr) -> Vec<Addr> {
    seq::elems(heap, arr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::heap::UNASSIGNED;
    use crate::objects::primitive;

    #[test]
    fn test_bounds_checked() {
        let mut heap = Heap::new(128).unwrap();
        let arr = create(&mut heap, 3).unwrap();
        assert_eq!(get(&heap, arr, 2).unwrap(), UNASSIGNED);
        assert_eq!(
            get(&heap, arr, 3).unwrap_err(),
            RuntimeError::IndexOutOfRange { index: 3, len: 3 }
        );
        assert_eq!(
            set(&mut heap, arr, -1, UNASSIGNED).unwrap_err(),
            RuntimeError::IndexOutOfRange { index: -1, len: 3 }
        );
    }

    #[test]
    fn test_from_elems() {
        let mut heap = Heap::new(128).unwrap();
        let a = primitive::new_int(&mut heap, 1).unwrap();
        let b = heap.with_roots(&[a], |h| primitive::new_int(h, 2)).unwrap();
        let arr = from_elems(&mut heap, &[a, b]).unwrap();
        assert_eq!(elems(&heap, arr), vec![a, b]);
        assert_eq!(len(&heap, arr), 2);
    }
}
