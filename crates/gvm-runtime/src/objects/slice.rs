//! Slice object operations.
//!
//! Layout: header + [array, start, end]
//! A slice is a window `[start, end)` over an underlying array; its capacity
//! runs to the end of that array. The nil slice has array `UNASSIGNED`.

use crate::error::{Result, RuntimeError};
use crate::heap::{Addr, Heap, UNASSIGNED};
use crate::objects::{array, Tag};

pub const FIELD_ARRAY: usize = 0;
pub const FIELD_START: usize = 1;
pub const FIELD_END: usize = 2;

const MIN_GROWTH: usize = 4;

pub fn from_array_range(heap: &mut Heap, arr: Addr, start: usize, end: usize) -> Result<Addr> {
    let s = heap.with_roots(&[arr], |h| h.alloc(Tag::Slice, 3))?;
    heap.write_addr(s, FIELD_ARRAY, arr);
    heap.write(s, FIELD_START, start as u64);
    heap.write(s, FIELD_END, end as u64);
    Ok(s)
}

pub fn nil(heap: &mut Heap) -> Result<Addr> {
    from_array_range(heap, UNASSIGNED, 0, 0)
}

#[inline]
pub fn array_ref(heap: &Heap, s: Addr) -> Addr {
    heap.read_addr(s, FIELD_ARRAY)
}

#[inline]
pub fn start(heap: &Heap, s: Addr) -> usize {
    heap.read(s, FIELD_START) as usize
}

#[inline]
pub fn end(heap: &Heap, s: Addr) -> usize {
    heap.read(s, FIELD_END) as usize
}

#[inline]
pub fn len(heap: &Heap, s: Addr) -> usize {
    end(heap, s) - start(heap, s)
}

pub fn cap(heap: &Heap, s: Addr) -> usize {
    let arr = array_ref(heap, s);
    if arr == UNASSIGNED {
        0
    } else {
        array::len(heap, arr) - start(heap, s)
    }
}

fn check(heap: &Heap, s: Addr, index: i64) -> Result<usize> {
    let len = len(heap, s);
    if index < 0 || index as usize >= len {
        return Err(RuntimeError::IndexOutOfRange { index, len });
    }
    Ok(start(heap, s) + index as usize)
}

pub fn get(heap: &Heap, s: Addr, index: i64) -> Result<Addr> {
    let i = check(heap, s, index)?;
    Ok(array::raw_get(heap, array_ref(heap, s), i))
}

pub fn set(heap: &mut Heap, s: Addr, index: i64, val: Addr) -> Result<()> {
    let i = check(heap, s, index)?;
    let arr = array_ref(heap, s);
    array::raw_set(heap, arr, i, val);
    Ok(())
}

pub fn elems(heap: &Heap, s: Addr) -> Vec<Addr> {
    let arr = array_ref(heap, s);
    (start(heap, s)..end(heap, s))
        .map(|i| array::raw_get(heap, arr, i))
        .collect()
}

/// `s[low:high]`, with missing bounds defaulting to 0 and `len(s)`.
pub fn slice_of(heap: &mut Heap, s: Addr, low: Option<i64>, high: Option<i64>) -> Result<Addr> {
    let cap = cap(heap, s);
    let low = low.unwrap_or(0);
    let high = high.unwrap_or(len(heap, s) as i64);
    check_bounds(low, high, cap)?;
    let base = start(heap, s);
    let arr = array_ref(heap, s);
    from_array_range(heap, arr, base + low as usize, base + high as usize)
}

/// `arr[low:high]` over a whole array.
pub fn of_array(heap: &mut Heap, arr: Addr, low: Option<i64>, high: Option<i64>) -> Result<Addr> {
    let len = array::len(heap, arr);
    let low = low.unwrap_or(0);
    let high = high.unwrap_or(len as i64);
    check_bounds(low, high, len)?;
    from_array_range(heap, arr, low as usize, high as usize)
}

/// Validate `0 <= low <= high <= cap`.
pub fn check_bounds(low: i64, high: i64, cap: usize) -> Result<()> {
    if high < 0 || high as usize > cap {
        return Err(RuntimeError::IndexOutOfRange { index: high, len: cap });
    }
    if low < 0 || low > high {
        return Err(RuntimeError::IndexOutOfRange { index: low, len: high as usize });
    }
    Ok(())
}

/// Append `vals`, reusing the backing array while capacity allows and
/// otherwise growing it to double (at least 4).
pub fn append(heap: &mut Heap, s: Addr, vals: &[Addr]) -> Result<Addr> {
    let arr = array_ref(heap, s);
    let base = start(heap, s);
    let len = len(heap, s);
    let cap = cap(heap, s);
    let need = len + vals.len();

    if need <= cap {
        for (i, &v) in vals.iter().enumerate() {
            array::raw_set(heap, arr, base + len + i, v);
        }
        return from_array_range(heap, arr, base, base + need);
    }

    let new_cap = need.max(if cap == 0 { MIN_GROWTH } else { cap * 2 });
    let mut roots = vals.to_vec();
    roots.push(arr);
    let new_arr = heap.with_roots(&roots, |h| array::create(h, new_cap))?;
    for i in 0..len {
        let e = array::raw_get(heap, arr, base + i);
        array::raw_set(heap, new_arr, i, e);
    }
    for (i, &v) in vals.iter().enumerate() {
        array::raw_set(heap, new_arr, len + i, v);
    }
    from_array_range(heap, new_arr, 0, need)
}

pub fn children(heap: &Heap, s: Addr) -> Vec<Addr> {
    vec![array_ref(heap, s)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::primitive;

    fn ints(heap: &mut Heap, vals: &[i64]) -> Addr {
        let arr = array::create(heap, vals.len()).unwrap();
        heap.push_root(arr);
        for (i, &v) in vals.iter().enumerate() {
            let n = primitive::new_int(heap, v).unwrap();
            array::raw_set(heap, arr, i, n);
        }
        arr
    }

    fn values(heap: &Heap, s: Addr) -> Vec<i64> {
        elems(heap, s).iter().map(|&e| primitive::int_value(heap, e)).collect()
    }

    #[test]
    fn test_window_and_capacity() {
        let mut heap = Heap::new(256).unwrap();
        let arr = ints(&mut heap, &[1, 2, 3, 4]);
        let s = of_array(&mut heap, arr, Some(1), Some(3)).unwrap();
        assert_eq!(values(&heap, s), vec![2, 3]);
        assert_eq!(len(&heap, s), 2);
        assert_eq!(cap(&heap, s), 3);
        assert_eq!(
            get(&heap, s, 2).unwrap_err(),
            RuntimeError::IndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn test_reslice_up_to_capacity() {
        let mut heap = Heap::new(256).unwrap();
        let arr = ints(&mut heap, &[1, 2, 3, 4]);
        let s = of_array(&mut heap, arr, Some(1), Some(2)).unwrap();
        heap.push_root(s);
        let wide = slice_of(&mut heap, s, None, Some(3)).unwrap();
        assert_eq!(values(&heap, wide), vec![2, 3, 4]);
        assert!(slice_of(&mut heap, s, None, Some(4)).is_err());
        assert!(slice_of(&mut heap, s, Some(2), Some(1)).is_err());
    }

    #[test]
    fn test_append_shares_then_grows() {
        let mut heap = Heap::new(512).unwrap();
        let arr = ints(&mut heap, &[1, 2, 3]);
        let s = of_array(&mut heap, arr, Some(0), Some(2)).unwrap();
        heap.push_root(s);
        let x = primitive::new_int(&mut heap, 9).unwrap();
        let s2 = append(&mut heap, s, &[x]).unwrap();
        heap.push_root(s2);
        // Fits in capacity: writes through to the shared array.
        assert_eq!(array_ref(&heap, s2), arr);
        assert_eq!(primitive::int_value(&heap, array::raw_get(&heap, arr, 2)), 9);

        let s3 = append(&mut heap, s2, &[x]).unwrap();
        assert_ne!(array_ref(&heap, s3), arr);
        assert_eq!(values(&heap, s3), vec![1, 2, 9, 9]);
        assert_eq!(cap(&heap, s3), 6);
    }

    #[test]
    fn test_append_to_nil() {
        let mut heap = Heap::new(256).unwrap();
        let s = nil(&mut heap).unwrap();
        assert_eq!(cap(&heap, s), 0);
        heap.push_root(s);
        let x = primitive::new_int(&mut heap, 5).unwrap();
        let s2 = append(&mut heap, s, &[x]).unwrap();
        assert_eq!(values(&heap, s2), vec![5]);
        assert_eq!(cap(&heap, s2), 4);
    }
}
