//! Boxed primitives.
//!
//! Layout: header + one payload word (i64 bits, f64 bits, or 0/1).

use crate::error::Result;
use crate::heap::{Addr, Heap};
use crate::objects::Tag;

pub fn new_int(heap: &mut Heap, v: i64) -> Result<Addr> {
    let a = heap.alloc(Tag::Int, 1)?;
    heap.write(a, 0, v as u64);
    Ok(a)
}

pub fn new_float(heap: &mut Heap, v: f64) -> Result<Addr> {
    let a = heap.alloc(Tag::Float, 1)?;
    heap.write(a, 0, v.to_bits());
    Ok(a)
}

pub fn new_bool(heap: &mut Heap, v: bool) -> Result<Addr> {
    let a = heap.alloc(Tag::Bool, 1)?;
    heap.write(a, 0, v as u64);
    Ok(a)
}

#[inline]
pub fn int_value(heap: &Heap, a: Addr) -> i64 {
    heap.read(a, 0) as i64
}

#[inline]
pub fn float_value(heap: &Heap, a: Addr) -> f64 {
    f64::from_bits(heap.read(a, 0))
}

#[inline]
pub fn bool_value(heap: &Heap, a: Addr) -> bool {
    heap.read(a, 0) != 0
}

/// Integer payload of `a`, failing on any other tag.
pub fn expect_int(heap: &Heap, a: Addr) -> Result<i64> {
    heap.expect(a, Tag::Int)?;
    Ok(int_value(heap, a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_values() {
        let mut heap = Heap::new(64).unwrap();
        let i = new_int(&mut heap, i64::MIN).unwrap();
        let f = new_float(&mut heap, -0.125).unwrap();
        let b = new_bool(&mut heap, true).unwrap();
        assert_eq!(int_value(&heap, i), i64::MIN);
        assert_eq!(float_value(&heap, f), -0.125);
        assert!(bool_value(&heap, b));
        assert_eq!(heap.block_words(i), 2);
        assert_eq!(expect_int(&heap, i).unwrap(), i64::MIN);
        assert!(expect_int(&heap, f).is_err());
    }
}
