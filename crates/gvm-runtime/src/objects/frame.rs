//! Frames: fixed-size arrays of variable slots.
//!
//! Layout: header + [len, slot0, slot1, ...]. Fresh slots hold `UNASSIGNED`.

use crate::error::Result;
use crate::heap::{Addr, Heap};
use crate::objects::{seq, Tag};

pub fn create(heap: &mut Heap, len: usize) -> Result<Addr> {
    seq::create(heap, Tag::Frame, len)
}

#[inline]
pub fn len(heap: &Heap, f: Addr) -> usize {
    seq::len(heap, f)
}

pub fn get(heap: &Heap, f: Addr, slot: usize) -> Result<Addr> {
    let i = seq::check(heap, f, slot as i64)?;
    Ok(seq::raw_get(heap, f, i))
}

pub fn set(heap: &mut Heap, f: Addr, slot: usize, val: Addr) -> Result<()> {
    let i = seq::check(heap, f, slot as i64)?;
    seq::raw_set(heap, f, i, val);
    Ok(())
}

pub fn slots(heap: &Heap, f: Addr) -> Vec<Addr> {
    seq::elems(heap, f)
}
