//! Array, slice and string instructions.

use gvm_runtime::objects::{self, array, channel, primitive, slice, string};
use gvm_runtime::{Addr, RuntimeError, Tag};

use super::load::default_value;
use super::{pop, pop_int, pop_n, push, root};
use crate::error::{Result, VmError};
use crate::instruction::ValueType;
use crate::process::VmState;

fn unexpected(addr: Addr, expected: Tag, found: Tag) -> VmError {
    RuntimeError::UnexpectedTag { addr, expected, found }.into()
}

/// Copy each value for storage in a new container.
fn copies(state: &mut VmState, vals: &[Addr]) -> Result<Vec<Addr>> {
    let mut out = Vec::with_capacity(vals.len());
    for &v in vals {
        let c = objects::value_copy(&mut state.heap, v)?;
        out.push(root(state, c));
    }
    Ok(out)
}

pub fn exec_make_array(state: &mut VmState, ctx: Addr, len: usize) -> Result<()> {
    let elems = pop_n(state, ctx, len)?;
    let elems = copies(state, &elems)?;
    let arr = array::from_elems(&mut state.heap, &elems)?;
    push(state, ctx, arr)
}

/// `make([]T, len[, cap])` with every element set to T's zero value.
pub fn exec_make_slice(state: &mut VmState, ctx: Addr, elem: ValueType, has_cap: bool) -> Result<()> {
    let cap = if has_cap { Some(pop_int(state, ctx)?) } else { None };
    let len = pop_int(state, ctx)?;
    if len < 0 {
        return Err(VmError::InvalidLength { what: "makeslice: len", value: len });
    }
    let cap = cap.unwrap_or(len);
    if cap < len {
        return Err(VmError::InvalidLength { what: "makeslice: cap", value: cap });
    }
    let arr = array::create(&mut state.heap, cap as usize)?;
    root(state, arr);
    for i in 0..cap as usize {
        let zero = default_value(&mut state.heap, elem)?;
        array::raw_set(&mut state.heap, arr, i, zero);
    }
    let s = slice::from_array_range(&mut state.heap, arr, 0, len as usize)?;
    push(state, ctx, s)
}

fn string_index(heap: &gvm_runtime::Heap, s: Addr, index: i64) -> Result<u8> {
    let len = string::len(heap, s);
    if index < 0 || index as usize >= len {
        return Err(RuntimeError::IndexOutOfRange { index, len }.into());
    }
    Ok(string::byte_at(heap, s, index as usize))
}

pub fn exec_index(state: &mut VmState, ctx: Addr) -> Result<()> {
    let index = pop_int(state, ctx)?;
    let container = pop(state, ctx)?;
    let heap = &mut state.heap;
    let value = match heap.tag(container) {
        Tag::Array => array::get(heap, container, index)?,
        Tag::Slice => slice::get(heap, container, index)?,
        Tag::String => {
            let b = string_index(heap, container, index)?;
            primitive::new_int(heap, b as i64)?
        }
        found => return Err(unexpected(container, Tag::Slice, found)),
    };
    push(state, ctx, value)
}

pub fn exec_store_index(state: &mut VmState, ctx: Addr) -> Result<()> {
    let value = pop(state, ctx)?;
    let index = pop_int(state, ctx)?;
    let container = pop(state, ctx)?;
    let copy = objects::value_copy(&mut state.heap, value)?;
    let heap = &mut state.heap;
    let written = match heap.tag(container) {
        Tag::Array => {
            array::set(heap, container, index, copy)?;
            container
        }
        Tag::Slice => {
            slice::set(heap, container, index, copy)?;
            slice::array_ref(heap, container)
        }
        found => return Err(unexpected(container, Tag::Slice, found)),
    };
    state.dirty.extend([written, copy]);
    Ok(())
}

pub fn exec_len(state: &mut VmState, ctx: Addr) -> Result<()> {
    let container = pop(state, ctx)?;
    let heap = &mut state.heap;
    let n = match heap.tag(container) {
        Tag::Array => array::len(heap, container),
        Tag::Slice => slice::len(heap, container),
        Tag::String => string::len(heap, container),
        Tag::Channel => channel::len(heap, container),
        Tag::Unassigned => 0,
        found => return Err(unexpected(container, Tag::Slice, found)),
    };
    let a = primitive::new_int(heap, n as i64)?;
    push(state, ctx, a)
}

pub fn exec_cap(state: &mut VmState, ctx: Addr) -> Result<()> {
    let container = pop(state, ctx)?;
    let heap = &mut state.heap;
    let n = match heap.tag(container) {
        Tag::Array => array::len(heap, container),
        Tag::Slice => slice::cap(heap, container),
        Tag::Channel => channel::capacity(heap, container),
        Tag::Unassigned => 0,
        found => return Err(unexpected(container, Tag::Slice, found)),
    };
    let a = primitive::new_int(heap, n as i64)?;
    push(state, ctx, a)
}

/// `x[low:high]` over arrays, slices and strings.
pub fn exec_slice(state: &mut VmState, ctx: Addr, low: bool, high: bool) -> Result<()> {
    let high = if high { Some(pop_int(state, ctx)?) } else { None };
    let low = if low { Some(pop_int(state, ctx)?) } else { None };
    let container = pop(state, ctx)?;
    let heap = &mut state.heap;
    let out = match heap.tag(container) {
        Tag::Array => slice::of_array(heap, container, low, high)?,
        Tag::Slice => slice::slice_of(heap, container, low, high)?,
        Tag::String => {
            let bytes = string::as_bytes(heap, container);
            let (lo, hi) = (low.unwrap_or(0), high.unwrap_or(bytes.len() as i64));
            slice::check_bounds(lo, hi, bytes.len())?;
            string::from_bytes(heap, &bytes[lo as usize..hi as usize])?
        }
        found => return Err(unexpected(container, Tag::Slice, found)),
    };
    push(state, ctx, out)
}

pub fn exec_append(state: &mut VmState, ctx: Addr, argc: usize) -> Result<()> {
    let vals = pop_n(state, ctx, argc)?;
    let target = pop(state, ctx)?;
    let vals = copies(state, &vals)?;
    let target = match state.heap.tag(target) {
        Tag::Unassigned => {
            let nil = slice::nil(&mut state.heap)?;
            root(state, nil)
        }
        Tag::Slice => target,
        found => return Err(unexpected(target, Tag::Slice, found)),
    };
    let out = slice::append(&mut state.heap, target, &vals)?;
    push(state, ctx, out)
}
