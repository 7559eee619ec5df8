//! Callable values and call markers.
//!
//! Func layout: header + [entry, arity, env, decl_pc]
//!   `decl_pc` is the instruction that built the closure; debuggers use it
//!   to name parameter slots.
//! Method layout: header + [receiver, name]
//!   A builtin method bound to its receiver; `name` is a String.
//! CallRef layout: header + [return_pc]
//!   Return marker on the RTS. `TERMINATE` ends the owning context.

use crate::error::Result;
use crate::heap::{Addr, Heap};
use crate::objects::{string, Tag};

const FIELD_ENTRY: usize = 0;
const FIELD_ARITY: usize = 1;
const FIELD_ENV: usize = 2;
const FIELD_DECL: usize = 3;

const METHOD_RECEIVER: usize = 0;
const METHOD_NAME: usize = 1;

const TERMINATE: u64 = u64::MAX;

pub fn create(heap: &mut Heap, entry: usize, arity: usize, env: Addr, decl_pc: usize) -> Result<Addr> {
    let f = heap.with_roots(&[env], |h| h.alloc(Tag::Func, 4))?;
    heap.write(f, FIELD_ENTRY, entry as u64);
    heap.write(f, FIELD_ARITY, arity as u64);
    heap.write_addr(f, FIELD_ENV, env);
    heap.write(f, FIELD_DECL, decl_pc as u64);
    Ok(f)
}

#[inline]
pub fn entry(heap: &Heap, f: Addr) -> usize {
    heap.read(f, FIELD_ENTRY) as usize
}

#[inline]
pub fn arity(heap: &Heap, f: Addr) -> usize {
    heap.read(f, FIELD_ARITY) as usize
}

#[inline]
pub fn env(heap: &Heap, f: Addr) -> Addr {
    heap.read_addr(f, FIELD_ENV)
}

#[inline]
pub fn decl_pc(heap: &Heap, f: Addr) -> usize {
    heap.read(f, FIELD_DECL) as usize
}

pub fn children(heap: &Heap, f: Addr) -> Vec<Addr> {
    vec![env(heap, f)]
}

pub fn create_method(heap: &mut Heap, receiver: Addr, name: &str) -> Result<Addr> {
    let name = heap.with_roots(&[receiver], |h| string::create(h, name))?;
    let m = heap.with_roots(&[receiver, name], |h| h.alloc(Tag::Method, 2))?;
    heap.write_addr(m, METHOD_RECEIVER, receiver);
    heap.write_addr(m, METHOD_NAME, name);
    Ok(m)
}

#[inline]
pub fn method_receiver(heap: &Heap, m: Addr) -> Addr {
    heap.read_addr(m, METHOD_RECEIVER)
}

/// Address of the method's name String.
#[inline]
pub fn method_name(heap: &Heap, m: Addr) -> Addr {
    heap.read_addr(m, METHOD_NAME)
}

pub fn method_children(heap: &Heap, m: Addr) -> Vec<Addr> {
    vec![method_receiver(heap, m), method_name(heap, m)]
}

/// Marker returning to `return_pc`, or terminating the context for `None`.
pub fn create_call_ref(heap: &mut Heap, return_pc: Option<usize>) -> Result<Addr> {
    let r = heap.alloc(Tag::CallRef, 1)?;
    heap.write(r, 0, return_pc.map_or(TERMINATE, |pc| pc as u64));
    Ok(r)
}

pub fn call_ref_return(heap: &Heap, r: Addr) -> Option<usize> {
    let pc = heap.read(r, 0);
    (pc != TERMINATE).then_some(pc as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{environment, wait_group};

    #[test]
    fn test_func_fields() {
        let mut heap = Heap::new(128).unwrap();
        let captured = environment::create_empty(&mut heap).unwrap();
        let f = create(&mut heap, 12, 2, captured, 3).unwrap();
        assert_eq!(entry(&heap, f), 12);
        assert_eq!(arity(&heap, f), 2);
        assert_eq!(env(&heap, f), captured);
        assert_eq!(decl_pc(&heap, f), 3);
        assert_eq!(children(&heap, f), vec![captured]);
    }

    #[test]
    fn test_copy_reseats_captured_env() {
        let mut heap = Heap::new(256).unwrap();
        let e1 = environment::create_empty(&mut heap).unwrap();
        heap.push_root(e1);
        let e2 = environment::create_empty(&mut heap).unwrap();
        heap.push_root(e2);
        let f1 = create(&mut heap, 1, 0, e1, 0).unwrap();
        heap.push_root(f1);
        let f2 = create(&mut heap, 1, 0, e2, 0).unwrap();
        heap.copy(f1, f2);
        assert_eq!(env(&heap, f1), e2);
        heap.write_addr(f1, FIELD_ENV, e1);
        assert_eq!(env(&heap, f2), e2);
    }

    #[test]
    fn test_method_and_call_ref() {
        let mut heap = Heap::new(256).unwrap();
        let wg = wait_group::create(&mut heap).unwrap();
        let m = create_method(&mut heap, wg, "Done").unwrap();
        assert_eq!(method_receiver(&heap, m), wg);
        assert_eq!(string::to_string(&heap, method_name(&heap, m)), "Done");

        let r = create_call_ref(&mut heap, Some(40)).unwrap();
        assert_eq!(call_ref_return(&heap, r), Some(40));
        let t = create_call_ref(&mut heap, None).unwrap();
        assert_eq!(call_ref_return(&heap, t), None);
    }
}
