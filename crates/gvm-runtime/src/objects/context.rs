//! Context: one goroutine's register file.
//!
//! Layout: header + [pc, os, rts, env, blocked, waitlist, id]
//!
//! - `os`: operand stack (Stack)
//! - `rts`: return stack (Stack) of saved environments and call markers
//! - `env`: current Environment
//! - `waitlist`: List of pending channel requests / wait groups

use crate::error::Result;
use crate::heap::{Addr, Heap};
use crate::objects::{list, stack, Tag};

pub const FIELD_PC: usize = 0;
pub const FIELD_OS: usize = 1;
pub const FIELD_RTS: usize = 2;
pub const FIELD_ENV: usize = 3;
pub const FIELD_BLOCKED: usize = 4;
pub const FIELD_WAITLIST: usize = 5;
pub const FIELD_ID: usize = 6;

pub fn create(heap: &mut Heap, pc: usize, env: Addr, id: u64) -> Result<Addr> {
    heap.with_roots(&[env], |heap| -> Result<Addr> {
        let os = stack::create(heap)?;
        let rts = heap.with_roots(&[os], stack::create)?;
        let waitlist = heap.with_roots(&[os, rts], list::create)?;
        let ctx = heap.with_roots(&[os, rts, waitlist], |h| h.alloc(Tag::Context, 7))?;
        heap.write(ctx, FIELD_PC, pc as u64);
        heap.write_addr(ctx, FIELD_OS, os);
        heap.write_addr(ctx, FIELD_RTS, rts);
        heap.write_addr(ctx, FIELD_ENV, env);
        heap.write_addr(ctx, FIELD_WAITLIST, waitlist);
        heap.write(ctx, FIELD_ID, id);
        Ok(ctx)
    })
}

#[inline]
pub fn pc(heap: &Heap, ctx: Addr) -> usize {
    heap.read(ctx, FIELD_PC) as usize
}

#[inline]
pub fn set_pc(heap: &mut Heap, ctx: Addr, pc: usize) {
    heap.write(ctx, FIELD_PC, pc as u64);
}

#[inline]
pub fn os(heap: &Heap, ctx: Addr) -> Addr {
    heap.read_addr(ctx, FIELD_OS)
}

#[inline]
pub fn rts(heap: &Heap, ctx: Addr) -> Addr {
    heap.read_addr(ctx, FIELD_RTS)
}

#[inline]
pub fn env(heap: &Heap, ctx: Addr) -> Addr {
    heap.read_addr(ctx, FIELD_ENV)
}

#[inline]
pub fn set_env(heap: &mut Heap, ctx: Addr, env: Addr) {
    heap.write_addr(ctx, FIELD_ENV, env);
}

#[inline]
pub fn is_blocked(heap: &Heap, ctx: Addr) -> bool {
    heap.read(ctx, FIELD_BLOCKED) != 0
}

#[inline]
pub fn set_blocked(heap: &mut Heap, ctx: Addr, blocked: bool) {
    heap.write(ctx, FIELD_BLOCKED, blocked as u64);
}

#[inline]
pub fn waitlist(heap: &Heap, ctx: Addr) -> Addr {
    heap.read_addr(ctx, FIELD_WAITLIST)
}

#[inline]
pub fn id(heap: &Heap, ctx: Addr) -> u64 {
    heap.read(ctx, FIELD_ID)
}

pub fn push_os(heap: &mut Heap, ctx: Addr, val: Addr) -> Result<()> {
    let os = os(heap, ctx);
    stack::push(heap, os, val)
}

/// Pop the operand stack; `StackUnderflow` when empty.
pub fn pop_os(heap: &mut Heap, ctx: Addr) -> Result<Addr> {
    let os = os(heap, ctx);
    stack::pop(heap, os)
}

pub fn peek_os(heap: &Heap, ctx: Addr) -> Result<Addr> {
    stack::peek(heap, os(heap, ctx))
}

/// Operand stack from bottom to top.
pub fn operands(heap: &Heap, ctx: Addr) -> Vec<Addr> {
    stack::items_vec(heap, os(heap, ctx))
}

/// Push a raw entry (a call marker) onto the return stack.
pub fn push_rts(heap: &mut Heap, ctx: Addr, val: Addr) -> Result<()> {
    let rts = rts(heap, ctx);
    stack::push(heap, rts, val)
}

pub fn pop_rts(heap: &mut Heap, ctx: Addr) -> Result<Addr> {
    let rts = rts(heap, ctx);
    stack::pop(heap, rts)
}

/// Save the current environment on the return stack and install `new_env`.
pub fn push_env(heap: &mut Heap, ctx: Addr, new_env: Addr) -> Result<()> {
    let old = env(heap, ctx);
    heap.with_roots(&[new_env], |h| push_rts(h, ctx, old))?;
    set_env(heap, ctx, new_env);
    Ok(())
}

pub fn children(heap: &Heap, ctx: Addr) -> Vec<Addr> {
    vec![os(heap, ctx), rts(heap, ctx), env(heap, ctx), waitlist(heap, ctx)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::objects::{environment, frame, primitive};

    #[test]
    fn test_operand_stack() {
        let mut heap = Heap::new(512).unwrap();
        let env = environment::create_empty(&mut heap).unwrap();
        let ctx = create(&mut heap, 7, env, 1).unwrap();
        heap.register_context(ctx);
        assert_eq!(pc(&heap, ctx), 7);
        assert_eq!(id(&heap, ctx), 1);
        assert!(!is_blocked(&heap, ctx));

        let v = primitive::new_int(&mut heap, 3).unwrap();
        push_os(&mut heap, ctx, v).unwrap();
        assert_eq!(peek_os(&heap, ctx).unwrap(), v);
        assert_eq!(pop_os(&mut heap, ctx).unwrap(), v);
        assert_eq!(pop_os(&mut heap, ctx).unwrap_err(), RuntimeError::StackUnderflow);
    }

    #[test]
    fn test_push_env_saves_previous() {
        let mut heap = Heap::new(512).unwrap();
        let base = environment::create_empty(&mut heap).unwrap();
        let ctx = create(&mut heap, 0, base, 0).unwrap();
        heap.register_context(ctx);
        let f = frame::create(&mut heap, 1).unwrap();
        let inner = environment::extend(&mut heap, base, f).unwrap();
        push_env(&mut heap, ctx, inner).unwrap();
        assert_eq!(env(&heap, ctx), inner);
        assert_eq!(pop_rts(&mut heap, ctx).unwrap(), base);
    }

    #[test]
    fn test_registered_context_keeps_state_alive() {
        let mut heap = Heap::new(512).unwrap();
        let env = environment::create_empty(&mut heap).unwrap();
        let ctx = create(&mut heap, 0, env, 0).unwrap();
        heap.register_context(ctx);
        let v = primitive::new_int(&mut heap, 11).unwrap();
        push_os(&mut heap, ctx, v).unwrap();
        heap.mark_and_sweep();
        assert_eq!(heap.tag(ctx), Tag::Context);
        assert_eq!(heap.tag(env), Tag::Environment);
        let popped = pop_os(&mut heap, ctx).unwrap();
        assert_eq!(primitive::int_value(&heap, popped), 11);
    }
}
