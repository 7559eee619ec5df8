//! Constants, zero values, variables and scopes.

use gvm_runtime::objects::{self, context, environment, frame, primitive, slice, string, wait_group};
use gvm_runtime::{Addr, Heap, Tag, UNASSIGNED};

use super::{pop, push, root};
use crate::error::Result;
use crate::instruction::ValueType;
use crate::process::VmState;

/// Zero value of `ty`.
pub(super) fn default_value(heap: &mut Heap, ty: ValueType) -> gvm_runtime::Result<Addr> {
    match ty {
        ValueType::Int => primitive::new_int(heap, 0),
        ValueType::Float => primitive::new_float(heap, 0.0),
        ValueType::Bool => primitive::new_bool(heap, false),
        ValueType::String => string::create(heap, ""),
        ValueType::Slice => slice::nil(heap),
        ValueType::Chan | ValueType::Func => Ok(UNASSIGNED),
        ValueType::WaitGroup => wait_group::create(heap),
    }
}

pub fn exec_load_string(state: &mut VmState, ctx: Addr, s: &str) -> Result<()> {
    let a = string::create(&mut state.heap, s)?;
    push(state, ctx, a)
}

pub fn exec_load_default(state: &mut VmState, ctx: Addr, ty: ValueType) -> Result<()> {
    let a = default_value(&mut state.heap, ty)?;
    push(state, ctx, a)
}

pub fn exec_load_var(state: &mut VmState, ctx: Addr, frame: usize, slot: usize) -> Result<()> {
    let env = context::env(&state.heap, ctx);
    let v = environment::lookup(&state.heap, env, frame, slot)?;
    push(state, ctx, v)
}

/// Assignment rebinds the slot to a copy of the value.
pub fn exec_store_var(state: &mut VmState, ctx: Addr, frame: usize, slot: usize) -> Result<()> {
    let v = pop(state, ctx)?;
    let copy = objects::value_copy(&mut state.heap, v)?;
    let env = context::env(&state.heap, ctx);
    let target = environment::assign(&mut state.heap, env, frame, slot, copy)?;
    state.dirty.extend([target, copy]);
    Ok(())
}

pub fn exec_enter_scope(state: &mut VmState, ctx: Addr, pc: usize, slots: usize) -> Result<()> {
    let f = frame::create(&mut state.heap, slots)?;
    root(state, f);
    let env = context::env(&state.heap, ctx);
    let scope = environment::extend(&mut state.heap, env, f)?;
    context::push_env(&mut state.heap, ctx, scope)?;
    state.frame_origins.insert(f, pc);
    Ok(())
}

pub fn exec_exit_scope(state: &mut VmState, ctx: Addr) -> Result<()> {
    let saved = context::pop_rts(&mut state.heap, ctx)?;
    state.heap.expect(saved, Tag::Environment)?;
    context::set_env(&mut state.heap, ctx, saved);
    Ok(())
}
