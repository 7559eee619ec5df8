//! Calls: LoadFunc, Call, Return, LoadMethod, CallMethod
//!
//! A call pushes a return marker followed by the caller's environment onto
//! the RTS, then installs the callee's environment: its captured chain
//! extended with a frame of copied arguments. `Return` pops the RTS,
//! restoring every saved environment on the way, until it reaches the
//! marker.

use gvm_runtime::objects::{self, closure, context, environment, frame, stack};
use gvm_runtime::{Addr, RuntimeError, Tag};

use super::{builtin, pop, pop_n, push, root};
use crate::error::{Result, VmError};
use crate::process::{ChanResult, ExecResult, VmState};

pub fn exec_load_func(state: &mut VmState, ctx: Addr, pc: usize, entry: usize, arity: usize) -> Result<()> {
    let env = context::env(&state.heap, ctx);
    let f = closure::create(&mut state.heap, entry, arity, env, pc)?;
    push(state, ctx, f)
}

/// Build the callee environment for `func` applied to `args`.
pub(super) fn bind_args(state: &mut VmState, func: Addr, args: &[Addr]) -> Result<Addr> {
    let arity = closure::arity(&state.heap, func);
    if arity != args.len() {
        return Err(VmError::ArityMismatch {
            expected: arity,
            got: args.len(),
        });
    }
    let params = frame::create(&mut state.heap, arity)?;
    root(state, params);
    for (i, &arg) in args.iter().enumerate() {
        let copy = objects::value_copy(&mut state.heap, arg)?;
        frame::set(&mut state.heap, params, i, copy)?;
    }
    let captured = closure::env(&state.heap, func);
    let env = environment::extend(&mut state.heap, captured, params)?;
    root(state, env);
    state.frame_origins.insert(params, closure::decl_pc(&state.heap, func));
    Ok(env)
}

pub fn exec_call(state: &mut VmState, ctx: Addr, return_pc: usize, argc: usize) -> Result<ChanResult> {
    let args = pop_n(state, ctx, argc)?;
    let callee = pop(state, ctx)?;
    if state.heap.tag(callee) == Tag::Method {
        return builtin::call_bound(state, ctx, callee, &args);
    }
    state.heap.expect(callee, Tag::Func)?;

    let env = bind_args(state, callee, &args)?;
    let marker = closure::create_call_ref(&mut state.heap, Some(return_pc))?;
    context::push_rts(&mut state.heap, ctx, marker)?;
    context::push_env(&mut state.heap, ctx, env)?;
    let entry = closure::entry(&state.heap, callee);
    context::set_pc(&mut state.heap, ctx, entry);
    Ok(ChanResult::Continue)
}

pub fn exec_return(state: &mut VmState, ctx: Addr) -> Result<ExecResult> {
    let heap = &mut state.heap;
    loop {
        if stack::is_empty(heap, context::rts(heap, ctx)) {
            return Err(VmError::RtsExhausted);
        }
        let entry = context::pop_rts(heap, ctx)?;
        match heap.tag(entry) {
            Tag::Environment => context::set_env(heap, ctx, entry),
            Tag::CallRef => {
                return Ok(match closure::call_ref_return(heap, entry) {
                    Some(pc) => {
                        context::set_pc(heap, ctx, pc);
                        ExecResult::Continue
                    }
                    None => ExecResult::Done,
                });
            }
            found => {
                return Err(RuntimeError::UnexpectedTag {
                    addr: entry,
                    expected: Tag::CallRef,
                    found,
                }
                .into())
            }
        }
    }
}

pub fn exec_load_method(state: &mut VmState, ctx: Addr, method: &str) -> Result<()> {
    let receiver = pop(state, ctx)?;
    let m = closure::create_method(&mut state.heap, receiver, method)?;
    push(state, ctx, m)
}

pub fn exec_call_method(state: &mut VmState, ctx: Addr, method: &str, argc: usize) -> Result<ChanResult> {
    let args = pop_n(state, ctx, argc)?;
    let receiver = pop(state, ctx)?;
    builtin::dispatch(state, ctx, receiver, method, &args)
}
