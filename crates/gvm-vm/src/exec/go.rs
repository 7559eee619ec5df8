//! Goroutine creation.

use gvm_runtime::objects::{closure, context};
use gvm_runtime::{Addr, Tag};

use super::call::bind_args;
use super::{pop, pop_n};
use crate::error::Result;
use crate::process::VmState;
use crate::scheduler::Scheduler;

/// Start `func(args...)` in a new context. Its return stack holds only a
/// terminating marker, so returning from `func` ends the context.
pub fn exec_go(state: &mut VmState, scheduler: &mut Scheduler, ctx: Addr, argc: usize) -> Result<()> {
    let args = pop_n(state, ctx, argc)?;
    let func = pop(state, ctx)?;
    state.heap.expect(func, Tag::Func)?;
    let env = bind_args(state, func, &args)?;

    let id = state.fresh_id();
    let entry = closure::entry(&state.heap, func);
    let child = context::create(&mut state.heap, entry, env, id)?;
    state.heap.register_context(child);
    let terminate = closure::create_call_ref(&mut state.heap, None)?;
    context::push_rts(&mut state.heap, child, terminate)?;
    scheduler.spawn(child);
    log::debug!("context {} (@{}) forked at pc {}", id, child, entry);
    Ok(())
}
