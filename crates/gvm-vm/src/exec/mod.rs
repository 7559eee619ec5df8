//! Instruction execution.
//!
//! Every instruction runs against the heap with its own temp-root scope:
//! operands popped off the stack are rooted until the instruction finishes,
//! so intermediate allocations never collect them.

mod arith;
mod array;
mod builtin;
mod call;
mod chan;
mod go;
mod load;

use gvm_runtime::objects::{context, primitive};
use gvm_runtime::{Addr, Tag};

use crate::error::Result;
use crate::instruction::Instruction;
use crate::process::{ChanResult, ExecResult, VmState};
use crate::scheduler::Scheduler;

/// Run `inst`, fetched from `pc`, in `ctx`. The context's pc already points
/// at the following instruction.
pub(crate) fn execute(
    state: &mut VmState,
    scheduler: &mut Scheduler,
    ctx: Addr,
    pc: usize,
    inst: &Instruction,
) -> Result<ExecResult> {
    let mark = state.heap.root_mark();
    let result = dispatch(state, scheduler, ctx, pc, inst);
    state.heap.release_roots(mark);
    result
}

fn dispatch(
    state: &mut VmState,
    scheduler: &mut Scheduler,
    ctx: Addr,
    pc: usize,
    inst: &Instruction,
) -> Result<ExecResult> {
    let next = pc + 1;
    match inst {
        Instruction::Nop => {}

        // === LOAD ===
        Instruction::LoadInt(v) => {
            let a = primitive::new_int(&mut state.heap, *v)?;
            push(state, ctx, a)?;
        }
        Instruction::LoadFloat(v) => {
            let a = primitive::new_float(&mut state.heap, *v)?;
            push(state, ctx, a)?;
        }
        Instruction::LoadBool(v) => {
            let a = primitive::new_bool(&mut state.heap, *v)?;
            push(state, ctx, a)?;
        }
        Instruction::LoadString(s) => load::exec_load_string(state, ctx, s)?,
        Instruction::LoadDefault(ty) => load::exec_load_default(state, ctx, *ty)?,
        Instruction::LoadUnassigned => push(state, ctx, gvm_runtime::UNASSIGNED)?,
        Instruction::Pop => {
            pop(state, ctx)?;
        }
        Instruction::Dup => {
            let top = context::peek_os(&state.heap, ctx)?;
            push(state, ctx, top)?;
        }

        // === VARIABLES ===
        Instruction::LoadVar { frame, slot } => load::exec_load_var(state, ctx, *frame, *slot)?,
        Instruction::StoreVar { frame, slot } => load::exec_store_var(state, ctx, *frame, *slot)?,

        // === ARITHMETIC ===
        Instruction::Binary(op) => arith::exec_binary(state, ctx, *op)?,
        Instruction::Unary(op) => arith::exec_unary(state, ctx, *op)?,

        // === CONTROL FLOW ===
        Instruction::Jump(target) => context::set_pc(&mut state.heap, ctx, *target),
        Instruction::JumpIfFalse(target) => {
            if !pop_bool(state, ctx)? {
                context::set_pc(&mut state.heap, ctx, *target);
            }
        }
        Instruction::JumpIfTrue(target) => {
            if pop_bool(state, ctx)? {
                context::set_pc(&mut state.heap, ctx, *target);
            }
        }
        Instruction::EnterScope { names } => load::exec_enter_scope(state, ctx, pc, names.len())?,
        Instruction::ExitScope => load::exec_exit_scope(state, ctx)?,
        Instruction::LoadFunc { entry, params } => {
            call::exec_load_func(state, ctx, pc, *entry, params.len())?
        }
        Instruction::Call { argc } => {
            let result = call::exec_call(state, ctx, next, *argc)?;
            return Ok(settle(scheduler, result));
        }
        Instruction::Return => return call::exec_return(state, ctx),

        // === METHODS ===
        Instruction::LoadMethod { method } => call::exec_load_method(state, ctx, method)?,
        Instruction::CallMethod { method, argc } => {
            let result = call::exec_call_method(state, ctx, method, *argc)?;
            return Ok(settle(scheduler, result));
        }

        // === ARRAYS AND SLICES ===
        Instruction::MakeArray { len } => array::exec_make_array(state, ctx, *len)?,
        Instruction::MakeSlice { elem, has_cap } => {
            array::exec_make_slice(state, ctx, *elem, *has_cap)?
        }
        Instruction::Index => array::exec_index(state, ctx)?,
        Instruction::StoreIndex => array::exec_store_index(state, ctx)?,
        Instruction::Len => array::exec_len(state, ctx)?,
        Instruction::Cap => array::exec_cap(state, ctx)?,
        Instruction::Slice { low, high } => array::exec_slice(state, ctx, *low, *high)?,
        Instruction::Append { argc } => array::exec_append(state, ctx, *argc)?,

        // === CONCURRENCY ===
        Instruction::MakeChan { buffered } => chan::exec_make_chan(state, ctx, *buffered)?,
        Instruction::Send => {
            let result = chan::exec_send(state, ctx, next)?;
            return Ok(settle(scheduler, result));
        }
        Instruction::Recv => {
            let result = chan::exec_recv(state, ctx, next)?;
            return Ok(settle(scheduler, result));
        }
        Instruction::SelectSend { target } => chan::exec_select_send(state, ctx, *target)?,
        Instruction::SelectRecv { target, .. } => chan::exec_select_recv(state, ctx, pc, *target)?,
        Instruction::Select { cases, default } => {
            let result = chan::exec_select(state, ctx, *cases, *default)?;
            return Ok(settle(scheduler, result));
        }
        Instruction::Go { argc } => go::exec_go(state, scheduler, ctx, *argc)?,

        // === OUTPUT ===
        Instruction::Print { argc, newline } => builtin::exec_print(state, ctx, *argc, *newline)?,
        Instruction::Done => return Ok(ExecResult::Done),
    }
    Ok(ExecResult::Continue)
}

/// Hand released contexts back to the scheduler.
fn settle(scheduler: &mut Scheduler, result: ChanResult) -> ExecResult {
    match result {
        ChanResult::Continue => ExecResult::Continue,
        ChanResult::Block => ExecResult::Block,
        ChanResult::Wake(woken) => {
            for ctx in woken {
                scheduler.wake(ctx);
            }
            ExecResult::Continue
        }
    }
}

/// Release `woken` contexts, if any.
fn wake_all(woken: Vec<Addr>) -> ChanResult {
    if woken.is_empty() {
        ChanResult::Continue
    } else {
        ChanResult::Wake(woken)
    }
}

// =============================================================================
// Operand stack helpers
// =============================================================================

/// Pop the top operand and root it for the rest of the instruction.
fn pop(state: &mut VmState, ctx: Addr) -> Result<Addr> {
    let v = context::pop_os(&mut state.heap, ctx)?;
    state.heap.push_root(v);
    Ok(v)
}

/// Pop `n` operands, returned bottom to top.
fn pop_n(state: &mut VmState, ctx: Addr, n: usize) -> Result<Vec<Addr>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(pop(state, ctx)?);
    }
    out.reverse();
    Ok(out)
}

fn pop_int(state: &mut VmState, ctx: Addr) -> Result<i64> {
    let a = pop(state, ctx)?;
    Ok(primitive::expect_int(&state.heap, a)?)
}

fn pop_bool(state: &mut VmState, ctx: Addr) -> Result<bool> {
    let a = pop(state, ctx)?;
    state.heap.expect(a, Tag::Bool)?;
    Ok(primitive::bool_value(&state.heap, a))
}

#[inline]
fn push(state: &mut VmState, ctx: Addr, v: Addr) -> Result<()> {
    Ok(context::push_os(&mut state.heap, ctx, v)?)
}

/// Root a freshly allocated node for the rest of the instruction.
#[inline]
fn root(state: &mut VmState, v: Addr) -> Addr {
    state.heap.push_root(v);
    v
}
