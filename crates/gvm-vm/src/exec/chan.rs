//! Channel instructions: MakeChan, Send, Recv, SelectSend, SelectRecv, Select
//!
//! An operation that cannot finish right away parks a channel request
//! holding its continuation and blocks the context. Whoever completes the
//! request later writes the value, moves the pc to the resume point and
//! hands the context back to the scheduler.

use gvm_runtime::objects::channel::{self, Direction, RecvResult, RequestSpec, SendResult};
use gvm_runtime::objects::{self, context, environment, frame};
use gvm_runtime::{Addr, Heap, Tag, UNASSIGNED};

use super::{pop, pop_int, pop_n, push, root};
use crate::error::{Result, VmError};
use crate::process::{ChanResult, VmState};

fn woken(ctx: Option<Addr>) -> ChanResult {
    match ctx {
        Some(ctx) => ChanResult::Wake(vec![ctx]),
        None => ChanResult::Continue,
    }
}

/// Channel operand, or `None` for a nil channel.
fn expect_chan(heap: &Heap, chan: Addr) -> Result<Option<Addr>> {
    if chan == UNASSIGNED {
        return Ok(None);
    }
    heap.expect(chan, Tag::Channel)?;
    Ok(Some(chan))
}

/// Operations on a nil channel never complete.
fn block_forever(state: &mut VmState, ctx: Addr) -> ChanResult {
    log::debug!("context @{} blocks forever on a nil channel", ctx);
    context::set_blocked(&mut state.heap, ctx, true);
    ChanResult::Block
}

fn park(state: &mut VmState, spec: &RequestSpec) -> Result<ChanResult> {
    let req = channel::create_request(&mut state.heap, spec)?;
    channel::park(&mut state.heap, req)?;
    context::set_blocked(&mut state.heap, spec.context, true);
    log::trace!(
        "context @{} parked {:?} on channel @{}",
        spec.context,
        spec.direction,
        spec.chan
    );
    Ok(ChanResult::Block)
}

pub fn exec_make_chan(state: &mut VmState, ctx: Addr, buffered: bool) -> Result<()> {
    let cap = if buffered { pop_int(state, ctx)? } else { 0 };
    if cap < 0 {
        return Err(VmError::InvalidLength { what: "makechan: size", value: cap });
    }
    let ch = channel::create(&mut state.heap, cap as usize)?;
    push(state, ctx, ch)
}

pub fn exec_send(state: &mut VmState, ctx: Addr, resume_pc: usize) -> Result<ChanResult> {
    let value = pop(state, ctx)?;
    let chan = pop(state, ctx)?;
    let Some(chan) = expect_chan(&state.heap, chan)? else {
        return Ok(block_forever(state, ctx));
    };
    let value = objects::value_copy(&mut state.heap, value)?;
    root(state, value);
    match channel::try_send(&mut state.heap, chan, value)? {
        SendResult::Delivered { woken: other } => Ok(ChanResult::Wake(vec![other])),
        SendResult::Buffered => Ok(ChanResult::Continue),
        SendResult::WouldBlock => park(
            state,
            &RequestSpec {
                context: ctx,
                chan,
                resume_pc,
                direction: Direction::Send,
                value,
                frame: UNASSIGNED,
                env: UNASSIGNED,
            },
        ),
    }
}

/// A parked receive resumes with the value pushed onto its operand stack.
pub fn exec_recv(state: &mut VmState, ctx: Addr, resume_pc: usize) -> Result<ChanResult> {
    let chan = pop(state, ctx)?;
    let Some(chan) = expect_chan(&state.heap, chan)? else {
        return Ok(block_forever(state, ctx));
    };
    match channel::try_recv(&mut state.heap, chan)? {
        RecvResult::Received { value, woken: w } => {
            push(state, ctx, value)?;
            Ok(woken(w))
        }
        RecvResult::WouldBlock => park(
            state,
            &RequestSpec {
                context: ctx,
                chan,
                resume_pc,
                direction: Direction::Recv,
                value: UNASSIGNED,
                frame: UNASSIGNED,
                env: UNASSIGNED,
            },
        ),
    }
}

pub fn exec_select_send(state: &mut VmState, ctx: Addr, target: usize) -> Result<()> {
    let value = pop(state, ctx)?;
    let chan = pop(state, ctx)?;
    let chan = expect_chan(&state.heap, chan)?.unwrap_or(UNASSIGNED);
    let value = objects::value_copy(&mut state.heap, value)?;
    root(state, value);
    let spec = RequestSpec {
        context: ctx,
        chan,
        resume_pc: target,
        direction: Direction::Send,
        value,
        frame: UNASSIGNED,
        env: UNASSIGNED,
    };
    let req = channel::create_request(&mut state.heap, &spec)?;
    push(state, ctx, req)
}

/// The case's received value lands in slot 0 of a fresh frame, whose scope
/// is entered when the case is taken.
pub fn exec_select_recv(state: &mut VmState, ctx: Addr, pc: usize, target: usize) -> Result<()> {
    let chan = pop(state, ctx)?;
    let chan = expect_chan(&state.heap, chan)?.unwrap_or(UNASSIGNED);
    let binding = frame::create(&mut state.heap, 1)?;
    root(state, binding);
    let env = context::env(&state.heap, ctx);
    let scope = environment::extend(&mut state.heap, env, binding)?;
    root(state, scope);
    state.frame_origins.insert(binding, pc);
    let spec = RequestSpec {
        context: ctx,
        chan,
        resume_pc: target,
        direction: Direction::Recv,
        value: UNASSIGNED,
        frame: binding,
        env: scope,
    };
    let req = channel::create_request(&mut state.heap, &spec)?;
    push(state, ctx, req)
}

/// Take a random ready case, else the default, else park on every case.
pub fn exec_select(state: &mut VmState, ctx: Addr, cases: usize, default: Option<usize>) -> Result<ChanResult> {
    let mut requests = pop_n(state, ctx, cases)?;
    for &req in &requests {
        state.heap.expect(req, Tag::ChannelRequest)?;
    }
    state.rng.shuffle(&mut requests);

    let heap = &mut state.heap;
    for &req in &requests {
        let chan = channel::request_chan(heap, req);
        if chan == UNASSIGNED {
            continue;
        }
        match channel::request_direction(heap, req) {
            Direction::Send => {
                let value = channel::request_value(heap, req);
                match channel::try_send(heap, chan, value)? {
                    SendResult::Delivered { woken: other } => {
                        channel::complete(heap, req, None)?;
                        return Ok(ChanResult::Wake(vec![other]));
                    }
                    SendResult::Buffered => {
                        channel::complete(heap, req, None)?;
                        return Ok(ChanResult::Continue);
                    }
                    SendResult::WouldBlock => {}
                }
            }
            Direction::Recv => {
                if let RecvResult::Received { value, woken: w } = channel::try_recv(heap, chan)? {
                    channel::complete(heap, req, Some(value))?;
                    return Ok(woken(w));
                }
            }
        }
    }

    if let Some(target) = default {
        context::set_pc(heap, ctx, target);
        return Ok(ChanResult::Continue);
    }
    for &req in &requests {
        if channel::request_chan(heap, req) != UNASSIGNED {
            channel::park(heap, req)?;
        }
    }
    context::set_blocked(heap, ctx, true);
    log::trace!("context @{} blocked in select over {} cases", ctx, cases);
    Ok(ChanResult::Block)
}
