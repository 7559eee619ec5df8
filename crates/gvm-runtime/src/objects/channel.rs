//! Channels and channel requests.
//!
//! Channel layout: header + [cap, buffer, waiters]
//!   `buffer` is a bounded Queue of `cap` values; `waiters` a List of
//!   requests parked on this channel.
//!
//! Request layout: header + [context, chan, resume_pc, direction, value, frame, env]
//!   A captured continuation. Send requests carry `value`. Select recv
//!   requests carry a fresh one-slot `frame` and the `env` extending the
//!   context's environment with it; plain recv requests leave both unset
//!   and deliver onto the operand stack instead.
//!
//! Operations here only move values and rewrite context registers. Putting
//! woken contexts back on the ready queue is the scheduler's job, so every
//! hand-off reports the context it woke.

use crate::error::{Result, RuntimeError};
use crate::heap::{Addr, Heap, UNASSIGNED};
use crate::objects::{context, frame, list, queue, Tag};

const FIELD_CAP: usize = 0;
const FIELD_BUFFER: usize = 1;
const FIELD_WAITERS: usize = 2;

const REQ_CONTEXT: usize = 0;
const REQ_CHAN: usize = 1;
const REQ_RESUME: usize = 2;
const REQ_DIRECTION: usize = 3;
const REQ_VALUE: usize = 4;
const REQ_FRAME: usize = 5;
const REQ_ENV: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Recv = 0,
    Send = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// Handed straight to a parked receiver, which is now runnable.
    Delivered { woken: Addr },
    Buffered,
    WouldBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvResult {
    /// `woken` is a parked sender released by this receive.
    Received { value: Addr, woken: Option<Addr> },
    WouldBlock,
}

/// Fields of a request before it is allocated.
#[derive(Debug, Clone, Copy)]
pub struct RequestSpec {
    pub context: Addr,
    pub chan: Addr,
    pub resume_pc: usize,
    pub direction: Direction,
    pub value: Addr,
    pub frame: Addr,
    pub env: Addr,
}

pub fn create(heap: &mut Heap, cap: usize) -> Result<Addr> {
    let buffer = queue::create(heap, cap)?;
    let waiters = heap.with_roots(&[buffer], list::create)?;
    let ch = heap.with_roots(&[buffer, waiters], |h| h.alloc(Tag::Channel, 3))?;
    heap.write(ch, FIELD_CAP, cap as u64);
    heap.write_addr(ch, FIELD_BUFFER, buffer);
    heap.write_addr(ch, FIELD_WAITERS, waiters);
    Ok(ch)
}

#[inline]
pub fn capacity(heap: &Heap, ch: Addr) -> usize {
    heap.read(ch, FIELD_CAP) as usize
}

#[inline]
pub fn buffer(heap: &Heap, ch: Addr) -> Addr {
    heap.read_addr(ch, FIELD_BUFFER)
}

#[inline]
pub fn waiters(heap: &Heap, ch: Addr) -> Addr {
    heap.read_addr(ch, FIELD_WAITERS)
}

/// Number of buffered values.
#[inline]
pub fn len(heap: &Heap, ch: Addr) -> usize {
    queue::len(heap, buffer(heap, ch))
}

/// Requests currently parked on the channel, oldest first.
pub fn waiting(heap: &Heap, ch: Addr) -> Vec<Addr> {
    list::values(heap, waiters(heap, ch))
}

pub fn children(heap: &Heap, ch: Addr) -> Vec<Addr> {
    vec![buffer(heap, ch), waiters(heap, ch)]
}

// =============================================================================
// Requests
// =============================================================================

pub fn create_request(heap: &mut Heap, spec: &RequestSpec) -> Result<Addr> {
    let roots = [spec.context, spec.chan, spec.value, spec.frame, spec.env];
    let r = heap.with_roots(&roots, |h| h.alloc(Tag::ChannelRequest, 7))?;
    heap.write_addr(r, REQ_CONTEXT, spec.context);
    heap.write_addr(r, REQ_CHAN, spec.chan);
    heap.write(r, REQ_RESUME, spec.resume_pc as u64);
    heap.write(r, REQ_DIRECTION, spec.direction as u64);
    heap.write_addr(r, REQ_VALUE, spec.value);
    heap.write_addr(r, REQ_FRAME, spec.frame);
    heap.write_addr(r, REQ_ENV, spec.env);
    Ok(r)
}

#[inline]
pub fn request_context(heap: &Heap, r: Addr) -> Addr {
    heap.read_addr(r, REQ_CONTEXT)
}

#[inline]
pub fn request_chan(heap: &Heap, r: Addr) -> Addr {
    heap.read_addr(r, REQ_CHAN)
}

#[inline]
pub fn request_resume_pc(heap: &Heap, r: Addr) -> usize {
    heap.read(r, REQ_RESUME) as usize
}

#[inline]
pub fn request_direction(heap: &Heap, r: Addr) -> Direction {
    if heap.read(r, REQ_DIRECTION) == Direction::Send as u64 {
        Direction::Send
    } else {
        Direction::Recv
    }
}

#[inline]
pub fn request_value(heap: &Heap, r: Addr) -> Addr {
    heap.read_addr(r, REQ_VALUE)
}

#[inline]
pub fn request_frame(heap: &Heap, r: Addr) -> Addr {
    heap.read_addr(r, REQ_FRAME)
}

#[inline]
pub fn request_env(heap: &Heap, r: Addr) -> Addr {
    heap.read_addr(r, REQ_ENV)
}

pub fn request_children(heap: &Heap, r: Addr) -> Vec<Addr> {
    vec![
        request_context(heap, r),
        request_chan(heap, r),
        request_value(heap, r),
        request_frame(heap, r),
        request_env(heap, r),
    ]
}

// =============================================================================
// Protocol
// =============================================================================

/// Remove the oldest parked request of `direction`.
fn take_waiter(heap: &mut Heap, ch: Addr, direction: Direction) -> Option<Addr> {
    let waiters = waiters(heap, ch);
    list::take_first(heap, waiters, |h, r| request_direction(h, r) == direction)
}

pub fn try_send(heap: &mut Heap, ch: Addr, value: Addr) -> Result<SendResult> {
    if let Some(req) = take_waiter(heap, ch, Direction::Recv) {
        let woken = complete(heap, req, Some(value))?;
        return Ok(SendResult::Delivered { woken });
    }
    let buffer = buffer(heap, ch);
    if queue::try_push(heap, buffer, value) {
        return Ok(SendResult::Buffered);
    }
    Ok(SendResult::WouldBlock)
}

pub fn try_recv(heap: &mut Heap, ch: Addr) -> Result<RecvResult> {
    let buffer = buffer(heap, ch);
    if let Some(value) = queue::pop(heap, buffer) {
        let woken = match take_waiter(heap, ch, Direction::Send) {
            Some(req) => {
                let promoted = request_value(heap, req);
                queue::try_push(heap, buffer, promoted);
                Some(heap.with_roots(&[value], |h| complete(h, req, None))?)
            }
            None => None,
        };
        return Ok(RecvResult::Received { value, woken });
    }
    if let Some(req) = take_waiter(heap, ch, Direction::Send) {
        let value = request_value(heap, req);
        let woken = heap.with_roots(&[value], |h| complete(h, req, None))?;
        return Ok(RecvResult::Received { value, woken: Some(woken) });
    }
    Ok(RecvResult::WouldBlock)
}

/// Park `req` on its channel and on its context's wait-list.
pub fn park(heap: &mut Heap, req: Addr) -> Result<()> {
    let ch = request_chan(heap, req);
    let ctx = request_context(heap, req);
    let direction = request_direction(heap, req);
    let waiters = waiters(heap, ch);
    let mixed = list::values(heap, waiters).into_iter().any(|w| {
        request_direction(heap, w) != direction && request_context(heap, w) != ctx
    });
    if mixed {
        return Err(RuntimeError::MixedWaiters { chan: ch });
    }
    list::push_back(heap, waiters, req)?;
    let waitlist = context::waitlist(heap, ctx);
    heap.with_roots(&[req], |h| list::push_back(h, waitlist, req))
}

/// Resume the context behind `req`: deliver `value` to its target, jump to
/// the resume point and drop every other registration of that context.
/// Returns the context, which the caller must make ready.
pub fn complete(heap: &mut Heap, req: Addr, value: Option<Addr>) -> Result<Addr> {
    let roots = [req, value.unwrap_or(UNASSIGNED)];
    heap.with_roots(&roots, |heap| -> Result<Addr> {
        let ctx = request_context(heap, req);
        if let Some(value) = value {
            let target = request_frame(heap, req);
            if target == UNASSIGNED {
                context::push_os(heap, ctx, value)?;
            } else {
                frame::set(heap, target, 0, value)?;
                context::push_env(heap, ctx, request_env(heap, req))?;
            }
        }
        context::set_pc(heap, ctx, request_resume_pc(heap, req));
        cancel_waits(heap, ctx);
        context::set_blocked(heap, ctx, false);
        Ok(ctx)
    })
}

/// Remove all channel registrations of `ctx` and clear its wait-list.
pub fn cancel_waits(heap: &mut Heap, ctx: Addr) {
    let waitlist = context::waitlist(heap, ctx);
    for r in list::values(heap, waitlist) {
        if heap.tag(r) == Tag::ChannelRequest {
            let waiters = waiters(heap, request_chan(heap, r));
            list::remove(heap, waiters, r);
        }
    }
    list::clear(heap, waitlist);
}
