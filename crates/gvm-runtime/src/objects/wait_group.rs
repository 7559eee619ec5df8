//! sync.WaitGroup.
//!
//! Layout: header + [counter, waiters]
//! `waiters` is a Queue of blocked contexts, released in arrival order once
//! the counter drops to zero.

use crate::error::{Result, RuntimeError};
use crate::heap::{Addr, Heap};
use crate::objects::{channel, context, list, queue, Tag};

const FIELD_COUNTER: usize = 0;
const FIELD_WAITERS: usize = 1;

pub fn create(heap: &mut Heap) -> Result<Addr> {
    let waiters = queue::create(heap, 0)?;
    let wg = heap.with_roots(&[waiters], |h| h.alloc(Tag::WaitGroup, 2))?;
    heap.write_addr(wg, FIELD_WAITERS, waiters);
    Ok(wg)
}

#[inline]
pub fn counter(heap: &Heap, wg: Addr) -> i64 {
    heap.read(wg, FIELD_COUNTER) as i64
}

#[inline]
fn waiters(heap: &Heap, wg: Addr) -> Addr {
    heap.read_addr(wg, FIELD_WAITERS)
}

/// Contexts blocked in `Wait`, oldest first.
pub fn waiting(heap: &Heap, wg: Addr) -> Vec<Addr> {
    queue::items_vec(heap, waiters(heap, wg))
}

/// Adjust the counter by `delta`. Returns the contexts released when it
/// reaches zero.
pub fn add(heap: &mut Heap, wg: Addr, delta: i64) -> Result<Vec<Addr>> {
    let next = counter(heap, wg) + delta;
    if next < 0 {
        return Err(RuntimeError::WaitGroupNegativeCounter);
    }
    heap.write(wg, FIELD_COUNTER, next as u64);
    if next == 0 {
        Ok(release(heap, wg))
    } else {
        Ok(Vec::new())
    }
}

pub fn done(heap: &mut Heap, wg: Addr) -> Result<Vec<Addr>> {
    add(heap, wg, -1)
}

/// Block `ctx` until the counter is zero. Returns false when it already is,
/// in which case nothing changes.
pub fn wait(heap: &mut Heap, wg: Addr, ctx: Addr) -> Result<bool> {
    if counter(heap, wg) == 0 {
        return Ok(false);
    }
    let waiters = waiters(heap, wg);
    heap.with_roots(&[wg, ctx], |h| -> Result<()> {
        queue::push(h, waiters, ctx)?;
        let waitlist = context::waitlist(h, ctx);
        list::push_back(h, waitlist, wg)
    })?;
    context::set_blocked(heap, ctx, true);
    Ok(true)
}

fn release(heap: &mut Heap, wg: Addr) -> Vec<Addr> {
    let waiters = waiters(heap, wg);
    let mut woken = Vec::with_capacity(queue::len(heap, waiters));
    while let Some(ctx) = queue::pop(heap, waiters) {
        channel::cancel_waits(heap, ctx);
        context::set_blocked(heap, ctx, false);
        woken.push(ctx);
    }
    woken
}

pub fn children(heap: &Heap, wg: Addr) -> Vec<Addr> {
    vec![waiters(heap, wg)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::environment;

    fn blocked_context(heap: &mut Heap, id: u64) -> Addr {
        let env = environment::create_empty(heap).unwrap();
        let ctx = context::create(heap, 0, env, id).unwrap();
        heap.register_context(ctx);
        ctx
    }

    #[test]
    fn test_counter_and_negative() {
        let mut heap = Heap::new(256).unwrap();
        let wg = create(&mut heap).unwrap();
        heap.push_root(wg);
        assert_eq!(add(&mut heap, wg, 2).unwrap(), Vec::<Addr>::new());
        assert_eq!(counter(&heap, wg), 2);
        done(&mut heap, wg).unwrap();
        done(&mut heap, wg).unwrap();
        assert_eq!(done(&mut heap, wg).unwrap_err(), RuntimeError::WaitGroupNegativeCounter);
        assert_eq!(counter(&heap, wg), 0);
        assert_eq!(add(&mut heap, wg, -1).unwrap_err(), RuntimeError::WaitGroupNegativeCounter);
    }

    #[test]
    fn test_wait_on_zero_does_not_block() {
        let mut heap = Heap::new(512).unwrap();
        let wg = create(&mut heap).unwrap();
        heap.push_root(wg);
        let ctx = blocked_context(&mut heap, 1);
        assert!(!wait(&mut heap, wg, ctx).unwrap());
        assert!(!context::is_blocked(&heap, ctx));
    }

    #[test]
    fn test_release_in_arrival_order() {
        let mut heap = Heap::new(1024).unwrap();
        let wg = create(&mut heap).unwrap();
        heap.push_root(wg);
        add(&mut heap, wg, 1).unwrap();
        let a = blocked_context(&mut heap, 1);
        let b = blocked_context(&mut heap, 2);
        assert!(wait(&mut heap, wg, a).unwrap());
        assert!(wait(&mut heap, wg, b).unwrap());
        assert!(context::is_blocked(&heap, a));
        assert_eq!(waiting(&heap, wg), vec![a, b]);

        assert_eq!(done(&mut heap, wg).unwrap(), vec![a, b]);
        assert!(!context::is_blocked(&heap, a));
        assert!(!context::is_blocked(&heap, b));
        assert!(waiting(&heap, wg).is_empty());
        assert!(list::is_empty(&heap, context::waitlist(&heap, a)));
    }
}
