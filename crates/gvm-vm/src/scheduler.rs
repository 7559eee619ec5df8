//! Cooperative round-robin scheduling of contexts.
//!
//! The scheduler only tracks which context runs next. Blocked contexts are
//! not held here; whichever channel or wait group parked them hands them
//! back through `wake`.

use std::collections::VecDeque;

use gvm_runtime::Addr;

#[derive(Debug)]
pub struct Scheduler {
    ready: VecDeque<Addr>,
    current: Option<Addr>,
    slice_used: u32,
    time_slice: u32,
}

impl Scheduler {
    pub fn new(time_slice: u32) -> Self {
        Self {
            ready: VecDeque::new(),
            current: None,
            slice_used: 0,
            time_slice: time_slice.max(1),
        }
    }

    /// Enqueue a newly created context.
    pub fn spawn(&mut self, ctx: Addr) {
        log::trace!("spawn context @{}", ctx);
        self.ready.push_back(ctx);
    }

    /// Make a previously blocked context runnable again.
    pub fn wake(&mut self, ctx: Addr) {
        log::trace!("wake context @{}", ctx);
        self.ready.push_back(ctx);
    }

    /// The context to run next: the current one while its slice lasts,
    /// otherwise the front of the ready queue.
    pub fn schedule_next(&mut self) -> Option<Addr> {
        if self.current.is_none() {
            self.current = self.ready.pop_front();
            self.slice_used = 0;
        }
        self.current
    }

    /// Count one executed instruction. Returns true once the slice is spent.
    pub fn tick(&mut self) -> bool {
        self.slice_used += 1;
        self.slice_used >= self.time_slice
    }

    /// Move the current context to the back of the ready queue.
    pub fn yield_current(&mut self) {
        if let Some(ctx) = self.current.take() {
            log::trace!("preempt context @{} after {} instructions", ctx, self.slice_used);
            self.ready.push_back(ctx);
        }
    }

    /// Drop the current context without re-queueing it.
    pub fn block_current(&mut self) -> Option<Addr> {
        self.current.take()
    }

    pub fn kill_current(&mut self) -> Option<Addr> {
        self.current.take()
    }

    #[inline]
    pub fn current(&self) -> Option<Addr> {
        self.current
    }

    pub fn ready(&self) -> Vec<Addr> {
        self.ready.iter().copied().collect()
    }

    #[inline]
    pub fn has_work(&self) -> bool {
        self.current.is_some() || !self.ready.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_with_preemption() {
        let mut s = Scheduler::new(2);
        s.spawn(10);
        s.spawn(20);
        assert_eq!(s.schedule_next(), Some(10));
        assert!(!s.tick());
        assert_eq!(s.schedule_next(), Some(10));
        assert!(s.tick());
        s.yield_current();
        assert_eq!(s.schedule_next(), Some(20));
        assert_eq!(s.ready(), vec![10]);
    }

    #[test]
    fn test_block_and_wake() {
        let mut s = Scheduler::new(100);
        s.spawn(1);
        assert_eq!(s.schedule_next(), Some(1));
        assert_eq!(s.block_current(), Some(1));
        assert!(!s.has_work());
        assert_eq!(s.schedule_next(), None);
        s.wake(1);
        assert!(s.has_work());
        assert_eq!(s.schedule_next(), Some(1));
        assert_eq!(s.kill_current(), Some(1));
        assert_eq!(s.current(), None);
    }

    #[test]
    fn test_fresh_slice_after_switch() {
        let mut s = Scheduler::new(2);
        s.spawn(1);
        s.schedule_next();
        s.tick();
        s.block_current();
        s.wake(1);
        s.schedule_next();
        assert!(!s.tick());
    }
}
