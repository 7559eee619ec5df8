//! Buddy allocation: level-indexed circular free lists, split on allocate,
//! coalesce on free.

use super::{Addr, Heap};
use crate::error::{Result, RuntimeError};

/// `ceil(log2(size))`, with sizes 0 and 1 mapping to level 0. `None` when
/// no power of two in `usize` covers `size`.
#[inline]
pub(crate) fn level_for(size: usize) -> Option<u32> {
    size.max(1).checked_next_power_of_two().map(usize::trailing_zeros)
}

impl Heap {
    /// Allocate a zero-filled block of at least `size` words.
    ///
    /// Runs one garbage collection when no free block is large enough.
    pub fn allocate(&mut self, size: usize) -> Result<Addr> {
        let level = match level_for(size) {
            Some(level) if level <= self.levels => level,
            _ => return Err(RuntimeError::OutOfMemory { requested: size }),
        };
        let addr = match self.take_free(level) {
            Some(addr) => addr,
            None => {
                self.mark_and_sweep();
                self.take_free(level)
                    .ok_or(RuntimeError::OutOfMemory { requested: size })?
            }
        };
        self.write_header(addr, false, level);
        for i in 1..(1usize << level) {
            self.memory.set_word(0, addr + i);
        }
        Ok(addr)
    }

    /// Return the block at `addr` to the free lists, merging with free buddies.
    pub fn free(&mut self, addr: Addr) {
        debug_assert!(!self.is_free(addr), "double free of block {}", addr);
        let mut addr = addr;
        let mut level = self.level(addr);
        while level < self.levels {
            let buddy = addr ^ (1 << level);
            if !self.is_free(buddy) || self.level(buddy) != level {
                break;
            }
            self.unlink_free(buddy, level);
            addr = addr.min(buddy);
            level += 1;
        }
        self.push_free(addr, level);
    }

    fn take_free(&mut self, level: u32) -> Option<Addr> {
        for found in level..=self.levels {
            let Some(addr) = self.free_lists[found as usize] else {
                continue;
            };
            self.unlink_free(addr, found);
            let mut current = found;
            while current > level {
                current -= 1;
                self.push_free(addr + (1 << current), current);
            }
            return Some(addr);
        }
        None
    }

    /// Stamp `addr` as a free block of `level` and append it to that list.
    pub(super) fn push_free(&mut self, addr: Addr, level: u32) {
        self.write_header(addr, true, level);
        match self.free_lists[level as usize] {
            None => {
                self.set_prev_free(addr, addr);
                self.set_next_free(addr, addr);
                self.free_lists[level as usize] = Some(addr);
            }
            Some(head) => {
                let tail = self.prev_free(head);
                self.set_next_free(tail, addr);
                self.set_prev_free(addr, tail);
                self.set_next_free(addr, head);
                self.set_prev_free(head, addr);
            }
        }
    }

    fn unlink_free(&mut self, addr: Addr, level: u32) {
        let next = self.next_free(addr);
        if next == addr {
            self.free_lists[level as usize] = None;
            return;
        }
        let prev = self.prev_free(addr);
        self.set_next_free(prev, next);
        self.set_prev_free(next, prev);
        if self.free_lists[level as usize] == Some(addr) {
            self.free_lists[level as usize] = Some(next);
        }
    }
}
