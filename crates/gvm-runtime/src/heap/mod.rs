//! Buddy-allocated heap over flat word memory.
//!
//! Every block spans `2^level` words and starts with one packed header word:
//!
//! ```text
//! bit      0     1..6    6         8..16   6..34      34..62
//! alloc    free  level   mark      tag
//! free     free  level   prev-free link    next-free link
//! ```
//!
//! Payload words follow the header. A zeroed payload word reads as
//! [`UNASSIGNED`], the address of the sentinel allocated first, so fresh
//! blocks never contain dangling references.

mod alloc;
mod gc;

use crate::error::{Result, RuntimeError};
use crate::memory::{Memory, Word};
use crate::objects::Tag;

pub use gc::GcStats;

/// Word offset of a block inside the heap.
pub type Addr = usize;

/// Address of the sentinel "unassigned" node. Always a GC root.
pub const UNASSIGNED: Addr = 0;

/// Free-list links are 28 bits wide, which bounds the arena.
pub const MAX_LEVEL: u32 = 28;

const MIN_LEVEL: u32 = 4;

const FREE_OFFSET: u32 = 0;
const LEVEL_OFFSET: u32 = 1;
const LEVEL_BITS: u32 = 5;
const MARK_OFFSET: u32 = 6;
const TAG_OFFSET: u32 = 8;
const TAG_BITS: u32 = 8;
const PREV_OFFSET: u32 = 6;
const NEXT_OFFSET: u32 = 34;
const LINK_BITS: u32 = 28;

/// One block of the arena partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    pub addr: Addr,
    pub words: usize,
    pub free: bool,
    /// `None` for free blocks.
    pub tag: Option<Tag>,
}

#[derive(Debug, Default)]
struct Roots {
    contexts: Vec<Addr>,
    temp: Vec<Addr>,
}

pub struct Heap {
    memory: Memory,
    levels: u32,
    free_lists: Vec<Option<Addr>>,
    roots: Roots,
    stats: GcStats,
}

impl Heap {
    /// Build a heap of `capacity` words.
    ///
    /// The capacity is rounded down to a power of two no larger than
    /// `2^MAX_LEVEL`. The sentinel occupies the first word.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < 1 << MIN_LEVEL {
            return Err(RuntimeError::InvalidCapacity(capacity));
        }
        let levels = (usize::BITS - 1 - capacity.leading_zeros()).min(MAX_LEVEL);
        if 1usize << levels != capacity {
            log::warn!(
                "heap capacity {} rounded down to {} words",
                capacity,
                1usize << levels
            );
        }
        let mut heap = Heap {
            memory: Memory::new(1 << levels),
            levels,
            free_lists: vec![None; levels as usize + 1],
            roots: Roots::default(),
            stats: GcStats::default(),
        };
        heap.push_free(0, levels);
        let sentinel = heap.allocate(1)?;
        debug_assert_eq!(sentinel, UNASSIGNED);
        Ok(heap)
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.memory.len()
    }

    #[inline]
    pub fn stats(&self) -> GcStats {
        self.stats
    }

    // =========================================================================
    // Header fields
    // =========================================================================

    #[inline]
    pub fn is_free(&self, addr: Addr) -> bool {
        self.memory.get_bits(addr, 1, FREE_OFFSET) == 1
    }

    #[inline]
    pub fn level(&self, addr: Addr) -> u32 {
        self.memory.get_bits(addr, LEVEL_BITS, LEVEL_OFFSET) as u32
    }

    /// Size of the block at `addr` in words, header included.
    #[inline]
    pub fn block_words(&self, addr: Addr) -> usize {
        1 << self.level(addr)
    }

    #[inline]
    pub fn payload_words(&self, addr: Addr) -> usize {
        self.block_words(addr) - 1
    }

    #[inline]
    pub fn tag(&self, addr: Addr) -> Tag {
        Tag::from_u8(self.memory.get_bits(addr, TAG_BITS, TAG_OFFSET) as u8)
    }

    #[inline]
    pub fn set_tag(&mut self, addr: Addr, tag: Tag) {
        self.memory.set_bits(tag as Word, addr, TAG_BITS, TAG_OFFSET);
    }

    /// Fail unless the block at `addr` carries `expected`.
    pub fn expect(&self, addr: Addr, expected: Tag) -> Result<()> {
        let found = self.tag(addr);
        if found == expected {
            Ok(())
        } else {
            Err(RuntimeError::UnexpectedTag { addr, expected, found })
        }
    }

    #[inline]
    fn is_marked(&self, addr: Addr) -> bool {
        self.memory.get_bits(addr, 1, MARK_OFFSET) == 1
    }

    #[inline]
    fn set_mark(&mut self, addr: Addr, marked: bool) {
        self.memory.set_bits(marked as Word, addr, 1, MARK_OFFSET);
    }

    #[inline]
    fn prev_free(&self, addr: Addr) -> Addr {
        self.memory.get_bits(addr, LINK_BITS, PREV_OFFSET) as Addr
    }

    #[inline]
    fn next_free(&self, addr: Addr) -> Addr {
        self.memory.get_bits(addr, LINK_BITS, NEXT_OFFSET) as Addr
    }

    #[inline]
    fn set_prev_free(&mut self, addr: Addr, prev: Addr) {
        self.memory.set_bits(prev as Word, addr, LINK_BITS, PREV_OFFSET);
    }

    #[inline]
    fn set_next_free(&mut self, addr: Addr, next: Addr) {
        self.memory.set_bits(next as Word, addr, LINK_BITS, NEXT_OFFSET);
    }

    fn write_header(&mut self, addr: Addr, free: bool, level: u32) {
        self.memory.set_word(0, addr);
        self.memory.set_bits(free as Word, addr, 1, FREE_OFFSET);
        self.memory.set_bits(level as Word, addr, LEVEL_BITS, LEVEL_OFFSET);
    }

    // =========================================================================
    // Payload
    // =========================================================================

    /// Read payload word `i` of the block at `addr`.
    #[inline]
    pub fn read(&self, addr: Addr, i: usize) -> Word {
        assert!(
            i < self.payload_words(addr),
            "payload word {} outside block {} of {} words",
            i,
            addr,
            self.block_words(addr)
        );
        self.memory.get_word(addr + 1 + i)
    }

    #[inline]
    pub fn write(&mut self, addr: Addr, i: usize, val: Word) {
        assert!(
            i < self.payload_words(addr),
            "payload word {} outside block {} of {} words",
            i,
            addr,
            self.block_words(addr)
        );
        self.memory.set_word(val, addr + 1 + i);
    }

    #[inline]
    pub fn read_addr(&self, addr: Addr, i: usize) -> Addr {
        self.read(addr, i) as Addr
    }

    #[inline]
    pub fn write_addr(&mut self, addr: Addr, i: usize, val: Addr) {
        self.write(addr, i, val as Word);
    }

    /// Allocate a block with `payload` words and stamp it with `tag`.
    pub fn alloc(&mut self, tag: Tag, payload: usize) -> Result<Addr> {
        let size = payload
            .checked_add(1)
            .ok_or(RuntimeError::OutOfMemory { requested: payload })?;
        let addr = self.allocate(size)?;
        self.set_tag(addr, tag);
        Ok(addr)
    }

    /// Overwrite `dst`'s payload with `src`'s, word for word up to the
    /// shorter of the two. `dst` keeps its level and tag.
    pub fn copy(&mut self, dst: Addr, src: Addr) {
        if dst == src {
            return;
        }
        let n = self.payload_words(dst).min(self.payload_words(src));
        for i in 0..n {
            let w = self.read(src, i);
            self.write(dst, i, w);
        }
    }

    /// Allocate a block the size of `src` with the same tag and payload.
    pub fn clone(&mut self, src: Addr) -> Result<Addr> {
        let words = self.block_words(src);
        let dst = self.with_roots(&[src], |heap| heap.allocate(words))?;
        self.set_tag(dst, self.tag(src));
        self.copy(dst, src);
        Ok(dst)
    }

    // =========================================================================
    // Roots
    // =========================================================================

    /// Add a context to the live set traced by the collector.
    pub fn register_context(&mut self, ctx: Addr) {
        self.roots.contexts.push(ctx);
    }

    /// Remove a terminated context from the live set.
    pub fn retire_context(&mut self, ctx: Addr) {
        if let Some(pos) = self.roots.contexts.iter().position(|&c| c == ctx) {
            self.roots.contexts.remove(pos);
        }
    }

    /// Live contexts in registration order.
    #[inline]
    pub fn contexts(&self) -> &[Addr] {
        &self.roots.contexts
    }

    #[inline]
    pub fn push_root(&mut self, addr: Addr) {
        self.roots.temp.push(addr);
    }

    #[inline]
    pub fn root_mark(&self) -> usize {
        self.roots.temp.len()
    }

    /// Drop every temp root pushed since `mark`.
    #[inline]
    pub fn release_roots(&mut self, mark: usize) {
        self.roots.temp.truncate(mark);
    }

    /// Run `f` with `roots` protected from collection. Roots pushed inside
    /// `f` are released along with them.
    pub fn with_roots<R, E>(
        &mut self,
        roots: &[Addr],
        f: impl FnOnce(&mut Heap) -> core::result::Result<R, E>,
    ) -> core::result::Result<R, E> {
        let mark = self.root_mark();
        self.roots.temp.extend_from_slice(roots);
        let out = f(self);
        self.release_roots(mark);
        out
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Walk the arena partition in address order.
    pub fn blocks(&self) -> Vec<BlockInfo> {
        let mut out = Vec::new();
        let mut addr = 0;
        while addr < self.capacity() {
            let words = self.block_words(addr);
            let free = self.is_free(addr);
            out.push(BlockInfo {
                addr,
                words,
                free,
                tag: if free { None } else { Some(self.tag(addr)) },
            });
            addr += words;
        }
        out
    }

    pub fn free_words(&self) -> usize {
        self.blocks().iter().filter(|b| b.free).map(|b| b.words).sum()
    }

    /// Verify the partition and free lists agree with each other.
    pub fn check_invariants(&self) -> Result<()> {
        let corrupted = |msg: String| Err(RuntimeError::Corrupted(msg));
        let mut addr = 0;
        let mut free_counts = vec![0usize; self.free_lists.len()];
        while addr < self.capacity() {
            let level = self.level(addr);
            if level > self.levels {
                return corrupted(format!("block {} has level {}", addr, level));
            }
            let words = 1usize << level;
            if addr % words != 0 {
                return corrupted(format!("block {} not aligned to {} words", addr, words));
            }
            if self.is_free(addr) {
                free_counts[level as usize] += 1;
            }
            addr += words;
        }
        if addr != self.capacity() {
            return corrupted(format!("partition ends at {} of {}", addr, self.capacity()));
        }
        for (level, head) in self.free_lists.iter().enumerate() {
            let mut listed = 0;
            if let Some(head) = *head {
                let mut cur = head;
                loop {
                    if !self.is_free(cur) || self.level(cur) as usize != level {
                        return corrupted(format!("free list {} holds block {}", level, cur));
                    }
                    if self.prev_free(self.next_free(cur)) != cur {
                        return corrupted(format!("broken links at {}", cur));
                    }
                    listed += 1;
                    if listed > free_counts[level] {
                        return corrupted(format!("free list {} is cyclic", level));
                    }
                    cur = self.next_free(cur);
                    if cur == head {
                        break;
                    }
                }
            }
            if listed != free_counts[level] {
                return corrupted(format!(
                    "free list {} has {} blocks, partition has {}",
                    level, listed, free_counts[level]
                ));
            }
        }
        Ok(())
    }
}

impl core::fmt::Debug for Heap {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Heap")
            .field("capacity", &self.capacity())
            .field("contexts", &self.roots.contexts.len())
            .field("temp_roots", &self.roots.temp.len())
            .field("stats", &self.stats)
            .finish()
    }
}
