//! Mark-and-sweep collection.
//!
//! Roots are the live contexts, the temp-root stack and the sentinel. The
//! collector only runs from inside `allocate`, so it never observes a
//! half-executed instruction; callers holding unrooted addresses across an
//! allocation must protect them with `with_roots`.

use super::{Addr, Heap, UNASSIGNED};
use crate::objects;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    pub collections: u64,
    pub blocks_freed: u64,
    pub words_freed: u64,
}

impl Heap {
    /// Mark everything reachable from `root`.
    pub fn mark(&mut self, root: Addr) {
        let mut gray = vec![root];
        while let Some(addr) = gray.pop() {
            debug_assert!(!self.is_free(addr), "reference to free block {}", addr);
            if self.is_marked(addr) {
                continue;
            }
            self.set_mark(addr, true);
            gray.extend(objects::children(self, addr));
        }
    }

    /// Free every allocated block unreachable from the roots.
    pub fn mark_and_sweep(&mut self) {
        let roots: Vec<Addr> = core::iter::once(UNASSIGNED)
            .chain(self.roots.contexts.iter().copied())
            .chain(self.roots.temp.iter().copied())
            .collect();
        for root in roots {
            self.mark(root);
        }

        // Collect first, free after: coalescing rewrites headers the scan
        // has not reached yet.
        let mut dead = Vec::new();
        let mut addr = 0;
        while addr < self.capacity() {
            let words = self.block_words(addr);
            if !self.is_free(addr) {
                if self.is_marked(addr) {
                    self.set_mark(addr, false);
                } else {
                    dead.push((addr, words));
                }
            }
            addr += words;
        }

        let words: usize = dead.iter().map(|&(_, w)| w).sum();
        for &(addr, _) in &dead {
            self.free(addr);
        }
        self.stats.collections += 1;
        self.stats.blocks_freed += dead.len() as u64;
        self.stats.words_freed += words as u64;
        log::debug!(
            "gc #{}: freed {} blocks ({} words), {} words free",
            self.stats.collections,
            dead.len(),
            words,
            self.free_words()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{array, primitive, Tag};

    fn is_live(heap: &Heap, addr: Addr) -> bool {
        heap.blocks().iter().any(|b| b.addr == addr && !b.free)
    }

    #[test]
    fn test_sweep_frees_unreachable() {
        let mut heap = Heap::new(256).unwrap();
        let garbage: Vec<Addr> = (0..5).map(|i| primitive::new_int(&mut heap, i).unwrap()).collect();
        heap.mark_and_sweep();
        for g in garbage {
            assert!(!is_live(&heap, g));
        }
        assert_eq!(heap.free_words(), 255);
        heap.check_invariants().unwrap();
    }

    #[test]
    fn test_temp_roots_survive_with_children() {
        let mut heap = Heap::new(256).unwrap();
        let x = primitive::new_int(&mut heap, 1).unwrap();
        let arr = heap.with_roots(&[x], |h| array::from_elems(h, &[x])).unwrap();
        let lost = primitive::new_int(&mut heap, 2).unwrap();
        heap.push_root(arr);
        heap.mark_and_sweep();
        assert!(is_live(&heap, arr));
        assert!(is_live(&heap, x));
        assert!(!is_live(&heap, lost));
        assert_eq!(heap.tag(x), Tag::Int);
        assert_eq!(primitive::int_value(&heap, x), 1);
    }

    #[test]
    fn test_context_roots() {
        let mut heap = Heap::new(256).unwrap();
        let a = primitive::new_int(&mut heap, 5).unwrap();
        heap.register_context(a);
        heap.mark_and_sweep();
        assert!(is_live(&heap, a));
        heap.retire_context(a);
        heap.mark_and_sweep();
        assert!(!is_live(&heap, a));
    }

    #[test]
    fn test_marks_cleared_after_sweep() {
        let mut heap = Heap::new(64).unwrap();
        let a = primitive::new_int(&mut heap, 5).unwrap();
        heap.push_root(a);
        heap.mark_and_sweep();
        assert!(!heap.is_marked(a));
        assert!(!heap.is_marked(UNASSIGNED));
    }

    #[test]
    fn test_allocate_collects_when_full() {
        let mut heap = Heap::new(64).unwrap();
        let keep = primitive::new_int(&mut heap, 9).unwrap();
        heap.push_root(keep);
        for i in 0..200 {
            primitive::new_int(&mut heap, i).unwrap();
        }
        assert!(heap.stats().collections > 0);
        assert_eq!(primitive::int_value(&heap, keep), 9);
        heap.check_invariants().unwrap();
    }

    #[test]
    fn test_cycle_is_collected() {
        let mut heap = Heap::new(256).unwrap();
        let a = array::create(&mut heap, 1).unwrap();
        let b = heap.with_roots(&[a], |h| array::create(h, 1)).unwrap();
        array::raw_set(&mut heap, a, 0, b);
        array::raw_set(&mut heap, b, 0, a);
        heap.mark_and_sweep();
        assert!(!is_live(&heap, a));
        assert!(!is_live(&heap, b));
    }
}
