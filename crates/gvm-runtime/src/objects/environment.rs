//! Environments: the lexical scope chain.
//!
//! Layout: header + [len, frame0, frame1, ...], outermost frame first.
//! An environment is never mutated once built; `extend` makes a new one.

use crate::error::Result;
use crate::heap::{Addr, Heap};
use crate::objects::{frame, seq, Tag};

pub fn create_empty(heap: &mut Heap) -> Result<Addr> {
    seq::create(heap, Tag::Environment, 0)
}

/// New environment holding `env`'s frames followed by `new_frame`.
pub fn extend(heap: &mut Heap, env: Addr, new_frame: Addr) -> Result<Addr> {
    let frames = seq::elems(heap, env);
    let out = heap.with_roots(&[env, new_frame], |h| {
        seq::create(h, Tag::Environment, frames.len() + 1)
    })?;
    for (i, &f) in frames.iter().enumerate() {
        seq::raw_set(heap, out, i, f);
    }
    seq::raw_set(heap, out, frames.len(), new_frame);
    Ok(out)
}

#[inline]
pub fn len(heap: &Heap, env: Addr) -> usize {
    seq::len(heap, env)
}

pub fn frame(heap: &Heap, env: Addr, index: usize) -> Result<Addr> {
    let i = seq::check(heap, env, index as i64)?;
    Ok(seq::raw_get(heap, env, i))
}

pub fn frames(heap: &Heap, env: Addr) -> Vec<Addr> {
    seq::elems(heap, env)
}

/// Value bound at (frame, slot).
pub fn lookup(heap: &Heap, env: Addr, frame_index: usize, slot: usize) -> Result<Addr> {
    frame::get(heap, frame(heap, env, frame_index)?, slot)
}

/// Bind `val` at (frame, slot) and return the frame that was written.
pub fn assign(heap: &mut Heap, env: Addr, frame_index: usize, slot: usize, val: Addr) -> Result<Addr> {
    let f = frame(heap, env, frame_index)?;
    frame::set(heap, f, slot, val)?;
    Ok(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use crate::objects::primitive;

    #[test]
    fn test_extend_shares_frames() {
        let mut heap = Heap::new(256).unwrap();
        let base = create_empty(&mut heap).unwrap();
        heap.push_root(base);
        let f0 = frame::create(&mut heap, 2).unwrap();
        let e1 = extend(&mut heap, base, f0).unwrap();
        heap.push_root(e1);
        let f1 = frame::create(&mut heap, 1).unwrap();
        let e2 = extend(&mut heap, e1, f1).unwrap();
        heap.push_root(e2);

        assert_eq!(len(&heap, base), 0);
        assert_eq!(frames(&heap, e1), vec![f0]);
        assert_eq!(frames(&heap, e2), vec![f0, f1]);

        let v = primitive::new_int(&mut heap, 8).unwrap();
        assert_eq!(assign(&mut heap, e2, 0, 1, v).unwrap(), f0);
        // Visible through the older environment: frames are shared.
        assert_eq!(lookup(&heap, e1, 0, 1).unwrap(), v);
    }

    #[test]
    fn test_lookup_out_of_range() {
        let mut heap = Heap::new(128).unwrap();
        let base = create_empty(&mut heap).unwrap();
        let f = heap.with_roots(&[base], |h| frame::create(h, 1)).unwrap();
        let env = extend(&mut heap, base, f).unwrap();
        assert_eq!(
            lookup(&heap, env, 0, 3).unwrap_err(),
            RuntimeError::IndexOutOfRange { index: 3, len: 1 }
        );
        assert!(lookup(&heap, env, 1, 0).is_err());
    }
}
