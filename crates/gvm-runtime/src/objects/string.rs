//! Immutable strings.
//!
//! Layout: header + [len, bytes]
//! `bytes` is a `Bytes` block holding the UTF-8 data eight bytes per word,
//! little-endian, or `UNASSIGNED` for the empty string. Strings never change
//! after construction, so assignment shares them.

use crate::error::Result;
use crate::heap::{Addr, Heap, UNASSIGNED};
use crate::objects::Tag;

const FIELD_LEN: usize = 0;
const FIELD_BYTES: usize = 1;

pub fn create(heap: &mut Heap, s: &str) -> Result<Addr> {
    from_bytes(heap, s.as_bytes())
}

/// Build a string from raw bytes. Go strings need not be valid UTF-8.
pub fn from_bytes(heap: &mut Heap, s: &[u8]) -> Result<Addr> {
    let bytes = if s.is_empty() {
        UNASSIGNED
    } else {
        let b = heap.alloc(Tag::Bytes, s.len().div_ceil(8))?;
        for (i, chunk) in s.chunks(8).enumerate() {
            let mut buf = [0u8; 8];
            buf[..chunk.len()].copy_from_slice(chunk);
            heap.write(b, i, u64::from_le_bytes(buf));
        }
        b
    };
    let a = heap.with_roots(&[bytes], |h| h.alloc(Tag::String, 2))?;
    heap.write(a, FIELD_LEN, s.len() as u64);
    heap.write_addr(a, FIELD_BYTES, bytes);
    Ok(a)
}

#[inline]
pub fn len(heap: &Heap, a: Addr) -> usize {
    heap.read(a, FIELD_LEN) as usize
}

pub fn byte_at(heap: &Heap, a: Addr, i: usize) -> u8 {
    let word = heap.read(heap.read_addr(a, FIELD_BYTES), i / 8);
    word.to_le_bytes()[i % 8]
}

pub fn as_bytes(heap: &Heap, a: Addr) -> Vec<u8> {
    (0..len(heap, a)).map(|i| byte_at(heap, a, i)).collect()
}

pub fn to_string(heap: &Heap, a: Addr) -> String {
    String::from_utf8_lossy(&as_bytes(heap, a)).into_owned()
}

pub fn concat(heap: &mut Heap, a: Addr, b: Addr) -> Result<Addr> {
    let mut s = as_bytes(heap, a);
    s.extend(as_bytes(heap, b));
    from_bytes(heap, &s)
}

pub fn children(heap: &Heap, a: Addr) -> Vec<Addr> {
    vec![heap.read_addr(a, FIELD_BYTES)]
}
