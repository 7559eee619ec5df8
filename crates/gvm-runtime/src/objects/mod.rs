//! Typed views over heap blocks.
//!
//! Each module exposes free functions over an [`Addr`]: a constructor, field
//! accessors and `children` for tracing. Constructors protect their address
//! arguments across their own allocations; callers only need temp roots for
//! addresses they hold across several calls.

pub mod array;
pub mod channel;
pub mod closure;
pub mod context;
pub mod environment;
pub mod frame;
pub mod list;
pub mod primitive;
pub mod queue;
pub mod slice;
pub mod stack;
pub mod string;
pub mod wait_group;

use num_enum::TryFromPrimitive;

use crate::error::Result;
use crate::heap::{Addr, Heap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Tag {
    Unassigned = 0,
    Int,
    Float,
    Bool,
    String,
    /// Packed UTF-8 data behind a `String`.
    Bytes,
    Frame,
    Environment,
    Context,
    Array,
    Slice,
    Stack,
    Queue,
    List,
    ListNode,
    Channel,
    ChannelRequest,
    Func,
    Method,
    /// Return marker on a context's RTS.
    CallRef,
    WaitGroup,
}

impl Tag {
    #[inline]
    pub fn from_u8(v: u8) -> Self {
        Self::try_from(v).unwrap_or(Tag::Unassigned)
    }

    #[inline]
    pub fn is_primitive(self) -> bool {
        matches!(self, Tag::Int | Tag::Float | Tag::Bool | Tag::String)
    }
}

/// Addresses directly referenced by the block at `addr`.
pub fn children(heap: &Heap, addr: Addr) -> Vec<Addr> {
    match heap.tag(addr) {
        Tag::Unassigned | Tag::Int | Tag::Float | Tag::Bool | Tag::Bytes | Tag::CallRef => Vec::new(),
        Tag::String => string::children(heap, addr),
        Tag::Frame | Tag::Environment | Tag::Array => seq::elems(heap, addr),
        Tag::Slice => slice::children(heap, addr),
        Tag::Stack => stack::children(heap, addr),
        Tag::Queue => queue::children(heap, addr),
        Tag::List => list::children(heap, addr),
        Tag::ListNode => list::node_children(heap, addr),
        Tag::Context => context::children(heap, addr),
        Tag::Channel => channel::children(heap, addr),
        Tag::ChannelRequest => channel::request_children(heap, addr),
        Tag::Func => closure::children(heap, addr),
        Tag::Method => closure::method_children(heap, addr),
        Tag::WaitGroup => wait_group::children(heap, addr),
    }
}

/// Copy for assignment: primitives get a fresh box, arrays a fresh element
/// tree, everything else is shared.
pub fn value_copy(heap: &mut Heap, addr: Addr) -> Result<Addr> {
    match heap.tag(addr) {
        Tag::Int | Tag::Float | Tag::Bool => heap.clone(addr),
        Tag::Array => {
            let elems = array::elems(heap, addr);
            let out = heap.with_roots(&[addr], |h| array::create(h, elems.len()))?;
            heap.with_roots(&[addr, out], |h| -> Result<()> {
                for (i, e) in elems.into_iter().enumerate() {
                    let c = value_copy(h, e)?;
                    array::raw_set(h, out, i, c);
                }
                Ok(())
            })?;
            Ok(out)
        }
        _ => Ok(addr),
    }
}

/// Render a value the way `fmt.Println` would.
pub fn display(heap: &Heap, addr: Addr) -> String {
    match heap.tag(addr) {
        Tag::Unassigned => "<nil>".to_string(),
        Tag::Int => primitive::int_value(heap, addr).to_string(),
        Tag::Float => format_float(primitive::float_value(heap, addr)),
        Tag::Bool => primitive::bool_value(heap, addr).to_string(),
        Tag::String => string::to_string(heap, addr),
        Tag::Array => join(heap, &array::elems(heap, addr)),
        Tag::Slice => join(heap, &slice::elems(heap, addr)),
        Tag::Channel => format!("0x{:x}", addr),
        Tag::Func => format!("func@{}", closure::entry(heap, addr)),
        Tag::Method => format!(
            "method {}",
            string::to_string(heap, closure::method_name(heap, addr))
        ),
        Tag::WaitGroup => format!("{{{}}}", wait_group::counter(heap, addr)),
        tag => format!("<{:?}@{}>", tag, addr),
    }
}

fn join(heap: &Heap, elems: &[Addr]) -> String {
    let parts: Vec<String> = elems.iter().map(|&e| display(heap, e)).collect();
    format!("[{}]", parts.join(" "))
}

fn format_float(v: f64) -> String {
    if v.is_finite() && (v == 0.0 || (1e-4..1e21).contains(&v.abs())) {
        format!("{}", v)
    } else if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v > 0.0 { "+Inf" } else { "-Inf" }.to_string()
    } else {
        format!("{:e}", v)
    }
}

/// Shared layout of frames, environments and arrays: `[len, slot...]`.
pub(crate) mod seq {
    use super::Tag;
    use crate::error::{Result, RuntimeError};
    use crate::heap::{Addr, Heap};

    pub fn create(heap: &mut Heap, tag: Tag, len: usize) -> Result<Addr> {
        let payload = len
            .checked_add(1)
            .ok_or(RuntimeError::OutOfMemory { requested: len })?;
        let addr = heap.alloc(tag, payload)?;
        heap.write(addr, 0, len as u64);
        Ok(addr)
    }

    #[inline]
    pub fn len(heap: &Heap, addr: Addr) -> usize {
        heap.read(addr, 0) as usize
    }

    #[inline]
    pub fn raw_get(heap: &Heap, addr: Addr, i: usize) -> Addr {
        heap.read_addr(addr, 1 + i)
    }

    #[inline]
    pub fn raw_set(heap: &mut Heap, addr: Addr, i: usize, val: Addr) {
        heap.write_addr(addr, 1 + i, val);
    }

    pub fn check(heap: &Heap, addr: Addr, index: i64) -> Result<usize> {
        let len = len(heap, addr);
        if index < 0 || index as usize >= len {
            return Err(RuntimeError::IndexOutOfRange { index, len });
        }
        Ok(index as usize)
    }

    pub fn elems(heap: &Heap, addr: Addr) -> Vec<Addr> {
        (0..len(heap, addr)).map(|i| raw_get(heap, addr, i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::UNASSIGNED;

    #[test]
    fn test_tag_roundtrip() {
        for v in 0u8..=20 {
            assert_eq!(Tag::from_u8(v) as u8, v);
        }
        assert_eq!(Tag::from_u8(200), Tag::Unassigned);
    }

    #[test]
    fn test_display_values() {
        let mut heap = Heap::new(256).unwrap();
        let i = primitive::new_int(&mut heap, -3).unwrap();
        let f = primitive::new_float(&mut heap, 2.5).unwrap();
        let b = primitive::new_bool(&mut heap, true).unwrap();
        let s = string::create(&mut heap, "hi").unwrap();
        assert_eq!(display(&heap, i), "-3");
        assert_eq!(display(&heap, f), "2.5");
        assert_eq!(display(&heap, b), "true");
        assert_eq!(display(&heap, s), "hi");
        assert_eq!(display(&heap, UNASSIGNED), "<nil>");
        let arr = array::from_elems(&mut heap, &[i, b]).unwrap();
        assert_eq!(display(&heap, arr), "[-3 true]");
    }

    #[test]
    fn test_format_float() {
        assert_eq!(format_float(3.0), "3");
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(1e21), "1e21");
        assert_eq!(format_float(f64::INFINITY), "+Inf");
    }

    #[test]
    fn test_value_copy_is_deep_for_arrays() {
        let mut heap = Heap::new(256).unwrap();
        let x = primitive::new_int(&mut heap, 1).unwrap();
        let arr = heap.with_roots(&[x], |h| array::from_elems(h, &[x])).unwrap();
        let copy = heap.with_roots(&[arr], |h| value_copy(h, arr)).unwrap();
        assert_ne!(copy, arr);
        let inner = array::raw_get(&heap, copy, 0);
        assert_ne!(inner, x);
        assert_eq!(primitive::int_value(&heap, inner), 1);

        let s = string::create(&mut heap, "shared").unwrap();
        assert_eq!(value_copy(&mut heap, s).unwrap(), s);
    }
}
