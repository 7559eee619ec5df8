//! gvm runtime: the memory substrate shared by the VM.
//!
//! Everything lives in one flat word buffer ([`Memory`]). The [`Heap`] carves
//! it into buddy blocks, traces them for garbage collection, and the
//! [`objects`] modules give each tagged block a typed view. A reference to an
//! object is always an [`Addr`], a word offset into that buffer.

pub mod error;
pub mod heap;
pub mod memory;
pub mod objects;

pub use error::{Result, RuntimeError};
pub use heap::{Addr, BlockInfo, GcStats, Heap, UNASSIGNED};
pub use memory::{Memory, Word, WORD_BITS};
pub use objects::Tag;
