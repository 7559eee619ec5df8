//! Runtime errors raised by the heap and the object model.

use thiserror::Error;

use crate::heap::Addr;
use crate::objects::Tag;

pub type Result<T> = core::result::Result<T, RuntimeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("out of memory: no free block for {requested} words after garbage collection")]
    OutOfMemory { requested: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("index out of range [{index}] with length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("sync: negative WaitGroup counter")]
    WaitGroupNegativeCounter,

    #[error("expected {expected:?} at address {addr}, found {found:?}")]
    UnexpectedTag { addr: Addr, expected: Tag, found: Tag },

    /// A request was parked on a channel already holding opposite-direction
    /// waiters from another context.
    #[error("channel at {chan} already has waiters of the opposite direction")]
    MixedWaiters { chan: Addr },

    #[error("heap capacity of {0} words is too small")]
    InvalidCapacity(usize),

    #[error("heap corrupted: {0}")]
    Corrupted(String),
}
