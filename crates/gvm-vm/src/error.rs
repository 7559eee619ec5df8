//! Fatal VM errors. Any of these aborts the whole process.

use gvm_runtime::{RuntimeError, Tag};
use thiserror::Error;

pub type Result<T> = core::result::Result<T, VmError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("invalid operation: operator {op} not defined on {operands:?}")]
    InvalidOperandTypes { op: &'static str, operands: Vec<Tag> },

    #[error("integer divide by zero")]
    DivisionByZero,

    #[error("negative shift amount")]
    NegativeShift,

    /// A negative or inconsistent size passed to `make`.
    #[error("{what} out of range ({value})")]
    InvalidLength { what: &'static str, value: i64 },

    #[error("function takes {expected} arguments, called with {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("{receiver:?} has no method {method}")]
    UnknownMethod { receiver: Tag, method: String },

    #[error("program counter {0} outside the program")]
    PcOutOfRange(usize),

    #[error("time limit exceeded: more than {0} instructions executed")]
    TimeLimitExceeded(u64),

    #[error("return with no enclosing call")]
    RtsExhausted,

    #[error("fatal error: all goroutines are asleep - deadlock!\n{0}")]
    Deadlock(String),
}
