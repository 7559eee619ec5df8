//! gvm virtual machine.
//!
//! Runs an instruction array over a [`gvm_runtime::Heap`]: every goroutine is
//! a heap-resident context, scheduled cooperatively one instruction at a
//! time.

mod config;
mod error;
mod exec;
pub mod instruction;
mod process;
pub mod program;
mod scheduler;

pub use config::{ProcessConfig, TIME_SLICE};
pub use error::{Result, VmError};
pub use instruction::{BinaryOp, Instruction, UnaryOp, ValueType};
pub use process::{Binding, ContextSnapshot, Process, Snapshot, StepOutcome};
pub use program::{BuildError, Label, ProgramBuilder};

pub use gvm_runtime::{Addr, Heap, RuntimeError, Tag};
