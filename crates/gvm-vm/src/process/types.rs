//! Process state and execution results.

use gvm_runtime::{Addr, Heap, Tag};
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecResult {
    Continue,
    /// The context parked itself; a channel or wait group will wake it.
    Block,
    Done,
}

/// Outcome of an operation that may block or release other contexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChanResult {
    Continue,
    Block,
    Wake(Vec<Addr>),
}

/// What a single `Process::step` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One instruction ran in `context`, fetched from `pc`.
    Executed { context: Addr, pc: usize },
    Finished,
}

/// Mutable state shared by every context, borrowed apart from the scheduler.
pub struct VmState {
    pub heap: Heap,
    pub output: String,
    /// Nodes written by store instructions during the current step.
    pub dirty: Vec<Addr>,
    /// Frame address to the pc of the instruction that created it, for
    /// naming variables.
    pub frame_origins: HashMap<Addr, usize>,
    pub rng: fastrand::Rng,
    pub next_id: u64,
    /// Collection count when `frame_origins` was last pruned.
    pruned_at: u64,
}

impl VmState {
    pub fn new(heap: Heap, seed: Option<u64>) -> Self {
        Self {
            heap,
            output: String::new(),
            dirty: Vec::new(),
            frame_origins: HashMap::new(),
            rng: seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed),
            next_id: 0,
            pruned_at: 0,
        }
    }

    /// Allocate the next context id.
    pub fn fresh_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Forget origins of frames reclaimed since the last call.
    pub fn prune_origins(&mut self) {
        let collections = self.heap.stats().collections;
        if collections == self.pruned_at {
            return;
        }
        self.pruned_at = collections;
        let heap = &self.heap;
        self.frame_origins
            .retain(|&f, _| !heap.is_free(f) && heap.tag(f) == Tag::Frame);
    }
}
