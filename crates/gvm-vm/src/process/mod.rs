//! Process: heap, instruction array and scheduler driving one program.

mod snapshot;
mod types;

pub use snapshot::{Binding, ContextSnapshot, Snapshot};
pub use types::StepOutcome;
pub(crate) use types::{ChanResult, ExecResult, VmState};

use gvm_runtime::objects::{context, environment};
use gvm_runtime::{Addr, Heap};

use crate::config::ProcessConfig;
use crate::error::{Result, VmError};
use crate::exec;
use crate::instruction::Instruction;
use crate::scheduler::Scheduler;

pub struct Process {
    code: Vec<Instruction>,
    config: ProcessConfig,
    state: VmState,
    scheduler: Scheduler,
    main: Addr,
    executed: u64,
    main_done: bool,
    finished: bool,
}

impl Process {
    pub fn new(code: Vec<Instruction>, heap_words: usize) -> Result<Self> {
        Self::with_config(code, ProcessConfig::new().with_heap_words(heap_words))
    }

    /// Build the heap and the main context, which starts at instruction 0
    /// with an empty environment.
    pub fn with_config(code: Vec<Instruction>, config: ProcessConfig) -> Result<Self> {
        let mut heap = Heap::new(config.heap_words)?;
        let env = environment::create_empty(&mut heap)?;
        let main = context::create(&mut heap, 0, env, 0)?;
        heap.register_context(main);

        let mut state = VmState::new(heap, config.select_seed);
        state.next_id = 1;
        let mut scheduler = Scheduler::new(config.time_slice);
        scheduler.spawn(main);
        log::debug!(
            "process created: {} instructions, {} heap words",
            code.len(),
            state.heap.capacity()
        );
        Ok(Self {
            code,
            config,
            state,
            scheduler,
            main,
            executed: 0,
            main_done: false,
            finished: false,
        })
    }

    /// Run to completion and return everything printed.
    pub fn run(&mut self) -> Result<String> {
        while let StepOutcome::Executed { .. } = self.step()? {}
        Ok(self.state.output.clone())
    }

    /// Execute a single instruction of whichever context is scheduled.
    pub fn step(&mut self) -> Result<StepOutcome> {
        self.state.dirty.clear();
        if self.finished {
            return Ok(StepOutcome::Finished);
        }
        let result = self.step_inner();
        if let Err(e) = &result {
            self.finished = true;
            log::error!("process aborted after {} instructions: {}", self.executed, e);
        }
        result
    }

    fn step_inner(&mut self) -> Result<StepOutcome> {
        let Some(ctx) = self.scheduler.schedule_next() else {
            return self.stall();
        };
        self.executed += 1;
        if self.executed > self.config.max_instructions {
            return Err(VmError::TimeLimitExceeded(self.config.max_instructions));
        }

        let pc = context::pc(&self.state.heap, ctx);
        let inst = self.code.get(pc).ok_or(VmError::PcOutOfRange(pc))?;
        context::set_pc(&mut self.state.heap, ctx, pc + 1);
        log::trace!("context @{} pc {}: {}", ctx, pc, inst);

        let result = exec::execute(&mut self.state, &mut self.scheduler, ctx, pc, inst)?;
        self.state.prune_origins();
        match result {
            ExecResult::Continue => {
                if self.scheduler.tick() {
                    self.scheduler.yield_current();
                }
            }
            ExecResult::Block => {
                self.scheduler.block_current();
                log::debug!("context {} blocked at pc {}", context::id(&self.state.heap, ctx), pc);
            }
            ExecResult::Done => self.terminate(ctx),
        }
        Ok(StepOutcome::Executed { context: ctx, pc })
    }

    fn terminate(&mut self, ctx: Addr) {
        self.scheduler.kill_current();
        self.state.heap.retire_context(ctx);
        log::debug!("context {} terminated", context::id(&self.state.heap, ctx));
        if ctx == self.main {
            self.main_done = true;
        }
        // Goroutines still ready after main keep running; the run ends once
        // none are left.
        if self.main_done && !self.scheduler.has_work() {
            self.finish();
        }
    }

    /// Nothing is runnable. Either the program is over or main can never
    /// resume.
    fn stall(&mut self) -> Result<StepOutcome> {
        if !self.main_done {
            let blocked = self.blocked_contexts();
            if self.config.detect_deadlock && !blocked.is_empty() {
                return Err(VmError::Deadlock(self.deadlock_report(&blocked)));
            }
        }
        self.finish();
        Ok(StepOutcome::Finished)
    }

    /// Contexts still blocked at this point are abandoned.
    fn finish(&mut self) {
        let abandoned = self.state.heap.contexts().len();
        if abandoned > 0 {
            log::debug!("process finished, abandoning {} blocked contexts", abandoned);
        }
        self.finished = true;
    }

    fn blocked_contexts(&self) -> Vec<Addr> {
        let heap = &self.state.heap;
        heap.contexts()
            .iter()
            .copied()
            .filter(|&ctx| context::is_blocked(heap, ctx))
            .collect()
    }

    fn deadlock_report(&self, blocked: &[Addr]) -> String {
        let heap = &self.state.heap;
        let mut msg = String::new();
        for &ctx in blocked {
            // The pc already points past the blocking instruction.
            let at = context::pc(heap, ctx).saturating_sub(1);
            let inst = self.code.get(at).map_or_else(|| "?".to_string(), |i| i.to_string());
            msg.push_str(&format!(
                "  context {} blocked at pc {}: {}\n",
                context::id(heap, ctx),
                at,
                inst
            ));
        }
        msg
    }

    /// Output printed so far, including before a fault.
    pub fn output(&self) -> &str {
        &self.state.output
    }

    pub fn heap(&self) -> &Heap {
        &self.state.heap
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn main_context(&self) -> Addr {
        self.main
    }

    /// Instructions executed across all contexts.
    pub fn executed(&self) -> u64 {
        self.executed
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("instructions", &self.code.len())
            .field("executed", &self.executed)
            .field("finished", &self.finished)
            .field("heap", &self.state.heap)
            .finish()
    }
}
