//! Introspection for debuggers and visualizers.

use gvm_runtime::objects::{self, context, environment, frame};
use gvm_runtime::Addr;

use super::Process;
use crate::instruction::Instruction;

/// Instructions shown on either side of a context's pc.
const WINDOW: usize = 3;

/// One variable slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub addr: Addr,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnapshot {
    pub addr: Addr,
    pub id: u64,
    pub pc: usize,
    pub blocked: bool,
    /// Operand stack, bottom to top, rendered.
    pub operands: Vec<String>,
    /// `(pc, instruction)` pairs around the pc.
    pub window: Vec<(usize, String)>,
    /// Frame blocks of the environment chain, outermost first.
    pub frames: Vec<Addr>,
    /// Bindings of each frame in `frames`.
    pub scopes: Vec<Vec<Binding>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub ready: Vec<Addr>,
    pub blocked: Vec<Addr>,
    pub current: Option<Addr>,
    pub contexts: Vec<ContextSnapshot>,
    /// Blocks written by a store in the last step: the frame or backing
    /// array whose slot changed, followed by the value stored there.
    pub dirty: Vec<Addr>,
    pub executed: u64,
}

impl Process {
    pub fn snapshot(&self) -> Snapshot {
        let heap = &self.state.heap;
        Snapshot {
            ready: self.scheduler.ready(),
            blocked: self.blocked_contexts(),
            current: self.scheduler.current(),
            contexts: heap.contexts().iter().map(|&ctx| self.context_snapshot(ctx)).collect(),
            dirty: self.state.dirty.clone(),
            executed: self.executed,
        }
    }

    fn context_snapshot(&self, ctx: Addr) -> ContextSnapshot {
        let heap = &self.state.heap;
        let pc = context::pc(heap, ctx);
        let lo = pc.saturating_sub(WINDOW);
        let hi = (pc + WINDOW + 1).min(self.code.len());
        let window = (lo..hi).map(|i| (i, self.code[i].to_string())).collect();

        let env = context::env(heap, ctx);
        let frames = environment::frames(heap, env);
        let scopes = frames
            .iter()
            .map(|&f| {
                let names = self.frame_names(f);
                frame::slots(heap, f)
                    .into_iter()
                    .enumerate()
                    .map(|(i, addr)| Binding {
                        name: names.get(i).cloned().unwrap_or_else(|| format!("_{}", i)),
                        addr,
                        value: objects::display(heap, addr),
                    })
                    .collect()
            })
            .collect();

        ContextSnapshot {
            addr: ctx,
            id: context::id(heap, ctx),
            pc,
            blocked: context::is_blocked(heap, ctx),
            operands: context::operands(heap, ctx)
                .into_iter()
                .map(|a| objects::display(heap, a))
                .collect(),
            window,
            frames,
            scopes,
        }
    }

    /// Variable names of a frame, taken from the instruction that built it.
    fn frame_names(&self, f: Addr) -> Vec<String> {
        let origin = self.state.frame_origins.get(&f).and_then(|&pc| self.code.get(pc));
        match origin {
            Some(Instruction::EnterScope { names }) => names.clone(),
            Some(Instruction::LoadFunc { params, .. }) => params.clone(),
            Some(Instruction::SelectRecv { name, .. }) => vec![name.clone()],
            _ => Vec::new(),
        }
    }
}
