//! Assembling instruction arrays with forward labels.

use thiserror::Error;

use crate::instruction::{Instruction, ValueType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("label {0} was never bound")]
    UnboundLabel(usize),

    #[error("instruction {pc} jumps to {target}, past the end of the program")]
    TargetOutOfRange { pc: usize, target: usize },
}

/// A position in the program, possibly not yet known.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Label(usize);

#[derive(Debug, Default)]
pub struct ProgramBuilder {
    code: Vec<Instruction>,
    labels: Vec<Option<usize>>,
    fixups: Vec<(usize, Label)>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index the next emitted instruction will get.
    #[inline]
    pub fn pc(&self) -> usize {
        self.code.len()
    }

    pub fn emit(&mut self, inst: Instruction) -> usize {
        self.code.push(inst);
        self.code.len() - 1
    }

    pub fn label(&mut self) -> Label {
        self.labels.push(None);
        Label(self.labels.len() - 1)
    }

    /// Bind `label` to the next emitted instruction.
    pub fn bind(&mut self, label: Label) {
        debug_assert!(self.labels[label.0].is_none(), "label {} bound twice", label.0);
        self.labels[label.0] = Some(self.pc());
    }

    /// A new label bound to the current position.
    pub fn here(&mut self) -> Label {
        let label = self.label();
        self.bind(label);
        label
    }

    fn emit_to(&mut self, inst: Instruction, label: Label) -> usize {
        let pc = self.emit(inst);
        self.fixups.push((pc, label));
        pc
    }

    pub fn jump(&mut self, label: Label) -> usize {
        self.emit_to(Instruction::Jump(0), label)
    }

    pub fn jump_if_false(&mut self, label: Label) -> usize {
        self.emit_to(Instruction::JumpIfFalse(0), label)
    }

    pub fn jump_if_true(&mut self, label: Label) -> usize {
        self.emit_to(Instruction::JumpIfTrue(0), label)
    }

    pub fn load_func(&mut self, entry: Label, params: &[&str]) -> usize {
        let params = params.iter().map(|p| p.to_string()).collect();
        self.emit_to(Instruction::LoadFunc { entry: 0, params }, entry)
    }

    pub fn select_send(&mut self, target: Label) -> usize {
        self.emit_to(Instruction::SelectSend { target: 0 }, target)
    }

    pub fn select_recv(&mut self, target: Label, name: &str) -> usize {
        let name = name.to_string();
        self.emit_to(Instruction::SelectRecv { target: 0, name }, target)
    }

    pub fn select(&mut self, cases: usize, default: Option<Label>) -> usize {
        match default {
            Some(label) => self.emit_to(Instruction::Select { cases, default: Some(0) }, label),
            None => self.emit(Instruction::Select { cases, default: None }),
        }
    }

    pub fn enter_scope(&mut self, names: &[&str]) -> usize {
        let names = names.iter().map(|n| n.to_string()).collect();
        self.emit(Instruction::EnterScope { names })
    }

    pub fn load_default(&mut self, ty: ValueType) -> usize {
        self.emit(Instruction::LoadDefault(ty))
    }

    /// Resolve labels and check every target lies inside the program.
    pub fn build(mut self) -> Result<Vec<Instruction>, BuildError> {
        for &(pc, label) in &self.fixups {
            let target = self.labels[label.0].ok_or(BuildError::UnboundLabel(label.0))?;
            retarget(&mut self.code[pc], target);
        }
        let end = self.code.len();
        for (pc, inst) in self.code.iter().enumerate() {
            if let Some(&target) = inst.targets().iter().find(|&&t| t >= end) {
                return Err(BuildError::TargetOutOfRange { pc, target });
            }
        }
        Ok(self.code)
    }
}

fn retarget(inst: &mut Instruction, to: usize) {
    match inst {
        Instruction::Jump(t) | Instruction::JumpIfFalse(t) | Instruction::JumpIfTrue(t) => *t = to,
        Instruction::LoadFunc { entry, .. } => *entry = to,
        Instruction::SelectSend { target } | Instruction::SelectRecv { target, .. } => *target = to,
        Instruction::Select { default, .. } => *default = Some(to),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_and_backward_labels() {
        let mut b = ProgramBuilder::new();
        let top = b.here();
        let end = b.label();
        b.emit(Instruction::LoadBool(true));
        b.jump_if_false(end);
        b.jump(top);
        b.bind(end);
        b.emit(Instruction::Done);
        let code = b.build().unwrap();
        assert_eq!(code[1], Instruction::JumpIfFalse(3));
        assert_eq!(code[2], Instruction::Jump(0));
    }

    #[test]
    fn test_select_default_and_func() {
        let mut b = ProgramBuilder::new();
        let body = b.label();
        let fallback = b.label();
        b.load_func(body, &["x"]);
        b.select(0, Some(fallback));
        b.bind(fallback);
        b.bind(body);
        b.emit(Instruction::Done);
        let code = b.build().unwrap();
        assert_eq!(code[0], Instruction::LoadFunc { entry: 2, params: vec!["x".into()] });
        assert_eq!(code[1], Instruction::Select { cases: 0, default: Some(2) });
    }

    #[test]
    fn test_unbound_label() {
        let mut b = ProgramBuilder::new();
        let nowhere = b.label();
        b.jump(nowhere);
        assert_eq!(b.build().unwrap_err(), BuildError::UnboundLabel(0));
    }

    #[test]
    fn test_target_past_end() {
        let mut b = ProgramBuilder::new();
        let end = b.label();
        b.jump(end);
        b.bind(end);
        assert_eq!(b.build().unwrap_err(), BuildError::TargetOutOfRange { pc: 0, target: 1 });
    }
}
