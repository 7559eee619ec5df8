//! Instruction set.
//!
//! A program is a flat `Vec<Instruction>`; jump targets, function entries
//! and select resume points are absolute indices into it. Operands travel
//! on the context's operand stack, listed below bottom to top.

use core::fmt;

/// Type of a zero value produced by `LoadDefault` and `MakeSlice`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    Float,
    Bool,
    String,
    /// Nil slice.
    Slice,
    /// Nil channel.
    Chan,
    /// Nil function.
    Func,
    /// A fresh `sync.WaitGroup`.
    WaitGroup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    AndNot,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::AndNot => "&^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }

    #[inline]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "^",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Nop,

    // === LOAD ===
    LoadInt(i64),
    LoadFloat(f64),
    LoadBool(bool),
    LoadString(String),
    LoadDefault(ValueType),
    /// Push the `nil` sentinel.
    LoadUnassigned,
    Pop,
    Dup,

    // === VARIABLES ===
    LoadVar { frame: usize, slot: usize },
    /// `[value]`: assign a copy of the value to (frame, slot).
    StoreVar { frame: usize, slot: usize },

    // === ARITHMETIC ===
    /// `[lhs, rhs]`
    Binary(BinaryOp),
    Unary(UnaryOp),

    // === CONTROL FLOW ===
    Jump(usize),
    /// `[cond]`
    JumpIfFalse(usize),
    JumpIfTrue(usize),
    /// Extend the environment with a frame holding one slot per name.
    EnterScope { names: Vec<String> },
    ExitScope,
    /// Push a closure over the current environment. Parameters fill the
    /// callee's first frame.
    LoadFunc { entry: usize, params: Vec<String> },
    /// `[func, arg...]`
    Call { argc: usize },
    /// Unwind to the innermost call marker. Return values stay on the
    /// operand stack.
    Return,

    // === METHODS ===
    /// `[receiver]`: push the bound method value.
    LoadMethod { method: String },
    /// `[receiver, arg...]`
    CallMethod { method: String, argc: usize },

    // === ARRAYS AND SLICES ===
    /// `[elem...]`
    MakeArray { len: usize },
    /// `[len]` or `[len, cap]`
    MakeSlice { elem: ValueType, has_cap: bool },
    /// `[container, index]`
    Index,
    /// `[container, index, value]`
    StoreIndex,
    Len,
    Cap,
    /// `[container, low?, high?]`
    Slice { low: bool, high: bool },
    /// `[slice, value...]`
    Append { argc: usize },

    // === CONCURRENCY ===
    /// `[]` or `[cap]`
    MakeChan { buffered: bool },
    /// `[chan, value]`
    Send,
    /// `[chan]`
    Recv,
    /// `[chan, value]`: push a send case resuming at `target`.
    SelectSend { target: usize },
    /// `[chan]`: push a recv case resuming at `target` in a new scope that
    /// binds the received value to `name`.
    SelectRecv { target: usize, name: String },
    /// `[case...]`
    Select { cases: usize, default: Option<usize> },
    /// `[func, arg...]`: start a goroutine.
    Go { argc: usize },

    // === OUTPUT ===
    Print { argc: usize, newline: bool },
    /// Terminate the running context.
    Done,
}

impl Instruction {
    /// Absolute targets this instruction may transfer control to.
    pub fn targets(&self) -> Vec<usize> {
        match self {
            Instruction::Jump(t) | Instruction::JumpIfFalse(t) | Instruction::JumpIfTrue(t) => vec![*t],
            Instruction::LoadFunc { entry, .. } => vec![*entry],
            Instruction::SelectSend { target } | Instruction::SelectRecv { target, .. } => vec![*target],
            Instruction::Select { default: Some(t), .. } => vec![*t],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Nop => write!(f, "NOP"),
            Instruction::LoadInt(v) => write!(f, "LDC {}", v),
            Instruction::LoadFloat(v) => write!(f, "LDC {:?}", v),
            Instruction::LoadBool(v) => write!(f, "LDC {}", v),
            Instruction::LoadString(s) => write!(f, "LDC {:?}", s),
            Instruction::LoadDefault(t) => write!(f, "LDD {:?}", t),
            Instruction::LoadUnassigned => write!(f, "LDN"),
            Instruction::Pop => write!(f, "POP"),
            Instruction::Dup => write!(f, "DUP"),
            Instruction::LoadVar { frame, slot } => write!(f, "LD ({}, {})", frame, slot),
            Instruction::StoreVar { frame, slot } => write!(f, "ST ({}, {})", frame, slot),
            Instruction::Binary(op) => write!(f, "BINOP {}", op.symbol()),
            Instruction::Unary(op) => write!(f, "UNOP {}", op.symbol()),
            Instruction::Jump(t) => write!(f, "GOTO {}", t),
            Instruction::JumpIfFalse(t) => write!(f, "JOF {}", t),
            Instruction::JumpIfTrue(t) => write!(f, "JOT {}", t),
            Instruction::EnterScope { names } => write!(f, "ENTER_SCOPE [{}]", names.join(", ")),
            Instruction::ExitScope => write!(f, "EXIT_SCOPE"),
            Instruction::LoadFunc { entry, params } => {
                write!(f, "LDF {} ({})", entry, params.join(", "))
            }
            Instruction::Call { argc } => write!(f, "CALL {}", argc),
            Instruction::Return => write!(f, "RESET"),
            Instruction::LoadMethod { method } => write!(f, "LDM {}", method),
            Instruction::CallMethod { method, argc } => write!(f, "CALLM {} {}", method, argc),
            Instruction::MakeArray { len } => write!(f, "ARRAY {}", len),
            Instruction::MakeSlice { elem, has_cap } => {
                write!(f, "MAKE_SLICE {:?}{}", elem, if *has_cap { " cap" } else { "" })
            }
            Instruction::Index => write!(f, "INDEX"),
            Instruction::StoreIndex => write!(f, "ST_INDEX"),
            Instruction::Len => write!(f, "LEN"),
            Instruction::Cap => write!(f, "CAP"),
            Instruction::Slice { low, high } => write!(
                f,
                "SLICE [{}:{}]",
                if *low { "lo" } else { "" },
                if *high { "hi" } else { "" }
            ),
            Instruction::Append { argc } => write!(f, "APPEND {}", argc),
            Instruction::MakeChan { buffered } => {
                write!(f, "MAKE_CHAN{}", if *buffered { " buffered" } else { "" })
            }
            Instruction::Send => write!(f, "SEND"),
            Instruction::Recv => write!(f, "RECV"),
            Instruction::SelectSend { target } => write!(f, "SELECT_SEND -> {}", target),
            Instruction::SelectRecv { target, name } => {
                write!(f, "SELECT_RECV {} -> {}", name, target)
            }
            Instruction::Select { cases, default } => match default {
                Some(d) => write!(f, "SELECT {} default -> {}", cases, d),
                None => write!(f, "SELECT {}", cases),
            },
            Instruction::Go { argc } => write!(f, "FORK {}", argc),
            Instruction::Print { argc, newline } => {
                write!(f, "{} {}", if *newline { "PRINTLN" } else { "PRINT" }, argc)
            }
            Instruction::Done => write!(f, "DONE"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Instruction::LoadInt(-3).to_string(), "LDC -3");
        assert_eq!(Instruction::Binary(BinaryOp::AndNot).to_string(), "BINOP &^");
        assert_eq!(
            Instruction::EnterScope { names: vec!["i".into(), "wg".into()] }.to_string(),
            "ENTER_SCOPE [i, wg]"
        );
        assert_eq!(
            Instruction::Select { cases: 2, default: Some(9) }.to_string(),
            "SELECT 2 default -> 9"
        );
        assert_eq!(Instruction::LoadString("hi".into()).to_string(), "LDC \"hi\"");
    }

    #[test]
    fn test_targets() {
        assert_eq!(Instruction::JumpIfFalse(4).targets(), vec![4]);
        assert_eq!(Instruction::Select { cases: 1, default: None }.targets(), Vec::<usize>::new());
        assert_eq!(
            Instruction::SelectRecv { target: 7, name: "v".into() }.targets(),
            vec![7]
        );
    }

    #[test]
    fn test_comparison_ops() {
        assert!(BinaryOp::Le.is_comparison());
        assert!(!BinaryOp::Shl.is_comparison());
    }
}
