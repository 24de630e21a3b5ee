use std::fmt;

use crate::{Addr, Offset, Reg};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    // Control Instructions
    Allocate { n: usize },
    CallP { label: String },
    ReturnP,

    // Query Instructions, building the arguments of a call
    PushConst { constant: String },
    PushFreeVar { reg: Reg },
    PushBoundVar { reg: Reg },

    // Head Instructions, unifying against the arguments of a call
    UnifyConst { constant: String, offset: Offset },
    InitFreeVar { reg: Reg, offset: Offset },
    UnifyBoundVar { reg: Reg, offset: Offset },

    // Feature Instructions
    FClear,
    FPushStart { functor: String, arity: usize },
    FPushConst { constant: String },
    FPushBoundVar { reg: Reg },
    FReport,
    FFindAll { address: Addr },
}

impl Instruction {
    /// Feature-construction opcodes are skipped when features are not
    /// being computed.
    pub fn is_feature(&self) -> bool {
        matches!(
            self,
            Instruction::FClear
                | Instruction::FPushStart { .. }
                | Instruction::FPushConst { .. }
                | Instruction::FPushBoundVar { .. }
                | Instruction::FReport
                | Instruction::FFindAll { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Allocate { n } => write!(f, "allocate {n}"),
            Instruction::CallP { label } => write!(f, "callp {label}"),
            Instruction::ReturnP => write!(f, "returnp"),
            Instruction::PushConst { constant } => write!(f, "pushconst {constant}"),
            Instruction::PushFreeVar { reg } => write!(f, "pushfreevar {reg}"),
            Instruction::PushBoundVar { reg } => write!(f, "pushboundvar {reg}"),
            Instruction::UnifyConst { constant, offset } => {
                write!(f, "unifyconst {constant}, {offset}")
            }
            Instruction::InitFreeVar { reg, offset } => write!(f, "initfreevar {reg}, {offset}"),
            Instruction::UnifyBoundVar { reg, offset } => {
                write!(f, "unifyboundvar {reg}, {offset}")
            }
            Instruction::FClear => write!(f, "fclear"),
            Instruction::FPushStart { functor, arity } => {
                write!(f, "fpushstart {functor}, {arity}")
            }
            Instruction::FPushConst { constant } => write!(f, "fpushconst {constant}"),
            Instruction::FPushBoundVar { reg } => write!(f, "fpushboundvar {reg}"),
            Instruction::FReport => write!(f, "freport"),
            Instruction::FFindAll { address } => write!(f, "ffindall {address}"),
        }
    }
}
