use crate::class::{ClassId, FieldId};
use crate::method::VarId;
use crate::types::Type;
use serde::{Deserialize, Serialize};

/// Right-hand-side expressions. Binary operands are always variables; the IR
/// is three-address, so compound expressions never nest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exp {
    IntLiteral(i32),
    Var(VarId),
    Binary { op: BinaryOp, lhs: VarId, rhs: VarId },
    New { class: ClassId },
    NewArray { elem: Type },
    Cast { ty: Type, var: VarId },
    StaticField(FieldId),
    InstanceField { base: VarId, field: FieldId },
    ArrayAccess { array: VarId },
}

impl Exp {
    /// Variables this expression reads.
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            Exp::Var(v) | Exp::Cast { var: v, .. } => vec![*v],
            Exp::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Exp::InstanceField { base, .. } => vec![*base],
            Exp::ArrayAccess { array } => vec![*array],
            Exp::IntLiteral(_) | Exp::New { .. } | Exp::NewArray { .. } | Exp::StaticField(_) => {
                Vec::new()
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl BinaryOp {
    /// Division and remainder may trap on a zero divisor.
    pub fn is_division(&self) -> bool {
        matches!(self, BinaryOp::Div | BinaryOp::Rem)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Ushr => ">>>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
        };
        write!(f, "{}", s)
    }
}
