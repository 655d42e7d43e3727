use crate::class::{ClassId, FieldId};
use crate::exp::Exp;
use crate::method::{SubsigId, VarId};
use serde::{Deserialize, Serialize};

/// A statement together with its source index inside the owning method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stmt {
    pub index: usize,
    pub kind: StmtKind,
}

/// Assignment targets. Field and array targets carry the base variable so
/// stores can be rewired per receiver object during points-to analysis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LValue {
    Var(VarId),
    StaticField(FieldId),
    InstanceField { base: VarId, field: FieldId },
    ArrayIndex { array: VarId },
}

/// Statement variants of the IR. Allocation, copy, load and store statements
/// are all `Assign` shapes; a single match covers every kind exhaustively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StmtKind {
    Assign { lhs: LValue, rhs: Exp },
    Invoke(Invoke),
    If { cond: Exp, target: usize },
    Goto { target: usize },
    Switch { selector: VarId, cases: Vec<(i32, usize)>, default: usize },
    Return { value: Option<VarId> },
    Nop,
}

impl StmtKind {
    /// The variable this statement defines, if any.
    pub fn def(&self) -> Option<VarId> {
        match self {
            StmtKind::Assign { lhs: LValue::Var(v), .. } => Some(*v),
            StmtKind::Invoke(invoke) => invoke.result,
            _ => None,
        }
    }

    /// Variables this statement reads.
    pub fn uses(&self) -> Vec<VarId> {
        match self {
            StmtKind::Assign { lhs, rhs } => {
                let mut vars = rhs.uses();
                match lhs {
                    LValue::InstanceField { base, .. } => vars.push(*base),
                    LValue::ArrayIndex { array } => vars.push(*array),
                    LValue::Var(_) | LValue::StaticField(_) => {}
                }
                vars
            }
            StmtKind::Invoke(invoke) => {
                let mut vars = invoke.args.clone();
                if let Some(recv) = invoke.receiver {
                    vars.push(recv);
                }
                vars
            }
            StmtKind::If { cond, .. } => cond.uses(),
            StmtKind::Switch { selector, .. } => vec![*selector],
            StmtKind::Return { value } => value.iter().copied().collect(),
            StmtKind::Goto { .. } | StmtKind::Nop => Vec::new(),
        }
    }

    pub fn as_invoke(&self) -> Option<&Invoke> {
        match self {
            StmtKind::Invoke(invoke) => Some(invoke),
            _ => None,
        }
    }
}

/// How a call site binds its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvokeKind {
    Static,
    Special,
    Virtual,
    Interface,
}

/// A call site: the method reference it names, plus the data flowing in and
/// out. `declared_class` is the static receiver class of the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoke {
    pub kind: InvokeKind,
    pub declared_class: ClassId,
    pub subsig: SubsigId,
    pub receiver: Option<VarId>,
    pub args: Vec<VarId>,
    pub result: Option<VarId>,
}

impl Invoke {
    pub fn is_static(&self) -> bool {
        self.kind == InvokeKind::Static
    }

    pub fn is_special(&self) -> bool {
        self.kind == InvokeKind::Special
    }

    pub fn is_virtual(&self) -> bool {
        self.kind == InvokeKind::Virtual
    }

    pub fn is_interface(&self) -> bool {
        self.kind == InvokeKind::Interface
    }
}
