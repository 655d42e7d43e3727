use crate::analysis::cfg::Cfg;
use crate::analysis::dataflow::DataflowAnalysis;
use crate::exp::{BinaryOp, Exp};
use crate::method::{MethodIr, VarId};
use crate::program::Program;
use crate::stmt::{LValue, Stmt, StmtKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A point of the constant-propagation lattice: UNDEF ⊑ CONST(k) ⊑ NAC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CpValue {
    Undef,
    Const(i32),
    Nac,
}

impl CpValue {
    pub fn is_undef(&self) -> bool {
        matches!(self, CpValue::Undef)
    }

    pub fn is_const(&self) -> bool {
        matches!(self, CpValue::Const(_))
    }

    pub fn is_nac(&self) -> bool {
        matches!(self, CpValue::Nac)
    }

    pub fn as_const(&self) -> Option<i32> {
        match self {
            CpValue::Const(k) => Some(*k),
            _ => None,
        }
    }

    /// Lattice meet: NAC absorbs, UNDEF is the identity, equal constants stay,
    /// differing constants collapse to NAC.
    pub fn meet(self, other: CpValue) -> CpValue {
        match (self, other) {
            (CpValue::Nac, _) | (_, CpValue::Nac) => CpValue::Nac,
            (CpValue::Undef, v) => v,
            (v, CpValue::Undef) => v,
            (CpValue::Const(a), CpValue::Const(b)) => {
                if a == b {
                    CpValue::Const(a)
                } else {
                    CpValue::Nac
                }
            }
        }
    }
}

impl std::fmt::Display for CpValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CpValue::Undef => write!(f, "UNDEF"),
            CpValue::Const(k) => write!(f, "{}", k),
            CpValue::Nac => write!(f, "NAC"),
        }
    }
}

/// Map from variables to lattice values. Absent variables are implicitly
/// UNDEF; `update` drops bindings that go to UNDEF so the map stays minimal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CpFact {
    map: IndexMap<VarId, CpValue>,
}

impl CpFact {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, var: VarId) -> CpValue {
        self.map.get(&var).copied().unwrap_or(CpValue::Undef)
    }

    /// Binds `var` to `value`, returning whether the fact changed.
    pub fn update(&mut self, var: VarId, value: CpValue) -> bool {
        if value.is_undef() {
            self.map.shift_remove(&var).is_some()
        } else {
            self.map.insert(var, value) != Some(value)
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, CpValue)> + '_ {
        self.map.iter().map(|(v, val)| (*v, *val))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl PartialEq for CpFact {
    /// Facts compare over the union of their keys, so an explicit UNDEF and a
    /// missing binding are the same fact.
    fn eq(&self, other: &Self) -> bool {
        self.map.keys().chain(other.map.keys()).all(|&v| self.get(v) == other.get(v))
    }
}

impl Eq for CpFact {}

/// Forward constant propagation over the int-holder variables of one method.
pub struct ConstantPropagation<'a> {
    program: &'a Program,
    ir: &'a MethodIr,
}

impl<'a> ConstantPropagation<'a> {
    pub const ID: &'static str = "constprop";

    pub fn new(program: &'a Program, ir: &'a MethodIr) -> Self {
        Self { program, ir }
    }

    fn can_hold_int(&self, var: VarId) -> bool {
        self.program.var(var).ty.is_int_holder()
    }

    /// Evaluates `exp` under `fact`.
    ///
    /// Division and remainder by a constant zero yield UNDEF regardless of the
    /// dividend: the program would trap, so no constant is useful. When one
    /// operand is UNDEF and no division is involved the result is UNDEF even
    /// if the other operand is a known constant; this is monotone (the UNDEF
    /// operand can still rise to any value) though it can look surprising.
    /// Every unmodeled expression shape collapses to NAC.
    pub fn evaluate(exp: &Exp, fact: &CpFact) -> CpValue {
        match exp {
            Exp::IntLiteral(k) => CpValue::Const(*k),
            Exp::Var(v) => fact.get(*v),
            Exp::Binary { op, lhs, rhs } => {
                let a = fact.get(*lhs);
                let b = fact.get(*rhs);
                if let (CpValue::Const(x), CpValue::Const(y)) = (a, b) {
                    return Self::apply(*op, x, y);
                }
                if op.is_division() && b == CpValue::Const(0) {
                    return CpValue::Undef;
                }
                if a.is_nac() || b.is_nac() {
                    return CpValue::Nac;
                }
                CpValue::Undef
            }
            _ => CpValue::Nac,
        }
    }

    /// 32-bit two's-complement semantics: arithmetic wraps, shift amounts are
    /// masked to five bits, USHR is logical, comparisons yield 1 or 0.
    fn apply(op: BinaryOp, x: i32, y: i32) -> CpValue {
        let k = match op {
            BinaryOp::Add => x.wrapping_add(y),
            BinaryOp::Sub => x.wrapping_sub(y),
            BinaryOp::Mul => x.wrapping_mul(y),
            BinaryOp::Div => {
                if y == 0 {
                    return CpValue::Undef;
                }
                x.wrapping_div(y)
            }
            BinaryOp::Rem => {
                if y == 0 {
                    return CpValue::Undef;
                }
                x.wrapping_rem(y)
            }
            BinaryOp::And => x & y,
            BinaryOp::Or => x | y,
            BinaryOp::Xor => x ^ y,
            BinaryOp::Shl => x.wrapping_shl(y as u32),
            BinaryOp::Shr => x.wrapping_shr(y as u32),
            BinaryOp::Ushr => ((x as u32).wrapping_shr(y as u32)) as i32,
            BinaryOp::Eq => (x == y) as i32,
            BinaryOp::Ne => (x != y) as i32,
            BinaryOp::Lt => (x < y) as i32,
            BinaryOp::Gt => (x > y) as i32,
            BinaryOp::Le => (x <= y) as i32,
            BinaryOp::Ge => (x >= y) as i32,
        };
        CpValue::Const(k)
    }
}

impl DataflowAnalysis for ConstantPropagation<'_> {
    type Fact = CpFact;

    fn is_forward(&self) -> bool {
        true
    }

    /// Formal parameters that can hold integers enter as NAC; everything else
    /// is absent.
    fn boundary_fact(&self, _cfg: &Cfg) -> CpFact {
        let mut fact = CpFact::new();
        for &param in &self.ir.params {
            if self.can_hold_int(param) {
                fact.update(param, CpValue::Nac);
            }
        }
        fact
    }

    fn initial_fact(&self) -> CpFact {
        CpFact::new()
    }

    fn meet_into(&self, fact: &CpFact, target: &mut CpFact) {
        let vars: Vec<VarId> =
            fact.map.keys().chain(target.map.keys()).copied().collect();
        for var in vars {
            let met = fact.get(var).meet(target.get(var));
            target.update(var, met);
        }
    }

    fn transfer(&self, stmt: &Stmt, input: &CpFact, output: &mut CpFact) -> bool {
        let old = output.clone();
        *output = input.clone();
        match &stmt.kind {
            StmtKind::Assign { lhs: LValue::Var(v), rhs } if self.can_hold_int(*v) => {
                output.update(*v, Self::evaluate(rhs, input));
            }
            // A call result is an unmodeled expression: NAC.
            StmtKind::Invoke(invoke) => {
                if let Some(r) = invoke.result {
                    if self.can_hold_int(r) {
                        output.update(r, CpValue::Nac);
                    }
                }
            }
            _ => {}
        }
        *output != old
    }
}
