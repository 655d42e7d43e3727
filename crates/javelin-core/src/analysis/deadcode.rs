use crate::analysis::cfg::{Cfg, CfgNode};
use crate::analysis::constprop::{ConstantPropagation, CpFact, CpValue};
use crate::analysis::dataflow::DataflowResult;
use crate::analysis::livevars::LiveSet;
use crate::exp::Exp;
use crate::method::MethodIr;
use crate::stmt::{LValue, StmtKind};
use crate::{AnalysisError, Result};
use indexmap::IndexSet;
use std::collections::BTreeSet;

/// Fuses constant propagation, live variables and CFG reachability into one
/// set of dead statement indices: everything a single entry walk cannot reach
/// under constant branch conditions, plus reachable assignments whose value is
/// never read and whose right-hand side cannot trap.
pub struct DeadCodeDetection;

impl DeadCodeDetection {
    pub const ID: &'static str = "deadcode";

    pub fn analyze(
        ir: &MethodIr,
        cfg: &Cfg,
        constants: &DataflowResult<CpFact>,
        live_vars: &DataflowResult<LiveSet>,
    ) -> Result<BTreeSet<usize>> {
        let mut visited: IndexSet<CfgNode> = IndexSet::new();
        let mut useless: BTreeSet<usize> = BTreeSet::new();
        let mut stack = vec![cfg.entry()];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            let Some(index) = node.as_stmt() else {
                for &succ in cfg.succs_of(node) {
                    stack.push(succ);
                }
                continue;
            };
            let stmt = ir.stmt(index);
            let target_node = |target: usize| {
                if target < ir.len() {
                    CfgNode::Stmt(target)
                } else {
                    CfgNode::Exit
                }
            };

            if let StmtKind::Assign { lhs: LValue::Var(v), rhs } = &stmt.kind {
                if !live_vars.out_fact(node).contains(v) && has_no_side_effect(rhs) {
                    useless.insert(index);
                }
            }

            match &stmt.kind {
                StmtKind::If { cond, target } => {
                    let succs = cfg.succs_of(node);
                    if succs.len() != 2 {
                        return Err(AnalysisError::MalformedCfg(format!(
                            "if at {} has {} successors",
                            index,
                            succs.len()
                        )));
                    }
                    let taken = target_node(*target);
                    let fallthrough = succs.iter().copied().find(|&s| s != taken).unwrap_or(taken);
                    match ConstantPropagation::evaluate(cond, constants.in_fact(node)) {
                        CpValue::Const(0) => stack.push(fallthrough),
                        CpValue::Const(1) => stack.push(taken),
                        _ => {
                            for &succ in succs {
                                stack.push(succ);
                            }
                        }
                    }
                }
                StmtKind::Switch { selector, cases, default } => {
                    match constants.in_fact(node).get(*selector) {
                        CpValue::Const(k) => {
                            let target = cases
                                .iter()
                                .find(|(value, _)| *value == k)
                                .map(|(_, target)| *target)
                                .unwrap_or(*default);
                            stack.push(target_node(target));
                        }
                        _ => {
                            for &succ in cfg.succs_of(node) {
                                stack.push(succ);
                            }
                        }
                    }
                }
                _ => {
                    for &succ in cfg.succs_of(node) {
                        stack.push(succ);
                    }
                }
            }
        }

        let mut dead: BTreeSet<usize> = (0..ir.len())
            .filter(|i| !visited.contains(&CfgNode::Stmt(*i)))
            .collect();
        dead.extend(useless);
        Ok(dead)
    }
}

/// A right-hand side has no side effect unless it allocates, casts (may
/// trap), touches a field or array (may trap or trigger initialization), or
/// divides (may trap on zero).
fn has_no_side_effect(rhs: &Exp) -> bool {
    match rhs {
        Exp::New { .. }
        | Exp::NewArray { .. }
        | Exp::Cast { .. }
        | Exp::StaticField(_)
        | Exp::InstanceField { .. }
        | Exp::ArrayAccess { .. } => false,
        Exp::Binary { op, .. } => !op.is_division(),
        Exp::IntLiteral(_) | Exp::Var(_) => true,
    }
}
