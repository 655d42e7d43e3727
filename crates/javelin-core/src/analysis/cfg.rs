use crate::method::MethodIr;
use crate::stmt::StmtKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A node of the statement-level control-flow graph. `Entry` and `Exit` are
/// synthetic; every real statement appears as `Stmt(index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CfgNode {
    Entry,
    Stmt(usize),
    Exit,
}

impl CfgNode {
    pub fn as_stmt(&self) -> Option<usize> {
        match self {
            CfgNode::Stmt(i) => Some(*i),
            _ => None,
        }
    }
}

/// Intraprocedural CFG of one method body. Successor lists preserve insertion
/// order; an `If` always contributes its taken target first, then the
/// fall-through.
#[derive(Debug, Clone)]
pub struct Cfg {
    num_stmts: usize,
    succs: IndexMap<CfgNode, Vec<CfgNode>>,
    preds: IndexMap<CfgNode, Vec<CfgNode>>,
}

impl Cfg {
    pub const ID: &'static str = "cfg";

    pub fn build(ir: &MethodIr) -> Self {
        let num_stmts = ir.stmts.len();
        let mut succs: IndexMap<CfgNode, Vec<CfgNode>> = IndexMap::new();
        succs.insert(CfgNode::Entry, Vec::new());
        for i in 0..num_stmts {
            succs.insert(CfgNode::Stmt(i), Vec::new());
        }
        succs.insert(CfgNode::Exit, Vec::new());

        let stmt_or_exit = |i: usize| {
            if i < num_stmts {
                CfgNode::Stmt(i)
            } else {
                CfgNode::Exit
            }
        };

        succs[&CfgNode::Entry].push(stmt_or_exit(0));
        for (i, stmt) in ir.stmts.iter().enumerate() {
            let out = &mut succs[&CfgNode::Stmt(i)];
            match &stmt.kind {
                StmtKind::Goto { target } => out.push(stmt_or_exit(*target)),
                StmtKind::If { target, .. } => {
                    out.push(stmt_or_exit(*target));
                    out.push(stmt_or_exit(i + 1));
                }
                StmtKind::Switch { cases, default, .. } => {
                    for (_, target) in cases {
                        out.push(stmt_or_exit(*target));
                    }
                    out.push(stmt_or_exit(*default));
                }
                StmtKind::Return { .. } => out.push(CfgNode::Exit),
                _ => out.push(stmt_or_exit(i + 1)),
            }
        }

        let mut preds: IndexMap<CfgNode, Vec<CfgNode>> = IndexMap::new();
        for node in succs.keys() {
            preds.insert(*node, Vec::new());
        }
        for (node, out) in &succs {
            for succ in out {
                preds[succ].push(*node);
            }
        }

        Self { num_stmts, succs, preds }
    }

    pub fn entry(&self) -> CfgNode {
        CfgNode::Entry
    }

    pub fn exit(&self) -> CfgNode {
        CfgNode::Exit
    }

    pub fn num_stmts(&self) -> usize {
        self.num_stmts
    }

    /// All nodes in program order: entry, statements, exit.
    pub fn nodes(&self) -> impl Iterator<Item = CfgNode> + '_ {
        self.succs.keys().copied()
    }

    pub fn succs_of(&self, node: CfgNode) -> &[CfgNode] {
        self.succs.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn preds_of(&self, node: CfgNode) -> &[CfgNode] {
        self.preds.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Nodes reachable from the entry along successor edges.
    pub fn reachable_nodes(&self) -> indexmap::IndexSet<CfgNode> {
        let mut visited = indexmap::IndexSet::new();
        let mut queue = VecDeque::new();
        queue.push_back(CfgNode::Entry);
        while let Some(node) = queue.pop_front() {
            if visited.insert(node) {
                for &succ in self.succs_of(node) {
                    queue.push_back(succ);
                }
            }
        }
        visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ProgramBuilder;
    use crate::exp::BinaryOp;
    use crate::types::Type;

    #[test]
    fn straight_line_wires_entry_to_exit() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object");
        let sig = b.subsig("main", vec![], Type::Void);
        let mut m = b.static_method(object, sig);
        let x = m.var("x", Type::Int);
        m.assign_int(x, 1);
        m.ret();
        let m = m.finish();
        let program = b.finish();

        let cfg = Cfg::build(program.ir(m).unwrap());
        assert_eq!(cfg.succs_of(CfgNode::Entry), &[CfgNode::Stmt(0)]);
        assert_eq!(cfg.succs_of(CfgNode::Stmt(0)), &[CfgNode::Stmt(1)]);
        assert_eq!(cfg.succs_of(CfgNode::Stmt(1)), &[CfgNode::Exit]);
        assert_eq!(cfg.preds_of(CfgNode::Exit), &[CfgNode::Stmt(1)]);
    }

    #[test]
    fn branch_has_two_successors() {
        let mut b = ProgramBuilder::new();
        let object = b.class("Object");
        let sig = b.subsig("main", vec![], Type::Void);
        let mut m = b.static_method(object, sig);
        let x = m.var("x", Type::Int);
        let y = m.var("y", Type::Int);
        m.assign_int(x, 1);
        m.assign_int(y, 2);
        m.if_goto(BinaryOp::Lt, x, y, 4);
        m.nop();
        m.ret();
        let m = m.finish();
        let program = b.finish();

        let cfg = Cfg::build(program.ir(m).unwrap());
        assert_eq!(
            cfg.succs_of(CfgNode::Stmt(2)),
            &[CfgNode::Stmt(4), CfgNode::Stmt(3)]
        );
        assert!(cfg.reachable_nodes().contains(&CfgNode::Exit));
    }
}
