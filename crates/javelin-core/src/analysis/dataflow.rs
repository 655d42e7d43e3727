/*! Monotone-framework scaffolding for the intraprocedural analyses.
 *
 * An analysis supplies its lattice (facts, meet) and transfer function; the
 * solver runs chaotic iteration over the CFG with a deduplicating FIFO
 * worklist until no fact changes. Facts are stored per node in program
 * orientation, so `in_fact` is always the fact before a statement and
 * `out_fact` the fact after it, for both directions.
 */

use crate::analysis::cfg::{Cfg, CfgNode};
use crate::method::MethodIr;
use crate::stmt::Stmt;
use indexmap::IndexMap;
use log::trace;
use std::collections::{HashSet, VecDeque};

pub trait DataflowAnalysis {
    type Fact: Clone + PartialEq;

    fn is_forward(&self) -> bool;

    /// Fact at the boundary: the entry's OUT for forward analyses, the exit's
    /// IN for backward ones.
    fn boundary_fact(&self, cfg: &Cfg) -> Self::Fact;

    fn initial_fact(&self) -> Self::Fact;

    fn meet_into(&self, fact: &Self::Fact, target: &mut Self::Fact);

    /// Applies the node transfer. `input` is the meet result flowing into the
    /// statement (IN for forward, OUT for backward); `output` is mutated in
    /// place. Returns whether `output` changed.
    fn transfer(&self, stmt: &Stmt, input: &Self::Fact, output: &mut Self::Fact) -> bool;
}

/// IN/OUT facts per CFG node, in program orientation.
#[derive(Debug, Clone)]
pub struct DataflowResult<F> {
    in_facts: IndexMap<CfgNode, F>,
    out_facts: IndexMap<CfgNode, F>,
}

impl<F> DataflowResult<F> {
    pub fn in_fact(&self, node: CfgNode) -> &F {
        &self.in_facts[&node]
    }

    pub fn out_fact(&self, node: CfgNode) -> &F {
        &self.out_facts[&node]
    }

    pub fn in_fact_of_stmt(&self, index: usize) -> &F {
        self.in_fact(CfgNode::Stmt(index))
    }

    pub fn out_fact_of_stmt(&self, index: usize) -> &F {
        self.out_fact(CfgNode::Stmt(index))
    }
}

/// Runs `analysis` to fixpoint over `cfg` and returns the facts at every node.
pub fn solve<A: DataflowAnalysis>(analysis: &A, ir: &MethodIr, cfg: &Cfg) -> DataflowResult<A::Fact> {
    solve_directed(analysis, ir, cfg, analysis.is_forward())
}

fn solve_directed<A: DataflowAnalysis>(
    analysis: &A,
    ir: &MethodIr,
    cfg: &Cfg,
    forward: bool,
) -> DataflowResult<A::Fact> {
    let boundary_node = if forward { cfg.entry() } else { cfg.exit() };

    let mut in_facts: IndexMap<CfgNode, A::Fact> = IndexMap::new();
    let mut out_facts: IndexMap<CfgNode, A::Fact> = IndexMap::new();
    for node in cfg.nodes() {
        in_facts.insert(node, analysis.initial_fact());
        out_facts.insert(node, analysis.initial_fact());
    }
    // The boundary node carries the boundary fact on its flow-out side: OUT of
    // the entry when forward, IN of the exit when backward.
    if forward {
        out_facts.insert(boundary_node, analysis.boundary_fact(cfg));
    } else {
        in_facts.insert(boundary_node, analysis.boundary_fact(cfg));
    }

    let mut queue: VecDeque<CfgNode> = cfg.nodes().filter(|n| *n != boundary_node).collect();
    let mut queued: HashSet<CfgNode> = queue.iter().copied().collect();

    while let Some(node) = queue.pop_front() {
        queued.remove(&node);

        // Meet the facts flowing into this node.
        let mut input = analysis.initial_fact();
        let flows_in = if forward { cfg.preds_of(node) } else { cfg.succs_of(node) };
        for other in flows_in {
            let fact = if forward { &out_facts[other] } else { &in_facts[other] };
            analysis.meet_into(fact, &mut input);
        }

        let changed = match node {
            CfgNode::Stmt(i) => {
                let output = if forward {
                    in_facts.insert(node, input.clone());
                    &mut out_facts[&node]
                } else {
                    out_facts.insert(node, input.clone());
                    &mut in_facts[&node]
                };
                analysis.transfer(ir.stmt(i), &input, output)
            }
            CfgNode::Entry | CfgNode::Exit => {
                // Synthetic nodes pass facts through unchanged.
                let (src, dst) = if forward {
                    (&mut in_facts, &mut out_facts)
                } else {
                    (&mut out_facts, &mut in_facts)
                };
                src.insert(node, input.clone());
                let changed = dst[&node] != input;
                dst.insert(node, input);
                changed
            }
        };

        if changed {
            trace!("dataflow fact changed at {:?}", node);
            let flows_out = if forward { cfg.succs_of(node) } else { cfg.preds_of(node) };
            for &next in flows_out {
                if next != boundary_node && queued.insert(next) {
                    queue.push_back(next);
                }
            }
        }
    }

    DataflowResult { in_facts, out_facts }
}
