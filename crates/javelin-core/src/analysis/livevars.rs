use crate::analysis::cfg::Cfg;
use crate::analysis::dataflow::DataflowAnalysis;
use crate::method::VarId;
use crate::stmt::Stmt;
use indexmap::IndexSet;

pub type LiveSet = IndexSet<VarId>;

/// Backward may-analysis: a variable is live at a point if some path from
/// there reads it before redefining it. The OUT fact of a statement is its
/// live-after set.
pub struct LiveVariableAnalysis;

impl LiveVariableAnalysis {
    pub const ID: &'static str = "livevar";
}

impl DataflowAnalysis for LiveVariableAnalysis {
    type Fact = LiveSet;

    fn is_forward(&self) -> bool {
        false
    }

    fn boundary_fact(&self, _cfg: &Cfg) -> LiveSet {
        LiveSet::new()
    }

    fn initial_fact(&self) -> LiveSet {
        LiveSet::new()
    }

    fn meet_into(&self, fact: &LiveSet, target: &mut LiveSet) {
        for &var in fact {
            target.insert(var);
        }
    }

    fn transfer(&self, stmt: &Stmt, input: &LiveSet, output: &mut LiveSet) -> bool {
        let mut live = input.clone();
        if let Some(def) = stmt.kind.def() {
            live.shift_remove(&def);
        }
        for var in stmt.kind.uses() {
            live.insert(var);
        }
        let changed = live != *output;
        *output = live;
        changed
    }
}
