use crate::analysis::callgraph::{CallGraph, CallSite, ChaBuilder};
use crate::analysis::cfg::Cfg;
use crate::analysis::constprop::{ConstantPropagation, CpFact};
use crate::analysis::dataflow::{self, DataflowResult};
use crate::analysis::deadcode::DeadCodeDetection;
use crate::analysis::livevars::{LiveSet, LiveVariableAnalysis};
use crate::method::MethodId;
use crate::program::Program;
use anyhow::{anyhow, Result};
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Driver-facing front door to the per-method analyses. Results are memoized
/// per (analysis id, method); the id strings are the ones drivers select
/// analyses by.
pub struct AnalysisManager<'a> {
    program: &'a Program,
    cache: HashMap<(&'static str, MethodId), Arc<dyn Any + Send + Sync>>,
    cha: Option<Arc<CallGraph<CallSite, MethodId>>>,
}

impl<'a> AnalysisManager<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self { program, cache: HashMap::new(), cha: None }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    pub fn cfg(&mut self, method: MethodId) -> Result<Arc<Cfg>> {
        let program = self.program;
        self.get_or_compute(Cfg::ID, method, || Ok(Cfg::build(program.ir(method)?)))
    }

    pub fn constants(&mut self, method: MethodId) -> Result<Arc<DataflowResult<CpFact>>> {
        let cfg = self.cfg(method)?;
        let program = self.program;
        self.get_or_compute(ConstantPropagation::ID, method, || {
            let ir = program.ir(method)?;
            let analysis = ConstantPropagation::new(program, ir);
            Ok(dataflow::solve(&analysis, ir, &cfg))
        })
    }

    pub fn live_vars(&mut self, method: MethodId) -> Result<Arc<DataflowResult<LiveSet>>> {
        let cfg = self.cfg(method)?;
        let program = self.program;
        self.get_or_compute(LiveVariableAnalysis::ID, method, || {
            let ir = program.ir(method)?;
            Ok(dataflow::solve(&LiveVariableAnalysis, ir, &cfg))
        })
    }

    pub fn dead_code(&mut self, method: MethodId) -> Result<Arc<BTreeSet<usize>>> {
        let cfg = self.cfg(method)?;
        let constants = self.constants(method)?;
        let live_vars = self.live_vars(method)?;
        let program = self.program;
        self.get_or_compute(DeadCodeDetection::ID, method, || {
            let ir = program.ir(method)?;
            Ok(DeadCodeDetection::analyze(ir, &cfg, &constants, &live_vars)?)
        })
    }

    /// The whole-program CHA call graph; computed once.
    pub fn cha(&mut self) -> Result<Arc<CallGraph<CallSite, MethodId>>> {
        if let Some(cg) = &self.cha {
            return Ok(cg.clone());
        }
        let cg = Arc::new(ChaBuilder::new(self.program).build()?);
        self.cha = Some(cg.clone());
        Ok(cg)
    }

    fn get_or_compute<T, F>(&mut self, id: &'static str, method: MethodId, compute: F) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Result<T>,
    {
        if let Some(cached) = self.cache.get(&(id, method)) {
            return cached
                .clone()
                .downcast::<T>()
                .map_err(|_| anyhow!("analysis {} cached under a different type", id));
        }
        let value = Arc::new(compute()?);
        self.cache.insert((id, method), value.clone());
        Ok(value)
    }
}
