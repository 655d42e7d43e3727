use crate::analysis::callgraph::{resolve_callee, CallGraph, CallKind, CallSite, Edge};
use crate::analysis::pta::heap::{HeapModel, ObjId};
use crate::analysis::pta::pfg::{PointerFlowGraph, PointsToSet, WorkList};
use crate::class::FieldId;
use crate::exp::Exp;
use crate::method::{MethodId, VarId};
use crate::program::{Program, StmtSite};
use crate::stmt::{Invoke, LValue, StmtKind};
use crate::types::Type;
use crate::{AnalysisError, Result};
use log::debug;

/// Context-insensitive abstract pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    Var(VarId),
    StaticField(FieldId),
    InstanceField(ObjId, FieldId),
    ArrayIndex(ObjId),
}

/// Context-insensitive whole-program points-to analysis with an on-the-fly
/// call graph. Call-graph discovery and pointer propagation feed each other
/// until the worklist drains.
pub struct CiSolver<'a> {
    program: &'a Program,
    heap: HeapModel,
    pfg: PointerFlowGraph<Pointer, ObjId>,
    call_graph: CallGraph<CallSite, MethodId>,
    worklist: WorkList<ObjId>,
}

impl<'a> CiSolver<'a> {
    pub const ID: &'static str = "pta-ci";

    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            heap: HeapModel::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            worklist: WorkList::new(),
        }
    }

    pub fn solve(mut self) -> Result<CiPtaResult> {
        self.initialize()?;
        self.analyze()?;
        debug!(
            "CI points-to: {} pointers, {} objects, {} reachable methods",
            self.pfg.num_pointers(),
            self.heap.len(),
            self.call_graph.num_reachable()
        );
        Ok(CiPtaResult { heap: self.heap, pfg: self.pfg, call_graph: self.call_graph })
    }

    fn initialize(&mut self) -> Result<()> {
        let main = self.program.entry().ok_or(AnalysisError::NoEntryMethod)?;
        self.call_graph.add_entry(main);
        self.add_reachable(main)
    }

    /// Enters a newly reachable method: statements whose pointer flows do not
    /// depend on a receiver's points-to set are translated immediately;
    /// everything else waits for the main loop.
    fn add_reachable(&mut self, method: MethodId) -> Result<()> {
        if !self.call_graph.add_reachable(method) {
            return Ok(());
        }
        let Some(ir) = &self.program.method(method).ir else {
            return Ok(());
        };
        for stmt in &ir.stmts {
            let site = StmtSite { method, stmt: stmt.index };
            match &stmt.kind {
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::New { class } } => {
                    let obj = self.heap.obj(site, &Type::Reference(*class));
                    let ptr = self.pfg.pointer(Pointer::Var(*x));
                    self.worklist.add_entry(ptr, PointsToSet::singleton(obj));
                }
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::NewArray { elem } } => {
                    let obj = self.heap.obj(site, &Type::Array(Box::new(elem.clone())));
                    let ptr = self.pfg.pointer(Pointer::Var(*x));
                    self.worklist.add_entry(ptr, PointsToSet::singleton(obj));
                }
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::Var(y) } => {
                    self.add_pfg_edge(Pointer::Var(*y), Pointer::Var(*x));
                }
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::StaticField(f) } => {
                    self.add_pfg_edge(Pointer::StaticField(*f), Pointer::Var(*x));
                }
                StmtKind::Assign { lhs: LValue::StaticField(f), rhs: Exp::Var(y) } => {
                    self.add_pfg_edge(Pointer::Var(*y), Pointer::StaticField(*f));
                }
                StmtKind::Invoke(invoke) if invoke.is_static() => {
                    let callee = resolve_callee(self.program, None, invoke).ok_or_else(|| {
                        AnalysisError::UnresolvedMethod(format!(
                            "static {}.{}",
                            self.program.class(invoke.declared_class).name,
                            self.program.subsig(invoke.subsig).name,
                        ))
                    })?;
                    let edge = Edge { kind: CallKind::Static, call_site: site, callee };
                    if self.call_graph.add_edge(edge) {
                        self.add_reachable(callee)?;
                        self.pass_arguments(invoke, callee);
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn analyze(&mut self) -> Result<()> {
        while let Some((n, pts)) = self.worklist.poll() {
            let delta = self.pfg.propagate(n, &pts, &mut self.worklist);
            if delta.is_empty() {
                continue;
            }
            let Pointer::Var(x) = self.pfg.key(n) else { continue };
            for obj in delta.iter() {
                // Instance field, array and call statements mentioning x are
                // rewired against each newly discovered receiver object.
                for &site in self.program.store_fields_of(x) {
                    if self.reachable(site) {
                        let field = self.store_field_at(site)?;
                        let rhs = self.store_rhs_at(site)?;
                        self.add_pfg_edge(Pointer::Var(rhs), Pointer::InstanceField(obj, field));
                    }
                }
                for &site in self.program.load_fields_of(x) {
                    if self.reachable(site) {
                        let (lhs, field) = self.load_field_at(site)?;
                        self.add_pfg_edge(Pointer::InstanceField(obj, field), Pointer::Var(lhs));
                    }
                }
                for &site in self.program.store_arrays_of(x) {
                    if self.reachable(site) {
                        let rhs = self.store_rhs_at(site)?;
                        self.add_pfg_edge(Pointer::Var(rhs), Pointer::ArrayIndex(obj));
                    }
                }
                for &site in self.program.load_arrays_of(x) {
                    if self.reachable(site) {
                        let lhs = self.load_lhs_at(site)?;
                        self.add_pfg_edge(Pointer::ArrayIndex(obj), Pointer::Var(lhs));
                    }
                }
                self.process_call(x, obj)?;
            }
        }
        Ok(())
    }

    /// Handles the instance call sites whose receiver is `x` once `obj` flows
    /// into it: dispatch on the concrete type, seed `this`, and connect the
    /// call if its edge is new.
    fn process_call(&mut self, x: VarId, obj: ObjId) -> Result<()> {
        for &site in self.program.invokes_of(x) {
            if !self.reachable(site) {
                continue;
            }
            let invoke = self.invoke_at(site)?;
            let recv_ty = self.heap.ty(obj).clone();
            // A missing dispatch target contributes nothing; never fatal here.
            let Some(callee) = resolve_callee(self.program, Some(&recv_ty), &invoke) else {
                continue;
            };
            let Some(callee_ir) = &self.program.method(callee).ir else { continue };
            if let Some(this) = callee_ir.this {
                let ptr = self.pfg.pointer(Pointer::Var(this));
                self.worklist.add_entry(ptr, PointsToSet::singleton(obj));
            }
            let edge = Edge { kind: CallKind::of(&invoke), call_site: site, callee };
            if self.call_graph.add_edge(edge) {
                self.add_reachable(callee)?;
                self.pass_arguments(&invoke, callee);
            }
        }
        Ok(())
    }

    /// Wires actual arguments to formals and return variables back to the
    /// call-site result.
    fn pass_arguments(&mut self, invoke: &Invoke, callee: MethodId) {
        let Some(ir) = &self.program.method(callee).ir else { return };
        for (&arg, &param) in invoke.args.iter().zip(ir.params.iter()) {
            self.add_pfg_edge(Pointer::Var(arg), Pointer::Var(param));
        }
        if let Some(result) = invoke.result {
            for &ret in &ir.return_vars {
                self.add_pfg_edge(Pointer::Var(ret), Pointer::Var(result));
            }
        }
    }

    fn add_pfg_edge(&mut self, source: Pointer, target: Pointer) {
        let s = self.pfg.pointer(source);
        let t = self.pfg.pointer(target);
        self.pfg.add_flow_edge(s, t, &mut self.worklist);
    }

    /// A statement participates only while its owning method is reachable.
    fn reachable(&self, site: StmtSite) -> bool {
        self.call_graph.is_reachable(site.method)
    }

    fn stmt_kind(&self, site: StmtSite) -> Result<&StmtKind> {
        let ir = self.program.ir(site.method)?;
        Ok(&ir.stmt(site.stmt).kind)
    }

    fn invoke_at(&self, site: StmtSite) -> Result<Invoke> {
        match self.stmt_kind(site)? {
            StmtKind::Invoke(invoke) => Ok(invoke.clone()),
            other => Err(AnalysisError::MalformedStmt(format!(
                "expected invoke at {}: {:?}",
                site, other
            ))),
        }
    }

    fn store_field_at(&self, site: StmtSite) -> Result<FieldId> {
        match self.stmt_kind(site)? {
            StmtKind::Assign { lhs: LValue::InstanceField { field, .. }, .. } => Ok(*field),
            other => Err(AnalysisError::MalformedStmt(format!(
                "expected field store at {}: {:?}",
                site, other
            ))),
        }
    }

    fn store_rhs_at(&self, site: StmtSite) -> Result<VarId> {
        match self.stmt_kind(site)? {
            StmtKind::Assign { rhs: Exp::Var(y), .. } => Ok(*y),
            other => Err(AnalysisError::MalformedStmt(format!(
                "expected variable store at {}: {:?}",
                site, other
            ))),
        }
    }

    fn load_field_at(&self, site: StmtSite) -> Result<(VarId, FieldId)> {
        match self.stmt_kind(site)? {
            StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::InstanceField { field, .. } } => {
                Ok((*x, *field))
            }
            other => Err(AnalysisError::MalformedStmt(format!(
                "expected field load at {}: {:?}",
                site, other
            ))),
        }
    }

    fn load_lhs_at(&self, site: StmtSite) -> Result<VarId> {
        match self.stmt_kind(site)? {
            StmtKind::Assign { lhs: LValue::Var(x), .. } => Ok(*x),
            other => Err(AnalysisError::MalformedStmt(format!(
                "expected variable load at {}: {:?}",
                site, other
            ))),
        }
    }
}

/// The saturated pointer-flow graph and the call graph that emerged with it.
#[derive(Debug, Clone)]
pub struct CiPtaResult {
    heap: HeapModel,
    pfg: PointerFlowGraph<Pointer, ObjId>,
    call_graph: CallGraph<CallSite, MethodId>,
}

impl CiPtaResult {
    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    pub fn pfg(&self) -> &PointerFlowGraph<Pointer, ObjId> {
        &self.pfg
    }

    pub fn call_graph(&self) -> &CallGraph<CallSite, MethodId> {
        &self.call_graph
    }

    /// Points-to set of a variable; empty if the variable never became a
    /// pointer.
    pub fn var_pts(&self, var: VarId) -> PointsToSet<ObjId> {
        self.pfg
            .lookup(Pointer::Var(var))
            .map(|p| self.pfg.pts(p).clone())
            .unwrap_or_default()
    }
}
