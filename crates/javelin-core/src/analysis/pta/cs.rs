use crate::analysis::callgraph::{resolve_callee, CallGraph, CallKind, CallSite, Edge};
use crate::analysis::pta::context::{ContextSelector, ContextTable, CtxId, RecvObj};
use crate::analysis::pta::heap::{HeapModel, ObjId};
use crate::analysis::pta::pfg::{PointerFlowGraph, PointsToSet, WorkList};
use crate::class::FieldId;
use crate::exp::Exp;
use crate::method::{MethodId, VarId};
use crate::program::{Program, StmtSite};
use crate::stmt::{Invoke, LValue, StmtKind};
use crate::types::Type;
use crate::{AnalysisError, Result};
use indexmap::IndexSet;
use log::debug;

/// A context-qualified abstract object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CsObjId(pub u32);

/// Interns (heap context, object) pairs. The same allocation site under
/// different heap contexts yields distinct context-sensitive objects.
#[derive(Debug, Clone, Default)]
pub struct CsManager {
    cs_objs: IndexSet<(CtxId, ObjId)>,
}

impl CsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cs_obj(&mut self, heap_ctx: CtxId, obj: ObjId) -> CsObjId {
        let (index, _) = self.cs_objs.insert_full((heap_ctx, obj));
        CsObjId(index as u32)
    }

    pub fn heap_ctx(&self, cs_obj: CsObjId) -> CtxId {
        self.cs_objs.get_index(cs_obj.0 as usize).expect("interned cs-object").0
    }

    pub fn obj(&self, cs_obj: CsObjId) -> ObjId {
        self.cs_objs.get_index(cs_obj.0 as usize).expect("interned cs-object").1
    }

    pub fn len(&self) -> usize {
        self.cs_objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cs_objs.is_empty()
    }
}

/// A method analyzed under a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsMethod {
    pub ctx: CtxId,
    pub method: MethodId,
}

/// A call site occurring under a caller context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CsCallSite {
    pub ctx: CtxId,
    pub site: CallSite,
}

/// Context-sensitive abstract pointers. Static fields are context-free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsPointer {
    Var(CtxId, VarId),
    StaticField(FieldId),
    InstanceField(CsObjId, FieldId),
    ArrayIndex(CsObjId),
}

/// Context-sensitive points-to analysis. Structurally the insensitive solver
/// with every pointer, object, call site and method keyed by the contexts a
/// pluggable selector produces.
pub struct CsSolver<'a, S> {
    program: &'a Program,
    selector: S,
    heap: HeapModel,
    ctxs: ContextTable,
    csm: CsManager,
    pfg: PointerFlowGraph<CsPointer, CsObjId>,
    call_graph: CallGraph<CsCallSite, CsMethod>,
    worklist: WorkList<CsObjId>,
}

impl<'a, S: ContextSelector> CsSolver<'a, S> {
    pub const ID: &'static str = "pta-cs";

    pub fn new(program: &'a Program, selector: S) -> Self {
        Self {
            program,
            selector,
            heap: HeapModel::new(),
            ctxs: ContextTable::new(),
            csm: CsManager::new(),
            pfg: PointerFlowGraph::new(),
            call_graph: CallGraph::new(),
            worklist: WorkList::new(),
        }
    }

    pub fn solve(mut self) -> Result<CsPtaResult> {
        self.initialize()?;
        self.analyze()?;
        debug!(
            "CS points-to: {} pointers, {} cs-objects, {} contexts, {} reachable cs-methods",
            self.pfg.num_pointers(),
            self.csm.len(),
            self.ctxs.len(),
            self.call_graph.num_reachable()
        );
        Ok(CsPtaResult {
            heap: self.heap,
            ctxs: self.ctxs,
            csm: self.csm,
            pfg: self.pfg,
            call_graph: self.call_graph,
        })
    }

    fn initialize(&mut self) -> Result<()> {
        let main = self.program.entry().ok_or(AnalysisError::NoEntryMethod)?;
        let entry = CsMethod { ctx: self.selector.empty_context(&mut self.ctxs), method: main };
        self.call_graph.add_entry(entry);
        self.add_reachable(entry)
    }

    fn add_reachable(&mut self, cs_method: CsMethod) -> Result<()> {
        if !self.call_graph.add_reachable(cs_method) {
            return Ok(());
        }
        let CsMethod { ctx, method } = cs_method;
        let Some(ir) = &self.program.method(method).ir else {
            return Ok(());
        };
        for stmt in &ir.stmts {
            let site = StmtSite { method, stmt: stmt.index };
            match &stmt.kind {
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::New { class } } => {
                    let obj = self.heap.obj(site, &Type::Reference(*class));
                    let heap_ctx = self.selector.select_heap_context(&mut self.ctxs, ctx, method, obj);
                    let cs_obj = self.csm.cs_obj(heap_ctx, obj);
                    let ptr = self.pfg.pointer(CsPointer::Var(ctx, *x));
                    self.worklist.add_entry(ptr, PointsToSet::singleton(cs_obj));
                }
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::NewArray { elem } } => {
                    let obj = self.heap.obj(site, &Type::Array(Box::new(elem.clone())));
                    let heap_ctx = self.selector.select_heap_context(&mut self.ctxs, ctx, method, obj);
                    let cs_obj = self.csm.cs_obj(heap_ctx, obj);
                    let ptr = self.pfg.pointer(CsPointer::Var(ctx, *x));
                    self.worklist.add_entry(ptr, PointsToSet::singleton(cs_obj));
                }
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::Var(y) } => {
                    self.add_pfg_edge(CsPointer::Var(ctx, *y), CsPointer::Var(ctx, *x));
                }
                StmtKind::Assign { lhs: LValue::Var(x), rhs: Exp::StaticField(f) } => {
                    self.add_pfg_edge(CsPointer::StaticField(*f), CsPointer::Var(ctx, *x));
                }
                StmtKind::Assign { lhs: LValue::StaticField(f), rhs: Exp::Var(y) } => {
                    self.add_pfg_edge(CsPointer::Var(ctx, *y), CsPointer::StaticField(*f));
                }
                StmtKind::Invoke(invoke) if invoke.is_static() => {
                    let callee = resolve_callee(self.program, None, invoke).ok_or_else(|| {
                        AnalysisError::UnresolvedMethod(format!(
                            "static {}.{}",
                            self.program.class(invoke.declared_class).name,
                            self.program.subsig(invoke.subsig).name,
                        ))
                    })?;
                    let cs_site = CsCallSite { ctx, site };
                    let callee_ctx =
                        self.selector.select_static_context(&mut self.ctxs, ctx, site, callee);
                    let cs_callee = CsMethod { ctx: callee_ctx, method: callee };
                    let edge = Edge { kind: CallKind::Static, call_site: cs_site, callee: cs_callee };
                    if self.call_graph.add_edge(edge) {
                        self.add_reachable(cs_callee)?;
                        self.pass_arguments(ctx, invoke, cs_callee);
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
            let CsPointer::Var(ctx, x) = self.pfg.key(n) else { continue };
            for cs_obj in delta.iter() {
                for &site in self.program.store_fields_of(x) {
                    if self.reachable(ctx, site) {
                        let field = self.store_field_at(site)?;
                        let rhs = self.store_rhs_at(site)?;
                        self.add_pfg_edge(
                            CsPointer::Var(ctx, rhs),
                            CsPointer::InstanceField(cs_obj, field),
                        );
                    }
                }
                for &site in self.program.load_fields_of(x) {
                    if self.reachable(ctx, site) {
                        let (lhs, field) = self.load_field_at(site)?;
                        self.add_pfg_edge(
                            CsPointer::InstanceField(cs_obj, field),
                            CsPointer::Var(ctx, lhs),
                        );
                    }
                }
                for &site in self.program.store_arrays_of(x) {
                    if self.reachable(ctx, site) {
                        let rhs = self.store_rhs_at(site)?;
                        self.add_pfg_edge(CsPointer::Var(ctx, rhs), CsPointer::ArrayIndex(cs_obj));
                    }
                }
                for &site in self.program.load_arrays_of(x) {
                    if self.reachable(ctx, site) {
                        let lhs = self.load_lhs_at(site)?;
                        self.add_pfg_edge(CsPointer::ArrayIndex(cs_obj), CsPointer::Var(ctx, lhs));
                    }
                }
                self.process_call(ctx, x, cs_obj)?;
            }
        }
        Ok(())
    }

    fn process_call(&mut self, ctx: CtxId, x: VarId, recv: CsObjId) -> Result<()> {
        for &site in self.program.invokes_of(x) {
            if !self.reachable(ctx, site) {
                continue;
            }
            let invoke = self.invoke_at(site)?;
            let recv_ty = self.heap.ty(self.csm.obj(recv)).clone();
            let Some(callee) = resolve_callee(self.program, Some(&recv_ty), &invoke) else {
                continue;
            };
            let Some(callee_ir) = &self.program.method(callee).ir else { continue };
            let recv_obj = RecvObj { heap_ctx: self.csm.heap_ctx(recv), obj: self.csm.obj(recv) };
            let callee_ctx =
                self.selector.select_instance_context(&mut self.ctxs, ctx, site, recv_obj, callee);
            if let Some(this) = callee_ir.this {
                let ptr = self.pfg.pointer(CsPointer::Var(callee_ctx, this));
                self.worklist.add_entry(ptr, PointsToSet::singleton(recv));
            }
            let cs_callee = CsMethod { ctx: callee_ctx, method: callee };
            let edge = Edge {
                kind: CallKind::of(&invoke),
                call_site: CsCallSite { ctx, site },
                callee: cs_callee,
            };
            if self.call_graph.add_edge(edge) {
                self.add_reachable(cs_callee)?;
                self.pass_arguments(ctx, &invoke, cs_callee);
            }
        }
        Ok(())
    }

    /// Arguments flow under the caller's context, parameters live under the
    /// callee's; returns flow back callee to caller.
    fn pass_arguments(&mut self, caller_ctx: CtxId, invoke: &Invoke, callee: CsMethod) {
        let Some(ir) = &self.program.method(callee.method).ir else { return };
        for (&arg, &param) in invoke.args.iter().zip(ir.params.iter()) {
            self.add_pfg_edge(
                CsPointer::Var(caller_ctx, arg),
                CsPointer::Var(callee.ctx, param),
            );
        }
        if let Some(result) = invoke.result {
            for &ret in &ir.return_vars {
                self.add_pfg_edge(
                    CsPointer::Var(callee.ctx, ret),
                    CsPointer::Var(caller_ctx, result),
                );
            }
        }
    }

    fn add_pfg_edge(&mut self, source: CsPointer, target: CsPointer) {
        let s = self.pfg.pointer(source);
        let t = self.pfg.pointer(target);
        self.pfg.add_flow_edge(s, t, &mut self.worklist);
    }

    /// A statement participates only while (context, owning method) is
    /// reachable.
    fn reachable(&self, ctx: CtxId, site: StmtSite) -> bool {
        self.call_graph.is_reachable(CsMethod { ctx, method: site.method })
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

/// Everything the context-sensitive analysis produced: the interners and the
/// saturated graphs.
#[derive(Debug, Clone)]
pub struct CsPtaResult {
    heap: HeapModel,
    ctxs: ContextTable,
    csm: CsManager,
    pfg: PointerFlowGraph<CsPointer, CsObjId>,
    call_graph: CallGraph<CsCallSite, CsMethod>,
}

impl CsPtaResult {
    pub fn heap(&self) -> &HeapModel {
        &self.heap
    }

    pub fn contexts(&self) -> &ContextTable {
        &self.ctxs
    }

    pub fn cs_manager(&self) -> &CsManager {
        &self.csm
    }

    pub fn pfg(&self) -> &PointerFlowGraph<CsPointer, CsObjId> {
        &self.pfg
    }

    pub fn call_graph(&self) -> &CallGraph<CsCallSite, CsMethod> {
        &self.call_graph
    }

    /// Points-to set of a variable under one context.
    pub fn var_pts(&self, ctx: CtxId, var: VarId) -> PointsToSet<CsObjId> {
        self.pfg
            .lookup(CsPointer::Var(ctx, var))
            .map(|p| self.pfg.pts(p).clone())
            .unwrap_or_default()
    }

    /// Contexts under which `var` has a pointer.
    pub fn contexts_of_var(&self, var: VarId) -> Vec<CtxId> {
        self.pfg
            .pointers()
            .filter_map(|p| match self.pfg.key(p) {
                CsPointer::Var(ctx, v) if v == var => Some(ctx),
                _ => None,
            })
            .collect()
    }

    /// Context-collapsed view: every allocation-site object `var` may point
    /// to, across all of its contexts.
    pub fn objects_of_var(&self, var: VarId) -> IndexSet<ObjId> {
        let mut objs = IndexSet::new();
        for ctx in self.contexts_of_var(var) {
            for cs_obj in self.var_pts(ctx, var).iter() {
                objs.insert(self.csm.obj(cs_obj));
            }
        }
        objs
    }
}
