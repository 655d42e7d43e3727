use crate::class::ClassId;
use crate::method::{MethodId, SubsigId};
use crate::program::{Program, StmtSite};
use crate::stmt::{Invoke, InvokeKind};
use crate::types::Type;
use crate::{AnalysisError, Result};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallKind {
    Static,
    Special,
    Virtual,
    Interface,
    Other,
}

impl CallKind {
    pub fn of(invoke: &Invoke) -> CallKind {
        match invoke.kind {
            InvokeKind::Static => CallKind::Static,
            InvokeKind::Special => CallKind::Special,
            InvokeKind::Virtual => CallKind::Virtual,
            InvokeKind::Interface => CallKind::Interface,
        }
    }
}

/// A call site of the context-insensitive graphs.
pub type CallSite = StmtSite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge<S, M> {
    pub kind: CallKind,
    pub call_site: S,
    pub callee: M,
}

/// Directed graph from call sites to methods, generic over the node identity
/// so the context-sensitive solver can reuse it with (context, ...) pairs.
/// Invariant: every callee of a reachable method is itself reachable.
#[derive(Debug, Clone)]
pub struct CallGraph<S, M> {
    entries: Vec<M>,
    reachable: IndexSet<M>,
    edges: IndexSet<Edge<S, M>>,
    callees: IndexMap<S, IndexSet<M>>,
}

impl<S, M> CallGraph<S, M>
where
    S: Copy + Eq + Hash,
    M: Copy + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            reachable: IndexSet::new(),
            edges: IndexSet::new(),
            callees: IndexMap::new(),
        }
    }

    pub fn add_entry(&mut self, method: M) {
        self.entries.push(method);
    }

    pub fn entries(&self) -> &[M] {
        &self.entries
    }

    /// Marks `method` reachable; false if it already was.
    pub fn add_reachable(&mut self, method: M) -> bool {
        self.reachable.insert(method)
    }

    pub fn is_reachable(&self, method: M) -> bool {
        self.reachable.contains(&method)
    }

    pub fn reachable_methods(&self) -> impl Iterator<Item = M> + '_ {
        self.reachable.iter().copied()
    }

    pub fn num_reachable(&self) -> usize {
        self.reachable.len()
    }

    /// Inserts an edge; false if it was already present.
    pub fn add_edge(&mut self, edge: Edge<S, M>) -> bool {
        if self.edges.insert(edge) {
            self.callees.entry(edge.call_site).or_default().insert(edge.callee);
            true
        } else {
            false
        }
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge<S, M>> + '_ {
        self.edges.iter()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn callees_of(&self, call_site: S) -> impl Iterator<Item = M> + '_ {
        self.callees.get(&call_site).into_iter().flatten().copied()
    }
}

impl<S: Copy + Eq + Hash, M: Copy + Eq + Hash> Default for CallGraph<S, M> {
    fn default() -> Self {
        Self::new()
    }
}

/// Looks up the target of `subsig` starting at `class` and walking up the
/// superclass chain. A declared abstract method stops the walk: the reference
/// resolves to nothing there.
pub fn dispatch(program: &Program, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
    let mut current = Some(class);
    while let Some(c) = current {
        if let Some(method) = program.declared_method(c, subsig) {
            if program.method(method).is_abstract {
                return None;
            }
            return Some(method);
        }
        current = program.super_class(c);
    }
    None
}

/// Resolves the single callee of a call site the way the points-to solvers
/// need it: static and special calls ignore the receiver, virtual and
/// interface calls dispatch upward from the concrete receiver type.
pub fn resolve_callee(program: &Program, recv_type: Option<&Type>, invoke: &Invoke) -> Option<MethodId> {
    match invoke.kind {
        InvokeKind::Static => program.declared_method(invoke.declared_class, invoke.subsig),
        InvokeKind::Special => dispatch(program, invoke.declared_class, invoke.subsig),
        InvokeKind::Virtual | InvokeKind::Interface => {
            let class = match recv_type {
                Some(Type::Reference(c)) => *c,
                // array receivers dispatch through the declared class
                _ => invoke.declared_class,
            };
            dispatch(program, class, invoke.subsig)
        }
    }
}

/// Builds the whole-program call graph by class-hierarchy analysis: every
/// virtual target in the downward closure of the declared type is assumed
/// callable.
pub struct ChaBuilder<'a> {
    program: &'a Program,
}

impl<'a> ChaBuilder<'a> {
    pub const ID: &'static str = "cha";

    pub fn new(program: &'a Program) -> Self {
        Self { program }
    }

    pub fn build(&self) -> Result<CallGraph<CallSite, MethodId>> {
        let entry = self.program.entry().ok_or(AnalysisError::NoEntryMethod)?;
        let mut call_graph = CallGraph::new();
        call_graph.add_entry(entry);

        let mut worklist: VecDeque<MethodId> = VecDeque::new();
        let mut enqueued: IndexSet<MethodId> = IndexSet::new();
        worklist.push_back(entry);
        enqueued.insert(entry);

        while let Some(method) = worklist.pop_front() {
            if !call_graph.add_reachable(method) {
                continue;
            }
            let Some(ir) = &self.program.method(method).ir else { continue };
            for stmt in &ir.stmts {
                let Some(invoke) = stmt.kind.as_invoke() else { continue };
                let call_site = CallSite { method, stmt: stmt.index };
                for callee in self.resolve(invoke)? {
                    call_graph.add_edge(Edge { kind: CallKind::of(invoke), call_site, callee });
                    if enqueued.insert(callee) {
                        worklist.push_back(callee);
                    }
                }
            }
        }
        debug!(
            "CHA: {} reachable methods, {} edges",
            call_graph.num_reachable(),
            call_graph.num_edges()
        );
        Ok(call_graph)
    }

    /// Resolves all possible targets of a call site via the class hierarchy.
    pub fn resolve(&self, invoke: &Invoke) -> Result<IndexSet<MethodId>> {
        let program = self.program;
        let mut targets = IndexSet::new();
        match invoke.kind {
            InvokeKind::Static => {
                let method = program
                    .declared_method(invoke.declared_class, invoke.subsig)
                    .ok_or_else(|| {
                        AnalysisError::UnresolvedMethod(format!(
                            "static {}.{}",
                            program.class(invoke.declared_class).name,
                            program.subsig(invoke.subsig).name,
                        ))
                    })?;
                targets.insert(method);
            }
            InvokeKind::Special => {
                if let Some(method) = dispatch(program, invoke.declared_class, invoke.subsig) {
                    targets.insert(method);
                }
            }
            InvokeKind::Virtual => {
                // Downward closure over subclasses of the declared class.
                let mut queue = VecDeque::new();
                let mut visited = IndexSet::new();
                queue.push_back(invoke.declared_class);
                while let Some(class) = queue.pop_front() {
                    if !visited.insert(class) {
                        continue;
                    }
                    if let Some(method) = dispatch(program, class, invoke.subsig) {
                        targets.insert(method);
                    }
                    for &sub in program.direct_subclasses(class) {
                        queue.push_back(sub);
                    }
                }
            }
            InvokeKind::Interface => {
                // Walk sub-interfaces and implementors; dispatch only at
                // concrete classes and their subclass closure.
                let mut queue = VecDeque::new();
                let mut visited = IndexSet::new();
                queue.push_back(invoke.declared_class);
                while let Some(class) = queue.pop_front() {
                    if !visited.insert(class) {
                        continue;
                    }
                    if program.is_interface(class) {
                        for &sub in program.direct_subinterfaces(class) {
                            queue.push_back(sub);
                        }
                        for &imp in program.direct_implementors(class) {
                            queue.push_back(imp);
                        }
                    } else {
                        if let Some(method) = dispatch(program, class, invoke.subsig) {
                            targets.insert(method);
                        }
                        for &sub in program.direct_subclasses(class) {
                            queue.push_back(sub);
                        }
                    }
                }
            }
        }
        Ok(targets)
    }
}
