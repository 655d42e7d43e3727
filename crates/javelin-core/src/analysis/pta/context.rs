use crate::analysis::callgraph::CallSite;
use crate::analysis::pta::heap::ObjId;
use crate::method::MethodId;
use indexmap::IndexSet;

/// An interned context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CtxId(pub u32);

/// One element of a context string: a call site for call-site sensitivity, an
/// allocation for object sensitivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextElem {
    CallSite(CallSite),
    Obj(ObjId),
}

/// Interner for context strings. `CtxId(0)` is always the empty context.
#[derive(Debug, Clone)]
pub struct ContextTable {
    ctxs: IndexSet<Vec<ContextElem>>,
}

impl ContextTable {
    pub fn new() -> Self {
        let mut ctxs = IndexSet::new();
        ctxs.insert(Vec::new());
        Self { ctxs }
    }

    pub fn empty(&self) -> CtxId {
        CtxId(0)
    }

    pub fn elems(&self, ctx: CtxId) -> &[ContextElem] {
        self.ctxs.get_index(ctx.0 as usize).expect("interned context")
    }

    pub fn intern(&mut self, elems: Vec<ContextElem>) -> CtxId {
        let (index, _) = self.ctxs.insert_full(elems);
        CtxId(index as u32)
    }

    /// Appends `elem` to `base`, keeping only the last `k` elements.
    pub fn append_limited(&mut self, base: CtxId, elem: ContextElem, k: usize) -> CtxId {
        if k == 0 {
            return self.empty();
        }
        let mut elems = self.elems(base).to_vec();
        elems.push(elem);
        let excess = elems.len().saturating_sub(k);
        elems.drain(..excess);
        self.intern(elems)
    }

    /// The suffix of `base` with at most `k` elements.
    pub fn truncate_limited(&mut self, base: CtxId, k: usize) -> CtxId {
        let elems = self.elems(base);
        if elems.len() <= k {
            return base;
        }
        let suffix = elems[elems.len() - k..].to_vec();
        self.intern(suffix)
    }

    pub fn len(&self) -> usize {
        self.ctxs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ctxs.is_empty()
    }
}

impl Default for ContextTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A context-sensitive receiver object as the selectors see it.
#[derive(Debug, Clone, Copy)]
pub struct RecvObj {
    pub heap_ctx: CtxId,
    pub obj: ObjId,
}

/// Strategy producing heap and method contexts. The solver hands the table in
/// mutably so selectors can intern the strings they build.
pub trait ContextSelector {
    fn empty_context(&self, table: &mut ContextTable) -> CtxId {
        table.empty()
    }

    /// Heap context for an allocation inside a method analyzed under
    /// `method_ctx`.
    fn select_heap_context(&self, table: &mut ContextTable, method_ctx: CtxId, method: MethodId, obj: ObjId) -> CtxId;

    /// Callee context for a static call.
    fn select_static_context(&self, table: &mut ContextTable, caller_ctx: CtxId, site: CallSite, callee: MethodId) -> CtxId;

    /// Callee context for an instance call with a known receiver.
    fn select_instance_context(&self, table: &mut ContextTable, caller_ctx: CtxId, site: CallSite, recv: RecvObj, callee: MethodId) -> CtxId;
}

/// Degenerate selector: everything runs in the empty context. Makes the
/// context-sensitive solver behave exactly like the insensitive one.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextInsensitiveSelector;

impl ContextSelector for ContextInsensitiveSelector {
    fn select_heap_context(&self, table: &mut ContextTable, _method_ctx: CtxId, _method: MethodId, _obj: ObjId) -> CtxId {
        table.empty()
    }

    fn select_static_context(&self, table: &mut ContextTable, _caller_ctx: CtxId, _site: CallSite, _callee: MethodId) -> CtxId {
        table.empty()
    }

    fn select_instance_context(&self, table: &mut ContextTable, _caller_ctx: CtxId, _site: CallSite, _recv: RecvObj, _callee: MethodId) -> CtxId {
        table.empty()
    }
}

/// k-limited call-site sensitivity: the callee context is the last `k` call
/// sites of the chain; heap contexts keep `k - 1`.
#[derive(Debug, Clone, Copy)]
pub struct KCallSelector {
    pub k: usize,
}

impl KCallSelector {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KCallSelector {
    fn select_heap_context(&self, table: &mut ContextTable, method_ctx: CtxId, _method: MethodId, _obj: ObjId) -> CtxId {
        table.truncate_limited(method_ctx, self.k.saturating_sub(1))
    }

    fn select_static_context(&self, table: &mut ContextTable, caller_ctx: CtxId, site: CallSite, _callee: MethodId) -> CtxId {
        table.append_limited(caller_ctx, ContextElem::CallSite(site), self.k)
    }

    fn select_instance_context(&self, table: &mut ContextTable, caller_ctx: CtxId, site: CallSite, _recv: RecvObj, _callee: MethodId) -> CtxId {
        table.append_limited(caller_ctx, ContextElem::CallSite(site), self.k)
    }
}

/// k-limited object sensitivity: the callee context is the receiver's
/// allocation string; static calls inherit the caller's context unchanged.
#[derive(Debug, Clone, Copy)]
pub struct KObjSelector {
    pub k: usize,
}

impl KObjSelector {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl ContextSelector for KObjSelector {
    fn select_heap_context(&self, table: &mut ContextTable, method_ctx: CtxId, _method: MethodId, _obj: ObjId) -> CtxId {
        table.truncate_limited(method_ctx, self.k.saturating_sub(1))
    }

    fn select_static_context(&self, _table: &mut ContextTable, caller_ctx: CtxId, _site: CallSite, _callee: MethodId) -> CtxId {
        caller_ctx
    }

    fn select_instance_context(&self, table: &mut ContextTable, _caller_ctx: CtxId, _site: CallSite, recv: RecvObj, _callee: MethodId) -> CtxId {
        table.append_limited(recv.heap_ctx, ContextElem::Obj(recv.obj), self.k)
    }
}
