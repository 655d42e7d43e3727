/*! Whole-program points-to analysis.
 *
 * Both solvers saturate a pointer-flow graph and a call graph that grow
 * together: propagating objects into a receiver variable can resolve new
 * callees, and entering a callee adds new pointer flows. The
 * context-insensitive solver keys pointers by syntactic element alone; the
 * context-sensitive solver keys them by (context, element) pairs produced by
 * a pluggable selector.
 */

pub mod ci;
pub mod context;
pub mod cs;
pub mod heap;
pub mod pfg;

pub use ci::{CiPtaResult, CiSolver, Pointer};
pub use context::{
    ContextElem, ContextInsensitiveSelector, ContextSelector, ContextTable, CtxId, KCallSelector,
    KObjSelector, RecvObj,
};
pub use cs::{CsCallSite, CsManager, CsMethod, CsObjId, CsPointer, CsPtaResult, CsSolver};
pub use heap::{HeapModel, Obj, ObjId};
pub use pfg::{PointerFlowGraph, PointerId, PointsToSet, WorkList};
