/*! Analytical core of a whole-program static analyzer for a class-based,
 * single-inheritance managed IR.
 *
 * The crate computes four cooperating results over one program: a
 * class-hierarchy-analysis call graph, intraprocedural constant propagation,
 * dead-code detection fusing constants with liveness and reachability, and
 * whole-program points-to analysis in context-insensitive and
 * context-sensitive flavors. Each is a fixpoint computation over a graph that
 * grows while the computation runs.
 */

pub mod analysis;
pub mod builder;
pub mod class;
pub mod exp;
pub mod method;
pub mod program;
pub mod stmt;
pub mod types;

pub use builder::{MethodBuilder, ProgramBuilder};
pub use class::{Class, ClassId, Field, FieldId};
pub use exp::{BinaryOp, Exp};
pub use method::{Method, MethodId, MethodIr, Subsignature, SubsigId, VarId};
pub use program::{Program, StmtSite};
pub use stmt::{Invoke, InvokeKind, LValue, Stmt, StmtKind};
pub use types::Type;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("malformed control flow: {0}")]
    MalformedCfg(String),
    #[error("unresolved method reference: {0}")]
    UnresolvedMethod(String),
    #[error("no entry method configured")]
    NoEntryMethod,
    #[error("missing IR for method: {0}")]
    MissingIr(String),
    #[error("malformed statement: {0}")]
    MalformedStmt(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests;
