/*! The analyses: control flow, dataflow, call graphs and points-to.
 *
 * Everything here is a reader of a sealed [`Program`](crate::Program). The
 * intraprocedural passes (constant propagation, liveness, dead code) run per
 * method over a statement-level CFG; the whole-program passes (CHA and the
 * two points-to solvers) saturate worklists over graphs that grow as new
 * methods become reachable.
 */

pub mod callgraph;
pub mod cfg;
pub mod constprop;
pub mod dataflow;
pub mod deadcode;
pub mod livevars;
pub mod pass;
pub mod pta;

pub use callgraph::{CallGraph, CallKind, CallSite, ChaBuilder, Edge};
pub use cfg::{Cfg, CfgNode};
pub use constprop::{ConstantPropagation, CpFact, CpValue};
pub use dataflow::{solve, DataflowAnalysis, DataflowResult};
pub use deadcode::DeadCodeDetection;
pub use livevars::{LiveSet, LiveVariableAnalysis};
pub use pass::AnalysisManager;
