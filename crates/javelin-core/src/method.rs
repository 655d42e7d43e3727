use crate::class::ClassId;
use crate::stmt::Stmt;
use crate::types::Type;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub u32);

impl std::fmt::Display for MethodId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Program-wide variable index. Every local, parameter and `this` of every
/// method gets one; identity is global so pointer keys stay plain indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VarId(pub u32);

impl std::fmt::Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubsigId(pub u32);

/// Method name plus parameter and return types, without the declaring class.
/// Interned program-wide; dispatch compares these ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subsignature {
    pub name: String,
    pub params: Vec<Type>,
    pub ret: Type,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Method {
    pub class: ClassId,
    pub subsig: SubsigId,
    pub is_static: bool,
    pub is_abstract: bool,
    pub ir: Option<MethodIr>,
}

impl Method {
    pub fn param_count(&self) -> usize {
        self.ir.as_ref().map(|ir| ir.params.len()).unwrap_or(0)
    }
}

/// The body of a concrete method: a flat statement list addressed by index,
/// plus the variables that frame it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodIr {
    pub params: Vec<VarId>,
    pub this: Option<VarId>,
    pub vars: Vec<VarId>,
    pub stmts: Vec<Stmt>,
    pub return_vars: Vec<VarId>,
}

impl MethodIr {
    pub fn stmt(&self, index: usize) -> &Stmt {
        &self.stmts[index]
    }

    pub fn len(&self) -> usize {
        self.stmts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}
