use crate::class::{Class, ClassId, Field, FieldId};
use crate::method::{Method, MethodId, MethodIr, SubsigId, Subsignature, VarId};
use crate::types::Type;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// A statement location: the owning method plus the statement's index. Doubles
/// as allocation-site and call-site identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StmtSite {
    pub method: MethodId,
    pub stmt: usize,
}

impl std::fmt::Display for StmtSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.method, self.stmt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarInfo {
    pub name: String,
    pub ty: Type,
    pub method: MethodId,
}

/// Statement sites indexed by the variable they mention, built once while the
/// program is assembled. The analyses consume these as plain tables instead of
/// rescanning method bodies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VarUsage {
    pub store_fields: Vec<StmtSite>,
    pub load_fields: Vec<StmtSite>,
    pub store_arrays: Vec<StmtSite>,
    pub load_arrays: Vec<StmtSite>,
    pub invokes: Vec<StmtSite>,
}

/// The whole-program registry: every class, method, field and variable lives
/// in one of its tables and is addressed by index. Effectively immutable once
/// built; the analyses only read it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    pub(crate) classes: Vec<Class>,
    pub(crate) methods: Vec<Method>,
    pub(crate) fields: Vec<Field>,
    pub(crate) vars: Vec<VarInfo>,
    pub(crate) subsigs: IndexSet<Subsignature>,
    pub(crate) entry: Option<MethodId>,
    pub(crate) direct_subclasses: Vec<Vec<ClassId>>,
    pub(crate) direct_subinterfaces: Vec<Vec<ClassId>>,
    pub(crate) direct_implementors: Vec<Vec<ClassId>>,
    pub(crate) var_usage: Vec<VarUsage>,
}

impl Program {
    pub fn class(&self, id: ClassId) -> &Class {
        &self.classes[id.0 as usize]
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0 as usize]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0 as usize]
    }

    pub fn var(&self, id: VarId) -> &VarInfo {
        &self.vars[id.0 as usize]
    }

    pub fn subsig(&self, id: SubsigId) -> &Subsignature {
        self.subsigs.get_index(id.0 as usize).expect("interned subsignature")
    }

    pub fn classes(&self) -> impl Iterator<Item = ClassId> + '_ {
        (0..self.classes.len()).map(|i| ClassId(i as u32))
    }

    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        (0..self.methods.len()).map(|i| MethodId(i as u32))
    }

    /// The configured entry (`main`) method.
    pub fn entry(&self) -> Option<MethodId> {
        self.entry
    }

    pub fn ir(&self, method: MethodId) -> crate::Result<&MethodIr> {
        self.method(method)
            .ir
            .as_ref()
            .ok_or_else(|| crate::AnalysisError::MissingIr(self.method_name(method)))
    }

    /// Human-readable `Class.name(sig)` form, used in error messages.
    pub fn method_name(&self, method: MethodId) -> String {
        let m = self.method(method);
        let class = &self.class(m.class).name;
        let subsig = self.subsig(m.subsig);
        format!("{}.{}", class, subsig.name)
    }

    pub fn declared_method(&self, class: ClassId, subsig: SubsigId) -> Option<MethodId> {
        self.class(class).declared_method(subsig)
    }

    pub fn super_class(&self, class: ClassId) -> Option<ClassId> {
        self.class(class).super_class
    }

    pub fn is_interface(&self, class: ClassId) -> bool {
        self.class(class).is_interface
    }

    pub fn direct_subclasses(&self, class: ClassId) -> &[ClassId] {
        &self.direct_subclasses[class.0 as usize]
    }

    pub fn direct_subinterfaces(&self, class: ClassId) -> &[ClassId] {
        &self.direct_subinterfaces[class.0 as usize]
    }

    pub fn direct_implementors(&self, class: ClassId) -> &[ClassId] {
        &self.direct_implementors[class.0 as usize]
    }

    pub fn store_fields_of(&self, var: VarId) -> &[StmtSite] {
        &self.var_usage[var.0 as usize].store_fields
    }

    pub fn load_fields_of(&self, var: VarId) -> &[StmtSite] {
        &self.var_usage[var.0 as usize].load_fields
    }

    pub fn store_arrays_of(&self, var: VarId) -> &[StmtSite] {
        &self.var_usage[var.0 as usize].store_arrays
    }

    pub fn load_arrays_of(&self, var: VarId) -> &[StmtSite] {
        &self.var_usage[var.0 as usize].load_arrays
    }

    /// Instance call sites whose receiver is `var`.
    pub fn invokes_of(&self, var: VarId) -> &[StmtSite] {
        &self.var_usage[var.0 as usize].invokes
    }
}
