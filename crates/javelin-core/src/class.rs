use crate::method::{MethodId, SubsigId};
use crate::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(pub u32);

impl std::fmt::Display for ClassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub u32);

impl std::fmt::Display for FieldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// A class or interface declaration. `methods` maps subsignatures to the
/// methods declared here, not inherited ones; dispatch walks `super_class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Class {
    pub name: String,
    pub super_class: Option<ClassId>,
    pub interfaces: Vec<ClassId>,
    pub is_interface: bool,
    pub methods: IndexMap<SubsigId, MethodId>,
    pub fields: Vec<FieldId>,
}

impl Class {
    pub fn declared_method(&self, subsig: SubsigId) -> Option<MethodId> {
        self.methods.get(&subsig).copied()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub class: ClassId,
    pub name: String,
    pub ty: Type,
    pub is_static: bool,
}
