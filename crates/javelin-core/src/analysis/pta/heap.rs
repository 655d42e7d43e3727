use crate::program::StmtSite;
use crate::types::Type;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// An abstract heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjId(pub u32);

impl std::fmt::Display for ObjId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "o{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obj {
    pub site: StmtSite,
    pub ty: Type,
}

/// Allocation-site abstraction: one abstract object per `new` statement,
/// interned so the same site always yields the same identity.
#[derive(Debug, Clone, Default)]
pub struct HeapModel {
    objs: Vec<Obj>,
    by_site: IndexMap<StmtSite, ObjId>,
}

impl HeapModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn obj(&mut self, site: StmtSite, ty: &Type) -> ObjId {
        if let Some(&id) = self.by_site.get(&site) {
            return id;
        }
        let id = ObjId(self.objs.len() as u32);
        self.objs.push(Obj { site, ty: ty.clone() });
        self.by_site.insert(site, id);
        id
    }

    pub fn get(&self, id: ObjId) -> &Obj {
        &self.objs[id.0 as usize]
    }

    pub fn ty(&self, id: ObjId) -> &Type {
        &self.get(id).ty
    }

    pub fn len(&self) -> usize {
        self.objs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objs.is_empty()
    }
}
