use crate::class::ClassId;
use serde::{Deserialize, Serialize};

/// Static types of the analyzed IR. Single-inheritance reference types point
/// into the program's class table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Reference(ClassId),
    Array(Box<Type>),
    Void,
}

impl Type {
    /// True for the types whose values fit the 32-bit constant-propagation
    /// lattice: byte, short, int, char and boolean.
    pub fn is_int_holder(&self) -> bool {
        matches!(
            self,
            Type::Boolean | Type::Byte | Type::Char | Type::Short | Type::Int
        )
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Type::Reference(_) | Type::Array(_))
    }

    pub fn as_class(&self) -> Option<ClassId> {
        match self {
            Type::Reference(c) => Some(*c),
            _ => None,
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Boolean => write!(f, "boolean"),
            Type::Byte => write!(f, "byte"),
            Type::Char => write!(f, "char"),
            Type::Short => write!(f, "short"),
            Type::Int => write!(f, "int"),
            Type::Long => write!(f, "long"),
            Type::Float => write!(f, "float"),
            Type::Double => write!(f, "double"),
            Type::Reference(c) => write!(f, "class#{}", c.0),
            Type::Array(elem) => write!(f, "{}[]", elem),
            Type::Void => write!(f, "void"),
        }
    }
}
