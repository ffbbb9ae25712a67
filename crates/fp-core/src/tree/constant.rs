use crate::ty::ClassId;
use num_bigint::BigInt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstKind {
    Null,
    Boolean,
    Char,
    String,
    /// Integer literal whose numeric type is still deferred.
    IntegerLiteral,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
}

impl ConstKind {
    /// Literal kind for a numeric type a literal was approximated to.
    pub fn from_class_id(class_id: &ClassId) -> Option<ConstKind> {
        let kind = match class_id.as_str() {
            "Byte" => ConstKind::Byte,
            "Short" => ConstKind::Short,
            "Int" => ConstKind::Int,
            "Long" => ConstKind::Long,
            "Float" => ConstKind::Float,
            "Double" => ConstKind::Double,
            _ => return None,
        };
        Some(kind)
    }

    pub fn is_floating(&self) -> bool {
        matches!(self, ConstKind::Float | ConstKind::Double)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Null,
    Boolean(bool),
    Char(char),
    String(String),
    Integer(BigInt),
    Float(f64),
}
