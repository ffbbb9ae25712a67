use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Nominal identifier of a class-like type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassId(Cow<'static, str>);

const FUNCTION_PREFIX: &str = "Function";

impl ClassId {
    pub const ANY: ClassId = ClassId::from_static("Any");
    pub const NOTHING: ClassId = ClassId::from_static("Nothing");
    pub const UNIT: ClassId = ClassId::from_static("Unit");
    pub const NUMBER: ClassId = ClassId::from_static("Number");
    pub const COMPARABLE: ClassId = ClassId::from_static("Comparable");
    pub const BOOLEAN: ClassId = ClassId::from_static("Boolean");
    pub const CHAR: ClassId = ClassId::from_static("Char");
    pub const STRING: ClassId = ClassId::from_static("String");
    pub const BYTE: ClassId = ClassId::from_static("Byte");
    pub const SHORT: ClassId = ClassId::from_static("Short");
    pub const INT: ClassId = ClassId::from_static("Int");
    pub const LONG: ClassId = ClassId::from_static("Long");
    pub const FLOAT: ClassId = ClassId::from_static("Float");
    pub const DOUBLE: ClassId = ClassId::from_static("Double");
    pub const ARRAY: ClassId = ClassId::from_static("Array");

    pub const fn from_static(name: &'static str) -> Self {
        ClassId(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<String>) -> Self {
        ClassId(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `Function{arity}`: the builtin functional type taking `arity`
    /// parameters. Its last type argument is the return type.
    pub fn function(arity: usize) -> Self {
        ClassId::new(format!("{}{}", FUNCTION_PREFIX, arity))
    }

    pub fn function_arity(&self) -> Option<usize> {
        self.as_str()
            .strip_prefix(FUNCTION_PREFIX)
            .and_then(|digits| digits.parse::<usize>().ok())
    }

    pub fn is_builtin_functional(&self) -> bool {
        self.function_arity().is_some()
    }
}

impl Display for ClassId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for ClassId {
    fn from(name: &'static str) -> Self {
        ClassId::from_static(name)
    }
}
