//! Cone-style type model consumed by call finalization.
//!
//! Types are immutable values. Besides nominal class types the model keeps
//! the two kinds of type variables finalization substitutes away
//! (declaration type parameters and solver type variables), the deferred
//! integer literal type, and an error marker.

mod class_id;
mod literal;
mod substitutor;

pub use class_id::ClassId;
pub use literal::IntegerLiteralType;
pub use substitutor::{SubstitutionKey, Substitutor};

use crate::symbol::TypeParameterSymbol;
use derive_more::{Display, From};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display as FmtDisplay, Formatter};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
pub struct TypeVariableId(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassType {
    pub class_id: ClassId,
    pub arguments: Vec<Ty>,
    pub nullable: bool,
}

impl ClassType {
    pub fn new(class_id: ClassId) -> Self {
        Self {
            class_id,
            arguments: Vec::new(),
            nullable: false,
        }
    }

    pub fn with_arguments(mut self, arguments: Vec<Ty>) -> Self {
        self.arguments = arguments;
        self
    }

    pub fn with_nullability(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn byte() -> Self {
        Self::new(ClassId::BYTE)
    }
    pub fn short() -> Self {
        Self::new(ClassId::SHORT)
    }
    pub fn int() -> Self {
        Self::new(ClassId::INT)
    }
    pub fn long() -> Self {
        Self::new(ClassId::LONG)
    }
    pub fn float() -> Self {
        Self::new(ClassId::FLOAT)
    }
    pub fn double() -> Self {
        Self::new(ClassId::DOUBLE)
    }

    /// `Function{N}<params..., ret>`
    pub fn function(parameters: Vec<Ty>, ret: Ty) -> Self {
        let arity = parameters.len();
        let mut arguments = parameters;
        arguments.push(ret);
        Self::new(ClassId::function(arity)).with_arguments(arguments)
    }

    pub fn is_builtin_functional(&self) -> bool {
        self.class_id.is_builtin_functional()
    }

    /// Return type of a builtin functional type.
    pub fn functional_return_type(&self) -> Option<&Ty> {
        if self.is_builtin_functional() {
            self.arguments.last()
        } else {
            None
        }
    }
}

impl FmtDisplay for ClassType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.class_id)?;
        if !self.arguments.is_empty() {
            write!(f, "<{}>", self.arguments.iter().join(", "))?;
        }
        if self.nullable {
            f.write_str("?")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeParameterType {
    pub symbol: TypeParameterSymbol,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeVariableType {
    pub id: TypeVariableId,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ErrorType {
    pub reason: String,
}

impl ErrorType {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ty {
    Class(ClassType),
    TypeParameter(TypeParameterType),
    Variable(TypeVariableType),
    IntegerLiteral(IntegerLiteralType),
    Error(ErrorType),
}

impl Ty {
    pub fn class(class_id: ClassId) -> Ty {
        Ty::Class(ClassType::new(class_id))
    }
    pub fn any() -> Ty {
        Ty::class(ClassId::ANY)
    }
    pub fn nothing() -> Ty {
        Ty::class(ClassId::NOTHING)
    }
    pub fn unit() -> Ty {
        Ty::class(ClassId::UNIT)
    }
    pub fn boolean() -> Ty {
        Ty::class(ClassId::BOOLEAN)
    }
    pub fn string() -> Ty {
        Ty::class(ClassId::STRING)
    }
    pub fn byte() -> Ty {
        Ty::class(ClassId::BYTE)
    }
    pub fn short() -> Ty {
        Ty::class(ClassId::SHORT)
    }
    pub fn int() -> Ty {
        Ty::class(ClassId::INT)
    }
    pub fn long() -> Ty {
        Ty::class(ClassId::LONG)
    }
    pub fn float() -> Ty {
        Ty::class(ClassId::FLOAT)
    }
    pub fn double() -> Ty {
        Ty::class(ClassId::DOUBLE)
    }
    pub fn array(element: Ty) -> Ty {
        Ty::Class(ClassType::new(ClassId::ARRAY).with_arguments(vec![element]))
    }
    pub fn function(parameters: Vec<Ty>, ret: Ty) -> Ty {
        Ty::Class(ClassType::function(parameters, ret))
    }
    pub fn type_parameter(symbol: TypeParameterSymbol) -> Ty {
        Ty::TypeParameter(TypeParameterType {
            symbol,
            nullable: false,
        })
    }
    pub fn variable(id: u32) -> Ty {
        Ty::Variable(TypeVariableType {
            id: TypeVariableId(id),
            nullable: false,
        })
    }
    pub fn integer_literal(value: impl Into<num_bigint::BigInt>) -> Ty {
        Ty::IntegerLiteral(IntegerLiteralType::from_value(value))
    }
    pub fn error(reason: impl Into<String>) -> Ty {
        Ty::Error(ErrorType::new(reason))
    }

    pub fn nullable(self) -> Ty {
        self.with_nullability(true)
    }

    /// Literal and error types carry no nullability and are returned as is.
    pub fn with_nullability(self, nullable: bool) -> Ty {
        match self {
            Ty::Class(class) => Ty::Class(class.with_nullability(nullable)),
            Ty::TypeParameter(param) => Ty::TypeParameter(TypeParameterType { nullable, ..param }),
            Ty::Variable(var) => Ty::Variable(TypeVariableType { nullable, ..var }),
            other @ (Ty::IntegerLiteral(_) | Ty::Error(_)) => other,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Ty::Class(class) => class.nullable,
            Ty::TypeParameter(param) => param.nullable,
            Ty::Variable(var) => var.nullable,
            Ty::IntegerLiteral(_) | Ty::Error(_) => false,
        }
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Ty::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_integer_literal(&self) -> Option<&IntegerLiteralType> {
        match self {
            Ty::IntegerLiteral(literal) => Some(literal),
            _ => None,
        }
    }

    pub fn is_integer_literal(&self) -> bool {
        matches!(self, Ty::IntegerLiteral(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error(_))
    }

    pub fn is_builtin_functional(&self) -> bool {
        self.as_class()
            .is_some_and(|class| class.is_builtin_functional())
    }

    /// Fixes a deferred literal type against `expected`; other types are
    /// returned unchanged.
    pub fn approximate_integer_literal(&self, expected: Option<&Ty>) -> Ty {
        match self {
            Ty::IntegerLiteral(literal) => Ty::Class(literal.approximate(expected)),
            other => other.clone(),
        }
    }

    /// True if a deferred literal type occurs anywhere inside this type.
    pub fn contains_integer_literal(&self) -> bool {
        match self {
            Ty::IntegerLiteral(_) => true,
            Ty::Class(class) => class.arguments.iter().any(Ty::contains_integer_literal),
            Ty::TypeParameter(_) | Ty::Variable(_) | Ty::Error(_) => false,
        }
    }
}

impl From<ClassType> for Ty {
    fn from(class: ClassType) -> Self {
        Ty::Class(class)
    }
}

impl From<IntegerLiteralType> for Ty {
    fn from(literal: IntegerLiteralType) -> Self {
        Ty::IntegerLiteral(literal)
    }
}

impl FmtDisplay for Ty {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Class(class) => write!(f, "{}", class),
            Ty::TypeParameter(param) => {
                write!(f, "{}{}", param.symbol, if param.nullable { "?" } else { "" })
            }
            Ty::Variable(var) => {
                write!(f, "TV#{}{}", var.id, if var.nullable { "?" } else { "" })
            }
            Ty::IntegerLiteral(literal) => write!(f, "{}", literal),
            Ty::Error(err) => write!(f, "<error: {}>", err.reason),
        }
    }
}
