//! Declarations a call can resolve to.
//!
//! Resolution has already happened by the time finalization runs, so a
//! declaration only carries what substitution and return-type computation
//! read: type parameters, receiver and parameter types, and the declared
//! return type if there is one.

use crate::ty::{ClassId, Ty};
use derive_more::{Display, From};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt::{Display as FmtDisplay, Formatter};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeParameterSymbol {
    pub name: String,
}

impl TypeParameterSymbol {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// `T` as a type, as seen from inside the declaration.
    pub fn self_type(&self) -> Ty {
        Ty::type_parameter(self.clone())
    }
}

impl FmtDisplay for TypeParameterSymbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    From,
)]
pub struct DeclId(pub u32);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueParameter {
    pub name: String,
    pub ty: Ty,
    pub is_vararg: bool,
}

impl ValueParameter {
    pub fn new(name: impl Into<String>, ty: Ty) -> Self {
        Self {
            name: name.into(),
            ty,
            is_vararg: false,
        }
    }

    pub fn vararg(name: impl Into<String>, ty: Ty) -> Self {
        Self {
            is_vararg: true,
            ..Self::new(name, ty)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReturnTypeRef {
    Explicit(Ty),
    /// Inferred from the body; computed on demand.
    Implicit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegerOperatorKind {
    Plus,
    Minus,
    Times,
    Div,
    Rem,
    UnaryPlus,
    UnaryMinus,
}

impl IntegerOperatorKind {
    pub fn all() -> [IntegerOperatorKind; 7] {
        [
            IntegerOperatorKind::Plus,
            IntegerOperatorKind::Minus,
            IntegerOperatorKind::Times,
            IntegerOperatorKind::Div,
            IntegerOperatorKind::Rem,
            IntegerOperatorKind::UnaryPlus,
            IntegerOperatorKind::UnaryMinus,
        ]
    }

    pub fn is_unary(&self) -> bool {
        matches!(
            self,
            IntegerOperatorKind::UnaryPlus | IntegerOperatorKind::UnaryMinus
        )
    }

    pub fn operator_name(&self) -> &'static str {
        match self {
            IntegerOperatorKind::Plus => "plus",
            IntegerOperatorKind::Minus => "minus",
            IntegerOperatorKind::Times => "times",
            IntegerOperatorKind::Div => "div",
            IntegerOperatorKind::Rem => "rem",
            IntegerOperatorKind::UnaryPlus => "unaryPlus",
            IntegerOperatorKind::UnaryMinus => "unaryMinus",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclarationKind {
    Function,
    Property,
    /// Member of the synthetic scope of integer literal types.
    IntegerOperator(IntegerOperatorKind),
    Class,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclarationKind,
    pub type_parameters: Vec<TypeParameterSymbol>,
    pub receiver_type: Option<Ty>,
    pub value_parameters: Vec<ValueParameter>,
    /// `None` for declarations that have no return type at all (classes).
    pub return_type: Option<ReturnTypeRef>,
}

impl Declaration {
    /// A function with an inferred return type. The id is assigned when the
    /// declaration is registered with a session.
    pub fn function(name: impl Into<String>) -> Self {
        Self {
            id: DeclId::default(),
            name: name.into(),
            kind: DeclarationKind::Function,
            type_parameters: Vec::new(),
            receiver_type: None,
            value_parameters: Vec::new(),
            return_type: Some(ReturnTypeRef::Implicit),
        }
    }

    pub fn property(name: impl Into<String>, ty: Ty) -> Self {
        Self {
            kind: DeclarationKind::Property,
            return_type: Some(ReturnTypeRef::Explicit(ty)),
            ..Self::function(name)
        }
    }

    pub fn class(class_id: &ClassId) -> Self {
        Self {
            kind: DeclarationKind::Class,
            return_type: None,
            ..Self::function(class_id.as_str())
        }
    }

    pub fn with_id(mut self, id: DeclId) -> Self {
        self.id = id;
        self
    }

    pub fn with_kind(mut self, kind: DeclarationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_type_parameter(mut self, name: impl Into<String>) -> Self {
        self.type_parameters.push(TypeParameterSymbol::new(name));
        self
    }

    pub fn with_receiver(mut self, ty: Ty) -> Self {
        self.receiver_type = Some(ty);
        self
    }

    pub fn with_parameter(mut self, parameter: ValueParameter) -> Self {
        self.value_parameters.push(parameter);
        self
    }

    pub fn with_return_type(mut self, ty: Ty) -> Self {
        self.return_type = Some(ReturnTypeRef::Explicit(ty));
        self
    }

    pub fn with_implicit_return_type(mut self) -> Self {
        self.return_type = Some(ReturnTypeRef::Implicit);
        self
    }

    pub fn integer_operator(&self) -> Option<IntegerOperatorKind> {
        match self.kind {
            DeclarationKind::IntegerOperator(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn type_parameter(&self, name: &str) -> Option<&TypeParameterSymbol> {
        self.type_parameters.iter().find(|param| param.name == name)
    }
}

impl FmtDisplay for Declaration {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let keyword = match self.kind {
            DeclarationKind::Function | DeclarationKind::IntegerOperator(_) => "fun",
            DeclarationKind::Property => "val",
            DeclarationKind::Class => return write!(f, "class {}", self.name),
        };
        write!(f, "{} ", keyword)?;
        if !self.type_parameters.is_empty() {
            write!(f, "<{}> ", self.type_parameters.iter().join(", "))?;
        }
        if let Some(receiver) = &self.receiver_type {
            write!(f, "{}.", receiver)?;
        }
        f.write_str(&self.name)?;
        if self.kind != DeclarationKind::Property {
            let params = self
                .value_parameters
                .iter()
                .map(|param| {
                    format!(
                        "{}{}: {}",
                        if param.is_vararg { "vararg " } else { "" },
                        param.name,
                        param.ty
                    )
                })
                .join(", ");
            write!(f, "({})", params)?;
        }
        match &self.return_type {
            Some(ReturnTypeRef::Explicit(ty)) => write!(f, ": {}", ty),
            Some(ReturnTypeRef::Implicit) | None => Ok(()),
        }
    }
}
