use super::{ClassType, Ty, TypeParameterType, TypeVariableId, TypeVariableType};
use crate::symbol::TypeParameterSymbol;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubstitutionKey {
    Parameter(TypeParameterSymbol),
    Variable(TypeVariableId),
}

/// A finite mapping from type parameters or type variables to types.
///
/// Application is a single pass: replacement types are not substituted
/// again, so `{T -> U, U -> Int}` maps `T` to `U`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substitutor {
    mapping: HashMap<SubstitutionKey, Ty>,
}

impl Substitutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, symbol: TypeParameterSymbol, ty: Ty) -> Self {
        self.insert(SubstitutionKey::Parameter(symbol), ty);
        self
    }

    pub fn with_variable(mut self, id: u32, ty: Ty) -> Self {
        self.insert(SubstitutionKey::Variable(TypeVariableId(id)), ty);
        self
    }

    pub fn insert(&mut self, key: SubstitutionKey, ty: Ty) {
        self.mapping.insert(key, ty);
    }

    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Returns `None` when nothing inside `ty` is mapped.
    pub fn substitute_or_none(&self, ty: &Ty) -> Option<Ty> {
        if self.mapping.is_empty() {
            return None;
        }
        match ty {
            Ty::TypeParameter(TypeParameterType { symbol, nullable }) => self
                .mapping
                .get(&SubstitutionKey::Parameter(symbol.clone()))
                .map(|replacement| keep_nullability(replacement, *nullable)),
            Ty::Variable(TypeVariableType { id, nullable }) => self
                .mapping
                .get(&SubstitutionKey::Variable(*id))
                .map(|replacement| keep_nullability(replacement, *nullable)),
            Ty::Class(class) => self.substitute_class(class).map(Ty::Class),
            Ty::IntegerLiteral(_) | Ty::Error(_) => None,
        }
    }

    pub fn substitute_or_self(&self, ty: &Ty) -> Ty {
        self.substitute_or_none(ty).unwrap_or_else(|| ty.clone())
    }

    fn substitute_class(&self, class: &ClassType) -> Option<ClassType> {
        let substituted: Vec<Option<Ty>> = class
            .arguments
            .iter()
            .map(|argument| self.substitute_or_none(argument))
            .collect();
        if substituted.iter().all(Option::is_none) {
            return None;
        }
        let arguments = substituted
            .into_iter()
            .zip(&class.arguments)
            .map(|(new, old)| new.unwrap_or_else(|| old.clone()))
            .collect();
        Some(ClassType {
            class_id: class.class_id.clone(),
            arguments,
            nullable: class.nullable,
        })
    }
}

fn keep_nullability(replacement: &Ty, nullable: bool) -> Ty {
    if nullable {
        replacement.clone().nullable()
    } else {
        replacement.clone()
    }
}
