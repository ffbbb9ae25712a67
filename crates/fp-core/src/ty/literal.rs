use super::{ClassId, ClassType, Ty};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Type of an integer literal whose concrete numeric type is not fixed yet.
///
/// `possible_types` lists, in preference order, the integer types able to
/// hold `value`. Float and Double never appear here; they are only reachable
/// through an explicit expected type in [`IntegerLiteralType::approximate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntegerLiteralType {
    value: BigInt,
    possible_types: Vec<ClassType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FoldMode {
    CommonSuperType,
    IntersectionType,
}

impl IntegerLiteralType {
    /// Preference order is Int, Long, Byte, Short. Long is added without a
    /// range check. Unsigned types are not considered.
    pub fn from_value(value: impl Into<BigInt>) -> Self {
        let value = value.into();
        let mut possible_types = Vec::with_capacity(4);
        if value.to_i32().is_some() {
            possible_types.push(ClassType::int());
        }
        possible_types.push(ClassType::long());
        if value.to_i8().is_some() {
            possible_types.push(ClassType::byte());
        }
        if value.to_i16().is_some() {
            possible_types.push(ClassType::short());
        }
        Self {
            value,
            possible_types,
        }
    }

    fn with_possible_types(value: BigInt, possible_types: Vec<ClassType>) -> Self {
        Self {
            value,
            possible_types,
        }
    }

    pub fn value(&self) -> &BigInt {
        &self.value
    }

    pub fn possible_types(&self) -> &[ClassType] {
        &self.possible_types
    }

    pub fn can_be(&self, class: &ClassType) -> bool {
        self.possible_types.contains(class)
    }

    /// Picks the concrete type for this literal. Double and Float are taken
    /// as is; an expected type outside `possible_types` (or none) falls back
    /// to the first preferred type. Nullability of `expected` is ignored.
    pub fn approximate(&self, expected: Option<&Ty>) -> ClassType {
        let expected = expected
            .and_then(Ty::as_class)
            .map(|class| class.clone().with_nullability(false));
        match expected {
            Some(class) if class == ClassType::double() || class == ClassType::float() => class,
            Some(class) if self.can_be(&class) => class,
            _ => self
                .possible_types
                .first()
                .cloned()
                .unwrap_or_else(ClassType::long),
        }
    }

    pub fn supertypes(&self) -> Vec<Ty> {
        vec![
            Ty::class(ClassId::NUMBER),
            Ty::Class(
                ClassType::new(ClassId::COMPARABLE)
                    .with_arguments(vec![Ty::IntegerLiteral(self.clone())]),
            ),
        ]
    }

    /// Common supertype of literal types merged from different branches:
    /// two literals narrow to the intersection of their possible types, a
    /// literal and a concrete type give the concrete type when the literal
    /// can be it, anything else has no common type.
    pub fn find_common_super_type(types: &[Ty]) -> Option<Ty> {
        Self::fold_all(types, FoldMode::CommonSuperType)
    }

    /// Like [`Self::find_common_super_type`] but two literals widen to the
    /// union of their possible types.
    pub fn find_intersection_type(types: &[Ty]) -> Option<Ty> {
        Self::fold_all(types, FoldMode::IntersectionType)
    }

    fn fold_all(types: &[Ty], mode: FoldMode) -> Option<Ty> {
        let (first, rest) = types.split_first()?;
        rest.iter()
            .try_fold(first.clone(), |left, right| Self::fold(&left, right, mode))
    }

    fn fold(left: &Ty, right: &Ty, mode: FoldMode) -> Option<Ty> {
        match (left, right) {
            (Ty::IntegerLiteral(left), Ty::IntegerLiteral(right)) => {
                Self::fold_literals(left, right, mode).map(Ty::IntegerLiteral)
            }
            (Ty::IntegerLiteral(literal), other) | (other, Ty::IntegerLiteral(literal)) => {
                Self::fold_with_fixed(literal, other)
            }
            _ => None,
        }
    }

    fn fold_literals(
        left: &IntegerLiteralType,
        right: &IntegerLiteralType,
        mode: FoldMode,
    ) -> Option<IntegerLiteralType> {
        let possible_types: Vec<ClassType> = match mode {
            FoldMode::CommonSuperType => left
                .possible_types
                .iter()
                .filter(|ty| right.can_be(ty))
                .cloned()
                .collect(),
            FoldMode::IntersectionType => {
                let mut union = left.possible_types.clone();
                for ty in &right.possible_types {
                    if !union.contains(ty) {
                        union.push(ty.clone());
                    }
                }
                union
            }
        };
        // an empty set would leave the literal unresolvable
        if possible_types.is_empty() {
            return None;
        }
        Some(Self::with_possible_types(left.value.clone(), possible_types))
    }

    fn fold_with_fixed(literal: &IntegerLiteralType, fixed: &Ty) -> Option<Ty> {
        match fixed {
            Ty::Class(class) if literal.can_be(class) => Some(fixed.clone()),
            _ => None,
        }
    }
}

impl Display for IntegerLiteralType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ILT({})", self.value)
    }
}
