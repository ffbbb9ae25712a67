use fp_core::tree::ExprId;
use fp_core::ty::Ty;
use std::collections::HashMap;

/// What the surrounding context expects of the literals in a subtree.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedArgumentType {
    /// Per call argument, keyed by the unwrapped argument's id.
    ArgumentsMap(HashMap<ExprId, Ty>),
    /// One expectation for every literal below. `None` still approximates,
    /// to each literal's preferred type.
    ExpectedType(Option<Ty>),
    /// Literal types stay deferred (operands of integer operators).
    NoApproximation,
}

impl ExpectedArgumentType {
    pub fn none() -> Self {
        ExpectedArgumentType::ExpectedType(None)
    }

    pub fn of(ty: Ty) -> Self {
        ExpectedArgumentType::ExpectedType(Some(ty))
    }

    pub fn is_no_approximation(&self) -> bool {
        matches!(self, ExpectedArgumentType::NoApproximation)
    }

    pub fn expected_type_for(&self, id: ExprId) -> Option<Ty> {
        match self {
            ExpectedArgumentType::ArgumentsMap(map) => map.get(&id).cloned(),
            ExpectedArgumentType::ExpectedType(ty) => ty.clone(),
            ExpectedArgumentType::NoApproximation => None,
        }
    }

    /// Context for the result-producing children of the container `id`.
    pub fn narrow_to(&self, id: ExprId) -> Self {
        match self {
            ExpectedArgumentType::ArgumentsMap(map) => {
                ExpectedArgumentType::ExpectedType(map.get(&id).cloned())
            }
            other => other.clone(),
        }
    }

    /// Context for children whose value is not the node's value (statements,
    /// conditions, arguments of calls that are not being rewritten).
    pub fn for_statement(&self) -> Self {
        match self {
            ExpectedArgumentType::ArgumentsMap(_) => ExpectedArgumentType::none(),
            other => other.clone(),
        }
    }
}
