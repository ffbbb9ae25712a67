use fp_core::error::Result;
use fp_core::tree::{Expr, ExprId};
use itertools::Itertools;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnfinalizedReason {
    PendingCandidate,
    IntegerLiteralType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unfinalized {
    pub id: ExprId,
    pub reason: UnfinalizedReason,
}

impl Display for Unfinalized {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.reason {
            UnfinalizedReason::PendingCandidate => {
                write!(f, "expression {} still has a candidate", self.id)
            }
            UnfinalizedReason::IntegerLiteralType => {
                write!(f, "expression {} still has an integer literal type", self.id)
            }
        }
    }
}

/// Nodes a finalized tree must not contain: callee references that still
/// hold a candidate and types that still mention a literal type.
pub fn find_unfinalized(root: &Expr) -> Vec<Unfinalized> {
    let mut found = Vec::new();
    root.walk(&mut |expr| {
        if expr.callee().is_some_and(|callee| callee.has_candidate()) {
            found.push(Unfinalized {
                id: expr.id,
                reason: UnfinalizedReason::PendingCandidate,
            });
        }
        if expr.ty().is_some_and(|ty| ty.contains_integer_literal()) {
            found.push(Unfinalized {
                id: expr.id,
                reason: UnfinalizedReason::IntegerLiteralType,
            });
        }
    });
    found
}

/// Fails with every leftover listed if `root` is not fully finalized.
pub fn ensure_finalized(root: &Expr) -> Result<()> {
    let leftovers = find_unfinalized(root);
    if leftovers.is_empty() {
        return Ok(());
    }
    Err(format!(
        "tree {} is not finalized: {}",
        root.id,
        leftovers.iter().join("; ")
    )
    .into())
}
