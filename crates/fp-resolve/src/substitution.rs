//! Two-stage substitution applied to every type the writer finalizes.

use fp_core::tree::TypeRef;
use fp_core::ty::Ty;

pub use fp_core::ty::Substitutor;

/// `global(candidate(T))`.
///
/// The candidate substitutor runs first and the global one second, each as
/// a single pass. A missing stage is the identity. The global stage is
/// applied even when the candidate stage changed nothing, so type variables
/// that only the solver knows about are still replaced.
#[derive(Debug, Clone, Copy)]
pub struct FinalizingSubstitution<'a> {
    candidate: Option<&'a Substitutor>,
    global: &'a Substitutor,
}

impl<'a> FinalizingSubstitution<'a> {
    pub fn new(candidate: &'a Substitutor, global: &'a Substitutor) -> Self {
        Self {
            candidate: Some(candidate),
            global,
        }
    }

    /// Nodes without a candidate of their own (blocks, lambdas).
    pub fn global_only(global: &'a Substitutor) -> Self {
        Self {
            candidate: None,
            global,
        }
    }

    pub fn substitute_or_none(&self, ty: &Ty) -> Option<Ty> {
        let after_candidate = self
            .candidate
            .and_then(|candidate| candidate.substitute_or_none(ty));
        let base = after_candidate.as_ref().unwrap_or(ty);
        match self.global.substitute_or_none(base) {
            Some(substituted) => {
                tracing::trace!("substituted {} -> {}", ty, substituted);
                Some(substituted)
            }
            None => after_candidate,
        }
    }

    pub fn substitute_or_self(&self, ty: &Ty) -> Ty {
        self.substitute_or_none(ty).unwrap_or_else(|| ty.clone())
    }

    pub fn substitute_type_ref(&self, type_ref: &TypeRef) -> TypeRef {
        type_ref.map_type(|ty| self.substitute_or_self(ty))
    }
}
