//! Return types of callee declarations, memoized per session.

use fp_core::collections::ConcurrentMap;
use fp_core::symbol::{DeclId, Declaration, ReturnTypeRef};
use fp_core::tree::TypeRef;
use fp_core::ty::Ty;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

pub trait ReturnTypeCalculator: Send + Sync {
    /// Declared or inferred return type of `declaration`. Declarations that
    /// have no return type at all produce an error type ref.
    fn try_calculate_return_type(&self, declaration: &Declaration) -> TypeRef;
}

/// Computes the return type of a declaration whose return type is inferred
/// from its body. Body resolution itself lives outside this crate.
pub trait ImplicitReturnTypeResolver: Send + Sync {
    fn resolve_implicit_return_type(&self, declaration: &Declaration) -> Ty;
}

impl<F> ImplicitReturnTypeResolver for F
where
    F: Fn(&Declaration) -> Ty + Send + Sync,
{
    fn resolve_implicit_return_type(&self, declaration: &Declaration) -> Ty {
        self(declaration)
    }
}

/// Resolver used when no body resolution is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImplicitReturnTypes;

impl ImplicitReturnTypeResolver for NoImplicitReturnTypes {
    fn resolve_implicit_return_type(&self, declaration: &Declaration) -> Ty {
        Ty::error(format!("Cannot infer return type of {}", declaration))
    }
}

/// Single-flight cache in front of an [`ImplicitReturnTypeResolver`].
///
/// The per-declaration cell is created atomically in the concurrent map and
/// filled through [`OnceLock::get_or_init`], so concurrent callers for the
/// same declaration block on one computation and never see a partial value.
/// A resolver that asks for the same declaration while computing it would
/// deadlock; that kind of recursion has to be broken by the resolver.
pub struct CachingReturnTypeCalculator {
    resolver: Box<dyn ImplicitReturnTypeResolver>,
    cache: ConcurrentMap<DeclId, Arc<OnceLock<TypeRef>>>,
    computed: AtomicUsize,
}

impl CachingReturnTypeCalculator {
    pub fn new(resolver: impl ImplicitReturnTypeResolver + 'static) -> Self {
        Self {
            resolver: Box::new(resolver),
            cache: ConcurrentMap::new(),
            computed: AtomicUsize::new(0),
        }
    }

    /// How many declarations had their return type computed so far.
    pub fn computed_count(&self) -> usize {
        self.computed.load(Ordering::SeqCst)
    }

    pub fn is_cached(&self, id: DeclId) -> bool {
        self.cache
            .get_cloned(&id)
            .is_some_and(|cell| cell.get().is_some())
    }

    fn compute(&self, declaration: &Declaration) -> TypeRef {
        self.computed.fetch_add(1, Ordering::SeqCst);
        let type_ref = match &declaration.return_type {
            Some(ReturnTypeRef::Explicit(ty)) => TypeRef::from(ty.clone()),
            Some(ReturnTypeRef::Implicit) => {
                TypeRef::from(self.resolver.resolve_implicit_return_type(declaration))
            }
            None => TypeRef::error(format!(
                "Callee reference to candidate without return type: {}",
                declaration
            )),
        };
        tracing::debug!("return type of {} is {:?}", declaration.name, type_ref);
        type_ref
    }
}

impl Default for CachingReturnTypeCalculator {
    fn default() -> Self {
        Self::new(NoImplicitReturnTypes)
    }
}

impl ReturnTypeCalculator for CachingReturnTypeCalculator {
    fn try_calculate_return_type(&self, declaration: &Declaration) -> TypeRef {
        let cell = self
            .cache
            .get_or_insert_with(declaration.id, || Arc::new(OnceLock::new()));
        cell.get_or_init(|| self.compute(declaration)).clone()
    }
}
