//! Call-resolution finalization.
//!
//! Runs after overload resolution and constraint solving: every call-like
//! node still carrying its chosen candidate is rewritten to a resolved
//! reference with fully substituted types, and integer literal types are
//! folded and fixed to concrete numeric types.

pub mod approximation;
pub mod driver;
pub mod expected;
pub mod integer_ops;
pub mod options;
pub mod return_type;
pub mod session;
pub mod substitution;
pub mod verify;
pub mod writer;

pub use driver::{finalize_trees, FinalizedTree, PendingTree};
pub use expected::ExpectedArgumentType;
pub use options::FinalizeOptions;
pub use return_type::{
    CachingReturnTypeCalculator, ImplicitReturnTypeResolver, NoImplicitReturnTypes,
    ReturnTypeCalculator,
};
pub use session::Session;
pub use substitution::{FinalizingSubstitution, Substitutor};
pub use writer::{finalize_expression, CallCompletionResultsWriter, FinalizeOutcome};
