use super::{Expr, ExprId};
use crate::symbol::DeclId;
use crate::ty::{Substitutor, Ty};
use std::collections::BTreeMap;

/// Where a resolved receiver comes from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReceiverSlot {
    #[default]
    None,
    /// The explicit receiver written at the call site.
    Explicit,
    /// An implicit `this` supplied by resolution.
    Implicit(Box<Expr>),
}

impl ReceiverSlot {
    pub fn implicit(&self) -> Option<&Expr> {
        match self {
            ReceiverSlot::Implicit(expr) => Some(expr),
            ReceiverSlot::None | ReceiverSlot::Explicit => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ReceiverSlot::None)
    }
}

/// The declaration overload resolution chose for a call, together with the
/// solver's local view of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: DeclId,
    pub substitutor: Substitutor,
    /// Argument (after unwrapping named/spread wrappers) to the index of the
    /// value parameter it is passed to.
    pub argument_mapping: BTreeMap<ExprId, usize>,
    pub dispatch_receiver: ReceiverSlot,
    pub extension_receiver: ReceiverSlot,
}

impl Candidate {
    pub fn new(symbol: DeclId) -> Self {
        Self {
            symbol,
            substitutor: Substitutor::empty(),
            argument_mapping: BTreeMap::new(),
            dispatch_receiver: ReceiverSlot::None,
            extension_receiver: ReceiverSlot::None,
        }
    }

    pub fn with_substitutor(mut self, substitutor: Substitutor) -> Self {
        self.substitutor = substitutor;
        self
    }

    pub fn with_argument(mut self, argument: ExprId, parameter_index: usize) -> Self {
        self.argument_mapping.insert(argument, parameter_index);
        self
    }

    pub fn with_dispatch_receiver(mut self, receiver: ReceiverSlot) -> Self {
        self.dispatch_receiver = receiver;
        self
    }

    pub fn with_extension_receiver(mut self, receiver: ReceiverSlot) -> Self {
        self.extension_receiver = receiver;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalleeReference {
    /// Nothing to resolve (synthetic nodes already settled).
    Stub,
    WithCandidate {
        name: String,
        candidate: Box<Candidate>,
    },
    Resolved {
        name: String,
        symbol: DeclId,
    },
    ResolvedCallable {
        name: String,
        symbol: DeclId,
        inferred_type_arguments: Vec<Ty>,
    },
    Error {
        name: String,
        reason: String,
    },
}

impl CalleeReference {
    pub fn with_candidate(name: impl Into<String>, candidate: Candidate) -> Self {
        CalleeReference::WithCandidate {
            name: name.into(),
            candidate: Box::new(candidate),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CalleeReference::Stub => "<stub>",
            CalleeReference::WithCandidate { name, .. }
            | CalleeReference::Resolved { name, .. }
            | CalleeReference::ResolvedCallable { name, .. }
            | CalleeReference::Error { name, .. } => name,
        }
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            CalleeReference::WithCandidate { candidate, .. } => Some(candidate),
            _ => None,
        }
    }

    pub fn has_candidate(&self) -> bool {
        self.candidate().is_some()
    }

    /// The resolved declaration, if the reference is already rewritten.
    pub fn resolved_symbol(&self) -> Option<DeclId> {
        match self {
            CalleeReference::Resolved { symbol, .. }
            | CalleeReference::ResolvedCallable { symbol, .. } => Some(*symbol),
            _ => None,
        }
    }

    /// Moves the candidate out, leaving a stub behind. Returns `None` and
    /// leaves the reference untouched if there is no candidate.
    pub fn take_candidate(&mut self) -> Option<(String, Candidate)> {
        match std::mem::replace(self, CalleeReference::Stub) {
            CalleeReference::WithCandidate { name, candidate } => Some((name, *candidate)),
            other => {
                *self = other;
                None
            }
        }
    }
}
