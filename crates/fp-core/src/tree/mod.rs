//! Resolved expression tree handed over by the constraint solver.
//!
//! Pending call-like nodes hold a [`CalleeReference::WithCandidate`];
//! finalization rewrites them in place. Node identity is the [`ExprId`],
//! which survives rewrites (a folded call keeps the id of the call).

mod builder;
mod constant;
mod reference;

pub use builder::TreeBuilder;
pub use constant::{ConstKind, ConstValue};
pub use reference::{CalleeReference, Candidate, ReceiverSlot};

use crate::span::Span;
use crate::symbol::ValueParameter;
use crate::ty::{ErrorType, Ty};
use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
pub struct ExprId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    /// Not computed yet.
    Implicit,
    Resolved(Ty),
    Error(ErrorType),
}

impl TypeRef {
    pub fn error(reason: impl Into<String>) -> Self {
        TypeRef::Error(ErrorType::new(reason))
    }

    pub fn ty(&self) -> Option<&Ty> {
        match self {
            TypeRef::Resolved(ty) => Some(ty),
            TypeRef::Implicit | TypeRef::Error(_) => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TypeRef::Error(_))
    }

    /// Applies `f` to a resolved type; implicit and error refs are kept.
    pub fn map_type(&self, f: impl FnOnce(&Ty) -> Ty) -> TypeRef {
        match self {
            TypeRef::Resolved(ty) => TypeRef::from(f(ty)),
            other => other.clone(),
        }
    }
}

impl From<Ty> for TypeRef {
    fn from(ty: Ty) -> Self {
        match ty {
            Ty::Error(err) => TypeRef::Error(err),
            ty => TypeRef::Resolved(ty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variance {
    Invariant,
    In,
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeProjection {
    Star { span: Span },
    Typed {
        type_ref: TypeRef,
        variance: Variance,
        span: Span,
    },
}

impl TypeProjection {
    pub fn invariant(ty: Ty) -> Self {
        TypeProjection::Typed {
            type_ref: TypeRef::from(ty),
            variance: Variance::Invariant,
            span: Span::null(),
        }
    }

    pub fn ty(&self) -> Option<&Ty> {
        match self {
            TypeProjection::Star { .. } => None,
            TypeProjection::Typed { type_ref, .. } => type_ref.ty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: ExprId,
    pub span: Span,
    pub type_ref: TypeRef,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    QualifiedAccess(QualifiedAccess),
    CallableReference(CallableReference),
    VariableAssignment(VariableAssignment),
    FunctionCall(FunctionCall),
    AnonymousFunction(AnonymousFunction),
    Block(Block),
    When(When),
    Try(Try),
    Const(Const),
    WrappedArgument(WrappedArgument),
    Return(Return),
    ThisReceiver,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedAccess {
    pub callee: CalleeReference,
    pub explicit_receiver: Option<Box<Expr>>,
    pub dispatch_receiver: ReceiverSlot,
    pub extension_receiver: ReceiverSlot,
    pub type_arguments: Vec<TypeProjection>,
    /// `a?.b`
    pub safe: bool,
}

impl QualifiedAccess {
    pub fn new(callee: CalleeReference) -> Self {
        Self {
            callee,
            explicit_receiver: None,
            dispatch_receiver: ReceiverSlot::None,
            extension_receiver: ReceiverSlot::None,
            type_arguments: Vec::new(),
            safe: false,
        }
    }

    pub fn with_receiver(mut self, receiver: Expr) -> Self {
        self.explicit_receiver = Some(Box::new(receiver));
        self
    }

    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callee: CalleeReference,
    pub explicit_receiver: Option<Box<Expr>>,
    pub dispatch_receiver: ReceiverSlot,
    pub extension_receiver: ReceiverSlot,
    pub type_arguments: Vec<TypeProjection>,
    pub arguments: Vec<Expr>,
    pub safe: bool,
}

impl FunctionCall {
    pub fn new(callee: CalleeReference) -> Self {
        Self {
            callee,
            explicit_receiver: None,
            dispatch_receiver: ReceiverSlot::None,
            extension_receiver: ReceiverSlot::None,
            type_arguments: Vec::new(),
            arguments: Vec::new(),
            safe: false,
        }
    }

    pub fn with_receiver(mut self, receiver: Expr) -> Self {
        self.explicit_receiver = Some(Box::new(receiver));
        self
    }

    pub fn with_argument(mut self, argument: Expr) -> Self {
        self.arguments.push(argument);
        self
    }

    pub fn with_type_argument(mut self, projection: TypeProjection) -> Self {
        self.type_arguments.push(projection);
        self
    }

    pub fn safe(mut self) -> Self {
        self.safe = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallableReference {
    pub callee: CalleeReference,
    pub explicit_receiver: Option<Box<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableAssignment {
    pub callee: CalleeReference,
    pub rvalue: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnonymousFunction {
    pub receiver_type: Option<Ty>,
    pub value_parameters: Vec<ValueParameter>,
    pub return_type: TypeRef,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhenBranch {
    pub condition: Expr,
    pub result: Expr,
}

/// `when`; the branch types are unified through a synthetic call whose
/// candidate is still pending until finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct When {
    pub subject: Option<Box<Expr>>,
    pub branches: Vec<WhenBranch>,
    pub callee: CalleeReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Try {
    pub try_block: Box<Expr>,
    pub catches: Vec<Expr>,
    pub finally_block: Option<Box<Expr>>,
    pub callee: CalleeReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Const {
    pub kind: ConstKind,
    pub value: ConstValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WrapKind {
    Named(String),
    Spread,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrappedArgument {
    pub wrap: WrapKind,
    pub expr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub result: Box<Expr>,
}

impl Expr {
    pub fn ty(&self) -> Option<&Ty> {
        self.type_ref.ty()
    }

    /// The argument behind named/spread wrappers.
    pub fn unwrap_argument(&self) -> &Expr {
        match &self.kind {
            ExprKind::WrappedArgument(wrapped) => wrapped.expr.unwrap_argument(),
            _ => self,
        }
    }

    /// `*xs`, possibly behind a name: `name = *xs`.
    pub fn is_spread_argument(&self) -> bool {
        match &self.kind {
            ExprKind::WrappedArgument(WrappedArgument {
                wrap: WrapKind::Spread,
                ..
            }) => true,
            ExprKind::WrappedArgument(wrapped) => wrapped.expr.is_spread_argument(),
            _ => false,
        }
    }

    pub fn callee(&self) -> Option<&CalleeReference> {
        match &self.kind {
            ExprKind::QualifiedAccess(access) => Some(&access.callee),
            ExprKind::CallableReference(reference) => Some(&reference.callee),
            ExprKind::VariableAssignment(assignment) => Some(&assignment.callee),
            ExprKind::FunctionCall(call) => Some(&call.callee),
            ExprKind::When(when) => Some(&when.callee),
            ExprKind::Try(try_expr) => Some(&try_expr.callee),
            ExprKind::AnonymousFunction(_)
            | ExprKind::Block(_)
            | ExprKind::Const(_)
            | ExprKind::WrappedArgument(_)
            | ExprKind::Return(_)
            | ExprKind::ThisReceiver => None,
        }
    }

    /// Direct children in evaluation order, including implicit receivers
    /// stored in receiver slots.
    pub fn children(&self) -> Vec<&Expr> {
        let mut children = Vec::new();
        match &self.kind {
            ExprKind::QualifiedAccess(access) => {
                children.extend(access.explicit_receiver.as_deref());
                children.extend(access.dispatch_receiver.implicit());
                children.extend(access.extension_receiver.implicit());
            }
            ExprKind::CallableReference(reference) => {
                children.extend(reference.explicit_receiver.as_deref());
            }
            ExprKind::VariableAssignment(assignment) => children.push(&*assignment.rvalue),
            ExprKind::FunctionCall(call) => {
                children.extend(call.explicit_receiver.as_deref());
                children.extend(call.dispatch_receiver.implicit());
                children.extend(call.extension_receiver.implicit());
                children.extend(call.arguments.iter());
            }
            ExprKind::AnonymousFunction(function) => children.push(&*function.body),
            ExprKind::Block(block) => children.extend(block.statements.iter()),
            ExprKind::When(when) => {
                children.extend(when.subject.as_deref());
                for branch in &when.branches {
                    children.push(&branch.condition);
                    children.push(&branch.result);
                }
            }
            ExprKind::Try(try_expr) => {
                children.push(&*try_expr.try_block);
                children.extend(try_expr.catches.iter());
                children.extend(try_expr.finally_block.as_deref());
            }
            ExprKind::WrappedArgument(wrapped) => children.push(&*wrapped.expr),
            ExprKind::Return(ret) => children.push(&*ret.result),
            ExprKind::Const(_) | ExprKind::ThisReceiver => {}
        }
        children
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        for child in self.children() {
            child.walk(f);
        }
    }
}
