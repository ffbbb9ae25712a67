use super::{
    AnonymousFunction, Block, CallableReference, CalleeReference, Const, ConstKind, ConstValue,
    Expr, ExprId, ExprKind, FunctionCall, QualifiedAccess, Return, Try, TypeRef,
    VariableAssignment, When, WhenBranch, WrapKind, WrappedArgument,
};
use crate::span::Span;
use crate::symbol::ValueParameter;
use crate::ty::{IntegerLiteralType, Ty};
use num_bigint::BigInt;

/// Hands out fresh [`ExprId`]s while assembling a tree.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    next_id: u32,
    span: Span,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Span attached to subsequently built nodes.
    pub fn at(&mut self, span: Span) -> &mut Self {
        self.span = span;
        self
    }

    pub fn fresh_id(&mut self) -> ExprId {
        let id = ExprId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn expr(&mut self, kind: ExprKind, type_ref: TypeRef) -> Expr {
        Expr {
            id: self.fresh_id(),
            span: self.span,
            type_ref,
            kind,
        }
    }

    pub fn integer(&mut self, value: impl Into<BigInt>) -> Expr {
        let literal = IntegerLiteralType::from_value(value);
        let value = ConstValue::Integer(literal.value().clone());
        self.expr(
            ExprKind::Const(Const {
                kind: ConstKind::IntegerLiteral,
                value,
            }),
            TypeRef::Resolved(Ty::IntegerLiteral(literal)),
        )
    }

    pub fn string(&mut self, value: impl Into<String>) -> Expr {
        self.expr(
            ExprKind::Const(Const {
                kind: ConstKind::String,
                value: ConstValue::String(value.into()),
            }),
            TypeRef::Resolved(Ty::string()),
        )
    }

    pub fn boolean(&mut self, value: bool) -> Expr {
        self.expr(
            ExprKind::Const(Const {
                kind: ConstKind::Boolean,
                value: ConstValue::Boolean(value),
            }),
            TypeRef::Resolved(Ty::boolean()),
        )
    }

    pub fn this_receiver(&mut self, ty: Ty) -> Expr {
        self.expr(ExprKind::ThisReceiver, TypeRef::Resolved(ty))
    }

    pub fn access(&mut self, access: QualifiedAccess) -> Expr {
        self.expr(ExprKind::QualifiedAccess(access), TypeRef::Implicit)
    }

    pub fn call(&mut self, call: FunctionCall) -> Expr {
        self.expr(ExprKind::FunctionCall(call), TypeRef::Implicit)
    }

    pub fn callable_reference(
        &mut self,
        callee: CalleeReference,
        explicit_receiver: Option<Expr>,
        ty: Ty,
    ) -> Expr {
        self.expr(
            ExprKind::CallableReference(CallableReference {
                callee,
                explicit_receiver: explicit_receiver.map(Box::new),
            }),
            TypeRef::Resolved(ty),
        )
    }

    pub fn assignment(&mut self, callee: CalleeReference, rvalue: Expr) -> Expr {
        self.expr(
            ExprKind::VariableAssignment(VariableAssignment {
                callee,
                rvalue: Box::new(rvalue),
            }),
            TypeRef::Resolved(Ty::unit()),
        )
    }

    pub fn anonymous_function(
        &mut self,
        receiver_type: Option<Ty>,
        value_parameters: Vec<ValueParameter>,
        return_type: Ty,
        body: Expr,
    ) -> Expr {
        self.expr(
            ExprKind::AnonymousFunction(AnonymousFunction {
                receiver_type,
                value_parameters,
                return_type: TypeRef::Resolved(return_type),
                body: Box::new(body),
            }),
            TypeRef::Implicit,
        )
    }

    /// Block typed by its trailing statement.
    pub fn block(&mut self, statements: Vec<Expr>) -> Expr {
        let type_ref = statements
            .last()
            .map(|last| last.type_ref.clone())
            .unwrap_or_else(|| TypeRef::Resolved(Ty::unit()));
        self.expr(ExprKind::Block(Block { statements }), type_ref)
    }

    pub fn when(
        &mut self,
        subject: Option<Expr>,
        branches: Vec<(Expr, Expr)>,
        callee: CalleeReference,
        ty: Ty,
    ) -> Expr {
        let branches = branches
            .into_iter()
            .map(|(condition, result)| WhenBranch { condition, result })
            .collect();
        self.expr(
            ExprKind::When(When {
                subject: subject.map(Box::new),
                branches,
                callee,
            }),
            TypeRef::Resolved(ty),
        )
    }

    pub fn try_expr(
        &mut self,
        try_block: Expr,
        catches: Vec<Expr>,
        finally_block: Option<Expr>,
        callee: CalleeReference,
        ty: Ty,
    ) -> Expr {
        self.expr(
            ExprKind::Try(Try {
                try_block: Box::new(try_block),
                catches,
                finally_block: finally_block.map(Box::new),
                callee,
            }),
            TypeRef::Resolved(ty),
        )
    }

    pub fn named(&mut self, name: impl Into<String>, expr: Expr) -> Expr {
        self.wrap(WrapKind::Named(name.into()), expr)
    }

    pub fn spread(&mut self, expr: Expr) -> Expr {
        self.wrap(WrapKind::Spread, expr)
    }

    fn wrap(&mut self, wrap: WrapKind, expr: Expr) -> Expr {
        let type_ref = expr.type_ref.clone();
        self.expr(
            ExprKind::WrappedArgument(WrappedArgument {
                wrap,
                expr: Box::new(expr),
            }),
            type_ref,
        )
    }

    pub fn ret(&mut self, result: Expr) -> Expr {
        self.expr(
            ExprKind::Return(Return {
                result: Box::new(result),
            }),
            TypeRef::Resolved(Ty::nothing()),
        )
    }
}
