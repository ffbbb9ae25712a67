//! Constant folding of the operators integer literal types provide.
//!
//! `1 + 2` resolves to the `plus` of the literal scope; here it becomes the
//! constant `3` with a fresh literal type, so the usual literal
//! approximation decides its numeric type afterwards. Arithmetic is exact.

use crate::approximation::IntegerLiteralTypeApproximator;
use crate::expected::ExpectedArgumentType;
use crate::return_type::ReturnTypeCalculator;
use crate::writer::CallCompletionResultsWriter;
use fp_core::diagnostics::Diagnostic;
use fp_core::error::Result;
use fp_core::internal_bail;
use fp_core::span::Span;
use fp_core::symbol::{Declaration, IntegerOperatorKind};
use fp_core::tree::{Const, ConstKind, ConstValue, Expr, ExprId, ExprKind, FunctionCall, TypeRef};
use fp_core::ty::{IntegerLiteralType, Ty};
use num_bigint::BigInt;
use num_traits::Zero;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoldResult {
    Folded(BigInt),
    /// `div`/`rem` by a literal zero; nothing is computed.
    DivisionByZero,
}

/// `+v` and `-v`. No range check: `-(-2147483648)` stays exact and only
/// approximation decides it does not fit in Int.
pub fn fold_unary(kind: IntegerOperatorKind, value: &BigInt) -> BigInt {
    match kind {
        IntegerOperatorKind::UnaryMinus => -value,
        _ => value.clone(),
    }
}

/// Quotient and remainder truncate toward zero.
pub fn fold_binary(kind: IntegerOperatorKind, lhs: &BigInt, rhs: &BigInt) -> FoldResult {
    match kind {
        IntegerOperatorKind::Plus => FoldResult::Folded(lhs + rhs),
        IntegerOperatorKind::Minus => FoldResult::Folded(lhs - rhs),
        IntegerOperatorKind::Times => FoldResult::Folded(lhs * rhs),
        IntegerOperatorKind::Div | IntegerOperatorKind::Rem if rhs.is_zero() => {
            FoldResult::DivisionByZero
        }
        IntegerOperatorKind::Div => FoldResult::Folded(lhs / rhs),
        IntegerOperatorKind::Rem => FoldResult::Folded(lhs % rhs),
        IntegerOperatorKind::UnaryPlus | IntegerOperatorKind::UnaryMinus => {
            FoldResult::Folded(fold_unary(kind, lhs))
        }
    }
}

fn is_constant(expr: &Expr) -> bool {
    matches!(expr.unwrap_argument().kind, ExprKind::Const(_))
}

fn literal_type_of(expr: &Expr) -> Option<IntegerLiteralType> {
    expr.unwrap_argument()
        .ty()
        .and_then(Ty::as_integer_literal)
        .cloned()
}

impl<'a> CallCompletionResultsWriter<'a> {
    /// Calls of an integer literal operator. Operands are finalized without
    /// approximation first. Constant operands fold into a replacement node;
    /// otherwise the literal operand is fixed and the call is resolved to the
    /// matching member of the numeric class.
    pub(crate) fn update_integer_operator_call(
        &mut self,
        id: ExprId,
        span: Span,
        type_ref: &mut TypeRef,
        call: &mut FunctionCall,
        kind: IntegerOperatorKind,
    ) -> Result<Option<Expr>> {
        let Some((name, _)) = call.callee.take_candidate() else {
            return Ok(None);
        };
        let operands = ExpectedArgumentType::NoApproximation;
        let Some(receiver) = call.explicit_receiver.as_deref_mut() else {
            internal_bail!("integer operator {} called without a receiver", name);
        };
        self.finalize(receiver, &operands)?;
        for argument in &mut call.arguments {
            self.finalize(argument, &operands)?;
        }

        // A literal type on something that is not a literal (a `when` over
        // literals) is approximated here and the call resolves to a numeric
        // member. Its merged value is only the first branch's, so it must
        // never be folded.
        if literal_type_of(receiver).is_some() && !is_constant(receiver) {
            self.finalize(receiver, &ExpectedArgumentType::none())?;
        }
        let Some(receiver_literal) = literal_type_of(receiver) else {
            return self.resolve_numeric_operator(type_ref, call, name, kind);
        };

        if kind.is_unary() {
            let value = fold_unary(kind, receiver_literal.value());
            return Ok(Some(self.folded_constant(id, span, value)));
        }

        let Some(argument) = call.arguments.first_mut() else {
            internal_bail!("binary integer operator {} without an argument", name);
        };
        if literal_type_of(argument).is_some() && !is_constant(argument) {
            self.finalize(argument, &ExpectedArgumentType::none())?;
        }
        match literal_type_of(argument) {
            Some(argument_literal) => {
                let folded =
                    fold_binary(kind, receiver_literal.value(), argument_literal.value());
                let value = match folded {
                    FoldResult::Folded(value) => value,
                    FoldResult::DivisionByZero => {
                        self.report_division_by_zero(span, kind, receiver_literal.value());
                        receiver_literal.value().clone()
                    }
                };
                Ok(Some(self.folded_constant(id, span, value)))
            }
            None => {
                let argument_type = argument.unwrap_argument().ty().cloned();
                // literals nested in a concretely typed operand are still deferred
                self.finalize(
                    argument,
                    &ExpectedArgumentType::ExpectedType(argument_type.clone()),
                )?;
                let fixed = argument_type
                    .as_ref()
                    .map(IntegerLiteralTypeApproximator::expected_type_for_fixed_argument)
                    .unwrap_or_else(Ty::int);
                self.finalize(receiver, &ExpectedArgumentType::of(fixed.clone()))?;
                let member =
                    self.operator_member(receiver, &name, kind, argument_type.as_ref())?;
                *type_ref = TypeRef::Resolved(fixed);
                self.resolve(&mut call.callee, name, member);
                Ok(None)
            }
        }
    }

    /// Receiver already has a numeric class type: plain member call.
    fn resolve_numeric_operator(
        &mut self,
        type_ref: &mut TypeRef,
        call: &mut FunctionCall,
        name: String,
        kind: IntegerOperatorKind,
    ) -> Result<Option<Expr>> {
        let Some(receiver) = call.explicit_receiver.as_deref_mut() else {
            internal_bail!("integer operator {} called without a receiver", name);
        };
        let receiver_type = receiver.ty().cloned();
        // operands were visited without approximation; settle what they hold
        self.finalize(
            receiver,
            &ExpectedArgumentType::ExpectedType(receiver_type.clone()),
        )?;
        let argument_type = match call.arguments.first_mut() {
            Some(argument) => {
                let expected = if literal_type_of(argument).is_some() {
                    receiver_type.clone()
                } else {
                    argument.unwrap_argument().ty().cloned()
                };
                self.finalize(argument, &ExpectedArgumentType::ExpectedType(expected))?;
                argument.unwrap_argument().ty().cloned()
            }
            None => None,
        };
        let Some(receiver) = call.explicit_receiver.as_deref() else {
            internal_bail!("integer operator {} called without a receiver", name);
        };
        let member = self.operator_member(receiver, &name, kind, argument_type.as_ref())?;
        let session = self.session;
        *type_ref = session.return_types().try_calculate_return_type(member);
        self.resolve(&mut call.callee, name, member);
        Ok(None)
    }

    fn operator_member(
        &self,
        receiver: &Expr,
        name: &str,
        kind: IntegerOperatorKind,
        argument: Option<&Ty>,
    ) -> Result<&'a Declaration> {
        let Some(receiver_class) = receiver.ty().and_then(Ty::as_class) else {
            internal_bail!(
                "receiver of integer operator {} has no class type: {:?}",
                name,
                receiver.type_ref
            );
        };
        let argument = if kind.is_unary() { None } else { argument };
        IntegerLiteralTypeApproximator::new(self.session).find_operator_member(
            receiver_class,
            kind.operator_name(),
            argument,
        )
    }

    fn folded_constant(&mut self, id: ExprId, span: Span, value: BigInt) -> Expr {
        tracing::debug!("folded integer operator call {} to {}", id, value);
        self.outcome.folded_constants += 1;
        let literal = IntegerLiteralType::from_value(value.clone());
        Expr {
            id,
            span,
            type_ref: TypeRef::Resolved(Ty::IntegerLiteral(literal)),
            kind: ExprKind::Const(Const {
                kind: ConstKind::IntegerLiteral,
                value: ConstValue::Integer(value),
            }),
        }
    }

    fn report_division_by_zero(
        &mut self,
        span: Span,
        kind: IntegerOperatorKind,
        receiver: &BigInt,
    ) {
        tracing::warn!(
            "{} by zero in a constant expression at {}; keeping {}",
            kind.operator_name(),
            span,
            receiver
        );
        if self.session.options().report_division_by_zero {
            self.outcome.diagnostics.push(
                Diagnostic::warning(format!(
                    "division by zero in a constant expression, the result is {}",
                    receiver
                ))
                .with_span(span)
                .with_code("const-division-by-zero"),
            );
        }
    }
}
