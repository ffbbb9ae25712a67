//! Writes the results of call completion back into the tree.
//!
//! Every call-like node that still holds a candidate gets its final type
//! (`global(candidate(T))`), its resolved callee reference and finalized
//! children. Deferred integer literal types are settled from the expected
//! type the parent passes down, except below integer operator calls where
//! they are folded first.

use crate::expected::ExpectedArgumentType;
use crate::return_type::ReturnTypeCalculator;
use crate::session::Session;
use crate::substitution::{FinalizingSubstitution, Substitutor};
use fp_core::diagnostics::Diagnostic;
use fp_core::error::Result;
use fp_core::internal_bail;
use fp_core::symbol::Declaration;
use fp_core::span::Span;
use fp_core::tree::{
    AnonymousFunction, Block, CallableReference, CalleeReference, Candidate, Const, ConstKind,
    ConstValue, Expr, ExprId, ExprKind, FunctionCall, QualifiedAccess, ReceiverSlot, Try,
    TypeProjection, TypeRef, VariableAssignment, Variance, When,
};
use fp_core::ty::{ClassType, Ty};
use num_traits::ToPrimitive;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalizeOutcome {
    pub diagnostics: Vec<Diagnostic>,
    /// Integer operator calls replaced by a constant.
    pub folded_constants: usize,
    /// Callee references rewritten from candidate to resolved form.
    pub resolved_references: usize,
}

impl FinalizeOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Finalizes one tree against its global substitutor.
pub fn finalize_expression(
    session: &Session,
    global: &Substitutor,
    expr: &mut Expr,
) -> Result<FinalizeOutcome> {
    let mut writer = CallCompletionResultsWriter::new(session, global);
    writer.finalize(expr, &ExpectedArgumentType::none())?;
    let outcome = writer.into_outcome();
    tracing::debug!(
        "finalized tree {}: {} references resolved, {} constants folded",
        expr.id,
        outcome.resolved_references,
        outcome.folded_constants
    );
    Ok(outcome)
}

pub struct CallCompletionResultsWriter<'a> {
    pub(crate) session: &'a Session,
    pub(crate) global: &'a Substitutor,
    pub(crate) outcome: FinalizeOutcome,
}

impl<'a> CallCompletionResultsWriter<'a> {
    pub fn new(session: &'a Session, global: &'a Substitutor) -> Self {
        Self {
            session,
            global,
            outcome: FinalizeOutcome::default(),
        }
    }

    pub fn into_outcome(self) -> FinalizeOutcome {
        self.outcome
    }

    pub fn finalize(&mut self, expr: &mut Expr, expected: &ExpectedArgumentType) -> Result<()> {
        let mut replacement = None;
        let Expr {
            id,
            span,
            type_ref,
            kind,
        } = &mut *expr;
        let (id, span) = (*id, *span);
        match kind {
            ExprKind::QualifiedAccess(access) => {
                self.visit_qualified_access(type_ref, access, expected)?
            }
            ExprKind::CallableReference(reference) => {
                self.visit_callable_reference(type_ref, reference, expected)?
            }
            ExprKind::VariableAssignment(assignment) => {
                self.visit_variable_assignment(assignment, expected)?
            }
            ExprKind::FunctionCall(call) => {
                replacement = self.visit_function_call(id, span, type_ref, call, expected)?
            }
            ExprKind::AnonymousFunction(function) => {
                self.visit_anonymous_function(id, type_ref, function, expected)?
            }
            ExprKind::Block(block) => self.visit_block(id, type_ref, block, expected)?,
            ExprKind::When(when) => self.visit_when(id, type_ref, when, expected)?,
            ExprKind::Try(try_expr) => self.visit_try(id, type_ref, try_expr, expected)?,
            ExprKind::Const(constant) => self.visit_const(id, type_ref, constant, expected)?,
            ExprKind::WrappedArgument(wrapped) => {
                self.finalize(&mut wrapped.expr, expected)?;
                *type_ref = wrapped.expr.type_ref.clone();
            }
            ExprKind::Return(ret) => self.finalize(&mut ret.result, expected)?,
            ExprKind::ThisReceiver => {}
        }
        if let Some(folded) = replacement {
            *expr = folded;
            // the constant picks up the expectation the call had
            self.finalize(expr, expected)?;
        }
        Ok(())
    }

    fn visit_qualified_access(
        &mut self,
        type_ref: &mut TypeRef,
        access: &mut QualifiedAccess,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        let Some((name, candidate)) = access.callee.take_candidate() else {
            if let Some(receiver) = access.explicit_receiver.as_deref_mut() {
                self.finalize(receiver, &expected.for_statement())?;
            }
            return Ok(());
        };
        let session = self.session;
        let declaration = session.declaration(candidate.symbol)?;
        let substitution = FinalizingSubstitution::new(&candidate.substitutor, self.global);

        if let Some(receiver) = access.explicit_receiver.as_deref_mut() {
            self.finalize(receiver, &receiver_expectation(declaration, &substitution))?;
        }
        let result = self.finalized_return_type(declaration, &substitution);
        *type_ref = nullable_if_safe(result, access.safe);
        access.type_arguments =
            finalized_type_arguments(declaration, &substitution, &access.type_arguments);

        let Candidate {
            dispatch_receiver,
            extension_receiver,
            ..
        } = candidate;
        access.dispatch_receiver = self.finalize_receiver_slot(dispatch_receiver)?;
        access.extension_receiver = self.finalize_receiver_slot(extension_receiver)?;
        self.resolve(&mut access.callee, name, declaration);
        Ok(())
    }

    fn visit_callable_reference(
        &mut self,
        type_ref: &mut TypeRef,
        reference: &mut CallableReference,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        let Some((name, candidate)) = reference.callee.take_candidate() else {
            if let Some(receiver) = reference.explicit_receiver.as_deref_mut() {
                self.finalize(receiver, &expected.for_statement())?;
            }
            return Ok(());
        };
        let session = self.session;
        let declaration = session.declaration(candidate.symbol)?;
        let substitution = FinalizingSubstitution::new(&candidate.substitutor, self.global);

        if let Some(receiver) = reference.explicit_receiver.as_deref_mut() {
            self.finalize(receiver, &receiver_expectation(declaration, &substitution))?;
        }
        *type_ref = substitution.substitute_type_ref(type_ref);
        let inferred_type_arguments = declaration
            .type_parameters
            .iter()
            .map(|parameter| substitution.substitute_or_self(&parameter.self_type()))
            .collect();
        tracing::debug!("resolved callable reference ::{}", name);
        reference.callee = CalleeReference::ResolvedCallable {
            name,
            symbol: declaration.id,
            inferred_type_arguments,
        };
        self.outcome.resolved_references += 1;
        Ok(())
    }

    fn visit_variable_assignment(
        &mut self,
        assignment: &mut VariableAssignment,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        let rvalue_expectation = match assignment.callee.take_candidate() {
            Some((name, candidate)) => {
                let session = self.session;
                let declaration = session.declaration(candidate.symbol)?;
                let substitution =
                    FinalizingSubstitution::new(&candidate.substitutor, self.global);
                let variable_type = self
                    .finalized_return_type(declaration, &substitution)
                    .ty()
                    .cloned();
                self.resolve(&mut assignment.callee, name, declaration);
                ExpectedArgumentType::ExpectedType(variable_type)
            }
            None => expected.for_statement(),
        };
        self.finalize(&mut assignment.rvalue, &rvalue_expectation)
    }

    fn visit_function_call(
        &mut self,
        id: ExprId,
        span: Span,
        type_ref: &mut TypeRef,
        call: &mut FunctionCall,
        expected: &ExpectedArgumentType,
    ) -> Result<Option<Expr>> {
        let session = self.session;
        let Some(symbol) = call.callee.candidate().map(|candidate| candidate.symbol) else {
            let statement = expected.for_statement();
            if let Some(receiver) = call.explicit_receiver.as_deref_mut() {
                self.finalize(receiver, &statement)?;
            }
            for argument in &mut call.arguments {
                self.finalize(argument, &statement)?;
            }
            return Ok(None);
        };
        let declaration = session.declaration(symbol)?;
        if let Some(kind) = declaration.integer_operator() {
            return self.update_integer_operator_call(id, span, type_ref, call, kind);
        }
        let Some((name, candidate)) = call.callee.take_candidate() else {
            return Ok(None);
        };
        let substitution = FinalizingSubstitution::new(&candidate.substitutor, self.global);

        if let Some(receiver) = call.explicit_receiver.as_deref_mut() {
            self.finalize(receiver, &receiver_expectation(declaration, &substitution))?;
        }
        call.type_arguments =
            finalized_type_arguments(declaration, &substitution, &call.type_arguments);
        let result = self.finalized_return_type(declaration, &substitution);
        *type_ref = nullable_if_safe(result, call.safe);

        let arguments = ExpectedArgumentType::ArgumentsMap(expected_argument_types(
            declaration,
            &substitution,
            &candidate,
            &call.arguments,
        )?);
        for argument in &mut call.arguments {
            self.finalize(argument, &arguments)?;
        }

        let Candidate {
            dispatch_receiver,
            extension_receiver,
            ..
        } = candidate;
        call.dispatch_receiver = self.finalize_receiver_slot(dispatch_receiver)?;
        call.extension_receiver = self.finalize_receiver_slot(extension_receiver)?;
        self.resolve(&mut call.callee, name, declaration);
        Ok(None)
    }

    fn visit_anonymous_function(
        &mut self,
        id: ExprId,
        type_ref: &mut TypeRef,
        function: &mut AnonymousFunction,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        let global = FinalizingSubstitution::global_only(self.global);
        let forced_return = expected
            .expected_type_for(id)
            .as_ref()
            .and_then(Ty::as_class)
            .and_then(ClassType::functional_return_type)
            .filter(|ret| matches!(ret, Ty::Class(_)))
            .cloned();

        if let Some(initial) = function.return_type.ty() {
            let mut final_return = forced_return
                .clone()
                .unwrap_or_else(|| global.substitute_or_self(initial));
            if final_return.is_integer_literal() && !expected.is_no_approximation() {
                final_return = final_return.approximate_integer_literal(None);
            }
            function.receiver_type = function
                .receiver_type
                .as_ref()
                .map(|receiver| global.substitute_or_self(receiver));
            for parameter in &mut function.value_parameters {
                parameter.ty = global.substitute_or_self(&parameter.ty);
            }
            let parameters = function
                .receiver_type
                .iter()
                .chain(function.value_parameters.iter().map(|parameter| &parameter.ty))
                .cloned()
                .collect();
            *type_ref = TypeRef::Resolved(Ty::function(parameters, final_return.clone()));
            function.return_type = TypeRef::from(final_return);
        }
        self.finalize(
            &mut function.body,
            &ExpectedArgumentType::ExpectedType(forced_return),
        )
    }

    fn visit_block(
        &mut self,
        id: ExprId,
        type_ref: &mut TypeRef,
        block: &mut Block,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        *type_ref = FinalizingSubstitution::global_only(self.global).substitute_type_ref(type_ref);
        let result_expectation = result_expectation(expected, id, type_ref.ty());
        let statement_expectation = expected.for_statement();
        let Some((last, statements)) = block.statements.split_last_mut() else {
            return Ok(());
        };
        for statement in statements {
            self.finalize(statement, &statement_expectation)?;
        }
        self.finalize(last, &result_expectation)?;
        settle_literal_type(type_ref, expected, id, last.ty());
        Ok(())
    }

    fn visit_when(
        &mut self,
        id: ExprId,
        type_ref: &mut TypeRef,
        when: &mut When,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        let resolved = self.unify_branches(type_ref, &mut when.callee)?;
        let result_expectation = result_expectation(expected, id, type_ref.ty());
        let condition_expectation = ExpectedArgumentType::none();
        if let Some(subject) = when.subject.as_deref_mut() {
            self.finalize(subject, &condition_expectation)?;
        }
        for branch in &mut when.branches {
            self.finalize(&mut branch.condition, &condition_expectation)?;
            self.finalize(&mut branch.result, &result_expectation)?;
        }
        if let Some((name, declaration)) = resolved {
            self.resolve(&mut when.callee, name, declaration);
        }
        settle_literal_type(type_ref, expected, id, None);
        Ok(())
    }

    fn visit_try(
        &mut self,
        id: ExprId,
        type_ref: &mut TypeRef,
        try_expr: &mut Try,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        let resolved = self.unify_branches(type_ref, &mut try_expr.callee)?;
        let result_expectation = result_expectation(expected, id, type_ref.ty());
        self.finalize(&mut try_expr.try_block, &result_expectation)?;
        for catch in &mut try_expr.catches {
            self.finalize(catch, &result_expectation)?;
        }
        if let Some(finally_block) = try_expr.finally_block.as_deref_mut() {
            self.finalize(finally_block, &ExpectedArgumentType::none())?;
        }
        if let Some((name, declaration)) = resolved {
            self.resolve(&mut try_expr.callee, name, declaration);
        }
        settle_literal_type(type_ref, expected, id, None);
        Ok(())
    }

    /// Final type of a `when`/`try` from its synthetic unifier call. The
    /// callee is resolved by the caller once the branches are done.
    fn unify_branches(
        &mut self,
        type_ref: &mut TypeRef,
        callee: &mut CalleeReference,
    ) -> Result<Option<(String, &'a Declaration)>> {
        let Some((name, candidate)) = callee.take_candidate() else {
            return Ok(None);
        };
        let session = self.session;
        let declaration = session.declaration(candidate.symbol)?;
        let substitution = FinalizingSubstitution::new(&candidate.substitutor, self.global);
        *type_ref = self.finalized_return_type(declaration, &substitution);
        Ok(Some((name, declaration)))
    }

    fn visit_const(
        &mut self,
        id: ExprId,
        type_ref: &mut TypeRef,
        constant: &mut Const,
        expected: &ExpectedArgumentType,
    ) -> Result<()> {
        if expected.is_no_approximation() {
            return Ok(());
        }
        let Some(Ty::IntegerLiteral(literal)) = type_ref.ty() else {
            return Ok(());
        };
        let approximated = literal.approximate(expected.expected_type_for(id).as_ref());
        let Some(kind) = ConstKind::from_class_id(&approximated.class_id) else {
            internal_bail!(
                "integer literal {} approximated to non-numeric type {}",
                literal,
                approximated
            );
        };
        if kind.is_floating() {
            if let ConstValue::Integer(value) = &constant.value {
                constant.value = ConstValue::Float(value.to_f64().unwrap_or(f64::NAN));
            }
        }
        tracing::trace!("literal {} approximated to {}", literal, approximated);
        constant.kind = kind;
        *type_ref = TypeRef::Resolved(Ty::Class(approximated));
        Ok(())
    }

    pub(crate) fn finalized_return_type(
        &self,
        declaration: &Declaration,
        substitution: &FinalizingSubstitution<'_>,
    ) -> TypeRef {
        let return_type = self
            .session
            .return_types()
            .try_calculate_return_type(declaration);
        substitution.substitute_type_ref(&return_type)
    }

    pub(crate) fn resolve(
        &mut self,
        callee: &mut CalleeReference,
        name: String,
        declaration: &Declaration,
    ) {
        tracing::debug!("resolved {} to {}", name, declaration);
        *callee = CalleeReference::Resolved {
            name,
            symbol: declaration.id,
        };
        self.outcome.resolved_references += 1;
    }

    fn finalize_receiver_slot(&mut self, slot: ReceiverSlot) -> Result<ReceiverSlot> {
        match slot {
            ReceiverSlot::Implicit(mut receiver) => {
                self.finalize(&mut receiver, &ExpectedArgumentType::none())?;
                Ok(ReceiverSlot::Implicit(receiver))
            }
            other => Ok(other),
        }
    }
}

/// Explicit receivers are approximated to the receiver type the callee
/// declares, if any.
fn receiver_expectation(
    declaration: &Declaration,
    substitution: &FinalizingSubstitution<'_>,
) -> ExpectedArgumentType {
    ExpectedArgumentType::ExpectedType(
        declaration
            .receiver_type
            .as_ref()
            .map(|receiver| substitution.substitute_or_self(receiver)),
    )
}

fn nullable_if_safe(type_ref: TypeRef, safe: bool) -> TypeRef {
    if safe {
        type_ref.map_type(|ty| ty.clone().nullable())
    } else {
        type_ref
    }
}

/// One projection per type parameter of the callee. Explicit projections
/// keep their variance and position; star projections and missing ones
/// become invariant.
fn finalized_type_arguments(
    declaration: &Declaration,
    substitution: &FinalizingSubstitution<'_>,
    explicit: &[TypeProjection],
) -> Vec<TypeProjection> {
    declaration
        .type_parameters
        .iter()
        .enumerate()
        .map(|(index, parameter)| {
            let ty = substitution.substitute_or_self(&parameter.self_type());
            match explicit.get(index) {
                Some(TypeProjection::Typed { variance, span, .. }) => TypeProjection::Typed {
                    type_ref: TypeRef::from(ty),
                    variance: *variance,
                    span: *span,
                },
                Some(TypeProjection::Star { span }) => TypeProjection::Typed {
                    type_ref: TypeRef::from(ty),
                    variance: Variance::Invariant,
                    span: *span,
                },
                None => TypeProjection::invariant(ty),
            }
        })
        .collect()
}

/// Parameter types the arguments are finalized against, keyed by the
/// unwrapped argument. A spread argument passed to a vararg parameter
/// expects the array type.
fn expected_argument_types(
    declaration: &Declaration,
    substitution: &FinalizingSubstitution<'_>,
    candidate: &Candidate,
    arguments: &[Expr],
) -> Result<HashMap<ExprId, Ty>> {
    let mut expected = HashMap::with_capacity(arguments.len());
    for argument in arguments {
        let unwrapped = argument.unwrap_argument();
        let Some(&index) = candidate.argument_mapping.get(&unwrapped.id) else {
            continue;
        };
        let Some(parameter) = declaration.value_parameters.get(index) else {
            internal_bail!(
                "argument {} is mapped to parameter #{} of {}",
                unwrapped.id,
                index,
                declaration
            );
        };
        let parameter_type = substitution.substitute_or_self(&parameter.ty);
        let ty = if parameter.is_vararg && argument.is_spread_argument() {
            Ty::array(parameter_type)
        } else {
            parameter_type
        };
        expected.insert(unwrapped.id, ty);
    }
    Ok(expected)
}

/// Context for the children that produce the value of container `id` whose
/// finalized type is `final_type`.
fn result_expectation(
    expected: &ExpectedArgumentType,
    id: ExprId,
    final_type: Option<&Ty>,
) -> ExpectedArgumentType {
    if expected.is_no_approximation() {
        return ExpectedArgumentType::NoApproximation;
    }
    match final_type {
        Some(Ty::IntegerLiteral(literal)) => ExpectedArgumentType::of(Ty::Class(
            literal.approximate(expected.expected_type_for(id).as_ref()),
        )),
        Some(ty @ Ty::Class(_)) => ExpectedArgumentType::of(ty.clone()),
        _ => expected.narrow_to(id),
    }
}

/// A container typed with a literal type after its children are done gets
/// the concrete type of its result, or the approximation of its own type.
fn settle_literal_type(
    type_ref: &mut TypeRef,
    expected: &ExpectedArgumentType,
    id: ExprId,
    result: Option<&Ty>,
) {
    if expected.is_no_approximation() {
        return;
    }
    let Some(Ty::IntegerLiteral(literal)) = type_ref.ty() else {
        return;
    };
    let settled = match result {
        Some(Ty::Class(class)) => class.clone(),
        _ => literal.approximate(expected.expected_type_for(id).as_ref()),
    };
    *type_ref = TypeRef::Resolved(Ty::Class(settled));
}
