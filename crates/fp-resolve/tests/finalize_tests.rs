use fp_core::span::Span;
use fp_core::symbol::{
    DeclId, Declaration, IntegerOperatorKind, TypeParameterSymbol, ValueParameter,
};
use fp_core::tree::{
    AnonymousFunction, Block, CalleeReference, Candidate, Const, ConstKind, ConstValue, Expr,
    ExprKind, FunctionCall, QualifiedAccess, ReceiverSlot, TreeBuilder, TypeProjection, TypeRef,
    Variance, When,
};
use fp_core::ty::{ClassId, Ty};
use fp_resolve::verify::find_unfinalized;
use fp_resolve::{
    finalize_expression, finalize_trees, FinalizeOptions, PendingTree, Session, Substitutor,
};
use num_bigint::BigInt;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn candidate_call(name: &str, candidate: Candidate) -> FunctionCall {
    FunctionCall::new(CalleeReference::with_candidate(name, candidate))
}

fn operator_call(
    builder: &mut TreeBuilder,
    session: &Session,
    kind: IntegerOperatorKind,
    receiver: Expr,
    argument: Option<Expr>,
) -> Expr {
    let symbol = session
        .integer_operator(kind)
        .expect("literal scope declares every operator");
    let candidate = Candidate::new(symbol).with_dispatch_receiver(ReceiverSlot::Explicit);
    let mut call = candidate_call(kind.operator_name(), candidate).with_receiver(receiver);
    if let Some(argument) = argument {
        call = call.with_argument(argument);
    }
    builder.call(call)
}

/// `fun foo(x: <parameter>): Unit`
fn declare_sink(session: &mut Session, name: &str, parameter: Ty) -> DeclId {
    session.declare(
        Declaration::function(name)
            .with_parameter(ValueParameter::new("x", parameter))
            .with_return_type(Ty::unit()),
    )
}

/// `sink(argument)` with the argument mapped to the first parameter.
fn sink_call(builder: &mut TreeBuilder, sink: DeclId, argument: Expr) -> Expr {
    let candidate = Candidate::new(sink).with_argument(argument.unwrap_argument().id, 0);
    builder.call(candidate_call("sink", candidate).with_argument(argument))
}

fn finalize(session: &Session, root: &mut Expr) -> fp_resolve::FinalizeOutcome {
    init_tracing();
    finalize_expression(session, &Substitutor::empty(), root).expect("finalization succeeds")
}

fn call_of(expr: &Expr) -> &FunctionCall {
    match &expr.kind {
        ExprKind::FunctionCall(call) => call,
        other => panic!("expected a call, found {:?}", other),
    }
}

fn const_of(expr: &Expr) -> &Const {
    match &expr.kind {
        ExprKind::Const(constant) => constant,
        other => panic!("expected a constant, found {:?}", other),
    }
}

fn first_argument(expr: &Expr) -> &Expr {
    &call_of(expr).arguments[0]
}

#[test]
fn top_level_literal_defaults_to_int() {
    let session = Session::new();
    let mut builder = TreeBuilder::new();
    let mut root = builder.integer(42);

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::int()));
    assert_eq!(const_of(&root).kind, ConstKind::Int);
}

#[test]
fn literal_argument_takes_parameter_type() {
    let mut session = Session::new();
    let sink = declare_sink(&mut session, "sink", Ty::long());
    let mut builder = TreeBuilder::new();
    let argument = builder.integer(42);
    let mut root = sink_call(&mut builder, sink, argument);

    let outcome = finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::unit()));
    assert_eq!(first_argument(&root).type_ref, TypeRef::Resolved(Ty::long()));
    assert_eq!(const_of(first_argument(&root)).kind, ConstKind::Long);
    assert_eq!(
        call_of(&root).callee,
        CalleeReference::Resolved {
            name: "sink".to_string(),
            symbol: sink
        }
    );
    assert_eq!(outcome.resolved_references, 1);
}

#[test]
fn literal_too_large_for_byte_parameter_stays_int() {
    let mut session = Session::new();
    let sink = declare_sink(&mut session, "sink", Ty::byte());
    let mut builder = TreeBuilder::new();
    let argument = builder.integer(300);
    let mut root = sink_call(&mut builder, sink, argument);

    finalize(&session, &mut root);

    assert_eq!(first_argument(&root).type_ref, TypeRef::Resolved(Ty::int()));
}

#[test]
fn double_parameter_converts_the_literal_value() {
    let mut session = Session::new();
    let sink = declare_sink(&mut session, "sink", Ty::double());
    let mut builder = TreeBuilder::new();
    let argument = builder.integer(3);
    let mut root = sink_call(&mut builder, sink, argument);

    finalize(&session, &mut root);

    let constant = const_of(first_argument(&root));
    assert_eq!(constant.kind, ConstKind::Double);
    assert_eq!(constant.value, ConstValue::Float(3.0));
}

#[test]
fn named_argument_is_matched_through_its_wrapper() {
    let mut session = Session::new();
    let sink = declare_sink(&mut session, "sink", Ty::short());
    let mut builder = TreeBuilder::new();
    let value = builder.integer(7);
    let argument = builder.named("x", value);
    let mut root = sink_call(&mut builder, sink, argument);

    finalize(&session, &mut root);

    let wrapper = first_argument(&root);
    assert_eq!(wrapper.type_ref, TypeRef::Resolved(Ty::short()));
    assert_eq!(
        wrapper.unwrap_argument().type_ref,
        TypeRef::Resolved(Ty::short())
    );
}

#[test]
fn division_by_literal_zero_keeps_the_receiver() {
    let session = Session::new()
        .with_options(FinalizeOptions::default().with_report_division_by_zero(true));
    let mut builder = TreeBuilder::new();
    builder.at(Span::new(1, 20, 25));
    let five = builder.integer(5);
    let zero = builder.integer(0);
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Div,
        five,
        Some(zero),
    );
    let call_id = root.id;

    let outcome = finalize(&session, &mut root);

    assert_eq!(root.id, call_id);
    assert_eq!(
        const_of(&root),
        &Const {
            kind: ConstKind::Int,
            value: ConstValue::Integer(BigInt::from(5)),
        }
    );
    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::int()));
    assert_eq!(outcome.folded_constants, 1);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(
        outcome.diagnostics[0].code.as_deref(),
        Some("const-division-by-zero")
    );
    assert_eq!(outcome.diagnostics[0].span, Some(Span::new(1, 20, 25)));
    assert_eq!(root.span, Span::new(1, 20, 25));
    assert!(!outcome.has_errors());
}

#[test]
fn nested_operators_fold_before_approximation() {
    let mut session = Session::new();
    let sink = declare_sink(&mut session, "sink", Ty::long());
    let mut builder = TreeBuilder::new();
    let two = builder.integer(2);
    let three = builder.integer(3);
    let product = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Times,
        two,
        Some(three),
    );
    let one = builder.integer(1);
    let difference = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Minus,
        product,
        Some(one),
    );
    let mut root = sink_call(&mut builder, sink, difference);

    let outcome = finalize(&session, &mut root);

    let argument = first_argument(&root);
    assert_eq!(
        const_of(argument),
        &Const {
            kind: ConstKind::Long,
            value: ConstValue::Integer(BigInt::from(5)),
        }
    );
    assert_eq!(argument.type_ref, TypeRef::Resolved(Ty::long()));
    assert_eq!(outcome.folded_constants, 2);
}

#[test]
fn unary_minus_folds_without_range_check() {
    let session = Session::new();
    let mut builder = TreeBuilder::new();
    let min = builder.integer(i64::from(i32::MIN));
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::UnaryMinus,
        min,
        None,
    );

    finalize(&session, &mut root);

    // 2147483648 only fits in Long
    assert_eq!(
        const_of(&root).value,
        ConstValue::Integer(BigInt::from(i64::from(i32::MAX) + 1))
    );
    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::long()));
}

fn property_access(builder: &mut TreeBuilder, session: &mut Session, name: &str, ty: Ty) -> Expr {
    let property = session.declare(Declaration::property(name, ty));
    builder.access(QualifiedAccess::new(CalleeReference::with_candidate(
        name,
        Candidate::new(property),
    )))
}

#[test]
fn literal_plus_byte_variable_computes_in_int() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let one = builder.integer(1);
    let x = property_access(&mut builder, &mut session, "x", Ty::byte());
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Plus,
        one,
        Some(x),
    );

    let outcome = finalize(&session, &mut root);

    let call = call_of(&root);
    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::int()));
    let receiver = call.explicit_receiver.as_deref().expect("receiver");
    assert_eq!(receiver.type_ref, TypeRef::Resolved(Ty::int()));
    assert_eq!(const_of(receiver).kind, ConstKind::Int);
    let expected_member = session
        .members(&ClassId::INT)
        .find(|member| member.name == "plus" && member.value_parameters[0].ty == Ty::byte())
        .map(|member| member.id)
        .expect("Int.plus(Byte)");
    assert_eq!(call.callee.resolved_symbol(), Some(expected_member));
    assert_eq!(outcome.folded_constants, 0);
    assert_eq!(outcome.resolved_references, 2);
}

#[test]
fn literal_plus_long_variable_computes_in_long() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let one = builder.integer(1);
    let y = property_access(&mut builder, &mut session, "y", Ty::long());
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Times,
        one,
        Some(y),
    );

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::long()));
    let receiver = call_of(&root).explicit_receiver.as_deref().expect("receiver");
    assert_eq!(receiver.type_ref, TypeRef::Resolved(Ty::long()));
}

#[test]
fn operator_without_matching_overload_is_internal_error() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let one = builder.integer(1);
    let s = property_access(&mut builder, &mut session, "s", Ty::string());
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Plus,
        one,
        Some(s),
    );

    let err = finalize_expression(&session, &Substitutor::empty(), &mut root)
        .expect_err("Int has no plus(String)");
    assert!(err.is_internal());
}

#[test]
fn candidate_substitution_runs_before_global() {
    let mut session = Session::new();
    let t = TypeParameterSymbol::new("T");
    let identity = session.declare(
        Declaration::function("id")
            .with_type_parameter("T")
            .with_parameter(ValueParameter::new("x", t.self_type()))
            .with_return_type(t.self_type()),
    );
    let mut builder = TreeBuilder::new();
    let argument = builder.string("hello");
    let candidate = Candidate::new(identity)
        .with_substitutor(Substitutor::new().with_parameter(t, Ty::variable(1)))
        .with_argument(argument.id, 0);
    let mut root = builder.call(
        candidate_call("id", candidate)
            .with_argument(argument)
            .with_type_argument(TypeProjection::Star {
                span: Span::new(1, 3, 4),
            }),
    );
    let global = Substitutor::new().with_variable(1, Ty::string());

    init_tracing();
    finalize_expression(&session, &global, &mut root).expect("finalization succeeds");

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::string()));
    assert_eq!(
        call_of(&root).type_arguments,
        vec![TypeProjection::Typed {
            type_ref: TypeRef::Resolved(Ty::string()),
            variance: Variance::Invariant,
            span: Span::new(1, 3, 4),
        }]
    );
}

#[test]
fn explicit_type_argument_keeps_its_variance() {
    let mut session = Session::new();
    let t = TypeParameterSymbol::new("T");
    let empty = session.declare(
        Declaration::function("emptyList")
            .with_type_parameter("T")
            .with_return_type(Ty::array(t.self_type())),
    );
    let mut builder = TreeBuilder::new();
    let candidate = Candidate::new(empty)
        .with_substitutor(Substitutor::new().with_parameter(t, Ty::int()));
    let mut root = builder.call(candidate_call("emptyList", candidate).with_type_argument(
        TypeProjection::Typed {
            type_ref: TypeRef::Resolved(Ty::variable(4)),
            variance: Variance::Out,
            span: Span::new(1, 10, 13),
        },
    ));

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::array(Ty::int())));
    assert_eq!(
        call_of(&root).type_arguments,
        vec![TypeProjection::Typed {
            type_ref: TypeRef::Resolved(Ty::int()),
            variance: Variance::Out,
            span: Span::new(1, 10, 13),
        }]
    );
}

#[test]
fn safe_call_makes_result_nullable() {
    let mut session = Session::new();
    let foo_class = Ty::class(ClassId::new("Foo"));
    let foo = session.declare(Declaration::function("foo").with_return_type(foo_class.clone().nullable()));
    let bar = session.add_member(
        ClassId::new("Foo"),
        Declaration::function("bar")
            .with_receiver(foo_class)
            .with_return_type(Ty::string()),
    );
    let mut builder = TreeBuilder::new();
    let receiver = builder.call(candidate_call("foo", Candidate::new(foo)));
    let candidate = Candidate::new(bar).with_dispatch_receiver(ReceiverSlot::Explicit);
    let mut root = builder.call(candidate_call("bar", candidate).with_receiver(receiver).safe());

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::string().nullable()));
    let call = call_of(&root);
    assert_eq!(call.dispatch_receiver, ReceiverSlot::Explicit);
    assert_eq!(
        call.explicit_receiver.as_deref().map(|receiver| receiver.type_ref.clone()),
        Some(TypeRef::Resolved(Ty::class(ClassId::new("Foo")).nullable()))
    );
}

#[test]
fn anonymous_function_return_type_follows_expected_functional_type() {
    let mut session = Session::new();
    let run = declare_sink(&mut session, "run", Ty::function(vec![], Ty::int()));
    let mut builder = TreeBuilder::new();
    let body_value = builder.integer(1);
    let body = builder.block(vec![body_value]);
    let lambda = builder.anonymous_function(None, Vec::new(), Ty::variable(2), body);
    let mut root = sink_call(&mut builder, run, lambda);
    let global = Substitutor::new().with_variable(2, Ty::long());

    init_tracing();
    finalize_expression(&session, &global, &mut root).expect("finalization succeeds");

    let lambda = first_argument(&root);
    assert_eq!(
        lambda.type_ref,
        TypeRef::Resolved(Ty::function(vec![], Ty::int()))
    );
    let ExprKind::AnonymousFunction(AnonymousFunction { return_type, body, .. }) = &lambda.kind
    else {
        panic!("expected a lambda, found {:?}", lambda.kind);
    };
    assert_eq!(return_type, &TypeRef::Resolved(Ty::int()));
    let ExprKind::Block(Block { statements }) = &body.kind else {
        panic!("expected a block body");
    };
    assert_eq!(statements[0].type_ref, TypeRef::Resolved(Ty::int()));
    assert_eq!(body.type_ref, TypeRef::Resolved(Ty::int()));
}

#[test]
fn anonymous_function_without_expectation_uses_global_substitution() {
    let session = Session::new();
    let mut builder = TreeBuilder::new();
    let body = builder.string("x");
    let parameter = ValueParameter::new("it", Ty::variable(3));
    let mut root = builder.anonymous_function(
        Some(Ty::variable(3)),
        vec![parameter],
        Ty::variable(4),
        body,
    );
    let global = Substitutor::new()
        .with_variable(3, Ty::int())
        .with_variable(4, Ty::string());

    init_tracing();
    finalize_expression(&session, &global, &mut root).expect("finalization succeeds");

    assert_eq!(
        root.type_ref,
        TypeRef::Resolved(Ty::function(vec![Ty::int(), Ty::int()], Ty::string()))
    );
    assert_eq!(root.type_ref.ty().map(ToString::to_string).as_deref(), Some("Function2<Int, Int, String>"));
}

#[test]
fn when_over_literals_settles_to_parameter_type() {
    let mut session = Session::new();
    let sink = declare_sink(&mut session, "sink", Ty::long());
    let mut builder = TreeBuilder::new();
    let first_condition = builder.boolean(true);
    let first = builder.integer(1);
    let second_condition = builder.boolean(false);
    let second = builder.integer(2);
    let unifier = Candidate::new(session.when_call()).with_substitutor(
        Substitutor::new().with_parameter(TypeParameterSymbol::new("K"), Ty::integer_literal(1)),
    );
    let when = builder.when(
        None,
        vec![(first_condition, first), (second_condition, second)],
        CalleeReference::with_candidate("WHEN_CALL", unifier),
        Ty::integer_literal(1),
    );
    let mut root = sink_call(&mut builder, sink, when);

    finalize(&session, &mut root);

    let when = first_argument(&root);
    assert_eq!(when.type_ref, TypeRef::Resolved(Ty::long()));
    let ExprKind::When(When { branches, callee, .. }) = &when.kind else {
        panic!("expected a when, found {:?}", when.kind);
    };
    assert_eq!(callee.resolved_symbol(), Some(session.when_call()));
    for branch in branches {
        assert_eq!(branch.condition.type_ref, TypeRef::Resolved(Ty::boolean()));
        assert_eq!(branch.result.type_ref, TypeRef::Resolved(Ty::long()));
        assert_eq!(const_of(&branch.result).kind, ConstKind::Long);
    }
}

#[test]
fn try_branches_and_finally_are_finalized() {
    let session = Session::new();
    let mut builder = TreeBuilder::new();
    let body = builder.integer(1);
    let catch = builder.integer(2);
    let finally_value = builder.integer(3);
    let unifier = Candidate::new(session.try_call()).with_substitutor(
        Substitutor::new().with_parameter(TypeParameterSymbol::new("K"), Ty::integer_literal(1)),
    );
    let mut root = builder.try_expr(
        body,
        vec![catch],
        Some(finally_value),
        CalleeReference::with_candidate("TRY_CALL", unifier),
        Ty::integer_literal(1),
    );

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::int()));
    assert!(find_unfinalized(&root).is_empty());
}

#[test]
fn vararg_arguments_expect_the_element_type() {
    let mut session = Session::new();
    let t = TypeParameterSymbol::new("T");
    let list_of = session.declare(
        Declaration::function("listOf")
            .with_type_parameter("T")
            .with_parameter(ValueParameter::vararg("elements", t.self_type()))
            .with_return_type(Ty::array(t.self_type())),
    );
    let mut builder = TreeBuilder::new();
    let one = builder.integer(1);
    let two = builder.integer(2);
    let candidate = Candidate::new(list_of)
        .with_substitutor(Substitutor::new().with_parameter(t, Ty::short()))
        .with_argument(one.id, 0)
        .with_argument(two.id, 0);
    let mut root = builder.call(candidate_call("listOf", candidate).with_argument(one).with_argument(two));

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::array(Ty::short())));
    for argument in &call_of(&root).arguments {
        assert_eq!(argument.type_ref, TypeRef::Resolved(Ty::short()));
    }
}

#[test]
fn returned_literal_uses_the_statement_default() {
    let session = Session::new();
    let mut builder = TreeBuilder::new();
    let value = builder.integer(5_000_000_000i64);
    let mut root = builder.ret(value);

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::nothing()));
    let ExprKind::Return(ret) = &root.kind else {
        panic!("expected a return");
    };
    assert_eq!(ret.result.type_ref, TypeRef::Resolved(Ty::long()));
    assert!(find_unfinalized(&root).is_empty());
}

#[test]
fn class_callee_produces_error_type() {
    let mut session = Session::new();
    let class = session.declare(Declaration::class(&ClassId::new("Widget")));
    let mut builder = TreeBuilder::new();
    let mut root = builder.access(QualifiedAccess::new(CalleeReference::with_candidate(
        "Widget",
        Candidate::new(class),
    )));

    finalize(&session, &mut root);

    assert_eq!(
        root.type_ref,
        TypeRef::error("Callee reference to candidate without return type: class Widget")
    );
    assert!(matches!(
        root.kind,
        ExprKind::QualifiedAccess(QualifiedAccess {
            callee: CalleeReference::Resolved { .. },
            ..
        })
    ));
}

#[test]
fn implicit_receiver_is_moved_from_candidate() {
    let mut session = Session::new();
    let size = session.add_member(
        ClassId::new("Bag"),
        Declaration::property("size", Ty::int()).with_receiver(Ty::class(ClassId::new("Bag"))),
    );
    let mut builder = TreeBuilder::new();
    let this = builder.this_receiver(Ty::class(ClassId::new("Bag")));
    let candidate = Candidate::new(size).with_dispatch_receiver(ReceiverSlot::Implicit(Box::new(this.clone())));
    let mut root = builder.access(QualifiedAccess::new(CalleeReference::with_candidate("size", candidate)));

    finalize(&session, &mut root);

    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::int()));
    let ExprKind::QualifiedAccess(access) = &root.kind else {
        panic!("expected an access");
    };
    assert_eq!(access.dispatch_receiver, ReceiverSlot::Implicit(Box::new(this)));
    assert!(access.extension_receiver.is_none());
}

#[test]
fn callable_reference_records_inferred_type_arguments() {
    let mut session = Session::new();
    let t = TypeParameterSymbol::new("T");
    let identity = session.declare(
        Declaration::function("id")
            .with_type_parameter("T")
            .with_parameter(ValueParameter::new("x", t.self_type()))
            .with_return_type(t.self_type()),
    );
    let mut builder = TreeBuilder::new();
    let candidate = Candidate::new(identity)
        .with_substitutor(Substitutor::new().with_parameter(t.clone(), Ty::variable(8)));
    let mut root = builder.callable_reference(
        CalleeReference::with_candidate("id", candidate),
        None,
        Ty::function(vec![t.self_type()], t.self_type()),
    );
    let global = Substitutor::new().with_variable(8, Ty::boolean());

    init_tracing();
    finalize_expression(&session, &global, &mut root).expect("finalization succeeds");

    assert_eq!(
        root.type_ref,
        TypeRef::Resolved(Ty::function(vec![Ty::boolean()], Ty::boolean()))
    );
    let ExprKind::CallableReference(reference) = &root.kind else {
        panic!("expected a callable reference");
    };
    assert_eq!(
        reference.callee,
        CalleeReference::ResolvedCallable {
            name: "id".to_string(),
            symbol: identity,
            inferred_type_arguments: vec![Ty::boolean()],
        }
    );
}

#[test]
fn assignment_value_takes_variable_type() {
    let mut session = Session::new();
    let counter = session.declare(Declaration::property("counter", Ty::long()));
    let mut builder = TreeBuilder::new();
    let value = builder.integer(5);
    let mut root = builder.assignment(
        CalleeReference::with_candidate("counter", Candidate::new(counter)),
        value,
    );

    finalize(&session, &mut root);

    let ExprKind::VariableAssignment(assignment) = &root.kind else {
        panic!("expected an assignment");
    };
    assert_eq!(assignment.callee.resolved_symbol(), Some(counter));
    assert_eq!(assignment.rvalue.type_ref, TypeRef::Resolved(Ty::long()));
}

#[test]
fn implicit_return_types_are_computed_once_per_session() {
    let mut session = Session::with_implicit_return_types(|declaration: &Declaration| {
        if declaration.name == "answer" {
            Ty::int()
        } else {
            Ty::error("unexpected declaration")
        }
    });
    let answer = session.declare(Declaration::function("answer"));
    let mut builder = TreeBuilder::new();
    let first = builder.call(candidate_call("answer", Candidate::new(answer)));
    let second = builder.call(candidate_call("answer", Candidate::new(answer)));
    let mut root = builder.block(vec![first, second]);

    finalize(&session, &mut root);

    let ExprKind::Block(Block { statements }) = &root.kind else {
        panic!("expected a block");
    };
    for statement in statements {
        assert_eq!(statement.type_ref, TypeRef::Resolved(Ty::int()));
    }
    assert_eq!(session.return_types().computed_count(), 1);
    assert!(session.return_types().is_cached(answer));
}

fn sample_tree(session: &mut Session, builder: &mut TreeBuilder) -> Expr {
    let sink = declare_sink(session, "sink", Ty::long());
    let two = builder.integer(2);
    let three = builder.integer(3);
    let sum = operator_call(builder, session, IntegerOperatorKind::Plus, two, Some(three));
    let call = sink_call(builder, sink, sum);
    let literal = builder.integer(9);
    builder.block(vec![call, literal])
}

#[test]
fn finalized_tree_is_a_fixed_point() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let mut root = sample_tree(&mut session, &mut builder);
    assert_eq!(find_unfinalized(&root).len(), 6);

    let first = finalize(&session, &mut root);
    assert!(find_unfinalized(&root).is_empty());
    assert_eq!(first.folded_constants, 1);

    let snapshot = root.clone();
    let second = finalize(&session, &mut root);
    assert_eq!(root, snapshot);
    assert_eq!(second.resolved_references, 0);
    assert_eq!(second.folded_constants, 0);
}

#[test]
fn driver_finalizes_trees_in_parallel_and_keeps_order() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let mut trees = Vec::new();
    for _ in 0..12 {
        let root = sample_tree(&mut session, &mut builder);
        trees.push(PendingTree::new(root, Substitutor::empty()));
    }
    let one = builder.integer(1);
    let bad_argument = property_access(&mut builder, &mut session, "s", Ty::string());
    let bad = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Plus,
        one,
        Some(bad_argument),
    );
    trees.insert(5, PendingTree::new(bad, Substitutor::empty()));
    let ids: Vec<_> = trees.iter().map(|tree| tree.root.id).collect();
    let session = session.with_options(FinalizeOptions::default().with_threads(4));

    init_tracing();
    let finished = finalize_trees(&session, trees);

    assert_eq!(
        finished.iter().map(|tree| tree.root.id).collect::<Vec<_>>(),
        ids
    );
    for (index, tree) in finished.iter().enumerate() {
        if index == 5 {
            assert!(tree.result.as_ref().is_err_and(|err| err.is_internal()));
            continue;
        }
        assert!(tree.result.is_ok());
        assert!(find_unfinalized(&tree.root).is_empty());
    }
}

/// `when { true -> <literal>; false -> <other> }` unified by `WHEN_CALL` to `ty`.
fn when_over(
    builder: &mut TreeBuilder,
    session: &Session,
    literal: i64,
    other: Expr,
    ty: Ty,
) -> Expr {
    let first_condition = builder.boolean(true);
    let first = builder.integer(literal);
    let second_condition = builder.boolean(false);
    let unifier = Candidate::new(session.when_call()).with_substitutor(
        Substitutor::new().with_parameter(TypeParameterSymbol::new("K"), ty.clone()),
    );
    builder.when(
        None,
        vec![(first_condition, first), (second_condition, other)],
        CalleeReference::with_candidate("WHEN_CALL", unifier),
        ty,
    )
}

fn when_branch_results(expr: &Expr) -> Vec<&Expr> {
    match &expr.unwrap_argument().kind {
        ExprKind::When(When { branches, .. }) => {
            branches.iter().map(|branch| &branch.result).collect()
        }
        other => panic!("expected a when, found {:?}", other),
    }
}

#[test]
fn literal_plus_long_when_settles_branch_literals() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let one = builder.integer(1);
    let y = property_access(&mut builder, &mut session, "y", Ty::long());
    let when = when_over(&mut builder, &session, 2, y, Ty::long());
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Plus,
        one,
        Some(when),
    );

    let outcome = finalize(&session, &mut root);

    assert_eq!(find_unfinalized(&root), vec![]);
    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::long()));
    assert_eq!(outcome.folded_constants, 0);
    let call = call_of(&root);
    let receiver = call.explicit_receiver.as_deref().expect("receiver");
    assert_eq!(receiver.type_ref, TypeRef::Resolved(Ty::long()));
    let branches = when_branch_results(&call.arguments[0]);
    assert_eq!(branches[0].type_ref, TypeRef::Resolved(Ty::long()));
    assert_eq!(const_of(branches[0]).kind, ConstKind::Long);
}

#[test]
fn long_variable_plus_when_settles_branch_literals() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let x = property_access(&mut builder, &mut session, "x", Ty::long());
    let y = property_access(&mut builder, &mut session, "y", Ty::long());
    let when = when_over(&mut builder, &session, 7, y, Ty::long());
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Minus,
        x,
        Some(when),
    );

    finalize(&session, &mut root);

    assert_eq!(find_unfinalized(&root), vec![]);
    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::long()));
    let branches = when_branch_results(first_argument(&root));
    assert_eq!(branches[0].type_ref, TypeRef::Resolved(Ty::long()));
}

#[test]
fn driver_accepts_operator_over_concrete_when() {
    let mut session = Session::new();
    let mut builder = TreeBuilder::new();
    let one = builder.integer(1);
    let y = property_access(&mut builder, &mut session, "y", Ty::long());
    let when = when_over(&mut builder, &session, 2, y, Ty::long());
    let root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Plus,
        one,
        Some(when),
    );

    init_tracing();
    let finished = finalize_trees(&session, vec![PendingTree::new(root, Substitutor::empty())]);

    assert!(finished[0].result.is_ok());
}

#[test]
fn when_receiver_over_literals_is_approximated_not_folded() {
    let session = Session::new();
    let mut builder = TreeBuilder::new();
    let three = builder.integer(3);
    let receiver = when_over(&mut builder, &session, 2, three, Ty::integer_literal(2));
    let one = builder.integer(1);
    let mut root = operator_call(
        &mut builder,
        &session,
        IntegerOperatorKind::Plus,
        receiver,
        Some(one),
    );

    let outcome = finalize(&session, &mut root);

    // stays a call: the merged literal value is not the value of the `when`
    assert_eq!(outcome.folded_constants, 0);
    assert_eq!(root.type_ref, TypeRef::Resolved(Ty::int()));
    let call = call_of(&root);
    let receiver = call.explicit_receiver.as_deref().expect("receiver");
    assert_eq!(receiver.type_ref, TypeRef::Resolved(Ty::int()));
    for branch in when_branch_results(receiver) {
        assert_eq!(branch.type_ref, TypeRef::Resolved(Ty::int()));
    }
    assert_eq!(call.arguments[0].type_ref, TypeRef::Resolved(Ty::int()));
    assert_eq!(find_unfinalized(&root), vec![]);
}

proptest! {
    #[test]
    fn folding_then_approximation_matches_int_arithmetic(
        lhs in -46_340i32..46_340,
        rhs in -46_340i32..46_340,
        pick in 0usize..3,
    ) {
        let (kind, expected) = [
            (IntegerOperatorKind::Plus, lhs + rhs),
            (IntegerOperatorKind::Minus, lhs - rhs),
            (IntegerOperatorKind::Times, lhs * rhs),
        ][pick];
        let session = Session::new();
        let mut builder = TreeBuilder::new();
        let left = builder.integer(lhs);
        let right = builder.integer(rhs);
        let mut root = operator_call(&mut builder, &session, kind, left, Some(right));

        finalize_expression(&session, &Substitutor::empty(), &mut root)
            .map_err(|err| TestCaseError::fail(err.to_string()))?;

        prop_assert_eq!(root.type_ref.clone(), TypeRef::Resolved(Ty::int()));
        prop_assert_eq!(
            const_of(&root).value.clone(),
            ConstValue::Integer(BigInt::from(expected))
        );
    }
}
