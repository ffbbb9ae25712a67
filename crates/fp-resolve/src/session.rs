//! Everything finalization reads about the program besides the tree itself.

use crate::options::FinalizeOptions;
use crate::return_type::{CachingReturnTypeCalculator, ImplicitReturnTypeResolver};
use fp_core::error::{Error, Result};
use fp_core::symbol::{
    DeclId, Declaration, DeclarationKind, IntegerOperatorKind, TypeParameterSymbol, ValueParameter,
};
use fp_core::ty::{ClassId, Ty};
use std::collections::{HashMap, HashSet, VecDeque};

const NUMERIC_CLASSES: [ClassId; 6] = [
    ClassId::BYTE,
    ClassId::SHORT,
    ClassId::INT,
    ClassId::LONG,
    ClassId::FLOAT,
    ClassId::DOUBLE,
];

pub const WHEN_CALL: &str = "WHEN_CALL";
pub const TRY_CALL: &str = "TRY_CALL";

/// Declaration arena, class member scopes and the session-wide return type
/// cache. Shared read-only between the trees finalized in parallel.
pub struct Session {
    declarations: Vec<Declaration>,
    member_scopes: HashMap<ClassId, Vec<DeclId>>,
    supertypes: HashMap<ClassId, Vec<ClassId>>,
    integer_operators: HashMap<IntegerOperatorKind, DeclId>,
    when_call: DeclId,
    try_call: DeclId,
    return_types: CachingReturnTypeCalculator,
    options: FinalizeOptions,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self::with_return_types(CachingReturnTypeCalculator::default())
    }

    pub fn with_implicit_return_types(
        resolver: impl ImplicitReturnTypeResolver + 'static,
    ) -> Self {
        Self::with_return_types(CachingReturnTypeCalculator::new(resolver))
    }

    fn with_return_types(return_types: CachingReturnTypeCalculator) -> Self {
        let mut session = Self {
            declarations: Vec::new(),
            member_scopes: HashMap::new(),
            supertypes: HashMap::new(),
            integer_operators: HashMap::new(),
            when_call: DeclId(0),
            try_call: DeclId(0),
            return_types,
            options: FinalizeOptions::default(),
        };
        session.when_call = session.declare(synthetic_unifier(WHEN_CALL));
        session.try_call = session.declare(synthetic_unifier(TRY_CALL));
        session.register_integer_literal_scope();
        session.register_numeric_classes();
        session
    }

    pub fn with_options(mut self, options: FinalizeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &FinalizeOptions {
        &self.options
    }

    /// Adds `declaration` to the arena; its `id` is replaced by the one
    /// allocated here.
    pub fn declare(&mut self, mut declaration: Declaration) -> DeclId {
        let id = DeclId(self.declarations.len() as u32);
        declaration.id = id;
        self.declarations.push(declaration);
        id
    }

    /// Declares a member of `owner`. Member scopes keep declaration order.
    pub fn add_member(&mut self, owner: ClassId, declaration: Declaration) -> DeclId {
        let id = self.declare(declaration);
        self.member_scopes.entry(owner).or_default().push(id);
        id
    }

    pub fn add_supertype(&mut self, class: ClassId, supertype: ClassId) {
        let supertypes = self.supertypes.entry(class).or_default();
        if !supertypes.contains(&supertype) {
            supertypes.push(supertype);
        }
    }

    pub fn declaration(&self, id: DeclId) -> Result<&Declaration> {
        self.declarations
            .get(id.0 as usize)
            .ok_or_else(|| Error::internal(format!("unknown declaration {}", id)))
    }

    pub fn members<'s>(&'s self, class: &ClassId) -> impl Iterator<Item = &'s Declaration> + 's {
        self.member_scopes
            .get(class)
            .into_iter()
            .flatten()
            .filter_map(|id| self.declarations.get(id.0 as usize))
    }

    pub fn integer_operator(&self, kind: IntegerOperatorKind) -> Option<DeclId> {
        self.integer_operators.get(&kind).copied()
    }

    /// `fun <K> WHEN_CALL(vararg branches: K): K`
    pub fn when_call(&self) -> DeclId {
        self.when_call
    }

    /// `fun <K> TRY_CALL(vararg branches: K): K`
    pub fn try_call(&self) -> DeclId {
        self.try_call
    }

    pub fn return_types(&self) -> &CachingReturnTypeCalculator {
        &self.return_types
    }

    /// Nominal subtyping: reflexive, nullability-aware, `Nothing` at the
    /// bottom, `Any` at the top and declared supertypes followed
    /// transitively. Type arguments must match exactly.
    pub fn is_subtype_of(&self, sub: &Ty, sup: &Ty) -> bool {
        if sub == sup || (!sub.is_nullable() && sub.clone().nullable() == *sup) {
            return true;
        }
        match (sub, sup) {
            (Ty::Error(_), _) | (_, Ty::Error(_)) => false,
            (Ty::IntegerLiteral(literal), _) => literal
                .possible_types()
                .iter()
                .any(|class| self.is_subtype_of(&Ty::Class(class.clone()), sup)),
            (_, Ty::Class(sup_class)) if sup_class.class_id == ClassId::ANY => {
                sup_class.nullable || !sub.is_nullable()
            }
            (Ty::Class(sub_class), _) if sub_class.class_id == ClassId::NOTHING => {
                !sub_class.nullable || sup.is_nullable()
            }
            (Ty::Class(sub_class), Ty::Class(sup_class)) => {
                if sub_class.nullable && !sup_class.nullable {
                    return false;
                }
                if sub_class.class_id == sup_class.class_id {
                    return sub_class.arguments == sup_class.arguments;
                }
                sup_class.arguments.is_empty()
                    && self.is_subclass(&sub_class.class_id, &sup_class.class_id)
            }
            _ => false,
        }
    }

    fn is_subclass(&self, sub: &ClassId, sup: &ClassId) -> bool {
        let mut visited = HashSet::new();
        let mut queue = VecDeque::from([sub]);
        while let Some(class) = queue.pop_front() {
            if class == sup {
                return true;
            }
            if !visited.insert(class) {
                continue;
            }
            if let Some(supertypes) = self.supertypes.get(class) {
                queue.extend(supertypes.iter());
            }
        }
        false
    }

    fn register_integer_literal_scope(&mut self) {
        for kind in IntegerOperatorKind::all() {
            let mut declaration = Declaration::function(kind.operator_name())
                .with_kind(DeclarationKind::IntegerOperator(kind))
                .with_return_type(Ty::class(ClassId::NUMBER));
            if !kind.is_unary() {
                declaration = declaration
                    .with_parameter(ValueParameter::new("other", Ty::class(ClassId::NUMBER)));
            }
            let id = self.declare(declaration);
            self.integer_operators.insert(kind, id);
        }
    }

    fn register_numeric_classes(&mut self) {
        self.add_supertype(ClassId::NUMBER, ClassId::ANY);
        self.add_supertype(ClassId::COMPARABLE, ClassId::ANY);
        self.add_supertype(ClassId::STRING, ClassId::COMPARABLE);
        for receiver in NUMERIC_CLASSES {
            self.add_supertype(receiver.clone(), ClassId::NUMBER);
            self.add_supertype(receiver.clone(), ClassId::COMPARABLE);
            let receiver_ty = Ty::class(receiver.clone());
            for kind in IntegerOperatorKind::all() {
                if kind.is_unary() {
                    let result = widened(&receiver, &ClassId::INT);
                    self.add_member(
                        receiver.clone(),
                        Declaration::function(kind.operator_name())
                            .with_receiver(receiver_ty.clone())
                            .with_return_type(Ty::class(result)),
                    );
                    continue;
                }
                for argument in NUMERIC_CLASSES {
                    let result = widened(&receiver, &argument);
                    self.add_member(
                        receiver.clone(),
                        Declaration::function(kind.operator_name())
                            .with_receiver(receiver_ty.clone())
                            .with_parameter(ValueParameter::new("other", Ty::class(argument)))
                            .with_return_type(Ty::class(result)),
                    );
                }
            }
        }
    }
}

fn synthetic_unifier(name: &str) -> Declaration {
    let k = TypeParameterSymbol::new("K");
    Declaration::function(name)
        .with_type_parameter("K")
        .with_parameter(ValueParameter::vararg("branches", k.self_type()))
        .with_return_type(k.self_type())
}

/// Result class of arithmetic between two numeric classes: the wider of
/// the two, and never narrower than Int.
fn widened(left: &ClassId, right: &ClassId) -> ClassId {
    let rank = |class: &ClassId| {
        NUMERIC_CLASSES
            .iter()
            .position(|numeric| numeric == class)
            .unwrap_or(0)
    };
    let widest = rank(left).max(rank(right)).max(rank(&ClassId::INT));
    NUMERIC_CLASSES[widest].clone()
}
