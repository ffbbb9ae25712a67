use crate::session::Session;
use fp_core::error::Result;
use fp_core::internal_bail;
use fp_core::symbol::Declaration;
use fp_core::ty::{ClassId, ClassType, Ty};
use itertools::Itertools;

/// Chooses concrete types for literal operands and finds the numeric
/// operator a partially folded call ends up calling.
pub struct IntegerLiteralTypeApproximator<'s> {
    session: &'s Session,
}

impl<'s> IntegerLiteralTypeApproximator<'s> {
    pub fn new(session: &'s Session) -> Self {
        Self { session }
    }

    /// Type a literal receiver is fixed to when the other operand already has
    /// the concrete type `argument`: Float, Double and Long win, anything
    /// else computes in Int.
    pub fn expected_type_for_fixed_argument(argument: &Ty) -> Ty {
        match argument.as_class() {
            Some(class)
                if [ClassId::FLOAT, ClassId::DOUBLE, ClassId::LONG].contains(&class.class_id) =>
            {
                Ty::class(class.class_id.clone())
            }
            _ => Ty::int(),
        }
    }

    /// First member of `receiver`'s class named `name` whose first parameter
    /// accepts `argument`; for unary operators (`argument == None`) the first
    /// member with that name.
    pub fn find_operator_member(
        &self,
        receiver: &ClassType,
        name: &str,
        argument: Option<&Ty>,
    ) -> Result<&'s Declaration> {
        let session = self.session;
        let found = session
            .members(&receiver.class_id)
            .filter(|member| member.name == name)
            .find(|member| match argument {
                None => true,
                Some(argument) => member
                    .value_parameters
                    .first()
                    .is_some_and(|parameter| session.is_subtype_of(argument, &parameter.ty)),
            });
        match found {
            Some(member) => Ok(member),
            None => internal_bail!(
                "no operator {}({}) in the member scope of {}",
                name,
                argument.into_iter().join(", "),
                receiver
            ),
        }
    }
}
