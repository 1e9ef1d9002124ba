//! L3: linear expressions and constraints over a `VariableRef` universe
//! (`spec.md` §3/§4.3).

mod constraint;
mod expression;

pub use constraint::{ConstraintKind, LinearConstraint, LinearConstraintSystem};
pub use expression::LinearExpression;
