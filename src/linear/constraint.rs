//! Linear constraints and constraint systems (`spec.md` §3/§4.3).

use super::LinearExpression;
use crate::interfaces::Variable;
use crate::number::ZNumber;

/// `<` is strict only for rational domains; on integers it is equivalent
/// to `<= -1` (`spec.md` §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    Equals,
    NotEquals,
    LessEquals,
    LessThan,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearConstraint<V: Variable> {
    expr: LinearExpression<V>,
    kind: ConstraintKind,
}

impl<V: Variable> LinearConstraint<V> {
    pub fn new(expr: LinearExpression<V>, kind: ConstraintKind) -> Self {
        Self { expr, kind }
    }
    /// `expr == 0`.
    pub fn equals_zero(expr: LinearExpression<V>) -> Self {
        Self::new(expr, ConstraintKind::Equals)
    }
    /// `expr <= 0`.
    pub fn leq_zero(expr: LinearExpression<V>) -> Self {
        Self::new(expr, ConstraintKind::LessEquals)
    }
    /// `expr < 0`, normalized to `expr + 1 <= 0` on integers.
    pub fn lt_zero(expr: LinearExpression<V>) -> Self {
        Self::new(expr, ConstraintKind::LessThan)
    }
    /// An always-true constraint: `0 == 0`.
    pub fn tautology() -> Self {
        Self::equals_zero(LinearExpression::zero())
    }
    /// An always-false constraint: `1 == 0`.
    pub fn contradiction() -> Self {
        Self::equals_zero(LinearExpression::constant(ZNumber::one()))
    }

    pub fn expr(&self) -> &LinearExpression<V> {
        &self.expr
    }
    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    /// Integer-normalized form: `<` rewritten as `<= -1`.
    pub fn as_leq_integer(&self) -> Option<LinearExpression<V>> {
        match self.kind {
            ConstraintKind::LessEquals => Some(self.expr.clone()),
            ConstraintKind::LessThan => {
                Some(self.expr.add(&LinearExpression::constant(ZNumber::one())))
            }
            _ => None,
        }
    }

    pub fn is_tautology(&self) -> bool {
        if let Some(c) = self.expr.as_constant() {
            match self.kind {
                ConstraintKind::Equals => c.is_zero(),
                ConstraintKind::NotEquals => !c.is_zero(),
                ConstraintKind::LessEquals => !c.is_positive(),
                ConstraintKind::LessThan => c.is_negative(),
            }
        } else {
            false
        }
    }
    pub fn is_contradiction(&self) -> bool {
        if let Some(c) = self.expr.as_constant() {
            match self.kind {
                ConstraintKind::Equals => !c.is_zero(),
                ConstraintKind::NotEquals => c.is_zero(),
                ConstraintKind::LessEquals => c.is_positive(),
                ConstraintKind::LessThan => !c.is_negative(),
            }
        } else {
            false
        }
    }
}

/// An ordered sequence of constraints; adding a contradiction propagates
/// bottom to any domain that folds the system in (`spec.md` §4.3).
#[derive(Clone, Debug, Default)]
pub struct LinearConstraintSystem<V: Variable> {
    constraints: Vec<LinearConstraint<V>>,
}

impl<V: Variable> LinearConstraintSystem<V> {
    pub fn new() -> Self {
        Self { constraints: Vec::new() }
    }
    pub fn push(&mut self, c: LinearConstraint<V>) {
        self.constraints.push(c);
    }
    pub fn iter(&self) -> impl Iterator<Item = &LinearConstraint<V>> {
        self.constraints.iter()
    }
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }
    pub fn len(&self) -> usize {
        self.constraints.len()
    }
    pub fn contains_contradiction(&self) -> bool {
        self.constraints.iter().any(LinearConstraint::is_contradiction)
    }
}

impl<V: Variable> FromIterator<LinearConstraint<V>> for LinearConstraintSystem<V> {
    fn from_iter<T: IntoIterator<Item = LinearConstraint<V>>>(iter: T) -> Self {
        Self { constraints: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    struct V(&'static str);
    impl Variable for V {
        fn name_for_dump(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn tautology_and_contradiction_are_constant_folded() {
        assert!(LinearConstraint::<V>::tautology().is_tautology());
        assert!(LinearConstraint::<V>::contradiction().is_contradiction());
    }

    #[test]
    fn strict_lt_normalizes_to_leq_minus_one() {
        let c = LinearConstraint::lt_zero(LinearExpression::variable(V("x")));
        let normalized = c.as_leq_integer().unwrap();
        assert_eq!(*normalized.constant_term(), ZNumber::one());
    }

    #[test]
    fn system_detects_contradiction() {
        let mut sys = LinearConstraintSystem::<V>::new();
        sys.push(LinearConstraint::tautology());
        assert!(!sys.contains_contradiction());
        sys.push(LinearConstraint::contradiction());
        assert!(sys.contains_contradiction());
    }
}
