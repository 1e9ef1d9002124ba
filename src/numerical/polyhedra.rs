//! Polyhedral-domain wrapper (`spec.md` §4.5, `Polyhedral wrapper`).
//!
//! `spec.md` mandates only the domain's semantic behavior, not a specific
//! convex-polyhedra representation or library. This backend keeps the
//! exact affine constraints syntactically (no real convex-hull join, no
//! Fourier-Motzkin elimination) paired with an `IntervalStore` used for
//! feasibility propagation and for the `to_interval` projection — a sound,
//! if imprecise, over-approximation of a true polyhedral domain (see
//! `DESIGN.md`, polyhedral wrapper backend).

use crate::domain::{Congruence, Interval};
use crate::interfaces::Variable;
use crate::linear::{ConstraintKind, LinearConstraint, LinearConstraintSystem, LinearExpression};
use crate::number::ZNumber;
use crate::numerical::interval_store::IntervalStore;
use crate::numerical::traits::{BinaryOp, NumericalDomain};

#[derive(Clone, Debug)]
pub struct Polyhedra<V: Variable> {
    bottom: bool,
    constraints: Vec<LinearConstraint<V>>,
    env: IntervalStore<V>,
}

/// Whether an op's transfer relation is itself affine; non-affine ops only
/// update the interval projection, not the syntactic constraint set.
fn is_linear_op(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::Add | BinaryOp::Sub)
}

impl<V: Variable> Polyhedra<V> {
    fn drop_constraints_mentioning(&mut self, x: &V) {
        self.constraints.retain(|c| !c.expr().variables().any(|v| v == x));
    }
    fn push_constraint(&mut self, c: LinearConstraint<V>) {
        if !self.constraints.contains(&c) {
            self.constraints.push(c.clone());
        }
        self.env.add_constraint(&c);
        if self.env.is_bottom() {
            self.bottom = true;
        }
    }
}

impl<V: Variable> NumericalDomain<V> for Polyhedra<V> {
    fn top() -> Self {
        Self { bottom: false, constraints: Vec::new(), env: IntervalStore::top() }
    }
    fn bottom() -> Self {
        Self { bottom: true, constraints: Vec::new(), env: IntervalStore::bottom() }
    }
    fn is_top(&self) -> bool {
        !self.bottom && self.constraints.is_empty()
    }
    fn is_bottom(&self) -> bool {
        self.bottom || self.env.is_bottom()
    }
    fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }

    fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        // A sound under-approximation of real entailment: syntactic subset
        // plus the (weaker) interval projections agreeing.
        self.env.leq(&other.env) && other.constraints.iter().all(|c| self.constraints.contains(c))
    }
    fn equals(&self, other: &Self) -> bool {
        self.leq(other) && other.leq(self)
    }

    fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        let constraints: Vec<_> =
            self.constraints.iter().filter(|c| other.constraints.contains(c)).cloned().collect();
        Self { bottom: false, constraints, env: self.env.join(&other.env) }
    }
    fn meet(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let mut result = self.clone();
        for c in &other.constraints {
            result.push_constraint(c.clone());
            if result.is_bottom() {
                return Self::bottom();
            }
        }
        result
    }
    fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        // Keep only constraints stable across the iteration (present in
        // both), matching DBM's "drop entries that increased" rule.
        let constraints: Vec<_> =
            self.constraints.iter().filter(|c| other.constraints.contains(c)).cloned().collect();
        Self { bottom: false, constraints, env: self.env.widening(&other.env) }
    }
    fn narrowing(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let mut result = self.clone();
        for c in &other.constraints {
            result.push_constraint(c.clone());
        }
        result.env = self.env.narrowing(&other.env);
        result
    }
    fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        let constraints: Vec<_> =
            self.constraints.iter().filter(|c| other.constraints.contains(c)).cloned().collect();
        Self { bottom: false, constraints, env: self.env.widening_threshold(&other.env, threshold) }
    }
    fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let mut result = self.clone();
        result.env = self.env.narrowing_threshold(&other.env, threshold);
        result
    }

    fn assign_number(&mut self, x: &V, n: ZNumber) {
        self.drop_constraints_mentioning(x);
        self.env.assign_number(x, n.clone());
        let e = LinearExpression::term(ZNumber::one(), x.clone()).add(&LinearExpression::constant(-n));
        self.push_constraint(LinearConstraint::equals_zero(e));
    }
    fn assign_var(&mut self, x: &V, y: &V) {
        self.assign_expr(x, &LinearExpression::variable(y.clone()));
    }
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>) {
        self.drop_constraints_mentioning(x);
        self.env.assign_expr(x, e);
        // x - e == 0, i.e. x's term minus e's terms.
        let expr = LinearExpression::term(ZNumber::one(), x.clone()).sub(e);
        self.push_constraint(LinearConstraint::equals_zero(expr));
    }

    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V) {
        self.drop_constraints_mentioning(x);
        self.env.apply(op, x, y, z);
        if is_linear_op(op) {
            let rhs = match op {
                BinaryOp::Add => LinearExpression::variable(y.clone()).add(&LinearExpression::variable(z.clone())),
                BinaryOp::Sub => LinearExpression::variable(y.clone()).sub(&LinearExpression::variable(z.clone())),
                _ => unreachable!("is_linear_op guards this match"),
            };
            let expr = LinearExpression::term(ZNumber::one(), x.clone()).sub(&rhs);
            self.push_constraint(LinearConstraint::equals_zero(expr));
        }
    }
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber) {
        self.drop_constraints_mentioning(x);
        self.env.apply_const(op, x, y, k.clone());
        let affine = match op {
            BinaryOp::Add => {
                Some(LinearExpression::variable(y.clone()).add(&LinearExpression::constant(k)))
            }
            BinaryOp::Sub => {
                Some(LinearExpression::variable(y.clone()).add(&LinearExpression::constant(-k)))
            }
            BinaryOp::Mul => Some(LinearExpression::term(k, y.clone())),
            _ => None,
        };
        if let Some(rhs) = affine {
            let expr = LinearExpression::term(ZNumber::one(), x.clone()).sub(&rhs);
            self.push_constraint(LinearConstraint::equals_zero(expr));
        }
    }

    fn add_constraint(&mut self, c: &LinearConstraint<V>) {
        if self.is_bottom() {
            return;
        }
        if c.is_contradiction() {
            self.set_to_bottom();
            return;
        }
        if c.kind() == ConstraintKind::NotEquals || c.is_tautology() {
            return;
        }
        self.push_constraint(c.clone());
    }

    fn set_interval(&mut self, x: &V, v: Interval) {
        self.drop_constraints_mentioning(x);
        self.env.set_interval(x, v);
    }
    fn set_congruence(&mut self, x: &V, v: Congruence) {
        self.env.set_congruence(x, v);
    }
    fn set_interval_congruence(&mut self, x: &V, v: crate::domain::IntervalCongruence) {
        self.drop_constraints_mentioning(x);
        self.env.set_interval_congruence(x, v);
    }
    fn refine_interval(&mut self, x: &V, v: Interval) {
        self.env.refine_interval(x, v);
        if self.env.is_bottom() {
            self.bottom = true;
        }
    }
    fn refine_congruence(&mut self, x: &V, v: Congruence) {
        self.env.refine_congruence(x, v);
    }
    fn refine_interval_congruence(&mut self, x: &V, v: crate::domain::IntervalCongruence) {
        self.env.refine_interval_congruence(x, v);
        if self.env.is_bottom() {
            self.bottom = true;
        }
    }

    fn forget(&mut self, x: &V) {
        self.drop_constraints_mentioning(x);
        self.env.forget(x);
    }

    fn to_interval(&self, x: &V) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        self.env.to_interval(x)
    }
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        self.env.to_interval_expr(e)
    }
    fn to_congruence(&self, x: &V) -> Congruence {
        self.env.to_congruence(x)
    }
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V> {
        if self.is_bottom() {
            return std::iter::once(LinearConstraint::contradiction()).collect();
        }
        self.constraints.iter().cloned().collect()
    }

    fn dump(&self) -> String {
        if self.is_bottom() {
            return "\u{22a5}".to_string();
        }
        let mut parts: Vec<String> = self
            .constraints
            .iter()
            .map(|c| format!("{} {} 0", c.expr(), constraint_symbol(c.kind())))
            .collect();
        parts.sort();
        format!("{{{}}}", parts.join(" \u{2227} "))
    }
}

fn constraint_symbol(kind: ConstraintKind) -> &'static str {
    match kind {
        ConstraintKind::Equals => "==",
        ConstraintKind::NotEquals => "!=",
        ConstraintKind::LessEquals => "<=",
        ConstraintKind::LessThan => "<",
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
    fn linear_assignment_is_exact() {
        let mut d = Polyhedra::<V>::top();
        d.assign_number(&V("x"), ZNumber::from(3i64));
        d.apply_const(BinaryOp::Add, &V("y"), &V("x"), ZNumber::from(4i64));
        assert_eq!(d.to_interval(&V("y")), Interval::singleton(ZNumber::from(7i64)));
    }

    #[test]
    fn join_keeps_only_shared_constraints() {
        let mut a = Polyhedra::<V>::top();
        a.assign_number(&V("x"), ZNumber::from(1i64));
        let b = Polyhedra::<V>::top();
        let joined = a.join(&b);
        assert!(joined.to_interval(&V("x")).is_top());
    }

    #[test]
    fn contradiction_is_bottom() {
        let mut d = Polyhedra::<V>::top();
        d.add_constraint(&LinearConstraint::contradiction());
        assert!(d.is_bottom());
    }
}
