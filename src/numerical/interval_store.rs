//! Non-relational interval/congruence store (`spec.md` §4.5): one
//! `IntervalCongruence` per variable, absent variables implicitly top.

use crate::domain::{Congruence, Interval, IntervalCongruence};
use crate::interfaces::Variable;
use crate::linear::{ConstraintKind, LinearConstraint, LinearConstraintSystem, LinearExpression};
use crate::number::{Bound, ZNumber};
use crate::numerical::traits::{BinaryOp, NumericalDomain};
use std::collections::{BTreeMap, BTreeSet};

/// `bottom | (V -> IntervalCongruence)`, a map-based environment domain.
/// A variable missing from `values` is implicitly top; the canonical form
/// never stores a top value explicitly.
#[derive(Clone, Debug)]
pub struct IntervalStore<V: Variable> {
    bottom: bool,
    values: BTreeMap<V, IntervalCongruence>,
}

impl<V: Variable> IntervalStore<V> {
    fn get(&self, x: &V) -> IntervalCongruence {
        if self.bottom {
            return IntervalCongruence::bottom();
        }
        self.values.get(x).cloned().unwrap_or_else(IntervalCongruence::top)
    }

    fn put(&mut self, x: &V, v: IntervalCongruence) {
        if self.bottom {
            return;
        }
        if v.is_bottom() {
            self.set_to_bottom();
        } else if v.is_top() {
            self.values.remove(x);
        } else {
            self.values.insert(x.clone(), v);
        }
    }

    fn eval_expr(&self, e: &LinearExpression<V>) -> IntervalCongruence {
        let mut acc = IntervalCongruence::singleton(e.constant_term().clone());
        for (v, c) in e.terms() {
            let coeff = IntervalCongruence::singleton(c.clone());
            acc = acc.add(&self.get(v).mul(&coeff));
        }
        acc
    }

    fn keys_union<'a>(&'a self, other: &'a Self) -> BTreeSet<&'a V> {
        self.values.keys().chain(other.values.keys()).collect()
    }

    fn apply_op(op: BinaryOp, a: &IntervalCongruence, b: &IntervalCongruence) -> IntervalCongruence {
        match op {
            BinaryOp::Add => a.add(b),
            BinaryOp::Sub => a.sub(b),
            BinaryOp::Mul => a.mul(b),
            BinaryOp::Div => a.div(b),
            BinaryOp::Rem => a.rem(b),
            BinaryOp::Mod => a.mod_(b),
            BinaryOp::Shl => a.shl(b),
            BinaryOp::Shr => a.shr(b),
            BinaryOp::And => a.bitand(b),
            BinaryOp::Or => a.bitor(b),
            BinaryOp::Xor => a.bitxor(b),
        }
    }
}

impl<V: Variable> NumericalDomain<V> for IntervalStore<V> {
    fn top() -> Self {
        Self { bottom: false, values: BTreeMap::new() }
    }
    fn bottom() -> Self {
        Self { bottom: true, values: BTreeMap::new() }
    }
    fn is_top(&self) -> bool {
        !self.bottom && self.values.is_empty()
    }
    fn is_bottom(&self) -> bool {
        self.bottom
    }
    fn set_to_bottom(&mut self) {
        self.bottom = true;
        self.values.clear();
    }

    fn leq(&self, other: &Self) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        other.values.iter().all(|(k, v)| self.get(k).leq(v))
    }
    fn equals(&self, other: &Self) -> bool {
        if self.bottom || other.bottom {
            return self.bottom == other.bottom;
        }
        self.keys_union(other).into_iter().all(|k| self.get(k).equals(&other.get(k)))
    }

    fn join(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut result = Self::top();
        for k in self.keys_union(other) {
            result.put(k, self.get(k).join(&other.get(k)));
        }
        result
    }
    fn meet(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let mut result = Self::top();
        for k in self.keys_union(other) {
            result.put(k, self.get(k).meet(&other.get(k)));
            if result.is_bottom() {
                return result;
            }
        }
        result
    }
    fn widening(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut result = Self::top();
        for k in self.keys_union(other) {
            let merged = match (self.values.contains_key(k), other.values.contains_key(k)) {
                (true, _) => self.get(k).widening(&other.get(k)),
                (false, true) => other.get(k),
                (false, false) => unreachable!("key came from the union of both maps"),
            };
            result.put(k, merged);
        }
        result
    }
    fn narrowing(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let mut result = Self::top();
        for k in self.keys_union(other) {
            let merged = match (self.values.contains_key(k), other.values.contains_key(k)) {
                (true, true) => self.get(k).narrowing(&other.get(k)),
                (true, false) => self.get(k),
                (false, _) => other.get(k),
            };
            result.put(k, merged);
        }
        result
    }
    fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let mut result = Self::top();
        for k in self.keys_union(other) {
            let merged = if self.values.contains_key(k) {
                let (a, b) = (self.get(k), other.get(k));
                IntervalCongruence::new(
                    a.interval().widening_threshold(b.interval(), threshold),
                    a.congruence().widening(b.congruence()),
                )
            } else {
                other.get(k)
            };
            result.put(k, merged);
        }
        result
    }
    fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let mut result = Self::top();
        for k in self.keys_union(other) {
            let merged = if self.values.contains_key(k) && other.values.contains_key(k) {
                let (a, b) = (self.get(k), other.get(k));
                IntervalCongruence::new(
                    a.interval().narrowing_threshold(b.interval(), threshold),
                    a.congruence().narrowing(b.congruence()),
                )
            } else if self.values.contains_key(k) {
                self.get(k)
            } else {
                other.get(k)
            };
            result.put(k, merged);
        }
        result
    }

    fn assign_number(&mut self, x: &V, n: ZNumber) {
        self.put(x, IntervalCongruence::singleton(n));
    }
    fn assign_var(&mut self, x: &V, y: &V) {
        let v = self.get(y);
        self.put(x, v);
    }
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>) {
        let v = self.eval_expr(e);
        self.put(x, v);
    }

    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V) {
        let v = Self::apply_op(op, &self.get(y), &self.get(z));
        self.put(x, v);
    }
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber) {
        let v = Self::apply_op(op, &self.get(y), &IntervalCongruence::singleton(k));
        self.put(x, v);
    }

    fn add_constraint(&mut self, c: &LinearConstraint<V>) {
        if self.bottom {
            return;
        }
        if c.is_contradiction() {
            self.set_to_bottom();
            return;
        }
        // Only constraints on a single variable with a unit coefficient are
        // refined directly; the general relational case is left to
        // relational domains (DBM, polyhedra) layered on top via a product.
        if c.expr().num_terms() != 1 {
            return;
        }
        let (v, coeff) = c.expr().terms().next().expect("num_terms() == 1");
        // `expr = coeff*v + constant`; only unit coefficients (+-1) give a
        // direct bound on `v` without dividing the constant.
        let constant = c.expr().constant_term().clone();
        let refined = if *coeff == ZNumber::one() {
            // v + constant {kind} 0  <=>  v {kind} -constant
            let bound = -constant;
            match c.kind() {
                ConstraintKind::Equals => IntervalCongruence::singleton(bound),
                ConstraintKind::LessEquals => upper_bound(bound),
                ConstraintKind::LessThan => upper_bound(bound - ZNumber::one()),
                ConstraintKind::NotEquals => return,
            }
        } else if *coeff == -ZNumber::one() {
            // -v + constant {kind} 0  <=>  v {reversed kind} constant
            match c.kind() {
                ConstraintKind::Equals => IntervalCongruence::singleton(constant),
                ConstraintKind::LessEquals => lower_bound(constant),
                ConstraintKind::LessThan => lower_bound(constant + ZNumber::one()),
                ConstraintKind::NotEquals => return,
            }
        } else {
            return;
        };
        let current = self.get(v);
        self.put(v, current.meet(&refined));
    }

    fn set_interval(&mut self, x: &V, v: Interval) {
        let cur = self.get(x);
        self.put(x, IntervalCongruence::new(v, cur.congruence().clone()));
    }
    fn set_congruence(&mut self, x: &V, v: Congruence) {
        let cur = self.get(x);
        self.put(x, IntervalCongruence::new(cur.interval().clone(), v));
    }
    fn set_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        self.put(x, v);
    }
    fn refine_interval(&mut self, x: &V, v: Interval) {
        let cur = self.get(x);
        self.put(x, cur.meet(&IntervalCongruence::new(v, Congruence::top())));
    }
    fn refine_congruence(&mut self, x: &V, v: Congruence) {
        let cur = self.get(x);
        self.put(x, cur.meet(&IntervalCongruence::new(Interval::top(), v)));
    }
    fn refine_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        let cur = self.get(x);
        self.put(x, cur.meet(&v));
    }

    fn forget(&mut self, x: &V) {
        if !self.bottom {
            self.values.remove(x);
        }
    }

    fn to_interval(&self, x: &V) -> Interval {
        self.get(x).interval().clone()
    }
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval {
        self.eval_expr(e).interval().clone()
    }
    fn to_congruence(&self, x: &V) -> Congruence {
        self.get(x).congruence().clone()
    }
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V> {
        if self.bottom {
            return std::iter::once(LinearConstraint::contradiction()).collect();
        }
        let mut sys = LinearConstraintSystem::new();
        for (v, ic) in &self.values {
            let interval = ic.interval();
            if let Some(lo) = interval.lb().as_finite() {
                // -v + lo <= 0  <=>  v >= lo
                let e = LinearExpression::term(-ZNumber::one(), v.clone())
                    .add(&LinearExpression::constant(lo.clone()));
                sys.push(LinearConstraint::leq_zero(e));
            }
            if let Some(hi) = interval.ub().as_finite() {
                // v - hi <= 0  <=>  v <= hi
                let e = LinearExpression::term(ZNumber::one(), v.clone())
                    .add(&LinearExpression::constant(-hi.clone()));
                sys.push(LinearConstraint::leq_zero(e));
            }
        }
        sys
    }

    fn dump(&self) -> String {
        if self.bottom {
            return "\u{22a5}".to_string();
        }
        let mut parts: Vec<String> =
            self.values.iter().map(|(k, v)| format!("{} -> {}", k.name_for_dump(), v.dump())).collect();
        parts.sort();
        format!("{{{}}}", parts.join(", "))
    }
}

fn upper_bound(bound: ZNumber) -> IntervalCongruence {
    let interval = Interval::closed(Bound::minus_infinity(), Bound::finite(bound));
    IntervalCongruence::new(interval, Congruence::top())
}
fn lower_bound(bound: ZNumber) -> IntervalCongruence {
    let interval = Interval::closed(Bound::finite(bound), Bound::plus_infinity());
    IntervalCongruence::new(interval, Congruence::top())
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
    fn assign_and_apply_tracks_interval() {
        let mut d = IntervalStore::<V>::top();
        d.assign_number(&V("x"), ZNumber::from(5i64));
        d.assign_number(&V("y"), ZNumber::from(3i64));
        d.apply(BinaryOp::Add, &V("z"), &V("x"), &V("y"));
        assert_eq!(d.to_interval(&V("z")), Interval::singleton(ZNumber::from(8i64)));
    }

    #[test]
    fn forget_widens_to_top() {
        let mut d = IntervalStore::<V>::top();
        d.assign_number(&V("x"), ZNumber::from(5i64));
        d.forget(&V("x"));
        assert!(d.to_interval(&V("x")).is_top());
        assert!(d.is_top());
    }

    #[test]
    fn contradiction_constraint_is_bottom() {
        let mut d = IntervalStore::<V>::top();
        d.add_constraint(&LinearConstraint::contradiction());
        assert!(d.is_bottom());
    }

    #[test]
    fn join_drops_variables_unconstrained_on_either_side() {
        let mut a = IntervalStore::<V>::top();
        a.assign_number(&V("x"), ZNumber::from(1i64));
        let b = IntervalStore::<V>::top();
        let joined = a.join(&b);
        assert!(joined.to_interval(&V("x")).is_top());
    }

    #[test]
    fn widening_extrapolates_growing_bound() {
        let mut a = IntervalStore::<V>::top();
        a.refine_interval(&V("x"), Interval::closed(
            Bound::finite(ZNumber::zero()),
            Bound::finite(ZNumber::from(1i64)),
        ));
        let mut b = a.clone();
        b.set_interval(&V("x"), Interval::closed(
            Bound::finite(ZNumber::zero()),
            Bound::finite(ZNumber::from(2i64)),
        ));
        let widened = a.widening(&b);
        assert!(widened.to_interval(&V("x")).ub().is_plus_infinity());
    }
}
