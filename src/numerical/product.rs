//! Reduced domain products (`spec.md` §4.5, `Domain products`).
//!
//! `Product2<V, D1, D2>` stores both components; lattice operations act
//! componentwise; transfer functions call both and projections meet the
//! two results (sound because `gamma(a, b) = gamma(a) ∩ gamma(b)`). A
//! `reduce()` hook exchanges information between components after every
//! transfer function — an interval learned by `D1` is refined into `D2`
//! and vice versa — invoked from `normalize()`. `Product3` is defined as
//! `Product2<Product2<D1, D2>, D3>`.

use crate::domain::{Congruence, Interval, IntervalCongruence};
use crate::interfaces::Variable;
use crate::linear::{LinearConstraint, LinearConstraintSystem, LinearExpression};
use crate::number::ZNumber;
use crate::numerical::traits::{BinaryOp, NumericalDomain};
use std::collections::BTreeSet;
use std::marker::PhantomData;

#[derive(Clone, Debug)]
pub struct Product2<V, D1, D2> {
    d1: D1,
    d2: D2,
    _var: PhantomData<V>,
}

pub type Product3<V, D1, D2, D3> = Product2<V, Product2<V, D1, D2>, D3>;

impl<V: Variable, D1: NumericalDomain<V>, D2: NumericalDomain<V>> Product2<V, D1, D2> {
    pub fn first(&self) -> &D1 {
        &self.d1
    }
    pub fn second(&self) -> &D2 {
        &self.d2
    }

    /// Variables either component has an opinion about.
    fn tracked_vars(&self) -> BTreeSet<V> {
        let mut vars = BTreeSet::new();
        for c in self.d1.to_linear_constraint_system().iter() {
            vars.extend(c.expr().variables().cloned());
        }
        for c in self.d2.to_linear_constraint_system().iter() {
            vars.extend(c.expr().variables().cloned());
        }
        vars
    }

    /// Exchange `IntervalCongruence` facts between components for every
    /// tracked variable: each side's projection is met with the other's.
    fn reduce(&mut self) {
        for x in self.tracked_vars() {
            let ic1 = self.d1.to_interval_congruence(&x);
            let ic2 = self.d2.to_interval_congruence(&x);
            let merged = ic1.meet(&ic2);
            if merged.is_bottom() {
                self.d1.set_to_bottom();
                self.d2.set_to_bottom();
                return;
            }
            self.d1.set_interval_congruence(&x, merged.clone());
            self.d2.set_interval_congruence(&x, merged);
        }
    }
}

impl<V: Variable, D1: NumericalDomain<V>, D2: NumericalDomain<V>> NumericalDomain<V> for Product2<V, D1, D2> {
    fn top() -> Self {
        Self { d1: D1::top(), d2: D2::top(), _var: PhantomData }
    }
    fn bottom() -> Self {
        Self { d1: D1::bottom(), d2: D2::bottom(), _var: PhantomData }
    }
    fn is_top(&self) -> bool {
        self.d1.is_top() && self.d2.is_top()
    }
    fn is_bottom(&self) -> bool {
        self.d1.is_bottom() || self.d2.is_bottom()
    }
    fn set_to_bottom(&mut self) {
        self.d1.set_to_bottom();
        self.d2.set_to_bottom();
    }

    fn leq(&self, other: &Self) -> bool {
        self.d1.leq(&other.d1) && self.d2.leq(&other.d2)
    }
    fn equals(&self, other: &Self) -> bool {
        self.d1.equals(&other.d1) && self.d2.equals(&other.d2)
    }
    fn join(&self, other: &Self) -> Self {
        let mut result = Self { d1: self.d1.join(&other.d1), d2: self.d2.join(&other.d2), _var: PhantomData };
        result.reduce();
        result
    }
    fn meet(&self, other: &Self) -> Self {
        let mut result = Self { d1: self.d1.meet(&other.d1), d2: self.d2.meet(&other.d2), _var: PhantomData };
        result.reduce();
        result
    }
    fn join_loop(&self, other: &Self) -> Self {
        let mut result =
            Self { d1: self.d1.join_loop(&other.d1), d2: self.d2.join_loop(&other.d2), _var: PhantomData };
        result.reduce();
        result
    }
    fn join_iter(&self, other: &Self) -> Self {
        let mut result =
            Self { d1: self.d1.join_iter(&other.d1), d2: self.d2.join_iter(&other.d2), _var: PhantomData };
        result.reduce();
        result
    }
    fn widening(&self, other: &Self) -> Self {
        let mut result = Self { d1: self.d1.widening(&other.d1), d2: self.d2.widening(&other.d2), _var: PhantomData };
        result.reduce();
        result
    }
    fn narrowing(&self, other: &Self) -> Self {
        let mut result =
            Self { d1: self.d1.narrowing(&other.d1), d2: self.d2.narrowing(&other.d2), _var: PhantomData };
        result.reduce();
        result
    }
    fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        let mut result = Self {
            d1: self.d1.widening_threshold(&other.d1, threshold),
            d2: self.d2.widening_threshold(&other.d2, threshold),
            _var: PhantomData,
        };
        result.reduce();
        result
    }
    fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        let mut result = Self {
            d1: self.d1.narrowing_threshold(&other.d1, threshold),
            d2: self.d2.narrowing_threshold(&other.d2, threshold),
            _var: PhantomData,
        };
        result.reduce();
        result
    }

    fn normalize(&mut self) {
        self.d1.normalize();
        self.d2.normalize();
        self.reduce();
    }

    fn assign_number(&mut self, x: &V, n: ZNumber) {
        self.d1.assign_number(x, n.clone());
        self.d2.assign_number(x, n);
        self.reduce();
    }
    fn assign_var(&mut self, x: &V, y: &V) {
        self.d1.assign_var(x, y);
        self.d2.assign_var(x, y);
        self.reduce();
    }
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>) {
        self.d1.assign_expr(x, e);
        self.d2.assign_expr(x, e);
        self.reduce();
    }
    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V) {
        self.d1.apply(op, x, y, z);
        self.d2.apply(op, x, y, z);
        self.reduce();
    }
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber) {
        self.d1.apply_const(op, x, y, k.clone());
        self.d2.apply_const(op, x, y, k);
        self.reduce();
    }

    fn add_constraint(&mut self, c: &LinearConstraint<V>) {
        self.d1.add_constraint(c);
        self.d2.add_constraint(c);
        self.reduce();
    }

    fn set_interval(&mut self, x: &V, v: Interval) {
        self.d1.set_interval(x, v.clone());
        self.d2.set_interval(x, v);
        self.reduce();
    }
    fn set_congruence(&mut self, x: &V, v: Congruence) {
        self.d1.set_congruence(x, v.clone());
        self.d2.set_congruence(x, v);
        self.reduce();
    }
    fn set_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        self.d1.set_interval_congruence(x, v.clone());
        self.d2.set_interval_congruence(x, v);
        self.reduce();
    }
    fn refine_interval(&mut self, x: &V, v: Interval) {
        self.d1.refine_interval(x, v.clone());
        self.d2.refine_interval(x, v);
        self.reduce();
    }
    fn refine_congruence(&mut self, x: &V, v: Congruence) {
        self.d1.refine_congruence(x, v.clone());
        self.d2.refine_congruence(x, v);
        self.reduce();
    }
    fn refine_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        self.d1.refine_interval_congruence(x, v.clone());
        self.d2.refine_interval_congruence(x, v);
        self.reduce();
    }

    fn forget(&mut self, x: &V) {
        self.d1.forget(x);
        self.d2.forget(x);
    }

    fn to_interval(&self, x: &V) -> Interval {
        self.d1.to_interval(x).meet(&self.d2.to_interval(x))
    }
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval {
        self.d1.to_interval_expr(e).meet(&self.d2.to_interval_expr(e))
    }
    fn to_congruence(&self, x: &V) -> Congruence {
        self.d1.to_congruence(x).meet(&self.d2.to_congruence(x))
    }
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V> {
        let mut sys = self.d1.to_linear_constraint_system();
        for c in self.d2.to_linear_constraint_system().iter() {
            sys.push(c.clone());
        }
        sys
    }

    fn counter_mark(&mut self, x: &V) {
        self.d1.counter_mark(x);
        self.d2.counter_mark(x);
    }
    fn counter_unmark(&mut self, x: &V) {
        self.d1.counter_unmark(x);
        self.d2.counter_unmark(x);
    }
    fn counter_init(&mut self, x: &V, c: ZNumber) {
        self.d1.counter_init(x, c.clone());
        self.d2.counter_init(x, c);
        self.reduce();
    }
    fn counter_incr(&mut self, x: &V, k: ZNumber) {
        self.d1.counter_incr(x, k.clone());
        self.d2.counter_incr(x, k);
        self.reduce();
    }
    fn counter_forget(&mut self, x: &V) {
        self.d1.counter_forget(x);
        self.d2.counter_forget(x);
    }

    fn dump(&self) -> String {
        format!("{} x {}", self.d1.dump(), self.d2.dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::Dbm;
    use crate::numerical::IntervalStore;

    #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    struct V(&'static str);
    impl Variable for V {
        fn name_for_dump(&self) -> String {
            self.0.to_string()
        }
    }

    type P = Product2<V, IntervalStore<V>, Dbm<V>>;

    #[test]
    fn reduction_propagates_dbm_fact_into_interval_component() {
        let mut p = P::top();
        p.assign_number(&V("x"), ZNumber::from(10i64));
        p.assign_number(&V("y"), ZNumber::from(0i64));
        p.apply(BinaryOp::Sub, &V("d"), &V("x"), &V("y"));
        // d = x - y is an exact relational fact in the DBM component; the
        // interval component alone never sees it until reduction runs.
        assert_eq!(p.to_interval(&V("d")), Interval::singleton(ZNumber::from(10i64)));
    }

    #[test]
    fn bottom_in_either_component_is_product_bottom() {
        let mut p = P::top();
        p.add_constraint(&LinearConstraint::contradiction());
        assert!(p.is_bottom());
    }

    #[test]
    fn meet_of_two_tops_is_top() {
        let p = P::top();
        let q = P::top();
        assert!(p.meet(&q).is_top());
    }
}
