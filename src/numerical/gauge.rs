//! Gauge domain (`spec.md` §4.5, `Gauge domain`): bounds of the form
//! `a0 + sum(ai * ii)` over explicitly marked non-negative loop counters.
//!
//! Built as an `IntervalStore` (the concrete fallback, and the thing every
//! transfer function actually updates) plus a side table of exact symbolic
//! gauges synthesized only at `widening` time, when a variable's growth
//! across two increasing iterates tracks a counter's growth linearly
//! (`spec.md` §8, Scenario E).

use crate::domain::{Congruence, Interval};
use crate::interfaces::Variable;
use crate::linear::{LinearConstraint, LinearConstraintSystem, LinearExpression};
use crate::number::ZNumber;
use crate::numerical::interval_store::IntervalStore;
use crate::numerical::traits::{BinaryOp, NumericalDomain};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
pub struct Gauge<V: Variable> {
    counters: BTreeSet<V>,
    interval: IntervalStore<V>,
    gauges: BTreeMap<V, LinearExpression<V>>,
}

impl<V: Variable> Gauge<V> {
    fn drop_gauge(&mut self, x: &V) {
        self.gauges.remove(x);
        self.gauges.retain(|_, g| !g.variables().any(|v| v == x));
    }

    /// Try to synthesize `x`'s gauge from how far `x` and a tracked counter
    /// each moved between `self` (previous iterate) and `other` (next).
    fn synthesize_gauge(&self, other: &Self, x: &V) -> Option<LinearExpression<V>> {
        let sx = self.interval.to_interval(x);
        let ox = other.interval.to_interval(x);
        let (sx_lo, sx_hi) = (sx.lb().as_finite()?, sx.ub().as_finite()?);
        let (_ox_lo, ox_hi) = (ox.lb().as_finite()?, ox.ub().as_finite()?);
        if sx_lo != sx_hi {
            return None; // x wasn't a known singleton at the previous iterate
        }
        let delta_x = ox_hi - sx_hi;
        if delta_x.is_zero() {
            return None;
        }
        for c in &self.counters {
            let sc = self.interval.to_interval(c);
            let oc = other.interval.to_interval(c);
            let (Some(sc_v), Some(oc_v)) = (sc.as_singleton(), oc.as_singleton()) else { continue };
            let delta_c = oc_v - sc_v;
            if delta_c.is_zero() || !(&delta_x % &delta_c).is_zero() {
                continue;
            }
            let coeff = delta_x.clone() / delta_c;
            let offset = sx_hi.clone() - (coeff.clone() * sc_v.clone());
            return Some(LinearExpression::term(coeff, c.clone()).add(&LinearExpression::constant(offset)));
        }
        None
    }
}

impl<V: Variable> NumericalDomain<V> for Gauge<V> {
    fn top() -> Self {
        Self { counters: BTreeSet::new(), interval: IntervalStore::top(), gauges: BTreeMap::new() }
    }
    fn bottom() -> Self {
        Self { counters: BTreeSet::new(), interval: IntervalStore::bottom(), gauges: BTreeMap::new() }
    }
    fn is_top(&self) -> bool {
        self.interval.is_top() && self.gauges.is_empty()
    }
    fn is_bottom(&self) -> bool {
        self.interval.is_bottom()
    }
    fn set_to_bottom(&mut self) {
        self.interval.set_to_bottom();
        self.gauges.clear();
    }

    fn leq(&self, other: &Self) -> bool {
        self.interval.leq(&other.interval)
    }
    fn equals(&self, other: &Self) -> bool {
        self.interval.equals(&other.interval)
    }
    fn join(&self, other: &Self) -> Self {
        let counters = self.counters.union(&other.counters).cloned().collect();
        let gauges = self
            .gauges
            .iter()
            .filter_map(|(k, g)| (other.gauges.get(k) == Some(g)).then(|| (k.clone(), g.clone())))
            .collect();
        Self { counters, interval: self.interval.join(&other.interval), gauges }
    }
    fn meet(&self, other: &Self) -> Self {
        let counters = self.counters.union(&other.counters).cloned().collect();
        let mut gauges = self.gauges.clone();
        gauges.extend(other.gauges.iter().map(|(k, g)| (k.clone(), g.clone())));
        Self { counters, interval: self.interval.meet(&other.interval), gauges }
    }
    fn widening(&self, other: &Self) -> Self {
        let counters: BTreeSet<V> = self.counters.union(&other.counters).cloned().collect();
        let mut gauges = self.gauges.clone();
        let mut vars: BTreeSet<V> =
            self.interval.to_linear_constraint_system().iter().flat_map(|c| c.expr().variables().cloned()).collect();
        vars.extend(other.interval.to_linear_constraint_system().iter().flat_map(|c| c.expr().variables().cloned()));
        for x in &vars {
            if counters.contains(x) || gauges.contains_key(x) {
                continue;
            }
            if let Some(g) = self.synthesize_gauge(other, x) {
                gauges.insert(x.clone(), g);
            }
        }
        Self { counters, interval: self.interval.widening(&other.interval), gauges }
    }
    fn narrowing(&self, other: &Self) -> Self {
        let counters = self.counters.union(&other.counters).cloned().collect();
        Self { counters, interval: self.interval.narrowing(&other.interval), gauges: self.gauges.clone() }
    }
    fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        let mut result = self.widening(other);
        result.interval = self.interval.widening_threshold(&other.interval, threshold);
        result
    }
    fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        let mut result = self.narrowing(other);
        result.interval = self.interval.narrowing_threshold(&other.interval, threshold);
        result
    }

    fn assign_number(&mut self, x: &V, n: ZNumber) {
        self.drop_gauge(x);
        self.interval.assign_number(x, n);
    }
    fn assign_var(&mut self, x: &V, y: &V) {
        self.drop_gauge(x);
        self.interval.assign_var(x, y);
    }
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>) {
        self.drop_gauge(x);
        self.interval.assign_expr(x, e);
    }
    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V) {
        self.drop_gauge(x);
        self.interval.apply(op, x, y, z);
    }
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber) {
        self.drop_gauge(x);
        self.interval.apply_const(op, x, y, k);
    }

    fn add_constraint(&mut self, c: &LinearConstraint<V>) {
        self.interval.add_constraint(c);
    }

    fn set_interval(&mut self, x: &V, v: Interval) {
        self.drop_gauge(x);
        self.interval.set_interval(x, v);
    }
    fn set_congruence(&mut self, x: &V, v: Congruence) {
        self.interval.set_congruence(x, v);
    }
    fn set_interval_congruence(&mut self, x: &V, v: crate::domain::IntervalCongruence) {
        self.drop_gauge(x);
        self.interval.set_interval_congruence(x, v);
    }
    fn refine_interval(&mut self, x: &V, v: Interval) {
        self.interval.refine_interval(x, v);
    }
    fn refine_congruence(&mut self, x: &V, v: Congruence) {
        self.interval.refine_congruence(x, v);
    }
    fn refine_interval_congruence(&mut self, x: &V, v: crate::domain::IntervalCongruence) {
        self.interval.refine_interval_congruence(x, v);
    }

    fn forget(&mut self, x: &V) {
        self.counters.remove(x);
        self.drop_gauge(x);
        self.interval.forget(x);
    }

    fn to_interval(&self, x: &V) -> Interval {
        let base = self.interval.to_interval(x);
        match self.gauges.get(x) {
            Some(g) => base.meet(&self.interval.to_interval_expr(g)),
            None => base,
        }
    }
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval {
        self.interval.to_interval_expr(e)
    }
    fn to_congruence(&self, x: &V) -> Congruence {
        self.interval.to_congruence(x)
    }
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V> {
        self.interval.to_linear_constraint_system()
    }

    fn counter_mark(&mut self, x: &V) {
        self.counters.insert(x.clone());
    }
    fn counter_unmark(&mut self, x: &V) {
        self.counters.remove(x);
        self.drop_gauge(x);
    }
    fn counter_init(&mut self, x: &V, c: ZNumber) {
        self.counter_mark(x);
        self.drop_gauge(x);
        self.interval.assign_number(x, c);
    }
    fn counter_incr(&mut self, x: &V, k: ZNumber) {
        self.interval.apply_const(BinaryOp::Add, x, x, k);
    }
    fn counter_forget(&mut self, x: &V) {
        self.counter_unmark(x);
        self.interval.forget(x);
    }

    fn dump(&self) -> String {
        if self.gauges.is_empty() {
            return self.interval.dump();
        }
        let mut gauge_parts: Vec<String> =
            self.gauges.iter().map(|(k, g)| format!("{} = {}", k.name_for_dump(), g)).collect();
        gauge_parts.sort();
        format!("{} [gauges: {}]", self.interval.dump(), gauge_parts.join(", "))
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
    fn scenario_e_gauge_tracks_loop_counter() {
        let mut before = Gauge::<V>::top();
        before.counter_init(&V("i"), ZNumber::zero());
        before.assign_number(&V("x"), ZNumber::zero());

        let mut after_one_iter = before.clone();
        after_one_iter.counter_incr(&V("i"), ZNumber::one());
        after_one_iter.apply_const(BinaryOp::Add, &V("x"), &V("x"), ZNumber::from(2i64));

        let widened = before.widening(&after_one_iter);
        assert!(widened.to_interval(&V("x")).ub().is_plus_infinity());
        assert!(widened.gauges.contains_key(&V("x")));

        let mut refined = widened;
        refined.add_constraint(&LinearConstraint::leq_zero(
            LinearExpression::variable(V("i")).add(&LinearExpression::constant(-ZNumber::from(10i64))),
        ));
        assert_eq!(refined.to_interval(&V("x")).ub(), &crate::number::Bound::finite(ZNumber::from(20i64)));
    }
}
