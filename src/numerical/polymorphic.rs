//! Polymorphic type-erased domain (`spec.md` §4.5, `Polymorphic domain`).
//!
//! A heap-boxed domain value behind a uniform call table, carrying a
//! dynamic-type tag (`spec.md` §9, "virtual interfaces"). All lattice and
//! transfer operations forward to the boxed object. Mixing two values
//! whose underlying concrete types differ is a contract violation:
//! `join`/`meet`/`leq` assert the same dynamic type (`spec.md` §8,
//! Scenario F) and panic via [`ContractError::PolymorphicTypeMismatch`]
//! otherwise. `Clone` deep-copies the underlying domain.

use crate::domain::{Congruence, Interval, IntervalCongruence};
use crate::error::ContractError;
use crate::interfaces::Variable;
use crate::linear::{LinearConstraint, LinearConstraintSystem, LinearExpression};
use crate::number::ZNumber;
use crate::numerical::traits::{BinaryOp, NumericalDomain};
use std::any::Any;
use std::fmt;

/// Object-safe facade `NumericalDomain<V>` is generalized into so it can
/// be boxed. Every method here has a blanket impl below for any concrete
/// `D: NumericalDomain<V>`; callers never implement this by hand.
trait ErasedDomain<V: Variable>: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn clone_box(&self) -> Box<dyn ErasedDomain<V>>;
    fn type_name(&self) -> &'static str;

    fn is_top(&self) -> bool;
    fn is_bottom(&self) -> bool;
    fn set_to_bottom(&mut self);

    fn leq(&self, other: &dyn ErasedDomain<V>) -> bool;
    fn equals(&self, other: &dyn ErasedDomain<V>) -> bool;
    fn join(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>>;
    fn meet(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>>;
    fn widening(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>>;
    fn narrowing(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>>;
    fn widening_threshold(&self, other: &dyn ErasedDomain<V>, threshold: &ZNumber) -> Box<dyn ErasedDomain<V>>;
    fn narrowing_threshold(&self, other: &dyn ErasedDomain<V>, threshold: &ZNumber) -> Box<dyn ErasedDomain<V>>;

    fn assign_number(&mut self, x: &V, n: ZNumber);
    fn assign_var(&mut self, x: &V, y: &V);
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>);
    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V);
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber);
    fn add_constraint(&mut self, c: &LinearConstraint<V>);

    fn set_interval(&mut self, x: &V, v: Interval);
    fn set_congruence(&mut self, x: &V, v: Congruence);
    fn set_interval_congruence(&mut self, x: &V, v: IntervalCongruence);
    fn refine_interval(&mut self, x: &V, v: Interval);
    fn refine_congruence(&mut self, x: &V, v: Congruence);
    fn refine_interval_congruence(&mut self, x: &V, v: IntervalCongruence);

    fn forget(&mut self, x: &V);

    fn to_interval(&self, x: &V) -> Interval;
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval;
    fn to_congruence(&self, x: &V) -> Congruence;
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V>;

    fn counter_mark(&mut self, x: &V);
    fn counter_unmark(&mut self, x: &V);
    fn counter_init(&mut self, x: &V, c: ZNumber);
    fn counter_incr(&mut self, x: &V, k: ZNumber);
    fn counter_forget(&mut self, x: &V);

    fn dump(&self) -> String;
}

/// Downcasts `other` to `D`, raising the contract violation Scenario F
/// names when the runtime types disagree.
fn downcast<'a, V: Variable + 'static, D: 'static>(
    self_name: &'static str,
    other: &'a dyn ErasedDomain<V>,
) -> &'a D {
    other
        .as_any()
        .downcast_ref::<D>()
        .unwrap_or_else(|| ContractError::PolymorphicTypeMismatch(self_name, other.type_name()).raise())
}

impl<V: Variable + 'static, D: NumericalDomain<V> + 'static> ErasedDomain<V> for D {
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn clone_box(&self) -> Box<dyn ErasedDomain<V>> {
        Box::new(self.clone())
    }
    fn type_name(&self) -> &'static str {
        std::any::type_name::<D>()
    }

    fn is_top(&self) -> bool {
        NumericalDomain::is_top(self)
    }
    fn is_bottom(&self) -> bool {
        NumericalDomain::is_bottom(self)
    }
    fn set_to_bottom(&mut self) {
        NumericalDomain::set_to_bottom(self)
    }

    fn leq(&self, other: &dyn ErasedDomain<V>) -> bool {
        NumericalDomain::leq(self, downcast::<V, D>(self.type_name(), other))
    }
    fn equals(&self, other: &dyn ErasedDomain<V>) -> bool {
        NumericalDomain::equals(self, downcast::<V, D>(self.type_name(), other))
    }
    fn join(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>> {
        Box::new(NumericalDomain::join(self, downcast::<V, D>(self.type_name(), other)))
    }
    fn meet(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>> {
        Box::new(NumericalDomain::meet(self, downcast::<V, D>(self.type_name(), other)))
    }
    fn widening(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>> {
        Box::new(NumericalDomain::widening(self, downcast::<V, D>(self.type_name(), other)))
    }
    fn narrowing(&self, other: &dyn ErasedDomain<V>) -> Box<dyn ErasedDomain<V>> {
        Box::new(NumericalDomain::narrowing(self, downcast::<V, D>(self.type_name(), other)))
    }
    fn widening_threshold(&self, other: &dyn ErasedDomain<V>, threshold: &ZNumber) -> Box<dyn ErasedDomain<V>> {
        Box::new(NumericalDomain::widening_threshold(self, downcast::<V, D>(self.type_name(), other), threshold))
    }
    fn narrowing_threshold(&self, other: &dyn ErasedDomain<V>, threshold: &ZNumber) -> Box<dyn ErasedDomain<V>> {
        Box::new(NumericalDomain::narrowing_threshold(self, downcast::<V, D>(self.type_name(), other), threshold))
    }

    fn assign_number(&mut self, x: &V, n: ZNumber) {
        NumericalDomain::assign_number(self, x, n)
    }
    fn assign_var(&mut self, x: &V, y: &V) {
        NumericalDomain::assign_var(self, x, y)
    }
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>) {
        NumericalDomain::assign_expr(self, x, e)
    }
    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V) {
        NumericalDomain::apply(self, op, x, y, z)
    }
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber) {
        NumericalDomain::apply_const(self, op, x, y, k)
    }
    fn add_constraint(&mut self, c: &LinearConstraint<V>) {
        NumericalDomain::add_constraint(self, c)
    }

    fn set_interval(&mut self, x: &V, v: Interval) {
        NumericalDomain::set_interval(self, x, v)
    }
    fn set_congruence(&mut self, x: &V, v: Congruence) {
        NumericalDomain::set_congruence(self, x, v)
    }
    fn set_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        NumericalDomain::set_interval_congruence(self, x, v)
    }
    fn refine_interval(&mut self, x: &V, v: Interval) {
        NumericalDomain::refine_interval(self, x, v)
    }
    fn refine_congruence(&mut self, x: &V, v: Congruence) {
        NumericalDomain::refine_congruence(self, x, v)
    }
    fn refine_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        NumericalDomain::refine_interval_congruence(self, x, v)
    }

    fn forget(&mut self, x: &V) {
        NumericalDomain::forget(self, x)
    }

    fn to_interval(&self, x: &V) -> Interval {
        NumericalDomain::to_interval(self, x)
    }
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval {
        NumericalDomain::to_interval_expr(self, e)
    }
    fn to_congruence(&self, x: &V) -> Congruence {
        NumericalDomain::to_congruence(self, x)
    }
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V> {
        NumericalDomain::to_linear_constraint_system(self)
    }

    fn counter_mark(&mut self, x: &V) {
        NumericalDomain::counter_mark(self, x)
    }
    fn counter_unmark(&mut self, x: &V) {
        NumericalDomain::counter_unmark(self, x)
    }
    fn counter_init(&mut self, x: &V, c: ZNumber) {
        NumericalDomain::counter_init(self, x, c)
    }
    fn counter_incr(&mut self, x: &V, k: ZNumber) {
        NumericalDomain::counter_incr(self, x, k)
    }
    fn counter_forget(&mut self, x: &V) {
        NumericalDomain::counter_forget(self, x)
    }

    fn dump(&self) -> String {
        NumericalDomain::dump(self)
    }
}

/// A numerical domain value whose concrete type is erased at runtime.
///
/// Unlike the other `L5` domains this does not itself implement
/// `NumericalDomain<V>` — there is no type-free way to manufacture a
/// `top()`/`bottom()` without knowing which concrete domain to build, so
/// callers construct one from a concrete value with [`Polymorphic::new`].
pub struct Polymorphic<V: Variable> {
    inner: Box<dyn ErasedDomain<V>>,
}

impl<V: Variable + 'static> Polymorphic<V> {
    pub fn new<D: NumericalDomain<V> + 'static>(domain: D) -> Self {
        Self { inner: Box::new(domain) }
    }

    pub fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    /// Recovers the concrete domain if `D` matches the boxed runtime type.
    pub fn downcast_ref<D: NumericalDomain<V> + 'static>(&self) -> Option<&D> {
        self.inner.as_any().downcast_ref::<D>()
    }

    pub fn is_top(&self) -> bool {
        self.inner.is_top()
    }
    pub fn is_bottom(&self) -> bool {
        self.inner.is_bottom()
    }
    pub fn set_to_bottom(&mut self) {
        self.inner.set_to_bottom()
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.inner.leq(other.inner.as_ref())
    }
    pub fn equals(&self, other: &Self) -> bool {
        self.inner.equals(other.inner.as_ref())
    }
    pub fn join(&self, other: &Self) -> Self {
        Self { inner: self.inner.join(other.inner.as_ref()) }
    }
    pub fn meet(&self, other: &Self) -> Self {
        Self { inner: self.inner.meet(other.inner.as_ref()) }
    }
    pub fn widening(&self, other: &Self) -> Self {
        Self { inner: self.inner.widening(other.inner.as_ref()) }
    }
    pub fn narrowing(&self, other: &Self) -> Self {
        Self { inner: self.inner.narrowing(other.inner.as_ref()) }
    }
    pub fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        Self { inner: self.inner.widening_threshold(other.inner.as_ref(), threshold) }
    }
    pub fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        Self { inner: self.inner.narrowing_threshold(other.inner.as_ref(), threshold) }
    }

    pub fn assign_number(&mut self, x: &V, n: ZNumber) {
        self.inner.assign_number(x, n)
    }
    pub fn assign_var(&mut self, x: &V, y: &V) {
        self.inner.assign_var(x, y)
    }
    pub fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>) {
        self.inner.assign_expr(x, e)
    }
    pub fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V) {
        self.inner.apply(op, x, y, z)
    }
    pub fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber) {
        self.inner.apply_const(op, x, y, k)
    }
    pub fn add_constraint(&mut self, c: &LinearConstraint<V>) {
        self.inner.add_constraint(c)
    }

    pub fn set_interval(&mut self, x: &V, v: Interval) {
        self.inner.set_interval(x, v)
    }
    pub fn set_congruence(&mut self, x: &V, v: Congruence) {
        self.inner.set_congruence(x, v)
    }
    pub fn set_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        self.inner.set_interval_congruence(x, v)
    }
    pub fn refine_interval(&mut self, x: &V, v: Interval) {
        self.inner.refine_interval(x, v)
    }
    pub fn refine_congruence(&mut self, x: &V, v: Congruence) {
        self.inner.refine_congruence(x, v)
    }
    pub fn refine_interval_congruence(&mut self, x: &V, v: IntervalCongruence) {
        self.inner.refine_interval_congruence(x, v)
    }

    pub fn forget(&mut self, x: &V) {
        self.inner.forget(x)
    }

    pub fn to_interval(&self, x: &V) -> Interval {
        self.inner.to_interval(x)
    }
    pub fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval {
        self.inner.to_interval_expr(e)
    }
    pub fn to_congruence(&self, x: &V) -> Congruence {
        self.inner.to_congruence(x)
    }
    pub fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V> {
        self.inner.to_linear_constraint_system()
    }

    pub fn counter_mark(&mut self, x: &V) {
        self.inner.counter_mark(x)
    }
    pub fn counter_unmark(&mut self, x: &V) {
        self.inner.counter_unmark(x)
    }
    pub fn counter_init(&mut self, x: &V, c: ZNumber) {
        self.inner.counter_init(x, c)
    }
    pub fn counter_incr(&mut self, x: &V, k: ZNumber) {
        self.inner.counter_incr(x, k)
    }
    pub fn counter_forget(&mut self, x: &V) {
        self.inner.counter_forget(x)
    }

    pub fn dump(&self) -> String {
        self.inner.dump()
    }
}

impl<V: Variable + 'static> Clone for Polymorphic<V> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone_box() }
    }
}

impl<V: Variable + 'static> fmt::Debug for Polymorphic<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Polymorphic").field("type", &self.type_name()).field("value", &self.inner).finish()
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

    #[test]
    fn same_type_join_delegates_to_inner_domain() {
        let mut a = Polymorphic::new(IntervalStore::<V>::top());
        a.assign_number(&V("x"), ZNumber::from(1i64));
        let b = Polymorphic::new(IntervalStore::<V>::top());
        let joined = a.join(&b);
        assert!(joined.to_interval(&V("x")).is_top());
    }

    #[test]
    #[should_panic(expected = "joined polymorphic domains of different runtime types")]
    fn scenario_f_mismatched_types_is_contract_violation() {
        let a = Polymorphic::new(IntervalStore::<V>::top());
        let b = Polymorphic::new(Dbm::<V>::top());
        let _ = a.join(&b);
    }

    #[test]
    fn clone_deep_copies_underlying_domain() {
        let mut a = Polymorphic::new(IntervalStore::<V>::top());
        a.assign_number(&V("x"), ZNumber::from(5i64));
        let mut b = a.clone();
        b.assign_number(&V("x"), ZNumber::from(9i64));
        assert_eq!(a.to_interval(&V("x")), Interval::singleton(ZNumber::from(5i64)));
        assert_eq!(b.to_interval(&V("x")), Interval::singleton(ZNumber::from(9i64)));
    }
}
