//! L4: the numerical abstract-domain interface (`spec.md` §4.4) — the
//! contract every domain implementation in `spec.md` §4.5 satisfies.

use crate::domain::{Congruence, Interval, IntervalCongruence};
use crate::interfaces::Variable;
use crate::linear::{LinearConstraint, LinearConstraintSystem, LinearExpression};
use crate::number::ZNumber;

/// Binary arithmetic/bit-ops a domain's `apply` accepts (`spec.md` §4.2/§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Mod,
    Shl,
    Shr,
    And,
    Or,
    Xor,
}

/// The numerical-domain interface every `D` over `(ZNumber, V)` implements.
///
/// Contract (`spec.md` §4.4): `forget` must weaken, never strengthen;
/// `refine`/`add` must strengthen, never weaken; `join`/`widen` must
/// over-approximate. Implementors are value types — `clone` must be
/// `O(size of state)`.
pub trait NumericalDomain<V: Variable>: Clone {
    // ---- lattice ----

    fn top() -> Self;
    fn bottom() -> Self;
    fn is_top(&self) -> bool;
    fn is_bottom(&self) -> bool;
    fn set_to_top(&mut self) {
        *self = Self::top();
    }
    fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }

    fn leq(&self, other: &Self) -> bool;
    fn equals(&self, other: &Self) -> bool;
    fn join(&self, other: &Self) -> Self;
    fn meet(&self, other: &Self) -> Self;
    fn widening(&self, other: &Self) -> Self;
    fn narrowing(&self, other: &Self) -> Self;

    /// Join used at a loop head before the increasing phase has widened
    /// (`spec.md` §4.4). Defaults to `join`; relational domains may use a
    /// stronger join here.
    fn join_loop(&self, other: &Self) -> Self {
        self.join(other)
    }
    /// Join used between ordinary (non-head) iterations. Defaults to `join`.
    fn join_iter(&self, other: &Self) -> Self {
        self.join(other)
    }
    fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self;
    fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self;

    fn join_with(&mut self, other: &Self) {
        *self = self.join(other);
    }
    fn meet_with(&mut self, other: &Self) {
        *self = self.meet(other);
    }
    fn widening_with(&mut self, other: &Self) {
        *self = self.widening(other);
    }
    fn narrowing_with(&mut self, other: &Self) {
        *self = self.narrowing(other);
    }

    /// Optional canonicalization hook invoked before any client observation.
    fn normalize(&mut self) {}

    // ---- transfer ----

    fn assign_number(&mut self, x: &V, n: ZNumber);
    fn assign_var(&mut self, x: &V, y: &V);
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>);

    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V);
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber);

    fn add_constraint(&mut self, c: &LinearConstraint<V>);
    fn add_constraint_system(&mut self, cs: &LinearConstraintSystem<V>) {
        for c in cs.iter() {
            self.add_constraint(c);
        }
    }

    /// Replace all knowledge about `x` with `v`.
    fn set_interval(&mut self, x: &V, v: Interval);
    fn set_congruence(&mut self, x: &V, v: Congruence);
    fn set_interval_congruence(&mut self, x: &V, v: IntervalCongruence);

    /// Intersect current knowledge about `x` with `v`.
    fn refine_interval(&mut self, x: &V, v: Interval);
    fn refine_congruence(&mut self, x: &V, v: Congruence);
    fn refine_interval_congruence(&mut self, x: &V, v: IntervalCongruence);

    /// Remove any knowledge of `x`; result must be `>=` the current state.
    fn forget(&mut self, x: &V);

    fn to_interval(&self, x: &V) -> Interval;
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval;
    fn to_congruence(&self, x: &V) -> Congruence;
    fn to_interval_congruence(&self, x: &V) -> IntervalCongruence {
        IntervalCongruence::new(self.to_interval(x), self.to_congruence(x))
    }
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V>;

    // ---- non-negative loop counter hooks ----
    //
    // For interval-only domains these default to plain assigns/applies
    // (`spec.md` §4.4); the Gauge domain overrides them to track symbolic
    // coefficients instead.

    /// Mark `x` as a tracked loop counter. No-op unless overridden.
    fn counter_mark(&mut self, _x: &V) {}
    fn counter_unmark(&mut self, _x: &V) {}
    fn counter_init(&mut self, x: &V, c: ZNumber) {
        self.assign_number(x, c);
    }
    fn counter_incr(&mut self, x: &V, k: ZNumber) {
        self.apply_const(BinaryOp::Add, x, x, k);
    }
    fn counter_forget(&mut self, x: &V) {
        self.forget(x);
    }

    fn dump(&self) -> String;
}
