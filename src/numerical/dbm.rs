//! Difference-Bound Matrix domain (`spec.md` §4.5): tracks a tight upper
//! bound on `x - y` for every ordered pair of tracked variables.
//!
//! Indices are 1-based; index 0 is a fixed "zero" vertex representing the
//! constant `0`, so a unary bound `x <= c` is stored as the edge
//! `x - zero <= c`. A cell holds `None` for "no known bound" (`+inf`);
//! a normalized matrix is bottom iff some diagonal entry is negative
//! after closure (`spec.md` §3, `Difference-Bound Matrix`).

use crate::domain::Interval;
use crate::interfaces::Variable;
use crate::linear::{ConstraintKind, LinearConstraint, LinearConstraintSystem, LinearExpression};
use crate::number::{Bound, ZNumber};
use crate::numerical::traits::{BinaryOp, NumericalDomain};
use std::collections::BTreeMap;

type Cell = Option<ZNumber>;

#[derive(Clone, Debug)]
pub struct Dbm<V: Variable> {
    bottom: bool,
    index: BTreeMap<V, usize>,
    bound: Vec<Vec<Cell>>,
}

fn cell_add(a: &Cell, b: &Cell) -> Cell {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        _ => None,
    }
}
fn cell_min(a: Cell, b: Cell) -> Cell {
    match (&a, &b) {
        (Some(x), Some(y)) => Some(std::cmp::min(x.clone(), y.clone())),
        (Some(_), None) => a,
        (None, Some(_)) => b,
        (None, None) => None,
    }
}
fn cell_max(a: Cell, b: Cell) -> Cell {
    match (&a, &b) {
        (Some(x), Some(y)) => Some(std::cmp::max(x.clone(), y.clone())),
        _ => None,
    }
}
fn cell_leq(a: &Cell, b: &Cell) -> bool {
    match (a, b) {
        (_, None) => true,
        (None, Some(_)) => false,
        (Some(x), Some(y)) => x <= y,
    }
}

impl<V: Variable> Dbm<V> {
    fn dim(&self) -> usize {
        self.index.len() + 1
    }

    fn new_empty() -> Self {
        Self { bottom: false, index: BTreeMap::new(), bound: vec![vec![Some(ZNumber::zero())]] }
    }

    fn get_or_insert(&mut self, v: &V) -> usize {
        if let Some(&i) = self.index.get(v) {
            return i;
        }
        let i = self.index.len() + 1;
        self.index.insert(v.clone(), i);
        for row in &mut self.bound {
            row.push(None);
        }
        let mut new_row = vec![None; self.bound.len() + 1];
        new_row[i] = Some(ZNumber::zero());
        self.bound.push(new_row);
        i
    }
    fn lookup(&self, v: &V) -> Option<usize> {
        self.index.get(v).copied()
    }

    fn close(&mut self) {
        let n = self.dim();
        for k in 0..n {
            for i in 0..n {
                if self.bound[i][k].is_none() {
                    continue;
                }
                for j in 0..n {
                    let via = cell_add(&self.bound[i][k], &self.bound[k][j]);
                    self.bound[i][j] = cell_min(self.bound[i][j].clone(), via);
                }
            }
        }
        for i in 0..n {
            if matches!(&self.bound[i][i], Some(d) if d.is_negative()) {
                self.set_to_bottom();
                return;
            }
        }
    }

    /// Reindex onto the union of `self` and `other`'s tracked variables,
    /// returning the two matrices in the shared index space.
    fn unify(&self, other: &Self) -> (BTreeMap<V, usize>, Vec<Vec<Cell>>, Vec<Vec<Cell>>) {
        let mut union: BTreeMap<V, usize> = BTreeMap::new();
        for v in self.index.keys().chain(other.index.keys()) {
            if !union.contains_key(v) {
                union.insert(v.clone(), union.len() + 1);
            }
        }
        let project = |src: &Self| -> Vec<Vec<Cell>> {
            let n = union.len() + 1;
            let mut m = vec![vec![None; n]; n];
            m[0][0] = Some(ZNumber::zero());
            for i in 0..n {
                m[i][i] = Some(ZNumber::zero());
            }
            for (v1, &ui) in &union {
                let Some(&si) = src.index.get(v1) else { continue };
                for (v2, &uj) in &union {
                    let Some(&sj) = src.index.get(v2) else { continue };
                    m[ui][uj] = src.bound[si][sj].clone();
                }
                m[ui][0] = src.bound[si][0].clone();
                m[0][ui] = src.bound[0][si].clone();
            }
            m
        };
        (union.clone(), project(self), project(other))
    }

    fn from_unified(union: BTreeMap<V, usize>, bound: Vec<Vec<Cell>>) -> Self {
        let mut dbm = Self { bottom: false, index: union, bound };
        dbm.close();
        dbm
    }

    /// Zero-vertex edges give `[-bound[0][i], bound[i][0]]`: the interval
    /// known about variable at index `i` (0 is the interval's own trivial
    /// `[0, 0]`).
    fn interval_at(&self, i: usize) -> Interval {
        if self.bottom {
            return Interval::bottom();
        }
        let lo = match &self.bound[0][i] {
            Some(c) => Bound::finite(-c.clone()),
            None => Bound::minus_infinity(),
        };
        let hi = match &self.bound[i][0] {
            Some(c) => Bound::finite(c.clone()),
            None => Bound::plus_infinity(),
        };
        Interval::closed(lo, hi)
    }
    fn set_interval_at(&mut self, i: usize, v: &Interval) {
        self.bound[i][0] = v.ub().as_finite().cloned();
        self.bound[0][i] = v.lb().as_finite().map(|n| -n.clone());
    }

    fn project_expr(&self, e: &LinearExpression<V>) -> Interval {
        let mut acc = Interval::singleton(e.constant_term().clone());
        for (v, c) in e.terms() {
            let vi = self.lookup(v).map(|i| self.interval_at(i)).unwrap_or_else(Interval::top);
            acc = acc.add(&vi.mul(&Interval::singleton(c.clone())));
        }
        acc
    }
}

impl<V: Variable> NumericalDomain<V> for Dbm<V> {
    fn top() -> Self {
        Self::new_empty()
    }
    fn bottom() -> Self {
        let mut d = Self::new_empty();
        d.bottom = true;
        d
    }
    fn is_top(&self) -> bool {
        !self.bottom && self.bound.iter().flatten().all(|c| c.is_none() || matches!(c, Some(z) if z.is_zero()))
    }
    fn is_bottom(&self) -> bool {
        self.bottom
    }
    fn set_to_bottom(&mut self) {
        *self = Self::bottom();
    }

    fn leq(&self, other: &Self) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        let (_, a, b) = self.unify(other);
        let n = a.len();
        (0..n).all(|i| (0..n).all(|j| cell_leq(&a[i][j], &b[i][j])))
    }
    fn equals(&self, other: &Self) -> bool {
        if self.bottom || other.bottom {
            return self.bottom == other.bottom;
        }
        let (_, a, b) = self.unify(other);
        a == b
    }

    fn join(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let (union, a, b) = self.unify(other);
        let n = a.len();
        let mut bound = vec![vec![None; n]; n];
        for i in 0..n {
            for j in 0..n {
                bound[i][j] = cell_max(a[i][j].clone(), b[i][j].clone());
            }
        }
        // The join of two closed DBMs is already closed; skip re-closure.
        Self { bottom: false, index: union, bound }
    }
    fn meet(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let (union, a, b) = self.unify(other);
        let n = a.len();
        let mut bound = vec![vec![None; n]; n];
        for i in 0..n {
            for j in 0..n {
                bound[i][j] = cell_min(a[i][j].clone(), b[i][j].clone());
            }
        }
        Self::from_unified(union, bound)
    }
    fn widening(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let (union, a, b) = self.unify(other);
        let n = a.len();
        let mut bound = vec![vec![None; n]; n];
        for i in 0..n {
            for j in 0..n {
                bound[i][j] = if cell_leq(&b[i][j], &a[i][j]) { a[i][j].clone() } else { None };
            }
        }
        Self { bottom: false, index: union, bound }
    }
    fn narrowing(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let (union, a, b) = self.unify(other);
        let n = a.len();
        let mut bound = vec![vec![None; n]; n];
        for i in 0..n {
            for j in 0..n {
                bound[i][j] = if a[i][j].is_none() { b[i][j].clone() } else { a[i][j].clone() };
            }
        }
        Self { bottom: false, index: union, bound }
    }
    fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let (union, a, b) = self.unify(other);
        let n = a.len();
        let mut bound = vec![vec![None; n]; n];
        for i in 0..n {
            for j in 0..n {
                bound[i][j] = if cell_leq(&b[i][j], &a[i][j]) {
                    a[i][j].clone()
                } else if cell_leq(&b[i][j], &Some(threshold.clone())) {
                    Some(threshold.clone())
                } else {
                    None
                };
            }
        }
        Self { bottom: false, index: union, bound }
    }
    fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let (union, a, b) = self.unify(other);
        let n = a.len();
        let mut bound = vec![vec![None; n]; n];
        for i in 0..n {
            for j in 0..n {
                bound[i][j] = if a[i][j].is_some() {
                    a[i][j].clone()
                } else {
                    cell_min(b[i][j].clone(), Some(threshold.clone()))
                };
            }
        }
        Self { bottom: false, index: union, bound }
    }

    fn assign_number(&mut self, x: &V, n: ZNumber) {
        self.forget(x);
        let i = self.get_or_insert(x);
        self.set_interval_at(i, &Interval::singleton(n));
        self.close();
    }
    fn assign_var(&mut self, x: &V, y: &V) {
        self.assign_expr(x, &LinearExpression::variable(y.clone()));
    }
    fn assign_expr(&mut self, x: &V, e: &LinearExpression<V>) {
        self.forget(x);
        let ix = self.get_or_insert(x);
        match e.num_terms() {
            0 => {
                self.set_interval_at(ix, &Interval::singleton(e.constant_term().clone()));
            }
            1 => {
                let (y, coeff) = e.terms().next().expect("num_terms() == 1");
                let c = e.constant_term().clone();
                if *coeff == ZNumber::one() {
                    // x = y + c  <=>  x - y <= c  and  y - x <= -c
                    let iy = self.get_or_insert(y);
                    self.bound[ix][iy] = Some(c.clone());
                    self.bound[iy][ix] = Some(-c);
                } else {
                    self.set_interval_at(ix, &self.project_expr(e));
                }
            }
            _ => {
                self.set_interval_at(ix, &self.project_expr(e));
            }
        }
        self.close();
    }

    fn apply(&mut self, op: BinaryOp, x: &V, y: &V, z: &V) {
        self.forget(x);
        let ix = self.get_or_insert(x);
        let iy = self.get_or_insert(y);
        let iz = self.get_or_insert(z);
        // Add/Sub of two tracked variables are genuine differences: record
        // the exact relational edges in addition to the projected interval.
        match op {
            BinaryOp::Add => {
                // x - y = z  =>  x - y <= ub(z), y - x <= -lb(z)
                let z_iv = self.interval_at(iz);
                if let Some(hi) = z_iv.ub().as_finite() {
                    self.bound[ix][iy] = Some(hi.clone());
                }
                if let Some(lo) = z_iv.lb().as_finite() {
                    self.bound[iy][ix] = Some(-lo.clone());
                }
            }
            BinaryOp::Sub => {
                // x - y = ... no; x = y - z  =>  x - y = -z
                let z_iv = self.interval_at(iz);
                if let Some(lo) = z_iv.lb().as_finite() {
                    self.bound[ix][iy] = Some(-lo.clone());
                }
                if let Some(hi) = z_iv.ub().as_finite() {
                    self.bound[iy][ix] = Some(hi.clone());
                }
            }
            _ => {}
        }
        let result = Self::apply_interval(op, &self.interval_at(iy), &self.interval_at(iz));
        self.set_interval_at(ix, &result);
        self.close();
    }
    fn apply_const(&mut self, op: BinaryOp, x: &V, y: &V, k: ZNumber) {
        self.forget(x);
        let ix = self.get_or_insert(x);
        let iy = self.get_or_insert(y);
        if matches!(op, BinaryOp::Add | BinaryOp::Sub) {
            let c = if matches!(op, BinaryOp::Add) { -k.clone() } else { k.clone() };
            self.bound[ix][iy] = Some(c.clone());
            self.bound[iy][ix] = Some(-c);
        }
        let result = Self::apply_interval(op, &self.interval_at(iy), &Interval::singleton(k));
        self.set_interval_at(ix, &result);
        self.close();
    }

    fn add_constraint(&mut self, c: &LinearConstraint<V>) {
        if self.bottom {
            return;
        }
        if c.is_contradiction() {
            self.set_to_bottom();
            return;
        }
        match c.kind() {
            ConstraintKind::LessEquals | ConstraintKind::LessThan => {}
            _ => {
                // Equals/NotEquals aren't directly a single difference edge
                // in the general case; refine via the interval projection.
                let v = c.expr().as_single_variable();
                if let Some(v) = v {
                    let i = self.get_or_insert(v);
                    let bound = -c.expr().constant_term().clone();
                    if c.kind() == ConstraintKind::Equals {
                        self.set_interval_at(i, &Interval::singleton(bound));
                        self.close();
                    }
                }
                return;
            }
        }
        let strict = c.kind() == ConstraintKind::LessThan;
        let terms: Vec<_> = c.expr().terms().collect();
        match terms.as_slice() {
            [(v, coeff)] if **coeff == ZNumber::one() => {
                let i = self.get_or_insert(v);
                let mut rhs = -c.expr().constant_term().clone();
                if strict {
                    rhs = rhs - ZNumber::one();
                }
                self.bound[i][0] = cell_min(self.bound[i][0].clone(), Some(rhs));
            }
            [(v, coeff)] if **coeff == -ZNumber::one() => {
                let i = self.get_or_insert(v);
                let mut rhs = c.expr().constant_term().clone();
                if strict {
                    rhs = rhs + ZNumber::one();
                }
                self.bound[0][i] = cell_min(self.bound[0][i].clone(), Some(rhs));
            }
            [(v1, c1), (v2, c2)] if **c1 == ZNumber::one() && **c2 == -ZNumber::one() => {
                // v1 - v2 + const <= 0  <=>  v1 - v2 <= -const
                let i1 = self.get_or_insert(v1);
                let i2 = self.get_or_insert(v2);
                let mut rhs = -c.expr().constant_term().clone();
                if strict {
                    rhs = rhs - ZNumber::one();
                }
                self.bound[i1][i2] = cell_min(self.bound[i1][i2].clone(), Some(rhs));
            }
            [(v1, c1), (v2, c2)] if **c1 == -ZNumber::one() && **c2 == ZNumber::one() => {
                let i1 = self.get_or_insert(v2);
                let i2 = self.get_or_insert(v1);
                let mut rhs = -c.expr().constant_term().clone();
                if strict {
                    rhs = rhs - ZNumber::one();
                }
                self.bound[i1][i2] = cell_min(self.bound[i1][i2].clone(), Some(rhs));
            }
            _ => {}
        }
        self.close();
    }

    fn set_interval(&mut self, x: &V, v: Interval) {
        let i = self.get_or_insert(x);
        self.set_interval_at(i, &v);
        self.close();
    }
    fn set_congruence(&mut self, _x: &V, _v: crate::domain::Congruence) {}
    fn set_interval_congruence(&mut self, x: &V, v: crate::domain::IntervalCongruence) {
        self.set_interval(x, v.interval().clone());
    }
    fn refine_interval(&mut self, x: &V, v: Interval) {
        let i = self.get_or_insert(x);
        let current = self.interval_at(i);
        self.set_interval_at(i, &current.meet(&v));
        self.close();
    }
    fn refine_congruence(&mut self, _x: &V, _v: crate::domain::Congruence) {}
    fn refine_interval_congruence(&mut self, x: &V, v: crate::domain::IntervalCongruence) {
        self.refine_interval(x, v.interval().clone());
    }

    fn forget(&mut self, x: &V) {
        if self.bottom {
            return;
        }
        let Some(&i) = self.index.get(x) else { return };
        let n = self.dim();
        for j in 0..n {
            if j != i {
                self.bound[i][j] = None;
                self.bound[j][i] = None;
            }
        }
    }

    fn to_interval(&self, x: &V) -> Interval {
        match self.lookup(x) {
            Some(i) => self.interval_at(i),
            None if self.bottom => Interval::bottom(),
            None => Interval::top(),
        }
    }
    fn to_interval_expr(&self, e: &LinearExpression<V>) -> Interval {
        if self.bottom {
            return Interval::bottom();
        }
        self.project_expr(e)
    }
    fn to_congruence(&self, _x: &V) -> crate::domain::Congruence {
        crate::domain::Congruence::top()
    }
    fn to_linear_constraint_system(&self) -> LinearConstraintSystem<V> {
        if self.bottom {
            return std::iter::once(LinearConstraint::contradiction()).collect();
        }
        let mut sys = LinearConstraintSystem::new();
        let names: Vec<(&V, usize)> = self.index.iter().map(|(v, &i)| (v, i)).collect();
        for &(v, i) in &names {
            if let Some(c) = &self.bound[i][0] {
                // v - zero <= c  <=>  v <= c
                let e = LinearExpression::term(ZNumber::one(), v.clone())
                    .add(&LinearExpression::constant(-c.clone()));
                sys.push(LinearConstraint::leq_zero(e));
            }
            if let Some(c) = &self.bound[0][i] {
                let e = LinearExpression::term(-ZNumber::one(), v.clone())
                    .add(&LinearExpression::constant(-c.clone()));
                sys.push(LinearConstraint::leq_zero(e));
            }
            for &(w, j) in &names {
                if i == j {
                    continue;
                }
                if let Some(c) = &self.bound[i][j] {
                    // v - w <= c
                    let e = LinearExpression::term(ZNumber::one(), v.clone())
                        .add(&LinearExpression::term(-ZNumber::one(), w.clone()))
                        .add(&LinearExpression::constant(-c.clone()));
                    sys.push(LinearConstraint::leq_zero(e));
                }
            }
        }
        sys
    }

    fn dump(&self) -> String {
        if self.bottom {
            return "\u{22a5}".to_string();
        }
        let mut parts = Vec::new();
        for (v, &i) in &self.index {
            if let Some(c) = &self.bound[i][0] {
                parts.push(format!("{} <= {}", v.name_for_dump(), c));
            }
            if let Some(c) = &self.bound[0][i] {
                parts.push(format!("{} >= {}", v.name_for_dump(), -c.clone()));
            }
        }
        for (v1, &i) in &self.index {
            for (v2, &j) in &self.index {
                if i != j {
                    if let Some(c) = &self.bound[i][j] {
                        parts.push(format!("{} - {} <= {}", v1.name_for_dump(), v2.name_for_dump(), c));
                    }
                }
            }
        }
        format!("{{{}}}", parts.join(", "))
    }
}

impl<V: Variable> Dbm<V> {
    fn apply_interval(op: BinaryOp, a: &Interval, b: &Interval) -> Interval {
        match op {
            BinaryOp::Add => a.add(b),
            BinaryOp::Sub => a.sub(b),
            BinaryOp::Mul => a.mul(b),
            BinaryOp::Div => a.div(b),
            BinaryOp::Rem => a.rem(b),
            BinaryOp::Mod => a.mod_(b),
            BinaryOp::Shl => a.shl(b),
            BinaryOp::Shr => a.shr_arith(b),
            BinaryOp::And => a.bitand(b),
            BinaryOp::Or => a.bitor(b),
            BinaryOp::Xor => a.bitxor(b),
        }
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
    fn leq(v1: &str, v2: &str, c: i64) -> LinearConstraint<V> {
        let e = LinearExpression::term(ZNumber::one(), V(v1))
            .add(&LinearExpression::term(-ZNumber::one(), V(v2)))
            .add(&LinearExpression::constant(-ZNumber::from(c)));
        LinearConstraint::leq_zero(e)
    }

    #[test]
    fn scenario_d_closure_implies_transitive_bound() {
        let mut d = Dbm::<V>::top();
        d.add_constraint(&leq("x", "y", 3)); // x - y <= 3
        d.add_constraint(&leq("y", "z", 2)); // y - z <= 2
        let iz = d.lookup(&V("z")).unwrap();
        let ix = d.lookup(&V("x")).unwrap();
        assert_eq!(d.bound[ix][iz], Some(ZNumber::from(5i64)));
    }

    #[test]
    fn inconsistent_cycle_is_bottom() {
        let mut d = Dbm::<V>::top();
        d.add_constraint(&leq("x", "y", -1)); // x - y <= -1
        d.add_constraint(&leq("y", "x", -1)); // y - x <= -1
        assert!(d.is_bottom());
    }

    #[test]
    fn forget_removes_relational_knowledge() {
        let mut d = Dbm::<V>::top();
        d.add_constraint(&leq("x", "y", 3));
        d.forget(&V("x"));
        assert!(d.to_interval(&V("x")).is_top());
    }

    #[test]
    fn join_keeps_only_common_upper_bound() {
        let mut a = Dbm::<V>::top();
        a.add_constraint(&leq("x", "y", 3));
        let mut b = Dbm::<V>::top();
        b.add_constraint(&leq("x", "y", 10));
        let joined = a.join(&b);
        let ix = joined.lookup(&V("x")).unwrap();
        let iy = joined.lookup(&V("y")).unwrap();
        assert_eq!(joined.bound[ix][iy], Some(ZNumber::from(10i64)));
    }
}
