//! Interval lattice over `ZNumber` (`spec.md` §3/§4.2).

use crate::number::{Bound, ZNumber};

/// `bottom | [lb, ub]` with `lb <= ub`, endpoints in `Bound<ZNumber>`.
/// Bottom is represented as `lb > ub` (no separate tag, matching the
/// original `interval_t` representation the spec describes).
#[derive(Clone, Debug)]
pub struct Interval {
    lb: Bound<ZNumber>,
    ub: Bound<ZNumber>,
}

impl Interval {
    pub fn bottom() -> Self {
        Self { lb: Bound::finite(ZNumber::one()), ub: Bound::finite(ZNumber::zero()) }
    }
    pub fn top() -> Self {
        Self { lb: Bound::minus_infinity(), ub: Bound::plus_infinity() }
    }
    pub fn closed(lb: Bound<ZNumber>, ub: Bound<ZNumber>) -> Self {
        if lb > ub { Self::bottom() } else { Self { lb, ub } }
    }
    pub fn singleton(n: ZNumber) -> Self {
        Self { lb: Bound::finite(n.clone()), ub: Bound::finite(n) }
    }
    pub fn nonneg() -> Self {
        Self::closed(Bound::finite(ZNumber::zero()), Bound::plus_infinity())
    }

    pub fn is_bottom(&self) -> bool {
        self.lb > self.ub
    }
    pub fn is_top(&self) -> bool {
        !self.is_bottom() && self.lb.is_minus_infinity() && self.ub.is_plus_infinity()
    }
    pub fn lb(&self) -> &Bound<ZNumber> {
        &self.lb
    }
    pub fn ub(&self) -> &Bound<ZNumber> {
        &self.ub
    }

    pub fn as_singleton(&self) -> Option<&ZNumber> {
        if self.is_bottom() {
            return None;
        }
        match (self.lb.as_finite(), self.ub.as_finite()) {
            (Some(l), Some(u)) if l == u => Some(l),
            _ => None,
        }
    }

    pub fn contains(&self, n: &ZNumber) -> bool {
        if self.is_bottom() {
            return false;
        }
        let b = Bound::finite(n.clone());
        self.lb <= b && b <= self.ub
    }

    pub fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        other.lb <= self.lb && self.ub <= other.ub
    }
    pub fn equals(&self, other: &Self) -> bool {
        if self.is_bottom() || other.is_bottom() {
            return self.is_bottom() == other.is_bottom();
        }
        self.lb == other.lb && self.ub == other.ub
    }

    pub fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self::closed(
            Bound::min(self.lb.clone(), other.lb.clone()),
            Bound::max(self.ub.clone(), other.ub.clone()),
        )
    }
    pub fn meet(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self::closed(
            Bound::max(self.lb.clone(), other.lb.clone()),
            Bound::min(self.ub.clone(), other.ub.clone()),
        )
    }

    /// Standard interval widening: a bound that moved outward goes to infinity.
    pub fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        let lb = if other.lb < self.lb { Bound::minus_infinity() } else { self.lb.clone() };
        let ub = if other.ub > self.ub { Bound::plus_infinity() } else { self.ub.clone() };
        Self { lb, ub }
    }

    /// Widening with a threshold: a bound that moved outward is clamped to
    /// the threshold when the threshold lies between the old and new bound,
    /// else it goes to infinity (`spec.md` §4.2).
    pub fn widening_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        let t = Bound::finite(threshold.clone());
        let lb = if other.lb < self.lb {
            if t <= other.lb { t.clone() } else { Bound::minus_infinity() }
        } else {
            self.lb.clone()
        };
        let ub = if other.ub > self.ub {
            if t >= other.ub { t } else { Bound::plus_infinity() }
        } else {
            self.ub.clone()
        };
        Self { lb, ub }
    }

    /// An infinite bound adopts the other operand's bound; finite bounds
    /// are left unchanged (narrowing never widens a finite bound further).
    pub fn narrowing(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let lb = if self.lb.is_minus_infinity() { other.lb.clone() } else { self.lb.clone() };
        let ub = if self.ub.is_plus_infinity() { other.ub.clone() } else { self.ub.clone() };
        Self::closed(lb, ub)
    }

    /// Narrowing with a threshold: an infinite bound is replaced with
    /// `max(other.lb, threshold)` / `min(other.ub, threshold)`.
    pub fn narrowing_threshold(&self, other: &Self, threshold: &ZNumber) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let t = Bound::finite(threshold.clone());
        let lb = if self.lb.is_minus_infinity() {
            Bound::max(other.lb.clone(), t.clone())
        } else {
            self.lb.clone()
        };
        let ub = if self.ub.is_plus_infinity() {
            Bound::min(other.ub.clone(), t)
        } else {
            self.ub.clone()
        };
        Self::closed(lb, ub)
    }

    // ---- arithmetic transfer functions (value-level, spec.md §4.2) ----

    pub fn add(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self::closed(self.lb.clone() + other.lb.clone(), self.ub.clone() + other.ub.clone())
    }
    pub fn neg(&self) -> Self {
        if self.is_bottom() {
            return Self::bottom();
        }
        Self::closed(-self.ub.clone(), -self.lb.clone())
    }
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }
    /// Four-corner rule.
    pub fn mul(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        let (a, b) = (&self.lb, &self.ub);
        let (c, d) = (&other.lb, &other.ub);
        let corners = [
            a.clone() * c.clone(),
            a.clone() * d.clone(),
            b.clone() * c.clone(),
            b.clone() * d.clone(),
        ];
        Self::closed(Bound::min_of(&corners), Bound::max_of(&corners))
    }

    fn contains_zero(&self) -> bool {
        self.contains(&ZNumber::zero())
    }

    /// Truncating division; divisor intervals straddling zero are
    /// case-split; a zero-only divisor yields bottom.
    pub fn div(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if other.equals(&Self::singleton(ZNumber::zero())) {
            return Self::bottom();
        }
        if other.contains_zero() {
            let neg_part = Self::closed(other.lb.clone(), Bound::finite(ZNumber::from(-1i64)));
            let pos_part = Self::closed(Bound::finite(ZNumber::one()), other.ub.clone());
            let mut result = Self::bottom();
            if !neg_part.is_bottom() {
                result = result.join(&self.div_no_zero(&neg_part));
            }
            if !pos_part.is_bottom() {
                result = result.join(&self.div_no_zero(&pos_part));
            }
            result
        } else {
            self.div_no_zero(other)
        }
    }
    fn div_no_zero(&self, other: &Self) -> Self {
        let (a, b) = (&self.lb, &self.ub);
        let (c, d) = (&other.lb, &other.ub);
        let corners = [
            a.clone().checked_div(c.clone()),
            a.clone().checked_div(d.clone()),
            b.clone().checked_div(c.clone()),
            b.clone().checked_div(d.clone()),
        ];
        Self::closed(Bound::min_of(&corners), Bound::max_of(&corners))
    }

    /// Remainder, sign of the dividend: `a - (a/b)*b`, computed by
    /// case-splitting `self` on its sign and bounding against `|other|`.
    pub fn rem(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if other.equals(&Self::singleton(ZNumber::zero())) {
            return Self::bottom();
        }
        let bound_mag = Self::max_abs(other);
        let bound_mag = match bound_mag {
            Some(m) => m,
            None => return Self::top(), // unbounded divisor magnitude
        };
        let limit = Bound::finite(bound_mag - ZNumber::one());
        if !self.contains_zero() && self.lb.is_finite() && self.lb.clone() >= Bound::finite(ZNumber::zero()) {
            Self::closed(Bound::finite(ZNumber::zero()), Bound::min(self.ub.clone(), limit))
        } else if self.ub.is_finite() && self.ub.clone() <= Bound::finite(ZNumber::zero()) {
            let neg_limit = -limit;
            Self::closed(Bound::max(self.lb.clone(), neg_limit), Bound::finite(ZNumber::zero()))
        } else {
            Self::closed(-limit.clone(), limit)
        }
    }

    /// Mathematical modulo: always non-negative when divisor doesn't
    /// contain only negatives; conservatively `[0, max|other|-1]` unless
    /// `self` is non-negative, in which case tighter with `rem`.
    pub fn mod_(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if other.equals(&Self::singleton(ZNumber::zero())) {
            return Self::bottom();
        }
        let bound_mag = match Self::max_abs(other) {
            Some(m) => m,
            None => return Self::nonneg(),
        };
        let limit = Bound::finite(bound_mag - ZNumber::one());
        let lo = Bound::finite(ZNumber::zero());
        Self::closed(lo, limit).meet(&Self::nonneg())
    }

    fn max_abs(interval: &Self) -> Option<ZNumber> {
        let l = interval.lb.as_finite()?;
        let u = interval.ub.as_finite()?;
        Some(std::cmp::max(l.abs(), u.abs()))
    }

    /// Bitwise AND/OR/XOR/shifts fall back to top outside a handful of
    /// special cases (`spec.md` §4.2): singleton operands and non-negative
    /// finite operands, both handled via `fill_ones`.
    pub fn shl(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if let (Some(l), Some(u), Some(s)) = (self.lb.as_finite(), self.ub.as_finite(), other.as_singleton())
        {
            if !s.is_negative() {
                return Self::closed(Bound::finite(l.shl(s)), Bound::finite(u.shl(s)));
            }
        }
        Self::top()
    }
    pub fn shr_arith(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        if let (Some(l), Some(u), Some(s)) = (self.lb.as_finite(), self.ub.as_finite(), other.as_singleton())
        {
            if !s.is_negative() {
                return Self::closed(Bound::finite(l.shr(s)), Bound::finite(u.shr(s)));
            }
        }
        Self::top()
    }
    pub fn bitand(&self, other: &Self) -> Self {
        self.bitop_special_case(other).unwrap_or_else(Self::top)
    }
    pub fn bitor(&self, other: &Self) -> Self {
        self.bitop_special_case(other).unwrap_or_else(Self::top)
    }
    pub fn bitxor(&self, other: &Self) -> Self {
        self.bitop_special_case(other).unwrap_or_else(Self::top)
    }
    /// Non-negative finite operands: both fit in `[0, fill_ones(max)]`.
    fn bitop_special_case(&self, other: &Self) -> Option<Self> {
        if self.is_bottom() || other.is_bottom() {
            return Some(Self::bottom());
        }
        let l1 = self.lb.as_finite()?;
        let u1 = self.ub.as_finite()?;
        let l2 = other.lb.as_finite()?;
        let u2 = other.ub.as_finite()?;
        if l1.is_negative() || l2.is_negative() {
            return None;
        }
        let bound = std::cmp::max(u1.clone(), u2.clone()).fill_ones();
        Some(Self::closed(Bound::finite(ZNumber::zero()), Bound::finite(bound)))
    }

    pub fn dump(&self) -> String {
        if self.is_bottom() { "\u{22a5}".to_string() } else { format!("[{}, {}]", self.lb, self.ub) }
    }
}

impl PartialEq for Interval {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(lo: i64, hi: i64) -> Interval {
        Interval::closed(Bound::finite(ZNumber::from(lo)), Bound::finite(ZNumber::from(hi)))
    }

    #[test]
    fn lattice_laws_hold() {
        let a = iv(0, 5);
        let b = iv(3, 9);
        assert!(a.leq(&a));
        assert!(a.leq(&a.join(&b)));
        assert!(b.leq(&a.join(&b)));
        assert!(a.meet(&b).leq(&a));
        assert!(a.meet(&b).leq(&b));
        assert!(a.join(&Interval::bottom()).equals(&a));
        assert!(a.meet(&Interval::top()).equals(&a));
    }

    #[test]
    fn widening_with_threshold_scenario_b() {
        let x = iv(0, 1);
        let after_widen = x.widening_threshold(&iv(0, 2), &ZNumber::from(10i64));
        assert_eq!(after_widen, iv(0, 10));
        let after_narrow = after_widen.narrowing(&iv(0, 5));
        assert_eq!(after_narrow, iv(0, 5));
    }

    #[test]
    fn division_splits_on_straddling_divisor() {
        let x = iv(10, 10);
        let y = iv(-2, 3);
        let result = x.div(&y);
        // 10 / {-2,-1} in [-10,-5], 10 / {1,2,3} in [3,10] -> union
        assert!(result.contains(&ZNumber::from(-10i64)));
        assert!(result.contains(&ZNumber::from(10i64)));
    }

    #[test]
    fn division_by_exact_zero_is_bottom() {
        let x = iv(1, 1);
        let y = Interval::singleton(ZNumber::zero());
        assert!(x.div(&y).is_bottom());
    }

    #[test]
    fn mint_wrap_scenario_a_uses_machine_int_domain() {
        // Scenario A lives in the MachineInt interval domain; this is a
        // sanity check that the pure-Z domain never wraps.
        let x = iv(85, 85);
        let y = iv(43, 43);
        assert_eq!(x.add(&y), iv(128, 128));
    }
}
