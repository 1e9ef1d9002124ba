//! Interval lattice over `MachineInt` (`spec.md` §3/§4.2): fixed-width,
//! no genuine infinities — `top = [MIN, MAX]`, and any operation whose
//! mathematical result would wrap around `2^w` collapses to `top` rather
//! than being represented directly.

use crate::error::ContractError;
use crate::number::{MachineInt, Signedness};

#[derive(Clone, Debug)]
enum State {
    Bottom,
    Range(MachineInt, MachineInt),
}

#[derive(Clone, Debug)]
pub struct IntervalMInt {
    width: u32,
    sign: Signedness,
    state: State,
}

impl IntervalMInt {
    pub fn bottom(width: u32, sign: Signedness) -> Self {
        Self { width, sign, state: State::Bottom }
    }
    pub fn top(width: u32, sign: Signedness) -> Self {
        Self {
            width,
            sign,
            state: State::Range(MachineInt::min_value(width, sign), MachineInt::max_value(width, sign)),
        }
    }
    pub fn singleton(n: MachineInt) -> Self {
        Self { width: n.width(), sign: n.sign(), state: State::Range(n.clone(), n) }
    }
    pub fn closed(lb: MachineInt, ub: MachineInt) -> Self {
        assert!(lb.compatible(&ub), "interval endpoints must share width/sign");
        let width = lb.width();
        let sign = lb.sign();
        if lb.cmp_value(&ub) == std::cmp::Ordering::Greater {
            Self::bottom(width, sign)
        } else {
            Self { width, sign, state: State::Range(lb, ub) }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn sign(&self) -> Signedness {
        self.sign
    }
    pub fn is_bottom(&self) -> bool {
        matches!(self.state, State::Bottom)
    }
    pub fn is_top(&self) -> bool {
        match &self.state {
            State::Bottom => false,
            State::Range(lb, ub) => {
                *lb == MachineInt::min_value(self.width, self.sign)
                    && *ub == MachineInt::max_value(self.width, self.sign)
            }
        }
    }
    pub fn bounds(&self) -> Option<(&MachineInt, &MachineInt)> {
        match &self.state {
            State::Bottom => None,
            State::Range(lb, ub) => Some((lb, ub)),
        }
    }
    pub fn as_singleton(&self) -> Option<&MachineInt> {
        match self.bounds() {
            Some((lb, ub)) if lb == ub => Some(lb),
            _ => None,
        }
    }
    pub fn contains(&self, n: &MachineInt) -> bool {
        match self.bounds() {
            Some((lb, ub)) => lb.cmp_value(n) != std::cmp::Ordering::Greater && n.cmp_value(ub) != std::cmp::Ordering::Greater,
            None => false,
        }
    }

    fn require_compatible(&self, other: &Self) {
        if self.width != other.width || self.sign != other.sign {
            ContractError::IncompatibleMachineInt(self.width, self.sign, other.width, other.sign).raise();
        }
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) => true,
            (_, None) => false,
            (Some((l1, u1)), Some((l2, u2))) => {
                l2.cmp_value(l1) != std::cmp::Ordering::Greater
                    && u1.cmp_value(u2) != std::cmp::Ordering::Greater
            }
        }
    }
    pub fn equals(&self, other: &Self) -> bool {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, None) => true,
            (Some((l1, u1)), Some((l2, u2))) => l1 == l2 && u1 == u2,
            _ => false,
        }
    }

    pub fn join(&self, other: &Self) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some((l1, u1)), Some((l2, u2))) => {
                let lb = if l1.cmp_value(l2) == std::cmp::Ordering::Less { l1 } else { l2 }.clone();
                let ub = if u1.cmp_value(u2) == std::cmp::Ordering::Greater { u1 } else { u2 }.clone();
                Self::closed(lb, ub)
            }
        }
    }
    pub fn meet(&self, other: &Self) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::bottom(self.width, self.sign),
            (Some((l1, u1)), Some((l2, u2))) => {
                let lb = if l1.cmp_value(l2) == std::cmp::Ordering::Greater { l1 } else { l2 }.clone();
                let ub = if u1.cmp_value(u2) == std::cmp::Ordering::Less { u1 } else { u2 }.clone();
                Self::closed(lb, ub)
            }
        }
    }

    /// A bound that moved outward saturates to the domain's MIN/MAX (the
    /// finite-range analogue of going to infinity).
    pub fn widening(&self, other: &Self) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some((l1, u1)), Some((l2, u2))) => {
                let lb = if l2.cmp_value(l1) == std::cmp::Ordering::Less {
                    MachineInt::min_value(self.width, self.sign)
                } else {
                    l1.clone()
                };
                let ub = if u2.cmp_value(u1) == std::cmp::Ordering::Greater {
                    MachineInt::max_value(self.width, self.sign)
                } else {
                    u1.clone()
                };
                Self::closed(lb, ub)
            }
        }
    }
    pub fn widening_threshold(&self, other: &Self, threshold: &MachineInt) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) => other.clone(),
            (_, None) => self.clone(),
            (Some((l1, u1)), Some((l2, u2))) => {
                let lb = if l2.cmp_value(l1) == std::cmp::Ordering::Less {
                    if threshold.cmp_value(l2) != std::cmp::Ordering::Greater {
                        threshold.clone()
                    } else {
                        MachineInt::min_value(self.width, self.sign)
                    }
                } else {
                    l1.clone()
                };
                let ub = if u2.cmp_value(u1) == std::cmp::Ordering::Greater {
                    if threshold.cmp_value(u2) != std::cmp::Ordering::Less {
                        threshold.clone()
                    } else {
                        MachineInt::max_value(self.width, self.sign)
                    }
                } else {
                    u1.clone()
                };
                Self::closed(lb, ub)
            }
        }
    }
    pub fn narrowing(&self, other: &Self) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::bottom(self.width, self.sign),
            (Some((l1, u1)), Some((l2, u2))) => {
                let lb =
                    if *l1 == MachineInt::min_value(self.width, self.sign) { l2.clone() } else { l1.clone() };
                let ub =
                    if *u1 == MachineInt::max_value(self.width, self.sign) { u2.clone() } else { u1.clone() };
                Self::closed(lb, ub)
            }
        }
    }
    pub fn narrowing_threshold(&self, other: &Self, threshold: &MachineInt) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::bottom(self.width, self.sign),
            (Some((l1, u1)), Some((l2, u2))) => {
                let lb = if *l1 == MachineInt::min_value(self.width, self.sign) {
                    if l2.cmp_value(threshold) == std::cmp::Ordering::Greater { l2.clone() } else { threshold.clone() }
                } else {
                    l1.clone()
                };
                let ub = if *u1 == MachineInt::max_value(self.width, self.sign) {
                    if u2.cmp_value(threshold) == std::cmp::Ordering::Less { u2.clone() } else { threshold.clone() }
                } else {
                    u1.clone()
                };
                Self::closed(lb, ub)
            }
        }
    }

    /// Checks whether a mathematical-integer-space result interval
    /// `[lo, hi]` (unbounded `i128`-ish math, here `num_bigint::BigInt`
    /// through `ZNumber`) stays within `2^w` of itself — i.e. doesn't wrap.
    /// If it does wrap, the caller collapses to `top`.
    fn from_unwrapped(
        lo: num_bigint::BigInt,
        hi: num_bigint::BigInt,
        width: u32,
        sign: Signedness,
    ) -> Self {
        let span = &hi - &lo;
        let modulus_val = num_bigint::BigInt::from(1) << width;
        if span >= modulus_val {
            return Self::top(width, sign);
        }
        // Wrapping each endpoint individually must land back in order; if
        // the wrap reorders lb/ub, the true range crosses the wraparound
        // point and must be widened to top.
        let lb = MachineInt::new(lo, width, sign);
        let ub = MachineInt::new(hi, width, sign);
        if lb.cmp_value(&ub) == std::cmp::Ordering::Greater {
            Self::top(width, sign)
        } else {
            Self::closed(lb, ub)
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::bottom(self.width, self.sign),
            (Some((l1, u1)), Some((l2, u2))) => {
                let lo = l1.as_bigint() + l2.as_bigint();
                let hi = u1.as_bigint() + u2.as_bigint();
                Self::from_unwrapped(lo, hi, self.width, self.sign)
            }
        }
    }
    pub fn neg(&self) -> Self {
        match self.bounds() {
            None => self.clone(),
            Some((lb, ub)) => {
                let lo = -ub.as_bigint();
                let hi = -lb.as_bigint();
                Self::from_unwrapped(lo, hi, self.width, self.sign)
            }
        }
    }
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }
    pub fn mul(&self, other: &Self) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::bottom(self.width, self.sign),
            (Some((l1, u1)), Some((l2, u2))) => {
                let corners = [
                    l1.as_bigint() * l2.as_bigint(),
                    l1.as_bigint() * u2.as_bigint(),
                    u1.as_bigint() * l2.as_bigint(),
                    u1.as_bigint() * u2.as_bigint(),
                ];
                let lo = corners.iter().min().unwrap().clone();
                let hi = corners.iter().max().unwrap().clone();
                Self::from_unwrapped(lo, hi, self.width, self.sign)
            }
        }
    }

    /// Division never wraps (the domain is already bounded); zero divisor
    /// is bottom, straddling divisors are case-split, matching the `Z`
    /// interval's algebra but clamped into `[MIN, MAX]`.
    pub fn div(&self, other: &Self) -> Self {
        self.require_compatible(other);
        let zero = MachineInt::zero(self.width, self.sign);
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::bottom(self.width, self.sign),
            (_, Some((l2, u2))) if *l2 == zero && *u2 == zero => Self::bottom(self.width, self.sign),
            (Some((l1, u1)), Some((l2, u2))) => {
                if l2.cmp_value(&zero) != std::cmp::Ordering::Greater
                    && u2.cmp_value(&zero) != std::cmp::Ordering::Less
                {
                    let neg_one = MachineInt::new(-1, self.width, self.sign);
                    let one = MachineInt::one(self.width, self.sign);
                    let mut result = Self::bottom(self.width, self.sign);
                    if l2.cmp_value(&neg_one) != std::cmp::Ordering::Greater {
                        let neg_part = Self::closed(l2.clone(), neg_one);
                        result = result.join(&self.div_no_zero(&neg_part));
                    }
                    if u2.cmp_value(&one) != std::cmp::Ordering::Less {
                        let pos_part = Self::closed(one, u2.clone());
                        result = result.join(&self.div_no_zero(&pos_part));
                    }
                    result
                } else {
                    self.div_no_zero(other)
                }
            }
        }
    }
    fn div_no_zero(&self, other: &Self) -> Self {
        let (l1, u1) = self.bounds().expect("checked by caller");
        let (l2, u2) = other.bounds().expect("checked by caller");
        let corners = [l1.div(l2), l1.div(u2), u1.div(l2), u1.div(u2)];
        let lo = corners.iter().min_by(|a, b| a.cmp_value(b)).unwrap().clone();
        let hi = corners.iter().max_by(|a, b| a.cmp_value(b)).unwrap().clone();
        Self::closed(lo, hi)
    }

    /// Remainder, sign of the dividend: since the result always lies within
    /// the operand's own representable range, this is a sound (if coarse)
    /// over-approximation bounded by `self`'s own range.
    pub fn rem(&self, other: &Self) -> Self {
        self.require_compatible(other);
        match (self.bounds(), other.bounds()) {
            (None, _) | (_, None) => Self::bottom(self.width, self.sign),
            _ => self.clone(),
        }
    }
    /// Mathematical modulo: non-negative when the divisor excludes 0.
    pub fn mod_(&self, other: &Self) -> Self {
        self.require_compatible(other);
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom(self.width, self.sign);
        }
        Self::closed(MachineInt::zero(self.width, self.sign), MachineInt::max_value(self.width, self.sign))
    }

    pub fn dump(&self) -> String {
        match self.bounds() {
            None => "\u{22a5}".to_string(),
            Some((lb, ub)) => format!("[{lb}, {ub}]"),
        }
    }
}

impl PartialEq for IntervalMInt {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Signedness::*;

    fn iv(lo: i32, hi: i32, width: u32, sign: Signedness) -> IntervalMInt {
        IntervalMInt::closed(MachineInt::new(lo, width, sign), MachineInt::new(hi, width, sign))
    }

    #[test]
    fn scenario_a_wraps_on_add() {
        let x = iv(85, 85, 8, Signed);
        let y = iv(43, 43, 8, Signed);
        let sum = x.add(&y);
        assert_eq!(sum.as_singleton(), Some(&MachineInt::new(-128, 8, Signed)));
    }

    #[test]
    fn top_is_min_max() {
        let t = IntervalMInt::top(8, Signed);
        assert!(t.is_top());
        let (lb, ub) = t.bounds().unwrap();
        assert_eq!(*lb, MachineInt::min_value(8, Signed));
        assert_eq!(*ub, MachineInt::max_value(8, Signed));
    }

    #[test]
    fn widening_saturates_to_min_max() {
        let a = iv(0, 10, 8, Unsigned);
        let b = iv(0, 20, 8, Unsigned);
        let w = a.widening(&b);
        assert_eq!(*w.bounds().unwrap().1, MachineInt::max_value(8, Unsigned));
    }
}
