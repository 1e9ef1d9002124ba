//! Reduced product of `Interval` and `Congruence` over `ZNumber`
//! (`spec.md` §3/§4.2).

use super::{Congruence, Interval};
use crate::number::{Bound, ZNumber};

#[derive(Clone, Debug)]
pub struct IntervalCongruence {
    interval: Interval,
    congruence: Congruence,
}

impl IntervalCongruence {
    pub fn bottom() -> Self {
        Self { interval: Interval::bottom(), congruence: Congruence::bottom() }
    }
    pub fn top() -> Self {
        Self { interval: Interval::top(), congruence: Congruence::top() }
    }
    pub fn singleton(n: ZNumber) -> Self {
        Self { interval: Interval::singleton(n.clone()), congruence: Congruence::singleton(n) }
    }

    /// Build from the two components and reduce: if the congruence is a
    /// singleton, the interval collapses to it; otherwise the interval's
    /// endpoints snap to the nearest in-range multiples of the modulus
    /// congruent to the residue. An empty snap result is bottom.
    pub fn new(interval: Interval, congruence: Congruence) -> Self {
        Self { interval, congruence }.reduced()
    }

    pub fn interval(&self) -> &Interval {
        &self.interval
    }
    pub fn congruence(&self) -> &Congruence {
        &self.congruence
    }
    pub fn is_bottom(&self) -> bool {
        self.interval.is_bottom() || self.congruence.is_bottom()
    }
    pub fn is_top(&self) -> bool {
        self.interval.is_top() && self.congruence.is_top()
    }

    fn reduced(self) -> Self {
        if self.interval.is_bottom() || self.congruence.is_bottom() {
            return Self::bottom();
        }
        if let Some(n) = self.congruence.as_singleton() {
            return if self.interval.contains(n) {
                Self { interval: Interval::singleton(n.clone()), congruence: self.congruence }
            } else {
                Self::bottom()
            };
        }
        let a = self.congruence.modulus().clone();
        let b = self.congruence.residue().clone();
        let snapped_lb = match self.interval.lb().as_finite() {
            Some(l) => {
                let rem = l.mod_floor(&a);
                let delta = (&b - &rem).mod_floor(&a);
                Bound::finite(l + &delta)
            }
            None => self.interval.lb().clone(),
        };
        let snapped_ub = match self.interval.ub().as_finite() {
            Some(u) => {
                let rem = u.mod_floor(&a);
                let delta = (&rem - &b).mod_floor(&a);
                Bound::finite(u - &delta)
            }
            None => self.interval.ub().clone(),
        };
        let snapped = Interval::closed(snapped_lb, snapped_ub);
        if snapped.is_bottom() {
            Self::bottom()
        } else {
            Self { interval: snapped, congruence: self.congruence }
        }
    }

    pub fn leq(&self, other: &Self) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        self.interval.leq(&other.interval) && self.congruence.leq(&other.congruence)
    }
    pub fn equals(&self, other: &Self) -> bool {
        if self.is_bottom() || other.is_bottom() {
            return self.is_bottom() == other.is_bottom();
        }
        self.interval.equals(&other.interval) && self.congruence.equals(&other.congruence)
    }
    pub fn join(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self::new(self.interval.join(&other.interval), self.congruence.join(&other.congruence))
    }
    pub fn meet(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self::new(self.interval.meet(&other.interval), self.congruence.meet(&other.congruence))
    }
    pub fn widening(&self, other: &Self) -> Self {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Self::new(self.interval.widening(&other.interval), self.congruence.widening(&other.congruence))
    }
    pub fn narrowing(&self, other: &Self) -> Self {
        if self.is_bottom() || other.is_bottom() {
            return Self::bottom();
        }
        Self::new(self.interval.narrowing(&other.interval), self.congruence.narrowing(&other.congruence))
    }

    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.interval.add(&other.interval), self.congruence.add(&other.congruence))
    }
    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.interval.sub(&other.interval), self.congruence.sub(&other.congruence))
    }
    pub fn mul(&self, other: &Self) -> Self {
        Self::new(self.interval.mul(&other.interval), self.congruence.mul(&other.congruence))
    }
    pub fn div(&self, other: &Self) -> Self {
        Self::new(self.interval.div(&other.interval), self.congruence.div(&other.congruence))
    }
    pub fn rem(&self, other: &Self) -> Self {
        Self::new(self.interval.rem(&other.interval), self.congruence.rem(&other.congruence))
    }
    /// Mathematical modulo: the interval component uses `Interval::mod_`;
    /// the congruence component has no separate notion of mod vs rem.
    pub fn mod_(&self, other: &Self) -> Self {
        Self::new(self.interval.mod_(&other.interval), self.congruence.rem(&other.congruence))
    }
    pub fn shl(&self, other: &Self) -> Self {
        Self::new(self.interval.shl(&other.interval), self.congruence.shl(&other.congruence))
    }
    pub fn shr(&self, other: &Self) -> Self {
        Self::new(self.interval.shr_arith(&other.interval), self.congruence.shr(&other.congruence))
    }
    pub fn bitand(&self, other: &Self) -> Self {
        Self::new(self.interval.bitand(&other.interval), self.congruence.bitand(&other.congruence))
    }
    pub fn bitor(&self, other: &Self) -> Self {
        Self::new(self.interval.bitor(&other.interval), self.congruence.bitor(&other.congruence))
    }
    pub fn bitxor(&self, other: &Self) -> Self {
        Self::new(self.interval.bitxor(&other.interval), self.congruence.bitxor(&other.congruence))
    }

    pub fn dump(&self) -> String {
        if self.is_bottom() {
            "\u{22a5}".to_string()
        } else {
            format!("{} \u{2229} {}", self.interval.dump(), self.congruence.dump())
        }
    }
}

impl PartialEq for IntervalCongruence {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_iff_no_integer_in_range_matches_residue() {
        let interval = Interval::closed(Bound::finite(ZNumber::from(0i64)), Bound::finite(ZNumber::from(4i64)));
        let congruence = Congruence::new(ZNumber::from(6i64), ZNumber::from(5i64));
        let ic = IntervalCongruence::new(interval, congruence);
        assert!(ic.is_bottom());
    }

    #[test]
    fn snaps_to_nearest_matching_multiple() {
        let interval = Interval::closed(Bound::finite(ZNumber::from(0i64)), Bound::finite(ZNumber::from(10i64)));
        let congruence = Congruence::new(ZNumber::from(3i64), ZNumber::from(1i64));
        let ic = IntervalCongruence::new(interval, congruence);
        assert_eq!(*ic.interval().lb(), Bound::finite(ZNumber::from(1i64)));
        assert_eq!(*ic.interval().ub(), Bound::finite(ZNumber::from(10i64)));
    }
}
