//! Congruence lattice over `ZNumber` (`spec.md` §3/§4.2): `aZ + b`.

use crate::number::ZNumber;

/// `bottom | aZ + b` with `a >= 0` and `b` reduced mod `a` when `a > 0`.
/// `a == 0` means the singleton `{b}`. Top is `1Z + 0` (every integer).
#[derive(Clone, Debug)]
pub struct Congruence {
    bottom: bool,
    modulus: ZNumber,
    residue: ZNumber,
}

impl Congruence {
    pub fn bottom() -> Self {
        Self { bottom: true, modulus: ZNumber::zero(), residue: ZNumber::zero() }
    }
    pub fn top() -> Self {
        Self { bottom: false, modulus: ZNumber::one(), residue: ZNumber::zero() }
    }
    /// Build `aZ + b`, reducing `b` modulo `a` when `a > 0`.
    pub fn new(a: ZNumber, b: ZNumber) -> Self {
        let a = a.abs();
        if a.is_zero() {
            Self { bottom: false, modulus: ZNumber::zero(), residue: b }
        } else {
            Self { bottom: false, modulus: a.clone(), residue: b.mod_floor(&a) }
        }
    }
    pub fn singleton(n: ZNumber) -> Self {
        Self::new(ZNumber::zero(), n)
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }
    pub fn is_top(&self) -> bool {
        !self.bottom && self.modulus == ZNumber::one() && self.residue.is_zero()
    }
    /// `a == 0`: the element denotes a single value.
    pub fn is_singleton_modulus(&self) -> bool {
        !self.bottom && self.modulus.is_zero()
    }
    pub fn modulus(&self) -> &ZNumber {
        &self.modulus
    }
    pub fn residue(&self) -> &ZNumber {
        &self.residue
    }
    pub fn as_singleton(&self) -> Option<&ZNumber> {
        self.is_singleton_modulus().then_some(&self.residue)
    }

    pub fn contains(&self, n: &ZNumber) -> bool {
        if self.bottom {
            return false;
        }
        if self.modulus.is_zero() {
            *n == self.residue
        } else {
            (n - &self.residue).mod_floor(&self.modulus).is_zero()
        }
    }

    /// `leq`: every value of `self` is congruent to `other`, i.e.
    /// `other.modulus` divides `self.modulus` and the residues agree.
    pub fn leq(&self, other: &Self) -> bool {
        if self.bottom {
            return true;
        }
        if other.bottom {
            return false;
        }
        if other.modulus.is_zero() {
            return self.is_singleton_modulus() && self.residue == other.residue;
        }
        if self.modulus.is_zero() {
            return self.residue.mod_floor(&other.modulus) == other.residue.mod_floor(&other.modulus);
        }
        (&self.modulus % &other.modulus).is_zero()
            && self.residue.mod_floor(&other.modulus) == other.residue.mod_floor(&other.modulus)
    }
    pub fn equals(&self, other: &Self) -> bool {
        if self.bottom || other.bottom {
            return self.bottom == other.bottom;
        }
        self.modulus == other.modulus && self.residue == other.residue
    }

    /// Join: gcd of moduli and of the residue difference, matching the
    /// standard congruence-domain join.
    pub fn join(&self, other: &Self) -> Self {
        if self.bottom {
            return other.clone();
        }
        if other.bottom {
            return self.clone();
        }
        let diff = (&self.residue - &other.residue).abs();
        let a = self.modulus.gcd(&other.modulus).gcd(&diff);
        Self::new(a, self.residue.clone())
    }

    /// Meet via the extended Euclidean algorithm (CRT-style combination).
    pub fn meet(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        if self.modulus.is_zero() {
            return if other.contains(&self.residue) { self.clone() } else { Self::bottom() };
        }
        if other.modulus.is_zero() {
            return if self.contains(&other.residue) { other.clone() } else { Self::bottom() };
        }
        // Solve x = residue (mod modulus) = other.residue (mod other.modulus).
        let (g, p, _q) = extended_gcd(self.modulus.clone(), other.modulus.clone());
        let diff = &other.residue - &self.residue;
        if !(&diff % &g).is_zero() {
            return Self::bottom();
        }
        let lcm = self.modulus.lcm(&other.modulus);
        let t = (&diff / &g) * p;
        let x = (&self.residue + &(t * self.modulus.clone())).mod_floor(&lcm);
        Self::new(lcm, x)
    }

    /// Widening for congruences defaults to join: the modulus lattice has
    /// finite ascending chains bounded by the gcd structure, so join alone
    /// guarantees termination.
    pub fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }
    /// Narrowing defaults to meet for the same reason.
    pub fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }

    pub fn neg(&self) -> Self {
        if self.bottom {
            return self.clone();
        }
        Self::new(self.modulus.clone(), -self.residue.clone())
    }
    pub fn add(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let a = self.modulus.gcd(&other.modulus);
        Self::new(a, &self.residue + &other.residue)
    }
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.neg())
    }
    /// Exact under multiplication (gcd combination of the two moduli,
    /// weighted by the operands' residues).
    pub fn mul(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let a1 = &self.modulus;
        let b1 = &self.residue;
        let a2 = &other.modulus;
        let b2 = &other.residue;
        let a = a1.gcd(a2).gcd(&(a1.clone() * a2.clone()));
        let a = a.gcd(&(b1.clone() * a2.clone())).gcd(&(a1.clone() * b2.clone()));
        Self::new(a, b1 * b2)
    }

    /// Division follows the standard congruence algebra: exact only when
    /// the divisor is a nonzero singleton dividing the modulus and residue.
    pub fn div(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        match other.as_singleton() {
            Some(d) if !d.is_zero() && (&self.modulus % d).is_zero() && (&self.residue % d).is_zero() => {
                Self::new(&self.modulus / d.clone(), &self.residue / d.clone())
            }
            _ => Self::top(),
        }
    }
    pub fn rem(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        match other.as_singleton() {
            Some(d) if !d.is_zero() => Self::new(d.abs(), ZNumber::zero()),
            _ => Self::top(),
        }
    }

    /// Shift left by a constant `k` doubles the modulus and residue (the
    /// "doubling rule"); shift right by a constant halves them when exact.
    pub fn shl(&self, shift: &Self) -> Self {
        if self.bottom || shift.bottom {
            return Self::bottom();
        }
        match shift.as_singleton() {
            Some(k) if !k.is_negative() => {
                let factor = ZNumber::one().shl(k);
                Self::new(self.modulus.clone() * factor.clone(), self.residue.clone() * factor)
            }
            _ => Self::top(),
        }
    }
    pub fn shr(&self, shift: &Self) -> Self {
        if self.bottom || shift.bottom {
            return Self::bottom();
        }
        match shift.as_singleton() {
            Some(k) if !k.is_negative() => {
                let factor = ZNumber::one().shl(k);
                if (&self.modulus % &factor).is_zero() && (&self.residue % &factor).is_zero() {
                    Self::new(&self.modulus / factor.clone(), &self.residue / factor)
                } else {
                    Self::top()
                }
            }
            _ => Self::top(),
        }
    }

    /// Bitwise ops use a `2^k` over-approximation (`weaken`): widen the
    /// modulus down to the largest power of two dividing it before
    /// combining, since bit operations only respect power-of-two moduli.
    fn weaken(&self) -> Self {
        if self.bottom || self.modulus.is_zero() {
            return self.clone();
        }
        let mut k = ZNumber::one();
        while (&self.modulus % &k).is_zero() {
            let next = &k * &ZNumber::from(2i64);
            if (&self.modulus % &next).is_zero() {
                k = next;
            } else {
                break;
            }
        }
        Self::new(k, self.residue.clone())
    }
    pub fn bitand(&self, other: &Self) -> Self {
        self.weakened_bitop(other)
    }
    pub fn bitor(&self, other: &Self) -> Self {
        self.weakened_bitop(other)
    }
    pub fn bitxor(&self, other: &Self) -> Self {
        self.weakened_bitop(other)
    }
    /// Both operands are widened to the nearest power-of-two modulus; the
    /// result is then only known to respect the coarser of the two
    /// (bit operations cannot refine past that power of two), with the
    /// residue forgotten since none of AND/OR/XOR preserve it exactly.
    fn weakened_bitop(&self, other: &Self) -> Self {
        if self.bottom || other.bottom {
            return Self::bottom();
        }
        let w1 = self.weaken();
        let w2 = other.weaken();
        let a = std::cmp::min(w1.modulus, w2.modulus);
        Self::new(a, ZNumber::zero())
    }

    pub fn dump(&self) -> String {
        if self.bottom {
            "\u{22a5}".to_string()
        } else if self.modulus.is_zero() {
            format!("{{{}}}", self.residue)
        } else {
            format!("{}Z + {}", self.modulus, self.residue)
        }
    }
}

/// Returns `(g, x, y)` with `g = gcd(a, b) = a*x + b*y`.
fn extended_gcd(a: ZNumber, b: ZNumber) -> (ZNumber, ZNumber, ZNumber) {
    if b.is_zero() {
        (a, ZNumber::one(), ZNumber::zero())
    } else {
        let q = a.clone() / b.clone();
        let r = a % b.clone();
        let (g, x1, y1) = extended_gcd(b, r);
        let y = x1.clone() - (q * y1.clone());
        (g, y1, y)
    }
}

impl PartialEq for Congruence {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_c_join_and_meet() {
        let a = Congruence::singleton(ZNumber::from(1i64));
        let b = Congruence::new(ZNumber::zero(), ZNumber::from(3i64));
        let joined = a.join(&b);
        assert_eq!(joined, Congruence::new(ZNumber::from(2i64), ZNumber::from(1i64)));

        let c = Congruence::new(ZNumber::from(6i64), ZNumber::from(1i64));
        let met = joined.meet(&c);
        assert_eq!(met, Congruence::new(ZNumber::from(6i64), ZNumber::from(1i64)));
    }

    #[test]
    fn lattice_laws() {
        let a = Congruence::new(ZNumber::from(4i64), ZNumber::from(1i64));
        let b = Congruence::new(ZNumber::from(6i64), ZNumber::from(1i64));
        assert!(a.leq(&a));
        assert!(a.leq(&a.join(&b)));
        assert!(b.leq(&a.join(&b)));
        assert!(a.meet(&b).leq(&a));
        assert!(a.join(&Congruence::bottom()).equals(&a));
        assert!(a.meet(&Congruence::top()).equals(&a));
    }

    #[test]
    fn meet_of_incompatible_residues_is_bottom() {
        let a = Congruence::new(ZNumber::from(2i64), ZNumber::zero()); // evens
        let b = Congruence::new(ZNumber::from(2i64), ZNumber::one()); // odds
        assert!(a.meet(&b).is_bottom());
    }
}
