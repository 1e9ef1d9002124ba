//! Congruence lattice over `MachineInt` (`spec.md` §3/§4.2): internally a
//! `Z`-congruence, re-wrapped into the machine integer's range on every
//! observation.

use super::Congruence;
use crate::error::ContractError;
use crate::number::{MachineInt, Signedness};

#[derive(Clone, Debug)]
pub struct CongruenceMInt {
    width: u32,
    sign: Signedness,
    inner: Congruence,
}

impl CongruenceMInt {
    pub fn bottom(width: u32, sign: Signedness) -> Self {
        Self { width, sign, inner: Congruence::bottom() }
    }
    pub fn top(width: u32, sign: Signedness) -> Self {
        Self { width, sign, inner: Congruence::top() }
    }
    pub fn singleton(n: MachineInt) -> Self {
        Self { width: n.width(), sign: n.sign(), inner: Congruence::singleton(n.to_znumber()) }
    }
    pub fn new(width: u32, sign: Signedness, modulus: crate::number::ZNumber, residue: MachineInt) -> Self {
        Self { width, sign, inner: Congruence::new(modulus, residue.to_znumber()) }
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn sign(&self) -> Signedness {
        self.sign
    }
    pub fn inner(&self) -> &Congruence {
        &self.inner
    }
    pub fn is_bottom(&self) -> bool {
        self.inner.is_bottom()
    }
    pub fn is_top(&self) -> bool {
        self.inner.is_top()
    }
    pub fn as_singleton(&self) -> Option<MachineInt> {
        self.inner.as_singleton().map(|n| MachineInt::from_znumber(n, self.width, self.sign))
    }
    pub fn contains(&self, n: &MachineInt) -> bool {
        self.inner.contains(&n.to_znumber())
    }

    fn require_compatible(&self, other: &Self) {
        if self.width != other.width || self.sign != other.sign {
            ContractError::IncompatibleMachineInt(self.width, self.sign, other.width, other.sign).raise();
        }
    }

    pub fn leq(&self, other: &Self) -> bool {
        self.require_compatible(other);
        self.inner.leq(&other.inner)
    }
    pub fn equals(&self, other: &Self) -> bool {
        self.require_compatible(other);
        self.inner.equals(&other.inner)
    }
    pub fn join(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self { width: self.width, sign: self.sign, inner: self.inner.join(&other.inner) }
    }
    pub fn meet(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self { width: self.width, sign: self.sign, inner: self.inner.meet(&other.inner) }
    }
    pub fn widening(&self, other: &Self) -> Self {
        self.join(other)
    }
    pub fn narrowing(&self, other: &Self) -> Self {
        self.meet(other)
    }

    pub fn add(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self { width: self.width, sign: self.sign, inner: self.inner.add(&other.inner) }
    }
    pub fn sub(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self { width: self.width, sign: self.sign, inner: self.inner.sub(&other.inner) }
    }
    pub fn mul(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self { width: self.width, sign: self.sign, inner: self.inner.mul(&other.inner) }
    }

    pub fn dump(&self) -> String {
        self.inner.dump()
    }
}

impl PartialEq for CongruenceMInt {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Signedness::*;

    #[test]
    fn singleton_roundtrips() {
        let n = MachineInt::new(7, 8, Signed);
        let c = CongruenceMInt::singleton(n.clone());
        assert_eq!(c.as_singleton(), Some(n));
    }

    #[test]
    fn join_widens_modulus() {
        let a = CongruenceMInt::singleton(MachineInt::new(1, 8, Unsigned));
        let b = CongruenceMInt::singleton(MachineInt::new(3, 8, Unsigned));
        let j = a.join(&b);
        assert!(j.contains(&MachineInt::new(5, 8, Unsigned)));
        assert!(!j.contains(&MachineInt::new(4, 8, Unsigned)));
    }
}
