//! Arbitrary-precision signed integers (`spec.md` §3, `ZNumber`).
//!
//! Backed by `num-bigint::BigInt` rather than GMP: the contract is what the
//! spec fixes, the arbitrary-precision library is an implementation detail
//! (see `SPEC_FULL.md` §3).

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use std::ops::{
    Add, AddAssign, BitAnd, BitOr, BitXor, Div, DivAssign, Mul, MulAssign, Neg, Not, Rem,
    RemAssign, Shl, Shr, Sub, SubAssign,
};

/// Arbitrary-precision signed integer. Value type; cheap to clone relative
/// to its magnitude (a `Vec<u32>` limb buffer under the hood).
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZNumber(BigInt);

impl ZNumber {
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }
    pub fn one() -> Self {
        Self(BigInt::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.0
    }

    pub fn to_i128(&self) -> Option<i128> {
        use num_traits::ToPrimitive;
        self.0.to_i128()
    }
    pub fn to_u128(&self) -> Option<u128> {
        use num_traits::ToPrimitive;
        self.0.to_u128()
    }

    /// Mathematical absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Greatest common divisor, always non-negative.
    pub fn gcd(&self, other: &Self) -> Self {
        Self(self.0.gcd(&other.0))
    }

    /// Least common multiple, always non-negative.
    pub fn lcm(&self, other: &Self) -> Self {
        Self(self.0.lcm(&other.0))
    }

    /// Mathematical (Euclidean-style floored) modulo: non-negative result
    /// when `divisor > 0`. Contract violation if `divisor == 0`.
    pub fn mod_floor(&self, divisor: &Self) -> Self {
        if divisor.is_zero() {
            crate::error::ContractError::DivisionByZero.raise();
        }
        Self(self.0.mod_floor(&divisor.0))
    }

    /// Smallest value `2^k - 1 >= self` for `self >= 0`.
    pub fn fill_ones(&self) -> Self {
        if self.is_negative() {
            crate::error::ContractError::DivisionByZero.raise();
        }
        if self.is_zero() {
            return Self::zero();
        }
        let bits = self.0.bits();
        let full = (BigInt::one() << bits) - BigInt::one();
        Self(full)
    }

    fn check_shift(shift: &Self) {
        if shift.is_negative() || shift.to_u128().is_none_or(|v| v > u32::MAX as u128) {
            let amount = shift.to_i128().unwrap_or(i128::MAX);
            crate::error::ContractError::ShiftOutOfRange(amount, u32::MAX).raise();
        }
    }

    pub fn shl(&self, shift: &Self) -> Self {
        Self::check_shift(shift);
        let s = shift.to_u128().unwrap() as u32;
        Self(self.0.clone() << s)
    }
    pub fn shr(&self, shift: &Self) -> Self {
        Self::check_shift(shift);
        let s = shift.to_u128().unwrap() as u32;
        Self(self.0.clone() >> s)
    }
}

impl From<i64> for ZNumber {
    fn from(v: i64) -> Self {
        Self(BigInt::from(v))
    }
}
impl From<i128> for ZNumber {
    fn from(v: i128) -> Self {
        Self(BigInt::from(v))
    }
}
impl From<u64> for ZNumber {
    fn from(v: u64) -> Self {
        Self(BigInt::from(v))
    }
}
impl From<BigInt> for ZNumber {
    fn from(v: BigInt) -> Self {
        Self(v)
    }
}

impl std::fmt::Debug for ZNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for ZNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! forward_binop {
    ($trait:ident, $method:ident) => {
        impl $trait for ZNumber {
            type Output = ZNumber;
            fn $method(self, rhs: ZNumber) -> ZNumber {
                ZNumber(self.0.$method(rhs.0))
            }
        }
        impl $trait for &ZNumber {
            type Output = ZNumber;
            fn $method(self, rhs: &ZNumber) -> ZNumber {
                ZNumber((&self.0).$method(&rhs.0))
            }
        }
    };
}

forward_binop!(Add, add);
forward_binop!(Sub, sub);
forward_binop!(Mul, mul);
forward_binop!(BitAnd, bitand);
forward_binop!(BitOr, bitor);
forward_binop!(BitXor, bitxor);

impl Div for ZNumber {
    type Output = ZNumber;
    fn div(self, rhs: ZNumber) -> ZNumber {
        if rhs.is_zero() {
            crate::error::ContractError::DivisionByZero.raise();
        }
        ZNumber(self.0 / rhs.0)
    }
}
impl Div for &ZNumber {
    type Output = ZNumber;
    fn div(self, rhs: &ZNumber) -> ZNumber {
        if rhs.is_zero() {
            crate::error::ContractError::DivisionByZero.raise();
        }
        ZNumber(&self.0 / &rhs.0)
    }
}
impl Rem for ZNumber {
    type Output = ZNumber;
    fn rem(self, rhs: ZNumber) -> ZNumber {
        if rhs.is_zero() {
            crate::error::ContractError::DivisionByZero.raise();
        }
        ZNumber(self.0 % rhs.0)
    }
}
impl Rem for &ZNumber {
    type Output = ZNumber;
    fn rem(self, rhs: &ZNumber) -> ZNumber {
        if rhs.is_zero() {
            crate::error::ContractError::DivisionByZero.raise();
        }
        ZNumber(&self.0 % &rhs.0)
    }
}

impl AddAssign for ZNumber {
    fn add_assign(&mut self, rhs: ZNumber) {
        self.0 += rhs.0;
    }
}
impl SubAssign for ZNumber {
    fn sub_assign(&mut self, rhs: ZNumber) {
        self.0 -= rhs.0;
    }
}
impl MulAssign for ZNumber {
    fn mul_assign(&mut self, rhs: ZNumber) {
        self.0 *= rhs.0;
    }
}
impl DivAssign for ZNumber {
    fn div_assign(&mut self, rhs: ZNumber) {
        *self = self.clone() / rhs;
    }
}
impl RemAssign for ZNumber {
    fn rem_assign(&mut self, rhs: ZNumber) {
        *self = self.clone() % rhs;
    }
}
impl Neg for ZNumber {
    type Output = ZNumber;
    fn neg(self) -> ZNumber {
        ZNumber(-self.0)
    }
}
impl Neg for &ZNumber {
    type Output = ZNumber;
    fn neg(self) -> ZNumber {
        ZNumber(-self.0.clone())
    }
}
impl Not for ZNumber {
    type Output = ZNumber;
    fn not(self) -> ZNumber {
        ZNumber(!self.0)
    }
}

macro_rules! from_primitive {
    ($($t:ty),+) => {
        $(
            impl From<$t> for ZNumber {
                fn from(v: $t) -> Self {
                    Self(BigInt::from(v))
                }
            }
        )+
    };
}
from_primitive!(i8, i16, i32, u8, u16, u32, usize, isize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_lcm() {
        let a = ZNumber::from(12i64);
        let b = ZNumber::from(18i64);
        assert_eq!(a.gcd(&b), ZNumber::from(6i64));
        assert_eq!(a.lcm(&b), ZNumber::from(36i64));
    }

    #[test]
    fn mod_floor_is_non_negative_for_positive_divisor() {
        let a = ZNumber::from(-7i64);
        let b = ZNumber::from(3i64);
        assert_eq!(a.mod_floor(&b), ZNumber::from(2i64));
    }

    #[test]
    fn division_truncates_toward_zero() {
        let a = ZNumber::from(-7i64);
        let b = ZNumber::from(2i64);
        assert_eq!(a.clone() / b.clone(), ZNumber::from(-3i64));
        assert_eq!(a % b, ZNumber::from(-1i64));
    }

    #[test]
    fn fill_ones_rounds_up_to_mersenne() {
        assert_eq!(ZNumber::from(0i64).fill_ones(), ZNumber::from(0i64));
        assert_eq!(ZNumber::from(1i64).fill_ones(), ZNumber::from(1i64));
        assert_eq!(ZNumber::from(5i64).fill_ones(), ZNumber::from(7i64));
        assert_eq!(ZNumber::from(8i64).fill_ones(), ZNumber::from(15i64));
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn division_by_zero_is_a_contract_violation() {
        let _ = ZNumber::from(1i64) / ZNumber::from(0i64);
    }
}
