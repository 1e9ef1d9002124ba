//! Fixed-width two's-complement integers (`spec.md` §3/§4.1, `MachineInt`).

use super::{Signedness, ZNumber};
use crate::error::ContractError;
use num_bigint::BigInt;
use num_traits::{One, Signed as _, Zero};

/// `MachineInt(value, bit-width w in 1..=1024, sign)`.
///
/// The stored value is always reduced into the signed/unsigned two's
/// complement range implied by `(width, sign)` — that is the class
/// invariant every constructor and operator restores before returning.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MachineInt {
    value: BigInt,
    width: u32,
    sign: Signedness,
}

fn modulus(width: u32) -> BigInt {
    BigInt::one() << width
}

/// Reduce `raw` into the canonical signed/unsigned range for `(width, sign)`.
fn normalize(raw: BigInt, width: u32, sign: Signedness) -> BigInt {
    let m = modulus(width);
    let mut r = ((raw % &m) + &m) % &m; // now in [0, m)
    if sign.is_signed() && width > 0 {
        let half = BigInt::one() << (width - 1);
        if r >= half {
            r -= &m;
        }
    }
    r
}

impl MachineInt {
    pub fn new(value: impl Into<BigInt>, width: u32, sign: Signedness) -> Self {
        assert!((1..=1024).contains(&width), "machine integer width out of range: {width}");
        Self { value: normalize(value.into(), width, sign), width, sign }
    }

    pub fn from_znumber(value: &ZNumber, width: u32, sign: Signedness) -> Self {
        Self::new(value.as_bigint().clone(), width, sign)
    }

    pub fn zero(width: u32, sign: Signedness) -> Self {
        Self::new(BigInt::zero(), width, sign)
    }
    pub fn one(width: u32, sign: Signedness) -> Self {
        Self::new(BigInt::one(), width, sign)
    }
    pub fn min_value(width: u32, sign: Signedness) -> Self {
        match sign {
            Signedness::Unsigned => Self::zero(width, sign),
            Signedness::Signed => Self::new(-(BigInt::one() << (width - 1)), width, sign),
        }
    }
    pub fn max_value(width: u32, sign: Signedness) -> Self {
        match sign {
            Signedness::Unsigned => Self::new(modulus(width) - 1, width, sign),
            Signedness::Signed => Self::new((BigInt::one() << (width - 1)) - 1, width, sign),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }
    pub fn sign(&self) -> Signedness {
        self.sign
    }
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }
    pub fn is_negative(&self) -> bool {
        self.value.is_negative()
    }

    pub fn as_bigint(&self) -> &BigInt {
        &self.value
    }
    pub fn to_znumber(&self) -> ZNumber {
        ZNumber::from(self.value.clone())
    }

    pub fn compatible(&self, other: &Self) -> bool {
        self.width == other.width && self.sign == other.sign
    }
    fn require_compatible(&self, other: &Self) {
        if !self.compatible(other) {
            ContractError::IncompatibleMachineInt(self.width, self.sign, other.width, other.sign)
                .raise();
        }
    }

    /// Unsigned bit pattern, in `[0, 2^width)`, regardless of sign tag.
    fn raw_bits(&self) -> BigInt {
        if self.value.is_negative() { &self.value + modulus(self.width) } else { self.value.clone() }
    }

    fn check_shift_amount(&self, shift: &Self) {
        let amount = shift.as_bigint();
        if amount.is_negative() || *amount >= BigInt::from(self.width) {
            let ival = amount.clone();
            use num_traits::ToPrimitive;
            ContractError::ShiftOutOfRange(ival.to_i128().unwrap_or(i128::MAX), self.width)
                .raise();
        }
    }

    // ---- wrapping arithmetic ----

    pub fn wrapping_add(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(&self.value + &other.value, self.width, self.sign)
    }
    pub fn wrapping_sub(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(&self.value - &other.value, self.width, self.sign)
    }
    pub fn wrapping_mul(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(&self.value * &other.value, self.width, self.sign)
    }
    pub fn wrapping_neg(&self) -> Self {
        Self::new(-&self.value, self.width, self.sign)
    }

    /// Non-wrapping variants: compute both the wrapped result and whether
    /// the exact mathematical result fell outside the representable range.
    pub fn checked_add(&self, other: &Self) -> (Self, bool) {
        self.require_compatible(other);
        let exact = &self.value + &other.value;
        self.classify_overflow(exact)
    }
    pub fn checked_sub(&self, other: &Self) -> (Self, bool) {
        self.require_compatible(other);
        let exact = &self.value - &other.value;
        self.classify_overflow(exact)
    }
    pub fn checked_mul(&self, other: &Self) -> (Self, bool) {
        self.require_compatible(other);
        let exact = &self.value * &other.value;
        self.classify_overflow(exact)
    }

    fn classify_overflow(&self, exact: BigInt) -> (Self, bool) {
        let lo = Self::min_value(self.width, self.sign).value;
        let hi = Self::max_value(self.width, self.sign).value;
        let overflowed = exact < lo || exact > hi;
        (Self::new(exact, self.width, self.sign), overflowed)
    }

    /// Truncating division toward zero. Contract violation on division by zero.
    pub fn div(&self, other: &Self) -> Self {
        self.require_compatible(other);
        if other.is_zero() {
            ContractError::DivisionByZero.raise();
        }
        Self::new(&self.value / &other.value, self.width, self.sign)
    }
    /// Remainder with the sign of the dividend.
    pub fn rem(&self, other: &Self) -> Self {
        self.require_compatible(other);
        if other.is_zero() {
            ContractError::DivisionByZero.raise();
        }
        Self::new(&self.value % &other.value, self.width, self.sign)
    }
    /// Mathematical modulo: sign of the divisor, non-negative when `other > 0`.
    pub fn mod_(&self, other: &Self) -> Self {
        self.require_compatible(other);
        if other.is_zero() {
            ContractError::DivisionByZero.raise();
        }
        let m = self.to_znumber().mod_floor(&other.to_znumber());
        Self::from_znumber(&m, self.width, self.sign)
    }

    // ---- bitwise ----

    pub fn bitand(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(self.raw_bits() & other.raw_bits(), self.width, self.sign)
    }
    pub fn bitor(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(self.raw_bits() | other.raw_bits(), self.width, self.sign)
    }
    pub fn bitxor(&self, other: &Self) -> Self {
        self.require_compatible(other);
        Self::new(self.raw_bits() ^ other.raw_bits(), self.width, self.sign)
    }
    pub fn bitnot(&self) -> Self {
        let complement = modulus(self.width) - BigInt::one() - self.raw_bits();
        Self::new(complement, self.width, self.sign)
    }

    /// Shift left. Zero-filled on both signednesses.
    pub fn shl(&self, shift: &Self) -> Self {
        self.check_shift_amount(shift);
        use num_traits::ToPrimitive;
        let s = shift.as_bigint().to_u32().unwrap();
        Self::new(self.raw_bits() << s, self.width, self.sign)
    }
    /// Logical shift right (zero-filled), ignoring sign.
    pub fn lshr(&self, shift: &Self) -> Self {
        self.check_shift_amount(shift);
        use num_traits::ToPrimitive;
        let s = shift.as_bigint().to_u32().unwrap();
        Self::new(self.raw_bits() >> s, self.width, self.sign)
    }
    /// Arithmetic shift right (sign-filled).
    pub fn ashr(&self, shift: &Self) -> Self {
        self.check_shift_amount(shift);
        use num_traits::ToPrimitive;
        let s = shift.as_bigint().to_u32().unwrap();
        Self::new(self.value.clone() >> s, self.width, self.sign)
    }
    /// Dispatches to `ashr`/`lshr` based on this value's sign tag — the
    /// shift the domain interface actually calls.
    pub fn shr(&self, shift: &Self) -> Self {
        match self.sign {
            Signedness::Signed => self.ashr(shift),
            Signedness::Unsigned => self.lshr(shift),
        }
    }

    // ---- width / sign conversions ----

    /// Keep the low `w'` bits. Requires `w' < self.width()`.
    pub fn trunc(&self, new_width: u32) -> Self {
        assert!(new_width < self.width, "trunc requires a strictly smaller width");
        Self::new(self.raw_bits(), new_width, self.sign)
    }
    /// Widen to `w'`: zero-extend if unsigned, sign-extend if signed.
    /// Requires `w' > self.width()`.
    pub fn ext(&self, new_width: u32) -> Self {
        assert!(new_width > self.width, "ext requires a strictly larger width");
        Self::new(self.value.clone(), new_width, self.sign)
    }
    /// Reinterpret the bit pattern under a different sign, same width.
    pub fn sign_cast(&self, new_sign: Signedness) -> Self {
        Self::new(self.raw_bits(), self.width, new_sign)
    }
    /// General width+sign cast: truncate or extend using the current sign,
    /// then reinterpret under the target sign if it differs.
    pub fn cast(&self, new_width: u32, new_sign: Signedness) -> Self {
        use std::cmp::Ordering::*;
        let widened = match new_width.cmp(&self.width) {
            Less => self.trunc(new_width),
            Greater => self.ext(new_width),
            Equal => self.clone(),
        };
        if widened.sign == new_sign { widened } else { widened.sign_cast(new_sign) }
    }

    pub fn cmp_value(&self, other: &Self) -> std::cmp::Ordering {
        self.require_compatible(other);
        self.value.cmp(&other.value)
    }
}

impl std::fmt::Debug for MachineInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "i{}{}({})", self.width, if self.sign.is_signed() { "s" } else { "u" }, self.value)
    }
}
impl std::fmt::Display for MachineInt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl PartialOrd for MachineInt {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.compatible(other) { Some(self.value.cmp(&other.value)) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Signedness::*;

    #[test]
    fn wraps_on_overflow() {
        let x = MachineInt::new(85, 8, Signed);
        let y = MachineInt::new(43, 8, Signed);
        let sum = x.wrapping_add(&y);
        assert_eq!(sum, MachineInt::new(-128, 8, Signed));
    }

    #[test]
    fn checked_add_reports_overflow() {
        let x = MachineInt::new(120, 8, Signed);
        let y = MachineInt::new(50, 8, Signed);
        let (wrapped, overflowed) = x.checked_add(&y);
        assert!(overflowed);
        assert_eq!(wrapped, MachineInt::new(-86, 8, Signed));
    }

    #[test]
    fn rem_has_sign_of_dividend_mod_has_sign_of_divisor() {
        let a = MachineInt::new(-7, 8, Signed);
        let b = MachineInt::new(3, 8, Signed);
        assert_eq!(a.rem(&b), MachineInt::new(-1, 8, Signed));
        assert_eq!(a.mod_(&b), MachineInt::new(2, 8, Signed));
    }

    #[test]
    fn trunc_and_ext_roundtrip_low_bits() {
        let x = MachineInt::new(0xABCDu32, 16, Unsigned);
        let truncated = x.trunc(8);
        assert_eq!(truncated, MachineInt::new(0xCD, 8, Unsigned));
        let extended = truncated.ext(16);
        assert_eq!(extended, MachineInt::new(0xCD, 16, Unsigned));
    }

    #[test]
    fn sign_extend_preserves_negative_value() {
        let x = MachineInt::new(-1i32, 8, Signed);
        let extended = x.ext(16);
        assert_eq!(extended, MachineInt::new(-1i32, 16, Signed));
    }

    #[test]
    fn sign_cast_reinterprets_bit_pattern() {
        let x = MachineInt::new(-1i32, 8, Signed); // 0xFF
        let unsigned = x.sign_cast(Unsigned);
        assert_eq!(unsigned, MachineInt::new(255, 8, Unsigned));
    }

    #[test]
    fn ashr_is_sign_filled_lshr_is_zero_filled() {
        let neg = MachineInt::new(-8i32, 8, Signed); // 0xF8
        let one = MachineInt::new(1, 8, Signed);
        assert_eq!(neg.ashr(&one), MachineInt::new(-4, 8, Signed));
        let unsigned_view = neg.sign_cast(Unsigned);
        let one_u = MachineInt::new(1, 8, Unsigned);
        assert_eq!(unsigned_view.lshr(&one_u), MachineInt::new(0xF8u32 >> 1, 8, Unsigned));
    }

    #[test]
    #[should_panic(expected = "shift amount")]
    fn shift_out_of_range_is_a_contract_violation() {
        let x = MachineInt::new(1, 8, Unsigned);
        let shift = MachineInt::new(8, 8, Unsigned);
        let _ = x.shl(&shift);
    }

    #[test]
    #[should_panic(expected = "incompatible machine integers")]
    fn incompatible_widths_are_a_contract_violation() {
        let x = MachineInt::new(1, 8, Unsigned);
        let y = MachineInt::new(1, 16, Unsigned);
        let _ = x.wrapping_add(&y);
    }
}
