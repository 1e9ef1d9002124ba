//! Linear expressions `sum(c_i * v_i) + c_0` over a variable universe
//! (`spec.md` §3/§4.3, `LinearExpression`).

use crate::interfaces::Variable;
use crate::number::ZNumber;
use std::collections::BTreeMap;

/// Canonical form: no zero coefficients are ever stored.
#[derive(Clone, Debug)]
pub struct LinearExpression<V: Variable> {
    constant: ZNumber,
    coeffs: BTreeMap<V, ZNumber>,
}

impl<V: Variable> LinearExpression<V> {
    pub fn constant(c: ZNumber) -> Self {
        Self { constant: c, coeffs: BTreeMap::new() }
    }
    pub fn zero() -> Self {
        Self::constant(ZNumber::zero())
    }
    pub fn variable(v: V) -> Self {
        Self::term(ZNumber::one(), v)
    }
    pub fn term(coeff: ZNumber, v: V) -> Self {
        let mut coeffs = BTreeMap::new();
        if !coeff.is_zero() {
            coeffs.insert(v, coeff);
        }
        Self { constant: ZNumber::zero(), coeffs }
    }

    pub fn constant_term(&self) -> &ZNumber {
        &self.constant
    }
    pub fn coefficient(&self, v: &V) -> ZNumber {
        self.coeffs.get(v).cloned().unwrap_or_else(ZNumber::zero)
    }
    pub fn variables(&self) -> impl Iterator<Item = &V> {
        self.coeffs.keys()
    }
    pub fn terms(&self) -> impl Iterator<Item = (&V, &ZNumber)> {
        self.coeffs.iter()
    }
    pub fn num_terms(&self) -> usize {
        self.coeffs.len()
    }
    pub fn is_constant(&self) -> bool {
        self.coeffs.is_empty()
    }
    pub fn as_constant(&self) -> Option<&ZNumber> {
        self.is_constant().then_some(&self.constant)
    }
    /// A single-variable expression with unit coefficient and no constant,
    /// i.e. exactly `v`.
    pub fn as_single_variable(&self) -> Option<&V> {
        if self.constant.is_zero() && self.coeffs.len() == 1 {
            let (v, c) = self.coeffs.iter().next().unwrap();
            (*c == ZNumber::one()).then_some(v)
        } else {
            None
        }
    }

    pub fn add_term(&mut self, coeff: ZNumber, v: V) {
        if coeff.is_zero() {
            return;
        }
        match self.coeffs.get_mut(&v) {
            Some(existing) => {
                *existing = &*existing + &coeff;
                if existing.is_zero() {
                    self.coeffs.remove(&v);
                }
            }
            None => {
                self.coeffs.insert(v, coeff);
            }
        }
    }

    pub fn scale(&self, factor: &ZNumber) -> Self {
        if factor.is_zero() {
            return Self::zero();
        }
        let constant = &self.constant * factor;
        let coeffs = self.coeffs.iter().map(|(v, c)| (v.clone(), c * factor)).collect();
        Self { constant, coeffs }
    }

    pub fn add(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.constant = &result.constant + &other.constant;
        for (v, c) in &other.coeffs {
            result.add_term(c.clone(), v.clone());
        }
        result
    }
    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.scale(&ZNumber::from(-1i64)))
    }

    /// Substitute `v` with `replacement` (another linear expression),
    /// returning a new canonical-form expression.
    pub fn substitute(&self, v: &V, replacement: &Self) -> Self {
        match self.coeffs.get(v) {
            None => self.clone(),
            Some(coeff) => {
                let coeff = coeff.clone();
                let mut result = self.clone();
                result.coeffs.remove(v);
                let substituted = replacement.scale(&coeff);
                result.constant = &result.constant + &substituted.constant;
                for (rv, rc) in &substituted.coeffs {
                    result.add_term(rc.clone(), rv.clone());
                }
                result
            }
        }
    }
}

impl<V: Variable> PartialEq for LinearExpression<V> {
    fn eq(&self, other: &Self) -> bool {
        self.constant == other.constant && self.coeffs == other.coeffs
    }
}
impl<V: Variable> Eq for LinearExpression<V> {}

impl<V: Variable> std::fmt::Display for LinearExpression<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (v, c) in &self.coeffs {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}*{}", c, v.name_for_dump())?;
            first = false;
        }
        if !self.constant.is_zero() || first {
            if !first {
                write!(f, " + ")?;
            }
            write!(f, "{}", self.constant)?;
        }
        Ok(())
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

    #[test]
    fn canonical_form_drops_zero_coefficients() {
        let mut e = LinearExpression::term(ZNumber::from(2i64), V("x"));
        e.add_term(ZNumber::from(-2i64), V("x"));
        assert!(e.is_constant());
        assert_eq!(e.num_terms(), 0);
    }

    #[test]
    fn substitution_expands_linearly() {
        // e = 2x + 1, replace x with (y + 3) -> 2y + 7
        let e = LinearExpression::term(ZNumber::from(2i64), V("x")).add(&LinearExpression::constant(ZNumber::one()));
        let repl = LinearExpression::variable(V("y")).add(&LinearExpression::constant(ZNumber::from(3i64)));
        let substituted = e.substitute(&V("x"), &repl);
        assert_eq!(substituted.coefficient(&V("y")), ZNumber::from(2i64));
        assert_eq!(*substituted.constant_term(), ZNumber::from(7i64));
    }
}
