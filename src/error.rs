//! Contract-violation taxonomy (`spec.md` §7).
//!
//! These are programming errors, not recoverable conditions: a well-formed
//! client never triggers them. They are modeled as a typed enum so call
//! sites can match on the kind when they do show up during development,
//! the way `CfgErr`/`SlabListError` are matched in the teacher crate, but
//! the crate's own call sites turn them into panics per the contract.

use crate::number::Signedness;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error("shift amount {0} out of range for width {1}")]
    ShiftOutOfRange(i128, u32),

    #[error("incompatible machine integers: ({0}, {1:?}) vs ({2}, {3:?})")]
    IncompatibleMachineInt(u32, Signedness, u32, Signedness),

    #[error("division by zero was not excluded by the caller")]
    DivisionByZero,

    #[error("joined polymorphic domains of different runtime types ({0} vs {1})")]
    PolymorphicTypeMismatch(&'static str, &'static str),

    #[error("increasing iteration failed to converge after widening at node {0}")]
    NonConvergence(String),

    #[error("bound addition of opposite infinities is undefined")]
    InfinityClash,
}

impl ContractError {
    /// Raises the contract violation as a panic carrying this error as the message,
    /// matching `spec.md` §7: "the implementation may abort with a diagnostic".
    #[cold]
    #[track_caller]
    pub fn raise(self) -> ! {
        panic!("{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_stable() {
        let e = ContractError::DivisionByZero;
        assert_eq!(e.to_string(), "division by zero was not excluded by the caller");
    }
}
