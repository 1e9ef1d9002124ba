//! L2: scalar abstract-value lattices — Interval, Congruence and their
//! reduced product, over both `ZNumber` and `MachineInt` (`spec.md` §4.2).

mod congruence;
mod congruence_mint;
mod interval;
mod interval_congruence;
mod interval_congruence_mint;
mod interval_mint;

pub use congruence::Congruence;
pub use congruence_mint::CongruenceMInt;
pub use interval::Interval;
pub use interval_congruence::IntervalCongruence;
pub use interval_congruence_mint::IntervalCongruenceMInt;
pub use interval_mint::IntervalMInt;
