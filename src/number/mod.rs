//! L0/L1: arbitrary-precision and machine integers, and extended bounds
//! (`spec.md` §3, §4.1).

mod bound;
mod machine_int;
mod signedness;
mod znumber;

pub use bound::{Bound, BoundNumber};
pub use machine_int::MachineInt;
pub use signedness::Signedness;
pub use znumber::ZNumber;
