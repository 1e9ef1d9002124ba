//! L4/L5: the numerical abstract-domain interface and its implementations
//! (`spec.md` §4.4/§4.5).

mod dbm;
mod gauge;
mod interval_store;
mod polyhedra;
mod polymorphic;
mod product;
mod traits;

pub use dbm::Dbm;
pub use gauge::Gauge;
pub use interval_store::IntervalStore;
pub use polyhedra::Polyhedra;
pub use polymorphic::Polymorphic;
pub use product::{Product2, Product3};
pub use traits::{BinaryOp, NumericalDomain};
