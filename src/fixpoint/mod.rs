//! L7: the interleaved forward fixpoint iterator (`spec.md` §4.7), driven
//! by the `Wpo` built in [`crate::wpo`] and calling back into a
//! host-supplied [`FixpointEngine`] to interpret statements and edges.
//!
//! Grounded on the teacher's `opt::transforms` pass-driver shape (a small
//! struct owning per-node tables, a `run` entry point, and overridable
//! hooks) generalized from "one pass over one function" to "WPO-ordered
//! traversal with nested loop convergence" (`spec.md` §4.7).

mod cancel;
mod engine;
mod iterator;

pub use cancel::CancellationToken;
pub use engine::FixpointEngine;
pub use iterator::{FixpointIterator, RunOutcome};
