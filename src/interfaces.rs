//! External interfaces (`spec.md` §6): the traits a host implements to
//! plug its CFG and variable universe into this crate. The core never
//! constructs these — it only consumes them.

use std::fmt::Debug;
use std::hash::Hash;

/// Totally ordered, hashable variable handle, externally owned
/// (`spec.md` §3, `VariableRef`; §6, `VariableTrait`).
pub trait Variable: Clone + Eq + Ord + Hash + Debug {
    /// Human-readable name for diagnostics (`spec.md` §6).
    fn name_for_dump(&self) -> String;
}

/// Per-variable machine-integer shape, required by machine-int domains
/// (`spec.md` §6: "each variable carries `(bit_width, sign)`").
pub trait MachineIntVariable: Variable {
    fn bit_width(&self) -> u32;
    fn signedness(&self) -> crate::number::Signedness;
}

/// Totally ordered, hashable memory-location handle (`spec.md` §6,
/// `MemoryLocationTrait`). The numerical core itself never dereferences
/// these; they are passed through untouched for a host's memory layer
/// (`spec.md` §2 L8).
pub trait MemoryLocation: Clone + Eq + Ord + Hash + Debug {
    fn name_for_dump(&self) -> String;
}

/// A CFG supplied by the host (`spec.md` §6, `GraphTrait`). Nodes must be
/// hashable and equality-comparable; the core never mutates the graph.
pub trait GraphTrait {
    type Node: Clone + Eq + Hash + Debug;
    type NodeIter: Iterator<Item = Self::Node>;

    fn entry(&self) -> Self::Node;
    fn successors(&self, node: &Self::Node) -> Self::NodeIter;
    fn predecessors(&self, node: &Self::Node) -> Self::NodeIter;
}
