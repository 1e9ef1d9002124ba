//! Toy in-memory CFG builder used by WPO and fixpoint tests
//! (`SPEC_FULL.md` §2 ambient test tooling), grounded on the teacher's
//! `testing::cfg`/`testing::cases` pair: a couple of constructor functions
//! that assemble a handful of representative control-flow shapes rather
//! than a general-purpose graph DSL.

use std::collections::HashMap;

use crate::interfaces::{GraphTrait, Variable};

/// A node in a [`ToyCfg`]: a plain `usize` handle, the way the teacher
/// uses raw slab indices for blocks.
pub type ToyNode = usize;

/// An adjacency-list CFG with a fixed entry, implementing [`GraphTrait`]
/// directly so it can drive `Wpo`/fixpoint tests without any IR machinery.
#[derive(Debug, Clone)]
pub struct ToyCfg {
    entry: ToyNode,
    succs: HashMap<ToyNode, Vec<ToyNode>>,
    preds: HashMap<ToyNode, Vec<ToyNode>>,
}

impl ToyCfg {
    pub fn new(entry: ToyNode) -> Self {
        ToyCfg { entry, succs: HashMap::new(), preds: HashMap::new() }
    }

    pub fn add_edge(&mut self, from: ToyNode, to: ToyNode) -> &mut Self {
        self.succs.entry(from).or_default().push(to);
        self.preds.entry(to).or_default().push(from);
        self.succs.entry(to).or_default();
        self.preds.entry(from).or_default();
        self
    }

    /// `0 -> 1 -> ... -> n-1`, no back edges.
    pub fn chain(n: usize) -> Self {
        let mut cfg = Self::new(0);
        for i in 0..n.saturating_sub(1) {
            cfg.add_edge(i, i + 1);
        }
        cfg
    }

    /// `entry -> head -> body -> head` (a `while` loop), `head -> exit`.
    pub fn single_loop() -> Self {
        let mut cfg = Self::new(0);
        cfg.add_edge(0, 1); // entry -> head
        cfg.add_edge(1, 2); // head -> body
        cfg.add_edge(2, 1); // body -> head (back edge)
        cfg.add_edge(1, 3); // head -> exit
        cfg
    }

    /// A loop containing a nested loop: `0 -> 1 -> 2 -> 3 -> 2 (inner back)`,
    /// `3 -> 4`, `4 -> 1 (outer back)`, `1 -> 5` (outer exit).
    pub fn nested_loops() -> Self {
        let mut cfg = Self::new(0);
        cfg.add_edge(0, 1); // entry -> outer head
        cfg.add_edge(1, 2); // outer head -> inner head
        cfg.add_edge(2, 3); // inner head -> inner body
        cfg.add_edge(3, 2); // inner body -> inner head (inner back edge)
        cfg.add_edge(2, 4); // inner head -> outer tail
        cfg.add_edge(4, 1); // outer tail -> outer head (outer back edge)
        cfg.add_edge(1, 5); // outer head -> outer exit
        cfg
    }

    /// A diamond `0 -> {1, 2} -> 3` with no cycles, for join-point tests.
    pub fn diamond() -> Self {
        let mut cfg = Self::new(0);
        cfg.add_edge(0, 1);
        cfg.add_edge(0, 2);
        cfg.add_edge(1, 3);
        cfg.add_edge(2, 3);
        cfg
    }

    /// Two independent entries into the same loop body, making it
    /// irreducible: `0 -> 1`, `0 -> 2`, `1 -> 2`, `2 -> 1` (back edge into
    /// `1`), `2` is also reachable directly from `0`.
    pub fn irreducible() -> Self {
        let mut cfg = Self::new(0);
        cfg.add_edge(0, 1);
        cfg.add_edge(0, 2);
        cfg.add_edge(1, 2);
        cfg.add_edge(2, 1);
        cfg
    }
}

impl GraphTrait for ToyCfg {
    type Node = ToyNode;
    type NodeIter = std::vec::IntoIter<ToyNode>;

    fn entry(&self) -> Self::Node {
        self.entry
    }
    fn successors(&self, node: &Self::Node) -> Self::NodeIter {
        self.succs.get(node).cloned().unwrap_or_default().into_iter()
    }
    fn predecessors(&self, node: &Self::Node) -> Self::NodeIter {
        self.preds.get(node).cloned().unwrap_or_default().into_iter()
    }
}

/// A minimal `Variable` for tests: an interned name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToyVar(pub &'static str);

impl Variable for ToyVar {
    fn name_for_dump(&self) -> String {
        self.0.to_string()
    }
}
