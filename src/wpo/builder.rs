//! Weak partial ordering construction (`spec.md` §4.6).
//!
//! Grounded on the teacher's `opt::analysis::dfs`/`opt::analysis::dominance`
//! pair: a DFS that classifies every edge while it walks
//! (`CfgDfsSeq`/`DfsBuild`), followed by an offline union-find pass in the
//! style of `opt::analysis::cfg::dominance`'s semi-dominator computation.
//! `base::DSU` (copied from the same teacher file as its dominance solver
//! uses) backs the Tarjan-style offline LCA over the DFS tree that
//! `spec.md` step 2 asks for.
//!
//! The algorithm in five passes:
//!  1. Iterative DFS from `graph.entry()`, classifying every edge as
//!     tree/back/forward/cross and recording DFS postorder.
//!  2. Offline LCA for every non-tree edge via Tarjan's algorithm over the
//!     DFS tree, using `DSU` with path compression (`spec.md` step 2).
//!  3. Head discovery (back-edge targets and self-loops) and, for each head
//!     bottom-up, a backward-reachability walk over non-back edges that
//!     builds its component, collapsing any already-built nested
//!     component into a single unit (`spec.md` step 3).
//!  4. Emission: nodes are visited in ascending discovery order, with a
//!     head opening a `Head` marker, recursing into its component's
//!     members in the same ascending order, and closing with an `Exit`
//!     marker (`spec.md` step 4). This linearizes the nesting precisely
//!     without needing the DFS tree's own parent/child shape to line up
//!     with component membership, which isn't guaranteed on an irreducible
//!     graph.
//!  5. Edge wiring: every original edge is linked on its real endpoints;
//!     back edges are additionally routed to their head's `Exit`; edges
//!     entering a component at a node other than its head are counted as
//!     irreducible arrows on that component's `Exit` (`spec.md` steps 5-6).

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use crate::base::DSU;
use crate::interfaces::GraphTrait;

use super::node::WpoNode;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum EdgeKind {
    Tree,
    Back,
    Forward,
    Cross,
}

#[derive(Clone, Copy, Debug)]
struct DfsEdge {
    from: usize,
    to: usize,
    kind: EdgeKind,
}

/// A weak partial ordering over a host CFG (`spec.md` §3/§4.6).
#[derive(Debug, Clone)]
pub struct Wpo<N> {
    nodes: Vec<WpoNode<N>>,
    index_of: HashMap<N, usize>,
    /// `back_predecessors[head_pos]`: WPO positions of nodes with a back
    /// edge into `head_pos` (`spec.md` §3).
    back_predecessors: HashMap<usize, Vec<usize>>,
    back_edges: HashSet<(usize, usize)>,
    /// Diagnostic-only: DFS-tree LCA of every non-tree edge's endpoints,
    /// keyed by WPO position (`spec.md` §4.6 step 2). Not consulted by
    /// component construction, which instead follows the backward-
    /// reachability definition of step 3 directly; kept so a host can
    /// sanity-check nesting depth without recomputing it.
    lca_of_edge: HashMap<(usize, usize), usize>,
}

struct DfsState<N> {
    dfs_nodes: Vec<N>,
    index_of_dfs: HashMap<N, usize>,
    parent: Vec<usize>,
    children: Vec<Vec<usize>>,
    finish_order: Vec<usize>,
    edges: Vec<DfsEdge>,
}

const NULL_PARENT: usize = usize::MAX;

fn run_dfs<N, G>(graph: &G) -> DfsState<N>
where
    N: Clone + Eq + Hash + Debug,
    G: GraphTrait<Node = N>,
{
    struct Frame<N> {
        id: usize,
        succs: Vec<N>,
        next: usize,
    }

    let entry = graph.entry();
    let mut dfs_nodes = vec![entry.clone()];
    let mut index_of_dfs = HashMap::new();
    index_of_dfs.insert(entry.clone(), 0usize);
    let mut parent = vec![NULL_PARENT];
    let mut children: Vec<Vec<usize>> = vec![Vec::new()];
    // 0 = gray (on stack), 1 = black (finished); absence from `index_of_dfs` means white.
    let mut color: Vec<u8> = vec![0];
    let mut finish_order = Vec::new();
    let mut edges = Vec::new();

    let mut stack = vec![Frame { id: 0, succs: graph.successors(&entry).collect(), next: 0 }];

    while let Some(frame) = stack.last_mut() {
        if frame.next < frame.succs.len() {
            let succ = frame.succs[frame.next].clone();
            frame.next += 1;
            let from_id = frame.id;
            match index_of_dfs.get(&succ).copied() {
                None => {
                    let new_id = dfs_nodes.len();
                    index_of_dfs.insert(succ.clone(), new_id);
                    dfs_nodes.push(succ.clone());
                    parent.push(from_id);
                    children.push(Vec::new());
                    color.push(0);
                    children[from_id].push(new_id);
                    edges.push(DfsEdge { from: from_id, to: new_id, kind: EdgeKind::Tree });
                    let succs: Vec<N> = graph.successors(&succ).collect();
                    stack.push(Frame { id: new_id, succs, next: 0 });
                }
                Some(to_id) => {
                    let kind = if color[to_id] == 0 {
                        EdgeKind::Back
                    } else if to_id > from_id {
                        EdgeKind::Forward
                    } else {
                        EdgeKind::Cross
                    };
                    edges.push(DfsEdge { from: from_id, to: to_id, kind });
                }
            }
        } else {
            let id = frame.id;
            stack.pop();
            color[id] = 1;
            finish_order.push(id);
        }
    }

    DfsState { dfs_nodes, index_of_dfs, parent, children, finish_order, edges }
}

/// Tarjan's offline LCA over the DFS tree, using `DSU` with path
/// compression (`spec.md` §4.6 step 2).
fn offline_lca(n: usize, parent: &[usize], finish_order: &[usize], queries: &[(usize, usize)]) -> HashMap<(usize, usize), usize> {
    let mut dsu = DSU::new(n);
    let mut ancestor: Vec<usize> = (0..n).collect();
    let mut black = vec![false; n];
    let mut queries_by_node: Vec<Vec<(usize, usize)>> = vec![Vec::new(); n];
    for (idx, &(u, v)) in queries.iter().enumerate() {
        queries_by_node[u].push((v, idx));
    }
    let mut result = vec![None; queries.len()];

    for &u in finish_order {
        // Every DFS-tree child of `u` finishes before `u` in `finish_order`.
        for v in 0..n {
            if parent[v] == u {
                dsu.union(v, u);
                let root = dsu.find(u);
                ancestor[root] = u;
            }
        }
        let root = dsu.find(u);
        ancestor[root] = u;
        black[u] = true;
        for &(v, query_idx) in &queries_by_node[u] {
            if black[v] {
                let root_v = dsu.find(v);
                result[query_idx] = Some(ancestor[root_v]);
            }
        }
    }

    let mut out = HashMap::new();
    for (idx, &(u, v)) in queries.iter().enumerate() {
        if let Some(l) = result[idx] {
            out.insert((u, v), l);
        }
    }
    out
}

/// `u` belongs to head `h`'s component (possibly nested several levels
/// deep), including `u == h` itself.
fn is_inside(enclosing: &HashMap<usize, usize>, mut u: usize, h: usize) -> bool {
    if u == h {
        return true;
    }
    loop {
        match enclosing.get(&u) {
            Some(&parent) => {
                if parent == h {
                    return true;
                }
                u = parent;
            }
            None => return false,
        }
    }
}

struct Emitter<N> {
    dfs_nodes: Vec<N>,
    is_head: Vec<bool>,
    enclosing: HashMap<usize, usize>,
    out: Vec<WpoNode<N>>,
    pos_of: HashMap<usize, usize>,
    exit_pos_of: HashMap<usize, usize>,
}

impl<N: Clone> Emitter<N> {
    fn members_of(&self, head: usize, n: usize) -> Vec<usize> {
        let mut v: Vec<usize> =
            (0..n).filter(|x| self.enclosing.get(x).copied() == Some(head)).collect();
        v.sort_unstable();
        v
    }

    fn emit_region(&mut self, candidates: Vec<usize>, n: usize) {
        for u in candidates {
            if self.pos_of.contains_key(&u) {
                continue;
            }
            if self.is_head[u] {
                self.emit_head(u, n);
            } else {
                self.emit_plain(u);
            }
        }
    }

    fn emit_plain(&mut self, u: usize) {
        let pos = self.out.len();
        self.out.push(WpoNode::new_plain(self.dfs_nodes[u].clone()));
        self.pos_of.insert(u, pos);
    }

    fn emit_head(&mut self, u: usize, n: usize) {
        let head_pos = self.out.len();
        self.out.push(WpoNode::new_head(self.dfs_nodes[u].clone()));
        self.pos_of.insert(u, head_pos);

        let members = self.members_of(u, n);
        let component_size = members.len() + 1;
        self.emit_region(members, n);

        let exit_pos = self.out.len();
        self.out.push(WpoNode::new_exit());
        self.exit_pos_of.insert(u, exit_pos);

        self.out[head_pos].head_link = Some(exit_pos);
        self.out[head_pos].component_size = component_size;
        self.out[exit_pos].head_link = Some(head_pos);
        self.out[exit_pos].component_size = component_size;
    }
}

impl<N: Clone + Eq + Hash + Debug> Wpo<N> {
    /// Builds the WPO of `graph` from its entry node (`spec.md` §4.6).
    /// CFG parts unreachable from `entry` are silently omitted: they stay
    /// permanently `⊥` in the fixpoint tables (`spec.md` §7, "input
    /// ill-formedness").
    pub fn from_graph<G>(graph: &G) -> Self
    where
        G: GraphTrait<Node = N>,
    {
        let dfs = run_dfs(graph);
        let n = dfs.dfs_nodes.len();

        log::trace!("wpo: dfs discovered {n} reachable node(s)");

        // Step 2: offline LCA over non-tree edges (diagnostic only).
        let cross_forward_queries: Vec<(usize, usize)> = dfs
            .edges
            .iter()
            .filter(|e| matches!(e.kind, EdgeKind::Forward | EdgeKind::Cross))
            .map(|e| (e.from, e.to))
            .collect();
        let lca_raw = offline_lca(n, &dfs.parent, &dfs.finish_order, &cross_forward_queries);

        // Step 3: head discovery + component construction.
        let mut back_preds_of: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut preds_nonback: Vec<Vec<usize>> = vec![Vec::new(); n];
        for e in &dfs.edges {
            match e.kind {
                EdgeKind::Back => back_preds_of.entry(e.to).or_default().push(e.from),
                _ => preds_nonback[e.to].push(e.from),
            }
        }
        let mut is_head = vec![false; n];
        for u in 0..n {
            if back_preds_of.get(&u).is_some_and(|v| !v.is_empty()) {
                is_head[u] = true;
            }
        }

        let mut enclosing: HashMap<usize, usize> = HashMap::new();
        for &h in &dfs.finish_order {
            if !is_head[h] {
                continue;
            }
            let mut members: HashSet<usize> = HashSet::new();
            members.insert(h);
            let mut worklist: Vec<usize> = back_preds_of.get(&h).cloned().unwrap_or_default();
            while let Some(m) = worklist.pop() {
                if members.contains(&m) {
                    continue;
                }
                match enclosing.get(&m).copied() {
                    Some(owner) if owner != h => {
                        // `m` already belongs to a smaller, already-built
                        // component (processed earlier since we go
                        // bottom-up): collapse that component to a single
                        // unit and keep walking outward from its head.
                        if members.insert(owner) {
                            enclosing.entry(owner).or_insert(h);
                            worklist.extend(preds_nonback[owner].iter().copied());
                        }
                        continue;
                    }
                    Some(_) => continue, // already claimed by this walk
                    None => {}
                }
                members.insert(m);
                enclosing.insert(m, h);
                worklist.extend(preds_nonback[m].iter().copied());
            }
            log::debug!(
                "wpo: head discovered with {} direct component member(s)",
                members.len() - 1
            );
        }

        // Step 4: emission.
        let top_level: Vec<usize> = {
            let mut v: Vec<usize> = (0..n).filter(|u| !enclosing.contains_key(u)).collect();
            v.sort_unstable();
            v
        };
        let mut emitter = Emitter {
            dfs_nodes: dfs.dfs_nodes.clone(),
            is_head,
            enclosing: enclosing.clone(),
            out: Vec::new(),
            pos_of: HashMap::new(),
            exit_pos_of: HashMap::new(),
        };
        emitter.emit_region(top_level, n);
        let Emitter { out: mut nodes, pos_of, exit_pos_of, .. } = emitter;

        let total = nodes.len();
        let dfs_post_rank: Vec<usize> = {
            let mut rank = vec![0usize; n];
            for (r, &id) in dfs.finish_order.iter().enumerate() {
                rank[id] = r;
            }
            rank
        };
        for (&dfs_id, &pos) in &pos_of {
            nodes[pos].post_order_index = dfs_post_rank[dfs_id];
            nodes[pos].index = total - 1 - pos;
        }
        for (&_head_dfs, &exit_pos) in &exit_pos_of {
            let head_pos = nodes[exit_pos].head_link.expect("exit always links to its head");
            nodes[exit_pos].post_order_index = nodes[head_pos].post_order_index;
            nodes[exit_pos].index = total - 1 - exit_pos;
        }

        // Step 5/6: edge wiring.
        let mut back_predecessors: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut back_edges: HashSet<(usize, usize)> = HashSet::new();
        for (&h_dfs, srcs) in &back_preds_of {
            let h_pos = pos_of[&h_dfs];
            let exit_pos = exit_pos_of[&h_dfs];
            for &s_dfs in srcs {
                let s_pos = pos_of[&s_dfs];
                nodes[exit_pos].predecessors.push(s_pos);
                back_predecessors.entry(h_pos).or_default().push(s_pos);
                back_edges.insert((s_pos, h_pos));
            }
        }

        for e in &dfs.edges {
            let p_pos = pos_of[&e.from];
            let q_pos = pos_of[&e.to];
            nodes[p_pos].successors.push(q_pos);
            nodes[q_pos].predecessors.push(p_pos);
            if !matches!(e.kind, EdgeKind::Back) {
                nodes[q_pos].reducible_pred_count += 1;
            }
            if let Some(&h_dfs) = enclosing.get(&e.to) {
                if h_dfs != e.from && !is_inside(&enclosing, e.from, h_dfs) {
                    let exit_pos = exit_pos_of[&h_dfs];
                    nodes[exit_pos].irreducible_arrows += 1;
                    log::warn!(
                        "wpo: irreducible arrow attributed to a loop exit (multiplicity now {})",
                        nodes[exit_pos].irreducible_arrows
                    );
                }
            }
        }

        // Lifted edges: a nested component's exit feeds its parent's exit
        // (`spec.md` step 4).
        for (&inner_head_dfs, &outer_head_dfs) in &enclosing {
            if !is_head_dfs(&exit_pos_of, inner_head_dfs) {
                continue;
            }
            if let (Some(&inner_exit_pos), Some(&outer_exit_pos)) =
                (exit_pos_of.get(&inner_head_dfs), exit_pos_of.get(&outer_head_dfs))
            {
                nodes[outer_exit_pos].predecessors.push(inner_exit_pos);
                nodes[outer_exit_pos].reducible_pred_count += 1;
            }
        }

        let index_of: HashMap<N, usize> = pos_of
            .iter()
            .map(|(&dfs_id, &pos)| (dfs.dfs_nodes[dfs_id].clone(), pos))
            .collect();

        let lca_of_edge: HashMap<(usize, usize), usize> = lca_raw
            .into_iter()
            .filter_map(|((u, v), l)| {
                Some(((*pos_of.get(&u)?, *pos_of.get(&v)?), *pos_of.get(&l)?))
            })
            .collect();

        Wpo { nodes, index_of, back_predecessors, back_edges, lca_of_edge }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    pub fn node(&self, pos: usize) -> &WpoNode<N> {
        &self.nodes[pos]
    }
    pub fn index_of_node(&self, n: &N) -> Option<usize> {
        self.index_of.get(n).copied()
    }
    /// The entry node is always emitted first: `0` is its discovery
    /// position, and the top-level emission order is ascending discovery
    /// order, so entry (whose discovery id is always `0`) is always first.
    pub fn entry_position(&self) -> usize {
        0
    }

    /// Nodes in visitation order (`spec.md` §3: "visitation is by
    /// decreasing index" — this is literally iteration order, since
    /// `index` is defined to count down as position increases).
    pub fn iter(&self) -> impl Iterator<Item = &WpoNode<N>> {
        self.nodes.iter()
    }

    pub fn is_back_edge_at(&self, from_pos: usize, to_pos: usize) -> bool {
        self.back_edges.contains(&(from_pos, to_pos))
    }

    pub fn exit_of_head(&self, head_pos: usize) -> Option<usize> {
        self.nodes.get(head_pos).filter(|n| n.is_head()).and_then(|n| n.head_link)
    }
    pub fn head_of_exit(&self, exit_pos: usize) -> Option<usize> {
        self.nodes.get(exit_pos).filter(|n| n.is_exit()).and_then(|n| n.head_link)
    }
    pub fn back_predecessors_of(&self, head_pos: usize) -> &[usize] {
        self.back_predecessors.get(&head_pos).map(Vec::as_slice).unwrap_or(&[])
    }
    pub fn lca_of(&self, from_pos: usize, to_pos: usize) -> Option<usize> {
        self.lca_of_edge.get(&(from_pos, to_pos)).copied()
    }

    /// Advisory text dump (`SPEC_FULL.md` §3 supplement): node kind,
    /// successors, predecessors, and irreducible-arrow counts. Not meant to
    /// round-trip.
    pub fn dump(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for (pos, node) in self.nodes.iter().enumerate() {
            let _ = write!(
                out,
                "[{idx}] {kind} {graph_node:?} succ={succ:?} pred={pred:?}",
                idx = node.index,
                kind = node.dump_kind(),
                graph_node = node.graph_node,
                succ = node.successors,
                pred = node.predecessors,
            );
            if node.is_exit() {
                let _ = write!(out, " irreducible={}", node.irreducible_arrows);
            }
            let _ = writeln!(out, " [pos {pos}]");
        }
        out
    }
}

fn is_head_dfs(exit_pos_of: &HashMap<usize, usize>, dfs_id: usize) -> bool {
    exit_pos_of.contains_key(&dfs_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ToyCfg;

    #[test]
    fn straight_line_has_no_heads() {
        let cfg = ToyCfg::chain(4);
        let wpo = Wpo::from_graph(&cfg);
        assert_eq!(wpo.len(), 4);
        assert!(wpo.iter().all(|n| n.is_plain()));
    }

    #[test]
    fn single_loop_gets_head_and_adjacent_exit() {
        let cfg = ToyCfg::single_loop();
        let wpo = Wpo::from_graph(&cfg);
        let head_pos = wpo.iter().position(|n| n.is_head()).expect("loop must have a head");
        let exit_pos = wpo.exit_of_head(head_pos).expect("head must have a matching exit");
        assert_eq!(wpo.head_of_exit(exit_pos), Some(head_pos));
        assert!(!wpo.back_predecessors_of(head_pos).is_empty());
    }

    #[test]
    fn back_edge_target_is_always_a_head() {
        let cfg = ToyCfg::nested_loops();
        let wpo = Wpo::from_graph(&cfg);
        for (pos, node) in wpo.iter().enumerate() {
            for &succ in &node.successors {
                if wpo.is_back_edge_at(pos, succ) {
                    assert!(wpo.node(succ).is_head(), "back edge target must be a Head");
                }
            }
        }
    }

    #[test]
    fn nested_loops_each_get_their_own_head() {
        let cfg = ToyCfg::nested_loops();
        let wpo = Wpo::from_graph(&cfg);
        let heads = wpo.iter().filter(|n| n.is_head()).count();
        assert_eq!(heads, 2, "inner and outer loop each need a head");
    }

    #[test]
    fn decreasing_index_is_weakly_topological() {
        let cfg = ToyCfg::chain(5);
        let wpo = Wpo::from_graph(&cfg);
        // In a DAG, every successor must have a strictly smaller index
        // than its predecessor (`spec.md` §4.6 correctness conditions).
        for node in wpo.iter() {
            for &succ in &node.successors {
                assert!(wpo.node(succ).index < node.index);
            }
        }
    }
}
