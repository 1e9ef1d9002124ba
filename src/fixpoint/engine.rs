//! The host-supplied hooks the iterator calls back into (`spec.md` §4.7,
//! "Hooks (user overrides)"). The core never interprets statements itself
//! — `analyze_node` is where a host walks a basic block applying the
//! transfer functions of `spec.md` §4.4 to its chosen `NumericalDomain`.

use crate::interfaces::{GraphTrait, Variable};
use crate::number::ZNumber;
use crate::numerical::NumericalDomain;

/// Callbacks a host implements to drive one fixpoint run over its CFG
/// (`spec.md` §4.7/§6). `G` is the host's graph, `V` its variable universe,
/// `D` the numerical domain chosen for the run.
pub trait FixpointEngine<G: GraphTrait, V: Variable, D: NumericalDomain<V>> {
    /// Applies the statements of `node`'s basic block to `pre`, returning
    /// the abstract state at the block's exit (`spec.md` §4.7:
    /// `post[n] := analyze_node(n, pre[n])`).
    fn analyze_node(&mut self, node: &G::Node, pre: &D) -> D;

    /// Applies whatever a host associates with the edge `from -> to`
    /// (e.g. a branch condition) to `from`'s post-state, producing the
    /// edge's contribution to `to`'s pre-state (`spec.md` §4.7:
    /// `pre[n] := \bigsqcup analyze_edge(p, n, post[p])`).
    fn analyze_edge(&mut self, from: &G::Node, to: &G::Node, src_post: &D) -> D;

    /// Optional per-head widening threshold (`spec.md` §4.7: "a
    /// user-provided per-head `widening_hint(threshold)`"). `None` means
    /// no hint is available for this head.
    fn widening_hint(&self, _head: &G::Node) -> Option<ZNumber> {
        None
    }

    /// Combines the prior invariant `before` at a loop head with the
    /// freshly evaluated `after` during increasing iteration `iteration`
    /// (1-based). Default policy is exactly `spec.md` §4.7's
    /// `iterate_loop`: plain join on the first iteration, a threshold
    /// widening on the second if [`Self::widening_hint`] returns one,
    /// unqualified widening otherwise.
    fn extrapolate(&mut self, head: &G::Node, iteration: u32, before: &D, after: &D) -> D {
        if iteration <= 1 {
            before.join_loop(after)
        } else if iteration == 2 {
            match self.widening_hint(head) {
                Some(threshold) => before.widening_threshold(after, &threshold),
                None => before.widening(after),
            }
        } else {
            before.widening(after)
        }
    }

    /// Stop condition for the decreasing (narrowing) phase (`spec.md`
    /// §4.7). Default policy: keep narrowing while it still refines
    /// (`!new.leq(old)` would mean narrowing weakened something, which a
    /// sound domain never does); stop as soon as `old` and `new` coincide.
    /// Domains without a meaningful narrowing (e.g. pure congruences,
    /// where `narrowing` is effectively `meet`/identity) converge here in
    /// one call by construction, matching `spec.md`'s "otherwise stop
    /// after one decreasing iteration" without needing a separate flag.
    fn is_decreasing_iterations_fixpoint(&self, old: &D, new: &D) -> bool {
        old.leq(new)
    }

    /// Called once per node after its pre-invariant is final (`spec.md`
    /// §4.7). Default is a no-op; hosts that stream invariants to a
    /// checker layer override this.
    fn process_pre(&mut self, _node: &G::Node, _pre: &D) {}
    /// Called once per node after its post-invariant is final.
    fn process_post(&mut self, _node: &G::Node, _post: &D) {}
}
