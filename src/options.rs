//! Plain analysis-options record (`spec.md` §6, "CLI and environment").
//!
//! A host program that embeds this crate builds one of these and threads it
//! into the fixpoint iterator. The core never reads process environment
//! variables or argv; every knob a host might want lives here, the way the
//! teacher crate threads `IRModule`/`FuncID` handles explicitly rather than
//! reaching for globals.

/// Which numerical abstraction is used for machine-integer variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MachineIntDomainKind {
    #[default]
    Interval,
    Congruence,
    IntervalCongruence,
    Dbm,
    Gauge,
}

/// How precisely memory (as opposed to scalars) is tracked by a host's
/// memory-abstraction layer built atop this core (`spec.md` §4.8 / L8).
/// The core does not implement this layer; it only needs to know which
/// mode a host picked so logging/diagnostics can mention it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MemoryPrecision {
    /// Track no memory invariants, scalars only.
    #[default]
    ScalarsOnly,
    /// Track memory cells without points-to partitioning.
    Cells,
    /// Full points-to + cell partitioning.
    Partitioned,
}

/// Policy for initializing global variables before the fixpoint run starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlobalsInitPolicy {
    /// Globals start at their declared initializer value.
    #[default]
    InitializerValue,
    /// Globals start at top (no assumption about the initializer).
    Top,
}

/// Inert, cloneable options record consumed (never mutated) by the fixpoint
/// iterator and its caller-supplied hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub machine_int_domain: MachineIntDomainKind,
    pub memory_precision: MemoryPrecision,
    pub globals_init: GlobalsInitPolicy,
    /// Names or identifiers of entry points, opaque to the core.
    pub entry_points: Vec<String>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            machine_int_domain: MachineIntDomainKind::default(),
            memory_precision: MemoryPrecision::default(),
            globals_init: GlobalsInitPolicy::default(),
            entry_points: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_are_conservative() {
        let opts = AnalysisOptions::default();
        assert_eq!(opts.machine_int_domain, MachineIntDomainKind::Interval);
        assert_eq!(opts.memory_precision, MemoryPrecision::ScalarsOnly);
        assert!(opts.entry_points.is_empty());
    }
}
