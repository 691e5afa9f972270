//! The logic-program evaluator seam.

use std::collections::BTreeSet;
use std::marker::PhantomData;

use crate::node::{AmbiguityStatus, ModelCount};
use crate::universe::Constraint;

/// Verdict of an ambiguity check: a satisfiable subset either pins a single
/// possible world or admits several; an unsatisfiable one admits none.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OracleAmbiguity {
    Ambiguous,
    Unambiguous,
    Unsat,
}

impl OracleAmbiguity {
    /// Model-count hint carried by the verdict.
    pub fn count_hint(self) -> ModelCount {
        match self {
            OracleAmbiguity::Ambiguous => ModelCount::AtLeast(2),
            OracleAmbiguity::Unambiguous => ModelCount::Exact(1),
            OracleAmbiguity::Unsat => ModelCount::Exact(0),
        }
    }
}

impl From<OracleAmbiguity> for AmbiguityStatus {
    fn from(verdict: OracleAmbiguity) -> AmbiguityStatus {
        match verdict {
            OracleAmbiguity::Ambiguous => AmbiguityStatus::Ambiguous,
            OracleAmbiguity::Unambiguous => AmbiguityStatus::Unambiguous,
            OracleAmbiguity::Unsat => AmbiguityStatus::Unsat,
        }
    }
}

/// Decides satisfiability and ambiguity of the program induced by a subset.
///
/// Implementations must be deterministic for a given subset. They may cache
/// internally, and may fork a solver subprocess; a returned error abandons
/// the refinement in progress without committing anything.
pub trait Oracle<C: Constraint> {
    fn check_sat(&mut self, subset: &BTreeSet<C>) -> anyhow::Result<bool>;

    fn check_ambiguity(&mut self, subset: &BTreeSet<C>) -> anyhow::Result<OracleAmbiguity>;
}

/// Number of oracle calls answered so far, by kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OracleStats {
    pub sat_checks: u64,
    pub ambiguity_checks: u64,
}

/// Oracle backed by a possible-world counting function.
pub struct CountOracle<C, F> {
    count: F,
    stats: OracleStats,
    _constraint: PhantomData<C>,
}

impl<C, F> CountOracle<C, F> {
    pub fn new(count: F) -> Self {
        CountOracle {
            count,
            stats: OracleStats::default(),
            _constraint: PhantomData,
        }
    }

    pub fn stats(&self) -> OracleStats {
        self.stats
    }
}

impl<C: Constraint, F: Fn(&BTreeSet<C>) -> u64> Oracle<C> for CountOracle<C, F> {
    fn check_sat(&mut self, subset: &BTreeSet<C>) -> anyhow::Result<bool> {
        self.stats.sat_checks += 1;
        Ok((self.count)(subset) > 0)
    }

    fn check_ambiguity(&mut self, subset: &BTreeSet<C>) -> anyhow::Result<OracleAmbiguity> {
        self.stats.ambiguity_checks += 1;
        Ok(match (self.count)(subset) {
            0 => OracleAmbiguity::Unsat,
            1 => OracleAmbiguity::Unambiguous,
            _ => OracleAmbiguity::Ambiguous,
        })
    }
}
