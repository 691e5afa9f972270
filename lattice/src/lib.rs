//! Diagnostic exploration of the powerset lattice of a logic program's
//! constraints.
//!
//! Given an ordered universe of constraints and an [`oracle::Oracle`]
//! deciding, for any subset, whether the induced program is satisfiable and
//! whether it admits one or several possible worlds, a constraint map
//! ([`cmap`]) memoizes verdicts per lattice node, infers unvisited nodes from
//! the committed MSS/MUS/MAS/MUAS witnesses, and refines arbitrary seeds
//! into maximal/minimal witnesses. [`explore::Explorer`] drives the loop
//! until the lattice is partitioned into explained regions.

pub mod bits;
pub mod cmap;
pub mod explore;
pub mod node;
pub mod oracle;
pub mod params;
pub mod universe;

pub use bits::SubsetCode;
pub use cmap::{BitConstraintMap, ConstraintMap, Refined, RefineConfig};
pub use explore::{Exploration, Explorer, ExplorerConfig, Goal, SeedOrder};
pub use node::{AmbiguityStatus, EvalState, ModelCount, Node, SatStatus};
pub use oracle::{CountOracle, Oracle, OracleAmbiguity, OracleStats};
pub use universe::{Constraint, Universe};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A subset mentioned an identifier that is not part of the universe.
    #[error("unknown constraint `{0}`")]
    UnknownConstraint(String),

    #[error("duplicate constraint `{0}` in the universe")]
    DuplicateConstraint(String),

    /// The universe does not fit the configured subset-code width.
    #[error("universe of {n} constraints exceeds the supported width of {max} bits")]
    UniverseTooWide { n: usize, max: usize },

    /// Propagated from the oracle; the refinement in progress was abandoned
    /// with nothing committed.
    #[error("oracle failure: {0}")]
    Oracle(#[source] anyhow::Error),

    /// A memo update contradicted an already-definite record. Points at a
    /// non-deterministic oracle or a caller bug; never recovered.
    #[error("conflicting model counts for subset {subset}: recorded {existing:?}, new {new:?}")]
    InconsistentCount {
        subset: String,
        existing: ModelCount,
        new: ModelCount,
    },

    /// The external logic solver misbehaved. A solver returning zero models
    /// is normal termination, not an error.
    #[error("logic solver failure: {0}")]
    Solver(#[source] anyhow::Error),
}
