//! Constraint maps: memoized views of the subset lattice.
//!
//! A constraint map tracks the committed MSS/MUS/MAS/MUAS collections,
//! memoizes oracle verdicts per node, answers satisfiability and ambiguity
//! queries by explicit lookup or implicit dominance inference, and refines
//! arbitrary witness subsets into maximal/minimal ones.

mod bit;

pub use bit::BitConstraintMap;

use std::collections::BTreeSet;

use crate::bits::SubsetCode;
use crate::node::{AmbiguityStatus, EvalState, ModelCount, SatStatus};
use crate::oracle::Oracle;
use crate::universe::{Constraint, Universe};
use crate::Error;

/// Options honoured by the four refinement operations.
#[derive(Debug, Clone, Copy)]
pub struct RefineConfig {
    /// Commit the refined subset to the matching collection.
    pub commit: bool,
    /// Record every probed node's verdict as a model-count hint.
    pub record_intermediate: bool,
}

impl Default for RefineConfig {
    fn default() -> Self {
        RefineConfig {
            commit: true,
            record_intermediate: true,
        }
    }
}

/// A refinement result: the maximal/minimal subset reached from the seed and,
/// when the universe fits the code width, its integer code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refined<C> {
    pub subset: BTreeSet<C>,
    pub code: Option<SubsetCode>,
}

/// Common contract of the lattice maps.
///
/// `block_down` removes a subset and all its supersets from the unexplored
/// region; `block_up` removes it and all its subsets. Refinements consult the
/// oracle only where the map cannot already answer, and commit their result
/// unless configured otherwise. An oracle error abandons the refinement in
/// progress with nothing committed.
pub trait ConstraintMap {
    type C: Constraint;

    fn universe(&self) -> &Universe<Self::C>;

    fn num_constraints(&self) -> usize {
        self.universe().len()
    }

    fn mss_subsets(&self) -> Vec<BTreeSet<Self::C>>;
    fn mus_subsets(&self) -> Vec<BTreeSet<Self::C>>;
    fn mas_subsets(&self) -> Vec<BTreeSet<Self::C>>;
    fn muas_subsets(&self) -> Vec<BTreeSet<Self::C>>;

    /// Merge a possible-world count into the subset's node record.
    fn update_num_pws(&mut self, subset: &BTreeSet<Self::C>, count: ModelCount)
        -> Result<(), Error>;

    /// Three-valued satisfiability: explicit record first, then dominance by
    /// the committed collections.
    fn check_sat(&self, subset: &BTreeSet<Self::C>) -> Result<SatStatus, Error>;

    /// Four-valued ambiguity: explicit record first, then dominance.
    fn check_ambiguity(&self, subset: &BTreeSet<Self::C>) -> Result<AmbiguityStatus, Error>;

    /// Best known possible-world count, falling back to the satisfiability
    /// inference (`sat` gives at least one world, `unsat` exactly none).
    fn check_num_pws(&self, subset: &BTreeSet<Self::C>) -> Result<ModelCount, Error>;

    fn check_eval_state(&self, subset: &BTreeSet<Self::C>) -> Result<EvalState, Error>;

    /// Any unexplored subset, or `None` once the lattice is fully explored.
    fn get_unexplored(&mut self) -> Result<Option<BTreeSet<Self::C>>, Error>;

    /// An unexplored subset of maximum cardinality, ties broken arbitrarily.
    fn get_unexplored_max(&mut self) -> Result<Option<BTreeSet<Self::C>>, Error>;

    /// Mark `subset` and every subset of it explored.
    fn block_up(&mut self, subset: &BTreeSet<Self::C>) -> Result<(), Error>;

    /// Mark `subset` and every superset of it explored.
    fn block_down(&mut self, subset: &BTreeSet<Self::C>) -> Result<(), Error>;

    /// Extend a satisfiable seed into a maximal satisfiable subset.
    fn grow(
        &mut self,
        seed: &BTreeSet<Self::C>,
        oracle: &mut dyn Oracle<Self::C>,
        config: &RefineConfig,
    ) -> Result<Refined<Self::C>, Error>;

    /// Shrink an unsatisfiable seed into a minimal unsatisfiable subset.
    fn shrink(
        &mut self,
        seed: &BTreeSet<Self::C>,
        oracle: &mut dyn Oracle<Self::C>,
        config: &RefineConfig,
    ) -> Result<Refined<Self::C>, Error>;

    /// Extend an ambiguous seed into a maximal ambiguous subset.
    fn grow_ambiguous(
        &mut self,
        seed: &BTreeSet<Self::C>,
        oracle: &mut dyn Oracle<Self::C>,
        config: &RefineConfig,
    ) -> Result<Refined<Self::C>, Error>;

    /// Shrink an unambiguous seed into a minimal unambiguous subset.
    fn shrink_unambiguous(
        &mut self,
        seed: &BTreeSet<Self::C>,
        oracle: &mut dyn Oracle<Self::C>,
        config: &RefineConfig,
    ) -> Result<Refined<Self::C>, Error>;
}
