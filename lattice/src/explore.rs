//! Outer enumeration loop.
//!
//! Repeatedly draws an unexplored seed from the map, classifies it (asking
//! the oracle only when the map cannot already answer), refines it into a
//! maximal/minimal witness, and blocks the region the witness dominates.
//! The run ends when the map reports the lattice fully explored.

use std::collections::BTreeSet;

use tracing::debug;

use crate::cmap::{ConstraintMap, RefineConfig};
use crate::node::{AmbiguityStatus, ModelCount, SatStatus};
use crate::oracle::{Oracle, OracleAmbiguity};
use crate::Error;

/// Which region families the exploration carves the lattice into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    /// Partition by satisfiability: MSS and MUS.
    Satisfiability,
    /// Partition by ambiguity: MAS, MUAS and, for unsatisfiable seeds, MUS.
    Ambiguity,
}

/// How the next seed is drawn from the unexplored region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeedOrder {
    #[default]
    Any,
    MaxCardinality,
}

#[derive(Debug, Clone, Copy)]
pub struct ExplorerConfig {
    pub goal: Goal,
    pub seed_order: SeedOrder,
    pub refine: RefineConfig,
}

impl ExplorerConfig {
    pub fn satisfiability() -> Self {
        ExplorerConfig {
            goal: Goal::Satisfiability,
            seed_order: SeedOrder::default(),
            refine: RefineConfig::default(),
        }
    }

    pub fn ambiguity() -> Self {
        ExplorerConfig {
            goal: Goal::Ambiguity,
            seed_order: SeedOrder::default(),
            refine: RefineConfig::default(),
        }
    }
}

/// The committed collections at the end of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exploration<C> {
    pub mss: Vec<BTreeSet<C>>,
    pub mus: Vec<BTreeSet<C>>,
    pub mas: Vec<BTreeSet<C>>,
    pub muas: Vec<BTreeSet<C>>,
}

/// Drives a constraint map to a complete partition of its lattice.
pub struct Explorer<M, O> {
    map: M,
    oracle: O,
    config: ExplorerConfig,
}

impl<M: ConstraintMap, O: Oracle<M::C>> Explorer<M, O> {
    pub fn new(map: M, oracle: O, config: ExplorerConfig) -> Self {
        Explorer { map, oracle, config }
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn into_parts(self) -> (M, O) {
        (self.map, self.oracle)
    }

    pub fn run(&mut self) -> Result<Exploration<M::C>, Error> {
        while let Some(seed) = self.next_seed()? {
            debug!(size = seed.len(), "drew unexplored seed");
            match self.config.goal {
                Goal::Satisfiability => self.step_satisfiability(&seed)?,
                Goal::Ambiguity => self.step_ambiguity(&seed)?,
            }
        }
        Ok(Exploration {
            mss: self.map.mss_subsets(),
            mus: self.map.mus_subsets(),
            mas: self.map.mas_subsets(),
            muas: self.map.muas_subsets(),
        })
    }

    fn next_seed(&mut self) -> Result<Option<BTreeSet<M::C>>, Error> {
        match self.config.seed_order {
            SeedOrder::Any => self.map.get_unexplored(),
            SeedOrder::MaxCardinality => self.map.get_unexplored_max(),
        }
    }

    fn step_satisfiability(&mut self, seed: &BTreeSet<M::C>) -> Result<(), Error> {
        let sat = match self.map.check_sat(seed)? {
            SatStatus::Sat => true,
            SatStatus::Unsat => false,
            SatStatus::Unknown => {
                let sat = self.oracle.check_sat(seed).map_err(Error::Oracle)?;
                self.map.update_num_pws(seed, ModelCount::from_sat(sat))?;
                sat
            }
        };
        let refine = self.config.refine;
        if sat {
            let mss = self.map.grow(seed, &mut self.oracle, &refine)?;
            self.map.block_up(&mss.subset)?;
        } else {
            let mus = self.map.shrink(seed, &mut self.oracle, &refine)?;
            self.map.block_down(&mus.subset)?;
        }
        Ok(())
    }

    fn step_ambiguity(&mut self, seed: &BTreeSet<M::C>) -> Result<(), Error> {
        let verdict = match self.map.check_ambiguity(seed)? {
            AmbiguityStatus::Ambiguous => OracleAmbiguity::Ambiguous,
            AmbiguityStatus::Unambiguous => OracleAmbiguity::Unambiguous,
            AmbiguityStatus::Unsat => OracleAmbiguity::Unsat,
            AmbiguityStatus::Unknown => {
                let verdict = self.oracle.check_ambiguity(seed).map_err(Error::Oracle)?;
                self.map.update_num_pws(seed, verdict.count_hint())?;
                verdict
            }
        };
        let refine = self.config.refine;
        match verdict {
            OracleAmbiguity::Ambiguous => {
                let mas = self.map.grow_ambiguous(seed, &mut self.oracle, &refine)?;
                self.map.block_up(&mas.subset)?;
            }
            OracleAmbiguity::Unambiguous => {
                let muas = self.map.shrink_unambiguous(seed, &mut self.oracle, &refine)?;
                self.map.block_down(&muas.subset)?;
            }
            OracleAmbiguity::Unsat => {
                let mus = self.map.shrink(seed, &mut self.oracle, &refine)?;
                self.map.block_down(&mus.subset)?;
            }
        }
        Ok(())
    }
}
