//! Solver-backed constraint map.
//!
//! Nodes are keyed by frozen subsets rather than integer codes, so the
//! universe may be wider than the code width. The explored/unexplored
//! partition is never held in memory: it lives in the clause encoding, and
//! the external solver produces the next unexplored subset on demand.
//! Refinements are plain sequential oracle walks in universe order, without
//! the bitset map's per-bit memo shortcuts.

use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use tracing::{debug, trace};

use pwlat::cmap::{ConstraintMap, Refined, RefineConfig};
use pwlat::node::{AmbiguityStatus, EvalState, ModelCount, Node, SatStatus};
use pwlat::oracle::{Oracle, OracleAmbiguity};
use pwlat::universe::{Constraint, Universe};
use pwlat::Error;

use crate::encoding::Encoding;
use crate::solver::{LogicSolver, SolverModel};

pub struct AspConstraintMap<C> {
    universe: Universe<C>,
    /// Rendered atom argument back to its universe position.
    atom_index: HashMap<String, usize>,
    encoding: Encoding,
    nodes: HashMap<BTreeSet<C>, Node>,
    mss: BTreeSet<BTreeSet<C>>,
    mus: BTreeSet<BTreeSet<C>>,
    mas: BTreeSet<BTreeSet<C>>,
    muas: BTreeSet<BTreeSet<C>>,
    solver: Box<dyn LogicSolver>,
}

impl<C: Constraint> AspConstraintMap<C> {
    pub fn new(universe: Universe<C>, solver: Box<dyn LogicSolver>) -> Result<Self, Error> {
        let atoms = universe
            .constraints()
            .iter()
            .map(ToString::to_string)
            .collect_vec();
        let mut atom_index = HashMap::with_capacity(atoms.len());
        for (i, atom) in atoms.iter().enumerate() {
            if atom_index.insert(atom.clone(), i).is_some() {
                return Err(Error::DuplicateConstraint(atom.clone()));
            }
        }
        Ok(AspConstraintMap {
            encoding: Encoding::new(atoms),
            atom_index,
            universe,
            nodes: HashMap::new(),
            mss: BTreeSet::new(),
            mus: BTreeSet::new(),
            mas: BTreeSet::new(),
            muas: BTreeSet::new(),
            solver,
        })
    }

    /// The program text the solver sees for a plain `get_unexplored` call.
    pub fn program(&self) -> String {
        self.encoding.render()
    }

    fn validated(&self, subset: &BTreeSet<C>) -> Result<BTreeSet<C>, Error> {
        for c in subset {
            self.universe.position(c)?;
        }
        Ok(subset.clone())
    }

    fn positions(&self, subset: &BTreeSet<C>) -> Result<Vec<usize>, Error> {
        subset.iter().map(|c| self.universe.position(c)).collect()
    }

    fn decode_model(&self, model: &SolverModel) -> Result<BTreeSet<C>, Error> {
        model
            .unary_args("comp")
            .iter()
            .map(|atom| {
                self.atom_index
                    .get(atom)
                    .map(|&i| self.universe.constraints()[i].clone())
                    .ok_or_else(|| {
                        Error::Solver(anyhow::anyhow!("model mentions unknown atom `{atom}`"))
                    })
            })
            .collect()
    }

    fn render_subset(subset: &BTreeSet<C>) -> String {
        format!("{{{}}}", subset.iter().join(", "))
    }

    fn update_count(&mut self, subset: &BTreeSet<C>, count: ModelCount) -> Result<(), Error> {
        self.nodes
            .entry(subset.clone())
            .or_default()
            .update_num_pws(count)
            .map_err(|conflict| Error::InconsistentCount {
                subset: Self::render_subset(subset),
                existing: conflict.existing,
                new: conflict.new,
            })
    }

    fn sat_explicit(&self, subset: &BTreeSet<C>) -> SatStatus {
        self.nodes.get(subset).map(Node::is_sat).unwrap_or_default()
    }

    fn ambiguity_explicit(&self, subset: &BTreeSet<C>) -> AmbiguityStatus {
        self.nodes
            .get(subset)
            .map(Node::is_ambiguous)
            .unwrap_or_default()
    }

    fn sat_implicit(&self, subset: &BTreeSet<C>) -> SatStatus {
        for m in self.mus.iter().chain(self.mss.iter()) {
            if subset.is_subset(m) {
                return SatStatus::Sat;
            }
            if subset.is_superset(m) {
                return SatStatus::Unsat;
            }
        }
        // Only subset dominance is consulted for the ambiguity witnesses.
        for m in self.muas.iter().chain(self.mas.iter()) {
            if subset.is_subset(m) {
                return SatStatus::Sat;
            }
        }
        SatStatus::Unknown
    }

    fn ambiguity_implicit(&self, subset: &BTreeSet<C>) -> AmbiguityStatus {
        for m in self.mas.iter().chain(self.muas.iter()) {
            if subset.is_subset(m) {
                return AmbiguityStatus::Ambiguous;
            }
        }
        for m in self.mus.iter().chain(self.mss.iter()) {
            if subset.is_superset(m) {
                return AmbiguityStatus::Unsat;
            }
        }
        AmbiguityStatus::Unknown
    }

    fn refined(&self, subset: BTreeSet<C>) -> Refined<C> {
        let code = self.universe.constraint_set_to_int(&subset).ok();
        Refined { subset, code }
    }
}

impl<C: Constraint> ConstraintMap for AspConstraintMap<C> {
    type C = C;

    fn universe(&self) -> &Universe<C> {
        &self.universe
    }

    fn mss_subsets(&self) -> Vec<BTreeSet<C>> {
        self.mss.iter().cloned().collect()
    }

    fn mus_subsets(&self) -> Vec<BTreeSet<C>> {
        self.mus.iter().cloned().collect()
    }

    fn mas_subsets(&self) -> Vec<BTreeSet<C>> {
        self.mas.iter().cloned().collect()
    }

    fn muas_subsets(&self) -> Vec<BTreeSet<C>> {
        self.muas.iter().cloned().collect()
    }

    fn update_num_pws(&mut self, subset: &BTreeSet<C>, count: ModelCount) -> Result<(), Error> {
        let subset = self.validated(subset)?;
        self.update_count(&subset, count)
    }

    fn check_sat(&self, subset: &BTreeSet<C>) -> Result<SatStatus, Error> {
        let subset = self.validated(subset)?;
        let explicit = self.sat_explicit(&subset);
        if explicit.is_definite() {
            return Ok(explicit);
        }
        Ok(self.sat_implicit(&subset))
    }

    fn check_ambiguity(&self, subset: &BTreeSet<C>) -> Result<AmbiguityStatus, Error> {
        let subset = self.validated(subset)?;
        let explicit = self.ambiguity_explicit(&subset);
        if explicit.is_definite() {
            return Ok(explicit);
        }
        Ok(self.ambiguity_implicit(&subset))
    }

    fn check_num_pws(&self, subset: &BTreeSet<C>) -> Result<ModelCount, Error> {
        let subset = self.validated(subset)?;
        if let Some(node) = self.nodes.get(&subset) {
            if node.num_pws() != ModelCount::Unevaluated {
                return Ok(node.num_pws());
            }
        }
        Ok(match self.check_sat(&subset)? {
            SatStatus::Sat => ModelCount::AtLeast(1),
            SatStatus::Unsat => ModelCount::Exact(0),
            SatStatus::Unknown => ModelCount::Unevaluated,
        })
    }

    fn check_eval_state(&self, subset: &BTreeSet<C>) -> Result<EvalState, Error> {
        let subset = self.validated(subset)?;
        if let Some(node) = self.nodes.get(&subset) {
            return Ok(node.eval_state());
        }
        Ok(if self.check_sat(&subset)?.is_definite() {
            EvalState::Evaluated
        } else {
            EvalState::Unevaluated
        })
    }

    fn get_unexplored(&mut self) -> Result<Option<BTreeSet<C>>, Error> {
        let program = self.encoding.render();
        let models = self
            .solver
            .enumerate(&program, 1)
            .map_err(Error::Solver)?;
        match models.first() {
            None => Ok(None),
            Some(model) => Ok(Some(self.decode_model(model)?)),
        }
    }

    fn get_unexplored_max(&mut self) -> Result<Option<BTreeSet<C>>, Error> {
        let program = self.encoding.render_max_cardinality();
        let models = self
            .solver
            .enumerate(&program, 0)
            .map_err(Error::Solver)?;
        let best = models
            .iter()
            .max_by_key(|model| model.unary_args("comp").len());
        match best {
            None => Ok(None),
            Some(model) => Ok(Some(self.decode_model(model)?)),
        }
    }

    fn block_up(&mut self, subset: &BTreeSet<C>) -> Result<(), Error> {
        let members = self.positions(subset)?;
        self.encoding.block_subsets(&members);
        debug!(size = subset.len(), "blocked descendants");
        Ok(())
    }

    fn block_down(&mut self, subset: &BTreeSet<C>) -> Result<(), Error> {
        let members = self.positions(subset)?;
        self.encoding.block_supersets(&members);
        debug!(size = subset.len(), "blocked ancestors");
        Ok(())
    }

    fn grow(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut subset = self.validated(seed)?;
        for c in self.universe.constraints().to_vec() {
            if subset.contains(&c) {
                continue;
            }
            let mut candidate = subset.clone();
            candidate.insert(c);
            let sat = oracle.check_sat(&candidate).map_err(Error::Oracle)?;
            trace!(size = candidate.len(), sat, "grow probe");
            if config.record_intermediate {
                self.update_count(&candidate, ModelCount::from_sat(sat))?;
            }
            if sat {
                subset = candidate;
            }
        }
        if config.commit {
            self.mss.insert(subset.clone());
            debug!(size = subset.len(), "committed maximal satisfiable subset");
        }
        Ok(self.refined(subset))
    }

    fn shrink(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut subset = self.validated(seed)?;
        for c in self.universe.constraints().to_vec() {
            if !subset.contains(&c) {
                continue;
            }
            let mut candidate = subset.clone();
            candidate.remove(&c);
            let sat = oracle.check_sat(&candidate).map_err(Error::Oracle)?;
            trace!(size = candidate.len(), sat, "shrink probe");
            if config.record_intermediate {
                self.update_count(&candidate, ModelCount::from_sat(sat))?;
            }
            if !sat {
                subset = candidate;
            }
        }
        if config.commit {
            self.mus.insert(subset.clone());
            debug!(size = subset.len(), "committed minimal unsatisfiable subset");
        }
        Ok(self.refined(subset))
    }

    fn grow_ambiguous(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut subset = self.validated(seed)?;
        for c in self.universe.constraints().to_vec() {
            if subset.contains(&c) {
                continue;
            }
            let mut candidate = subset.clone();
            candidate.insert(c);
            let verdict = oracle.check_ambiguity(&candidate).map_err(Error::Oracle)?;
            trace!(size = candidate.len(), ?verdict, "grow_ambiguous probe");
            if config.record_intermediate {
                self.update_count(&candidate, verdict.count_hint())?;
            }
            if verdict == OracleAmbiguity::Ambiguous {
                subset = candidate;
            }
        }
        if config.commit {
            self.mas.insert(subset.clone());
            debug!(size = subset.len(), "committed maximal ambiguous subset");
        }
        Ok(self.refined(subset))
    }

    fn shrink_unambiguous(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut subset = self.validated(seed)?;
        for c in self.universe.constraints().to_vec() {
            if !subset.contains(&c) {
                continue;
            }
            let mut candidate = subset.clone();
            candidate.remove(&c);
            let verdict = oracle.check_ambiguity(&candidate).map_err(Error::Oracle)?;
            trace!(size = candidate.len(), ?verdict, "shrink_unambiguous probe");
            if config.record_intermediate {
                self.update_count(&candidate, verdict.count_hint())?;
            }
            if verdict == OracleAmbiguity::Unambiguous {
                subset = candidate;
            }
        }
        if config.commit {
            self.muas.insert(subset.clone());
            debug!(size = subset.len(), "committed minimal unambiguous subset");
        }
        Ok(self.refined(subset))
    }
}
