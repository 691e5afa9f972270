//! Bitset-backed constraint map.
//!
//! Nodes are keyed by their integer code, and the explored/unexplored
//! partition of the whole code range is held in a frontier that is sparse for
//! small universes and a dense bitset once the range justifies it. All four
//! refinements walk the absent/present bits most-significant first, so that
//! refinement is deterministic and the per-bit memo composes across seeds.

use std::collections::{BTreeSet, HashMap, HashSet};

use fixedbitset::FixedBitSet;
use tracing::{debug, trace};

use crate::bits::{self, SubsetCode};
use crate::cmap::{ConstraintMap, Refined, RefineConfig};
use crate::node::{AmbiguityStatus, EvalState, ModelCount, Node, SatStatus};
use crate::oracle::{Oracle, OracleAmbiguity};
use crate::params;
use crate::universe::{Constraint, Universe};
use crate::Error;

/// The unexplored side of the explored/unexplored partition.
enum Frontier {
    Sparse(HashSet<SubsetCode>),
    Dense(FixedBitSet),
}

impl Frontier {
    fn full(n: usize) -> Frontier {
        if n >= params::DENSE_FRONTIER_MIN_BITS.get() {
            let mut set = FixedBitSet::with_capacity(1 << n);
            set.insert_range(..);
            Frontier::Dense(set)
        } else {
            Frontier::Sparse((0..1u64 << n).collect())
        }
    }

    fn remove(&mut self, code: SubsetCode) {
        match self {
            Frontier::Sparse(set) => {
                set.remove(&code);
            }
            Frontier::Dense(set) => set.set(code as usize, false),
        }
    }

    fn contains(&self, code: SubsetCode) -> bool {
        match self {
            Frontier::Sparse(set) => set.contains(&code),
            Frontier::Dense(set) => set.contains(code as usize),
        }
    }

    fn len(&self) -> usize {
        match self {
            Frontier::Sparse(set) => set.len(),
            Frontier::Dense(set) => set.count_ones(..),
        }
    }

    fn any(&self) -> Option<SubsetCode> {
        match self {
            Frontier::Sparse(set) => set.iter().next().copied(),
            Frontier::Dense(set) => set.ones().next().map(|c| c as SubsetCode),
        }
    }

    fn max_popcount(&self) -> Option<SubsetCode> {
        match self {
            Frontier::Sparse(set) => set.iter().copied().max_by_key(|&c| bits::popcount(c)),
            Frontier::Dense(set) => set
                .ones()
                .map(|c| c as SubsetCode)
                .max_by_key(|&c| bits::popcount(c)),
        }
    }
}

/// Constraint map over an integer-coded lattice.
pub struct BitConstraintMap<C> {
    universe: Universe<C>,
    mask: SubsetCode,
    nodes: HashMap<SubsetCode, Node>,
    mss: BTreeSet<SubsetCode>,
    mus: BTreeSet<SubsetCode>,
    mas: BTreeSet<SubsetCode>,
    muas: BTreeSet<SubsetCode>,
    unexplored: Frontier,
}

impl<C: Constraint> BitConstraintMap<C> {
    pub fn new(universe: Universe<C>) -> Result<Self, Error> {
        let max = params::MAX_UNIVERSE_BITS.get().min(bits::CODE_WIDTH);
        let n = universe.len();
        if n > max {
            return Err(Error::UniverseTooWide { n, max });
        }
        Ok(BitConstraintMap {
            mask: universe.full_code(),
            unexplored: Frontier::full(n),
            universe,
            nodes: HashMap::new(),
            mss: BTreeSet::new(),
            mus: BTreeSet::new(),
            mas: BTreeSet::new(),
            muas: BTreeSet::new(),
        })
    }

    pub fn universe(&self) -> &Universe<C> {
        &self.universe
    }

    pub fn mss_codes(&self) -> &BTreeSet<SubsetCode> {
        &self.mss
    }

    pub fn mus_codes(&self) -> &BTreeSet<SubsetCode> {
        &self.mus
    }

    pub fn mas_codes(&self) -> &BTreeSet<SubsetCode> {
        &self.mas
    }

    pub fn muas_codes(&self) -> &BTreeSet<SubsetCode> {
        &self.muas
    }

    pub fn is_unexplored(&self, code: SubsetCode) -> bool {
        self.unexplored.contains(code)
    }

    pub fn is_explored(&self, code: SubsetCode) -> bool {
        !self.unexplored.contains(code)
    }

    pub fn num_unexplored(&self) -> usize {
        self.unexplored.len()
    }

    pub fn num_explored(&self) -> usize {
        (1usize << self.universe.len()) - self.unexplored.len()
    }

    fn sat_explicit(&self, code: SubsetCode) -> SatStatus {
        self.nodes.get(&code).map(Node::is_sat).unwrap_or_default()
    }

    fn ambiguity_explicit(&self, code: SubsetCode) -> AmbiguityStatus {
        self.nodes
            .get(&code)
            .map(Node::is_ambiguous)
            .unwrap_or_default()
    }

    /// Satisfiability implied by the committed collections: a subset of an
    /// MSS or MUS is satisfiable, a superset unsatisfiable; a subset of an
    /// MAS or MUAS has at least one world.
    fn sat_implicit(&self, code: SubsetCode) -> SatStatus {
        for &m in self.mus.iter().chain(self.mss.iter()) {
            if code & m == code {
                return SatStatus::Sat;
            }
            if code & m == m {
                return SatStatus::Unsat;
            }
        }
        for &m in self.muas.iter().chain(self.mas.iter()) {
            if code & m == code {
                return SatStatus::Sat;
            }
        }
        SatStatus::Unknown
    }

    /// Ambiguity implied by the committed collections: a subset of an MAS or
    /// MUAS is ambiguous, a superset of an MSS or MUS unsatisfiable.
    fn ambiguity_implicit(&self, code: SubsetCode) -> AmbiguityStatus {
        for &m in self.mas.iter().chain(self.muas.iter()) {
            if code & m == code {
                return AmbiguityStatus::Ambiguous;
            }
        }
        for &m in self.mus.iter().chain(self.mss.iter()) {
            if code & m == m {
                return AmbiguityStatus::Unsat;
            }
        }
        AmbiguityStatus::Unknown
    }

    pub fn check_sat_code(&self, code: SubsetCode) -> SatStatus {
        let explicit = self.sat_explicit(code);
        if explicit.is_definite() {
            return explicit;
        }
        self.sat_implicit(code)
    }

    pub fn check_ambiguity_code(&self, code: SubsetCode) -> AmbiguityStatus {
        let explicit = self.ambiguity_explicit(code);
        if explicit.is_definite() {
            return explicit;
        }
        self.ambiguity_implicit(code)
    }

    pub fn check_num_pws_code(&self, code: SubsetCode) -> ModelCount {
        if let Some(node) = self.nodes.get(&code) {
            if node.num_pws() != ModelCount::Unevaluated {
                return node.num_pws();
            }
        }
        match self.check_sat_code(code) {
            SatStatus::Sat => ModelCount::AtLeast(1),
            SatStatus::Unsat => ModelCount::Exact(0),
            SatStatus::Unknown => ModelCount::Unevaluated,
        }
    }

    pub fn check_eval_state_code(&self, code: SubsetCode) -> EvalState {
        if let Some(node) = self.nodes.get(&code) {
            return node.eval_state();
        }
        if self.check_sat_code(code).is_definite() {
            EvalState::Evaluated
        } else {
            EvalState::Unevaluated
        }
    }

    pub fn update_num_pws_code(&mut self, code: SubsetCode, count: ModelCount) -> Result<(), Error> {
        self.nodes
            .entry(code)
            .or_default()
            .update_num_pws(count)
            .map_err(|conflict| Error::InconsistentCount {
                subset: format!("{code:#b}"),
                existing: conflict.existing,
                new: conflict.new,
            })
    }

    /// Mark `code` and every strict subset of it explored.
    pub fn block_up_code(&mut self, code: SubsetCode) {
        let mut sub = code;
        loop {
            self.unexplored.remove(sub);
            if sub == 0 {
                break;
            }
            sub = (sub - 1) & code;
        }
        debug!(code, "blocked descendants");
    }

    /// Mark `code` and every strict superset of it explored.
    pub fn block_down_code(&mut self, code: SubsetCode) {
        let free = !code & self.mask;
        let mut sub = free;
        loop {
            self.unexplored.remove(code | sub);
            if sub == 0 {
                break;
            }
            sub = (sub - 1) & free;
        }
        debug!(code, "blocked ancestors");
    }

    fn record_sat_probe(
        &mut self,
        code: SubsetCode,
        sat: bool,
        config: &RefineConfig,
    ) -> Result<(), Error> {
        if config.record_intermediate {
            self.update_num_pws_code(code, ModelCount::from_sat(sat))?;
        }
        Ok(())
    }

    fn record_ambiguity_probe(
        &mut self,
        code: SubsetCode,
        verdict: OracleAmbiguity,
        config: &RefineConfig,
    ) -> Result<(), Error> {
        if config.record_intermediate {
            self.update_num_pws_code(code, verdict.count_hint())?;
        }
        Ok(())
    }

    fn refined(&self, code: SubsetCode) -> Refined<C> {
        Refined {
            subset: self.universe.int_to_constraint_set(code),
            code: Some(code),
        }
    }
}

impl<C: Constraint> ConstraintMap for BitConstraintMap<C> {
    type C = C;

    fn universe(&self) -> &Universe<C> {
        &self.universe
    }

    fn mss_subsets(&self) -> Vec<BTreeSet<C>> {
        self.mss
            .iter()
            .map(|&c| self.universe.int_to_constraint_set(c))
            .collect()
    }

    fn mus_subsets(&self) -> Vec<BTreeSet<C>> {
        self.mus
            .iter()
            .map(|&c| self.universe.int_to_constraint_set(c))
            .collect()
    }

    fn mas_subsets(&self) -> Vec<BTreeSet<C>> {
        self.mas
            .iter()
            .map(|&c| self.universe.int_to_constraint_set(c))
            .collect()
    }

    fn muas_subsets(&self) -> Vec<BTreeSet<C>> {
        self.muas
            .iter()
            .map(|&c| self.universe.int_to_constraint_set(c))
            .collect()
    }

    fn update_num_pws(&mut self, subset: &BTreeSet<C>, count: ModelCount) -> Result<(), Error> {
        let code = self.universe.constraint_set_to_int(subset)?;
        self.update_num_pws_code(code, count)
    }

    fn check_sat(&self, subset: &BTreeSet<C>) -> Result<SatStatus, Error> {
        Ok(self.check_sat_code(self.universe.constraint_set_to_int(subset)?))
    }

    fn check_ambiguity(&self, subset: &BTreeSet<C>) -> Result<AmbiguityStatus, Error> {
        Ok(self.check_ambiguity_code(self.universe.constraint_set_to_int(subset)?))
    }

    fn check_num_pws(&self, subset: &BTreeSet<C>) -> Result<ModelCount, Error> {
        Ok(self.check_num_pws_code(self.universe.constraint_set_to_int(subset)?))
    }

    fn check_eval_state(&self, subset: &BTreeSet<C>) -> Result<EvalState, Error> {
        Ok(self.check_eval_state_code(self.universe.constraint_set_to_int(subset)?))
    }

    fn get_unexplored(&mut self) -> Result<Option<BTreeSet<C>>, Error> {
        Ok(self
            .unexplored
            .any()
            .map(|code| self.universe.int_to_constraint_set(code)))
    }

    fn get_unexplored_max(&mut self) -> Result<Option<BTreeSet<C>>, Error> {
        Ok(self
            .unexplored
            .max_popcount()
            .map(|code| self.universe.int_to_constraint_set(code)))
    }

    fn block_up(&mut self, subset: &BTreeSet<C>) -> Result<(), Error> {
        let code = self.universe.constraint_set_to_int(subset)?;
        self.block_up_code(code);
        Ok(())
    }

    fn block_down(&mut self, subset: &BTreeSet<C>) -> Result<(), Error> {
        let code = self.universe.constraint_set_to_int(subset)?;
        self.block_down_code(code);
        Ok(())
    }

    fn grow(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut code = self.universe.constraint_set_to_int(seed)?;
        for i in (0..self.universe.len()).rev() {
            if (code >> i) & 1 == 1 {
                continue;
            }
            let candidate = code | (1u64 << i);
            match self.sat_explicit(candidate) {
                SatStatus::Sat => code = candidate,
                SatStatus::Unsat => {}
                SatStatus::Unknown => {
                    let candidate_set = self.universe.int_to_constraint_set(candidate);
                    let sat = oracle.check_sat(&candidate_set).map_err(Error::Oracle)?;
                    trace!(candidate, sat, "grow probe");
                    if sat {
                        code = candidate;
                    }
                    self.record_sat_probe(candidate, sat, config)?;
                }
            }
        }
        if config.commit {
            self.mss.insert(code);
            debug!(mss = code, "committed maximal satisfiable subset");
        }
        Ok(self.refined(code))
    }

    fn shrink(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut code = self.universe.constraint_set_to_int(seed)?;
        for i in (0..self.universe.len()).rev() {
            if (code >> i) & 1 == 0 {
                continue;
            }
            let candidate = code & !(1u64 << i);
            match self.sat_explicit(candidate) {
                SatStatus::Unsat => code = candidate,
                SatStatus::Sat => {}
                SatStatus::Unknown => {
                    let candidate_set = self.universe.int_to_constraint_set(candidate);
                    let sat = oracle.check_sat(&candidate_set).map_err(Error::Oracle)?;
                    trace!(candidate, sat, "shrink probe");
                    if !sat {
                        code = candidate;
                    }
                    self.record_sat_probe(candidate, sat, config)?;
                }
            }
        }
        if config.commit {
            self.mus.insert(code);
            debug!(mus = code, "committed minimal unsatisfiable subset");
        }
        Ok(self.refined(code))
    }

    fn grow_ambiguous(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut code = self.universe.constraint_set_to_int(seed)?;
        for i in (0..self.universe.len()).rev() {
            if (code >> i) & 1 == 1 {
                continue;
            }
            let candidate = code | (1u64 << i);
            match self.ambiguity_explicit(candidate) {
                AmbiguityStatus::Ambiguous => code = candidate,
                AmbiguityStatus::Unambiguous | AmbiguityStatus::Unsat => {}
                AmbiguityStatus::Unknown => {
                    let candidate_set = self.universe.int_to_constraint_set(candidate);
                    let verdict = oracle
                        .check_ambiguity(&candidate_set)
                        .map_err(Error::Oracle)?;
                    trace!(candidate, ?verdict, "grow_ambiguous probe");
                    if verdict == OracleAmbiguity::Ambiguous {
                        code = candidate;
                    }
                    self.record_ambiguity_probe(candidate, verdict, config)?;
                }
            }
        }
        if config.commit {
            self.mas.insert(code);
            debug!(mas = code, "committed maximal ambiguous subset");
        }
        Ok(self.refined(code))
    }

    fn shrink_unambiguous(
        &mut self,
        seed: &BTreeSet<C>,
        oracle: &mut dyn Oracle<C>,
        config: &RefineConfig,
    ) -> Result<Refined<C>, Error> {
        let mut code = self.universe.constraint_set_to_int(seed)?;
        for i in (0..self.universe.len()).rev() {
            if (code >> i) & 1 == 0 {
                continue;
            }
            let candidate = code & !(1u64 << i);
            match self.ambiguity_explicit(candidate) {
                AmbiguityStatus::Unambiguous => code = candidate,
                AmbiguityStatus::Ambiguous | AmbiguityStatus::Unsat => {}
                AmbiguityStatus::Unknown => {
                    let candidate_set = self.universe.int_to_constraint_set(candidate);
                    let verdict = oracle
                        .check_ambiguity(&candidate_set)
                        .map_err(Error::Oracle)?;
                    trace!(candidate, ?verdict, "shrink_unambiguous probe");
                    if verdict == OracleAmbiguity::Unambiguous {
                        code = candidate;
                    }
                    self.record_ambiguity_probe(candidate, verdict, config)?;
                }
            }
        }
        if config.commit {
            self.muas.insert(code);
            debug!(muas = code, "committed minimal unambiguous subset");
        }
        Ok(self.refined(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::CountOracle;

    type Set = BTreeSet<&'static str>;

    fn abcd_map() -> BitConstraintMap<&'static str> {
        BitConstraintMap::new(Universe::new(["a", "b", "c", "d"]).unwrap()).unwrap()
    }

    /// Satisfiable iff at most two constraints are active.
    fn pairs_oracle() -> CountOracle<&'static str, impl Fn(&Set) -> u64> {
        CountOracle::new(|s: &Set| if s.len() <= 2 { 1 } else { 0 })
    }

    /// Possible worlds 1..=5 filtered by per-constraint allowed sets.
    fn worlds_oracle() -> CountOracle<&'static str, impl Fn(&Set) -> u64> {
        CountOracle::new(|s: &Set| {
            let allowed = |c: &str| -> &[u8] {
                match c {
                    "a" => &[1, 2, 3],
                    "b" => &[2, 3, 4],
                    "c" => &[3, 4, 5],
                    "d" => &[1, 5],
                    _ => unreachable!(),
                }
            };
            (1..=5u8)
                .filter(|w| s.iter().copied().all(|c| allowed(c).contains(w)))
                .count() as u64
        })
    }

    #[test]
    fn grow_reaches_a_maximal_satisfiable_subset() {
        let mut map = abcd_map();
        let mut oracle = pairs_oracle();
        let refined = map
            .grow(&Set::from(["a"]), &mut oracle, &RefineConfig::default())
            .unwrap();
        // Most-significant-first probing commits `b` and rejects the rest.
        assert_eq!(refined.subset, Set::from(["a", "b"]));
        assert_eq!(refined.code, Some(0b1100));
        assert!(map.mss_codes().contains(&0b1100));
    }

    #[test]
    fn shrink_reaches_a_minimal_unsatisfiable_subset() {
        let mut map = abcd_map();
        let mut oracle = pairs_oracle();
        let refined = map
            .shrink(
                &Set::from(["a", "b", "c", "d"]),
                &mut oracle,
                &RefineConfig::default(),
            )
            .unwrap();
        assert_eq!(refined.subset, Set::from(["b", "c", "d"]));
        assert_eq!(refined.code, Some(0b0111));
        assert!(map.mus_codes().contains(&0b0111));
    }

    #[test]
    fn committed_subsets_answer_queries_implicitly() {
        let mut map = abcd_map();
        let mut oracle = pairs_oracle();
        let config = RefineConfig {
            commit: true,
            record_intermediate: false,
        };
        map.grow(&Set::from(["a"]), &mut oracle, &config).unwrap();
        // No node records exist, so these all come from dominance inference.
        assert!(map.nodes.is_empty());
        assert_eq!(map.check_sat(&Set::from(["a"])).unwrap(), SatStatus::Sat);
        assert_eq!(
            map.check_sat(&Set::from(["a", "b", "c"])).unwrap(),
            SatStatus::Unsat
        );
        assert_eq!(
            map.check_sat(&Set::from(["c", "d"])).unwrap(),
            SatStatus::Unknown
        );
        assert_eq!(
            map.check_ambiguity(&Set::from(["a", "b", "c", "d"])).unwrap(),
            AmbiguityStatus::Unsat
        );
        assert_eq!(
            map.check_num_pws(&Set::from(["b"])).unwrap(),
            ModelCount::AtLeast(1)
        );
        assert_eq!(
            map.check_num_pws(&Set::from(["a", "b", "d"])).unwrap(),
            ModelCount::Exact(0)
        );
        assert_eq!(
            map.check_eval_state(&Set::from(["a", "b"])).unwrap(),
            EvalState::Evaluated
        );
        assert_eq!(
            map.check_eval_state(&Set::from(["c", "d"])).unwrap(),
            EvalState::Unevaluated
        );
    }

    #[test]
    fn memoized_probes_skip_the_oracle() {
        let mut map = abcd_map();
        let mut oracle = pairs_oracle();
        map.shrink(
            &Set::from(["a", "b", "c", "d"]),
            &mut oracle,
            &RefineConfig::default(),
        )
        .unwrap();
        let probes_so_far = oracle.stats().sat_checks;
        // Growing {c, d} probes {a, c, d} fresh but finds {b, c, d} memoized.
        let refined = map
            .grow(&Set::from(["c", "d"]), &mut oracle, &RefineConfig::default())
            .unwrap();
        assert_eq!(refined.subset, Set::from(["c", "d"]));
        assert_eq!(oracle.stats().sat_checks, probes_so_far + 1);
    }

    #[test]
    fn block_down_removes_all_supersets() {
        let mut map = abcd_map();
        map.block_down(&Set::from(["a", "b"])).unwrap();
        for code in [0b1100, 0b1101, 0b1110, 0b1111] {
            assert!(map.is_explored(code));
        }
        assert!(map.is_unexplored(0b1011));
        assert_eq!(map.num_unexplored(), 12);
        assert_eq!(map.num_explored(), 4);
    }

    #[test]
    fn block_up_removes_all_subsets() {
        let mut map = abcd_map();
        map.block_up(&Set::from(["a", "b"])).unwrap();
        for code in [0b1100, 0b1000, 0b0100, 0b0000] {
            assert!(map.is_explored(code));
        }
        assert!(map.is_unexplored(0b1110));
        assert_eq!(map.num_unexplored(), 12);
    }

    #[test]
    fn get_unexplored_max_prefers_cardinality() {
        let mut map = abcd_map();
        for code in 0..16u64 {
            if ![3, 5, 7, 12, 15].contains(&code) {
                map.unexplored.remove(code);
            }
        }
        let top = map.get_unexplored_max().unwrap().unwrap();
        assert_eq!(map.universe().constraint_set_to_int(&top).unwrap(), 15);
        map.unexplored.remove(15);
        let next = map.get_unexplored_max().unwrap().unwrap();
        assert_eq!(map.universe().constraint_set_to_int(&next).unwrap(), 7);
    }

    #[test]
    fn empty_universe_has_a_single_node() {
        let mut map = BitConstraintMap::new(Universe::<&str>::new([]).unwrap()).unwrap();
        assert_eq!(map.num_unexplored(), 1);
        assert_eq!(map.get_unexplored().unwrap(), Some(Set::new()));
        map.block_up(&Set::new()).unwrap();
        assert_eq!(map.get_unexplored().unwrap(), None);
    }

    #[test]
    fn blocked_codes_are_never_drawn_again() {
        let mut map = abcd_map();
        map.block_down(&Set::from(["b"])).unwrap();
        while let Some(seed) = map.get_unexplored().unwrap() {
            assert!(!seed.contains("b"));
            map.block_up(&seed).unwrap();
            map.block_down(&seed).unwrap();
        }
    }

    #[test]
    fn ambiguous_refinements_follow_the_count() {
        let mut map = abcd_map();
        let mut oracle = worlds_oracle();
        let mas = map
            .grow_ambiguous(&Set::from(["a"]), &mut oracle, &RefineConfig::default())
            .unwrap();
        assert_eq!(mas.subset, Set::from(["a", "b"]));
        assert!(map.mas_codes().contains(&0b1100));

        let muas = map
            .shrink_unambiguous(
                &Set::from(["a", "b", "c"]),
                &mut oracle,
                &RefineConfig::default(),
            )
            .unwrap();
        assert_eq!(muas.subset, Set::from(["a", "c"]));
        assert!(map.muas_codes().contains(&0b1010));

        // Subsets of committed ambiguous witnesses are inferred ambiguous,
        // and satisfiable.
        assert_eq!(
            map.check_ambiguity(&Set::from(["b"])).unwrap(),
            AmbiguityStatus::Ambiguous
        );
        assert_eq!(map.check_sat(&Set::from(["b"])).unwrap(), SatStatus::Sat);
    }

    #[test]
    fn conflicting_exact_counts_surface_both_values() {
        let mut map = abcd_map();
        map.update_num_pws(&Set::from(["a"]), ModelCount::Exact(1))
            .unwrap();
        let err = map
            .update_num_pws(&Set::from(["a"]), ModelCount::Exact(2))
            .unwrap_err();
        match err {
            Error::InconsistentCount { existing, new, .. } => {
                assert_eq!(existing, ModelCount::Exact(1));
                assert_eq!(new, ModelCount::Exact(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn oracle_failure_commits_nothing() {
        struct FailingOracle;
        impl Oracle<&'static str> for FailingOracle {
            fn check_sat(&mut self, _subset: &Set) -> anyhow::Result<bool> {
                anyhow::bail!("evaluator crashed")
            }
            fn check_ambiguity(&mut self, _subset: &Set) -> anyhow::Result<OracleAmbiguity> {
                anyhow::bail!("evaluator crashed")
            }
        }
        let mut map = abcd_map();
        let err = map
            .grow(&Set::from(["a"]), &mut FailingOracle, &RefineConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Oracle(_)));
        assert!(map.mss_codes().is_empty());
        assert!(map.nodes.is_empty());
    }

    #[test]
    fn uncommitted_refinements_leave_the_collections_alone() {
        let mut map = abcd_map();
        let mut oracle = pairs_oracle();
        let config = RefineConfig {
            commit: false,
            record_intermediate: true,
        };
        let refined = map.grow(&Set::from(["a"]), &mut oracle, &config).unwrap();
        assert_eq!(refined.subset, Set::from(["a", "b"]));
        assert!(map.mss_codes().is_empty());
        // The probes were still memoized.
        assert_eq!(
            map.check_sat(&Set::from(["a", "b"])).unwrap(),
            SatStatus::Sat
        );
    }

    #[test]
    fn oversized_universe_is_rejected() {
        let labels: Vec<String> = (0..40).map(|i| format!("c{i}")).collect();
        let universe = Universe::new(labels).unwrap();
        assert!(matches!(
            BitConstraintMap::new(universe),
            Err(Error::UniverseTooWide { n: 40, .. })
        ));
    }
}
