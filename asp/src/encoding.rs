//! The growing clause encoding that materialises the unexplored region.
//!
//! Every constraint gets a free choice `comp(c) ; not comp(c).`. Blocking a
//! region appends one disjunctive clause ruling out the dominated models, so
//! the stable models of the rendered text are exactly the unexplored subsets.

use itertools::Itertools;

/// Derives the active-constraint count; appended, together with
/// [`COMP_MAXIMIZE_RULE`], when a maximum-cardinality seed is requested.
pub const COMP_COUNT_RULE: &str = "on_comp(N) :- #count { P : comp(P) } = N.";
pub const COMP_MAXIMIZE_RULE: &str = "#maximize { N : on_comp(N) }.";

/// One rule of the encoding, over constraint positions in the universe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapClause {
    /// `comp(c) ; not comp(c).`
    FreeChoice(usize),
    /// `comp(a) ; comp(b) ; ...`: at least one of these must be present.
    AnyPresent(Vec<usize>),
    /// `not comp(a) ; not comp(b) ; ...`: at least one of these must be absent.
    AnyAbsent(Vec<usize>),
}

impl MapClause {
    fn render(&self, atoms: &[String]) -> String {
        match self {
            MapClause::FreeChoice(i) => format!("comp({0}) ; not comp({0}).", atoms[*i]),
            MapClause::AnyPresent(members) if members.is_empty() => "#false.".to_string(),
            MapClause::AnyPresent(members) => format!(
                "{}.",
                members.iter().map(|&i| format!("comp({})", atoms[i])).join(" ; ")
            ),
            MapClause::AnyAbsent(members) if members.is_empty() => "#false.".to_string(),
            MapClause::AnyAbsent(members) => format!(
                "{}.",
                members
                    .iter()
                    .map(|&i| format!("not comp({})", atoms[i]))
                    .join(" ; ")
            ),
        }
    }
}

/// The clause list, grown monotonically by the blocking operations.
#[derive(Debug, Clone)]
pub struct Encoding {
    atoms: Vec<String>,
    clauses: Vec<MapClause>,
}

impl Encoding {
    pub fn new(atoms: Vec<String>) -> Encoding {
        let clauses = (0..atoms.len()).map(MapClause::FreeChoice).collect();
        Encoding { atoms, clauses }
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    pub fn clauses(&self) -> &[MapClause] {
        &self.clauses
    }

    /// Rule out every model containing all of `members`.
    pub fn block_supersets(&mut self, members: &[usize]) {
        self.clauses.push(MapClause::AnyAbsent(members.to_vec()));
    }

    /// Rule out every model contained in `members`.
    pub fn block_subsets(&mut self, members: &[usize]) {
        let complement = (0..self.atoms.len())
            .filter(|i| !members.contains(i))
            .collect();
        self.clauses.push(MapClause::AnyPresent(complement));
    }

    pub fn render(&self) -> String {
        self.clauses
            .iter()
            .map(|clause| clause.render(&self.atoms))
            .join("\n")
    }

    /// The encoding plus the (non-persisted) maximisation rules.
    pub fn render_max_cardinality(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.render(),
            COMP_COUNT_RULE,
            COMP_MAXIMIZE_RULE
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atoms() -> Vec<String> {
        ["a", "b", "c"].map(str::to_string).to_vec()
    }

    #[test]
    fn fresh_encoding_is_one_free_choice_per_constraint() {
        let encoding = Encoding::new(atoms());
        assert_eq!(
            encoding.render(),
            "comp(a) ; not comp(a).\ncomp(b) ; not comp(b).\ncomp(c) ; not comp(c)."
        );
    }

    #[test]
    fn blocking_appends_disjunctive_clauses() {
        let mut encoding = Encoding::new(atoms());
        encoding.block_supersets(&[0, 1]);
        encoding.block_subsets(&[0]);
        let rendered = encoding.render();
        assert!(rendered.ends_with("not comp(a) ; not comp(b).\ncomp(b) ; comp(c)."));
    }

    #[test]
    fn degenerate_blocks_render_as_falsity() {
        let mut encoding = Encoding::new(atoms());
        // Supersets of the empty set, and subsets of the full set, are the
        // whole lattice.
        encoding.block_supersets(&[]);
        encoding.block_subsets(&[0, 1, 2]);
        let rendered = encoding.render();
        assert_eq!(rendered.matches("#false.").count(), 2);
    }

    #[test]
    fn maximisation_rules_are_not_persisted() {
        let encoding = Encoding::new(atoms());
        let maxed = encoding.render_max_cardinality();
        assert!(maxed.contains(COMP_COUNT_RULE));
        assert!(maxed.contains(COMP_MAXIMIZE_RULE));
        assert!(!encoding.render().contains("#maximize"));
    }
}
