//! Solver-backed constraint map.
//!
//! For universes too wide to enumerate the code range explicitly, the
//! unexplored region is materialised as a growing clause encoding; an
//! external ASP solver picks the next unexplored subset (optionally of
//! maximum cardinality) as a stable model of that encoding.

pub mod encoding;
pub mod map;
pub mod solver;

pub use encoding::Encoding;
pub use map::AspConstraintMap;
pub use solver::{ClingoSolver, LogicSolver, SolverModel};
