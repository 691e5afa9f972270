//! External ASP solver seam.

use std::collections::BTreeSet;
use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use tracing::trace;

use pwlat::params::EnvParam;

/// Solver binary used by [`ClingoSolver::default`].
pub static CLINGO_BIN: EnvParam<String> = EnvParam::new("PWLAT_CLINGO_BIN", "clingo");

/// One stable model: its ground facts, with any optimization value the
/// solver reported for it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SolverModel {
    pub facts: Vec<String>,
    pub optimization: Option<i64>,
}

impl SolverModel {
    /// Arguments of every `predicate(arg)` fact in the model.
    pub fn unary_args(&self, predicate: &str) -> BTreeSet<String> {
        let prefix = format!("{predicate}(");
        self.facts
            .iter()
            .filter_map(|fact| {
                fact.strip_prefix(&prefix)
                    .and_then(|rest| rest.strip_suffix(')'))
                    .map(str::to_string)
            })
            .collect()
    }
}

/// Grounds and solves a logic program, returning its stable models.
///
/// An empty model list means the program is unsatisfiable; that is the normal
/// end-of-enumeration signal, not an error.
pub trait LogicSolver {
    /// Return up to `num_models` stable models of `program` (0 means all).
    fn enumerate(&mut self, program: &str, num_models: u32) -> anyhow::Result<Vec<SolverModel>>;
}

/// Runs the `clingo` executable over a pipe.
pub struct ClingoSolver {
    binary: String,
}

impl ClingoSolver {
    pub fn with_binary(binary: impl Into<String>) -> ClingoSolver {
        ClingoSolver {
            binary: binary.into(),
        }
    }
}

impl Default for ClingoSolver {
    fn default() -> Self {
        ClingoSolver {
            binary: CLINGO_BIN.get(),
        }
    }
}

impl LogicSolver for ClingoSolver {
    fn enumerate(&mut self, program: &str, num_models: u32) -> anyhow::Result<Vec<SolverModel>> {
        trace!(bytes = program.len(), num_models, "invoking solver");
        let mut child = Command::new(&self.binary)
            .arg("-")
            .arg(num_models.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("could not launch `{}`", self.binary))?;
        child
            .stdin
            .take()
            .context("no stdin handle on solver process")?
            .write_all(program.as_bytes())
            .context("could not send the encoding to the solver")?;
        let output = child
            .wait_with_output()
            .context("solver did not terminate cleanly")?;

        // clasp convention: 10 = satisfiable, 20 = unsatisfiable, 30 = both
        // satisfiable and search exhausted (e.g. optimum found).
        match output.status.code() {
            Some(10) | Some(20) | Some(30) => {
                Ok(parse_models(&String::from_utf8_lossy(&output.stdout)))
            }
            code => bail!(
                "solver exited with {:?}: {}",
                code,
                String::from_utf8_lossy(&output.stderr)
            ),
        }
    }
}

/// Parse the solver's textual output: every `Answer:` header is followed by
/// one line of ground facts; `Optimization:` lines refine the model that
/// precedes them.
pub fn parse_models(output: &str) -> Vec<SolverModel> {
    let mut models = Vec::new();
    let mut expect_facts = false;
    for line in output.lines() {
        let line = line.trim();
        if line.starts_with("Answer:") {
            expect_facts = true;
            continue;
        }
        if expect_facts {
            models.push(SolverModel {
                facts: line.split_whitespace().map(str::to_string).collect(),
                optimization: None,
            });
            expect_facts = false;
            continue;
        }
        if let Some(value) = line.strip_prefix("Optimization:") {
            if let (Some(model), Ok(value)) = (models.last_mut(), value.trim().parse()) {
                model.optimization = Some(value);
            }
        }
    }
    models
}
