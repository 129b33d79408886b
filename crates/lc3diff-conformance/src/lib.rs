#![forbid(unsafe_code)]

//! Differential conformance harness for LC-3 simulators.
//!
//! Small assembly programs are assembled with the external `lc3as`, executed
//! on the trusted reference simulator and on the candidate under development,
//! and the final register snapshots are compared. The candidate is correct
//! relative to the oracle, not relative to hand-written expectations.

pub mod artifacts;
pub mod assembler;
pub mod backend;
pub mod oracle;
mod process;
pub mod runner;
pub mod scenarios;

use crate::backend::{Backend, CandidateBackend, ReferenceBackend};
use crate::oracle::{RegisterDiff, Verdict};
use crate::scenarios::TestScenario;
use lc3diff_trace::TraceParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Everything a suite run needs to find its external collaborators.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// External assembler, `lc3as` by convention.
    pub assembler: PathBuf,
    /// Trusted reference simulator, `lc3sim` by convention.
    pub reference_simulator: PathBuf,
    /// Candidate simulator under development.
    pub candidate_simulator: PathBuf,
    /// Directory for transient source/script/object artifacts.
    pub scratch_root: PathBuf,
    /// Bound on every external-process wait. A hung simulator becomes a
    /// reported backend failure instead of blocking the suite forever.
    pub timeout: Duration,
    /// Disarms artifact deletion for post-mortem debugging.
    pub keep_artifacts: bool,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            assembler: PathBuf::from(resolve_env("LC3DIFF_ASSEMBLER", "lc3as")),
            reference_simulator: PathBuf::from(resolve_env("LC3DIFF_REFERENCE_SIM", "lc3sim")),
            candidate_simulator: PathBuf::from(resolve_env("LC3DIFF_CANDIDATE_SIM", "./lc")),
            scratch_root: std::env::temp_dir(),
            timeout: Duration::from_millis(resolve_timeout_ms()),
            keep_artifacts: resolve_env("LC3DIFF_KEEP_ARTIFACTS", "0") == "1",
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

fn resolve_env(name: &str, fallback: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn resolve_timeout_ms() -> u64 {
    std::env::var("LC3DIFF_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(10_000)
}

/// Run-level failures, surfaced to the suite as a scenario's outcome and
/// never allowed to abort the harness process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarnessError {
    /// Assembler exited nonzero or produced no object image.
    Assembly(String),
    /// A simulator could not be started, produced no output, or timed out.
    BackendExecution(String),
    /// A simulator ran but its trace did not contain a well-formed dump.
    TraceParse(TraceParseError),
}

impl HarnessError {
    #[must_use]
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Assembly(_) => "assembly_failed",
            Self::BackendExecution(_) => "backend_execution_failed",
            Self::TraceParse(_) => "trace_parse_failed",
        }
    }
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assembly(detail) => write!(f, "assembly failed: {detail}"),
            Self::BackendExecution(detail) => write!(f, "backend execution failed: {detail}"),
            Self::TraceParse(err) => write!(f, "trace parse failed: {err}"),
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TraceParse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TraceParseError> for HarnessError {
    fn from(err: TraceParseError) -> Self {
        Self::TraceParse(err)
    }
}

/// One scenario's result. Tooling failures (assembler, simulator, parser)
/// and semantic mismatches are distinct reason codes: only
/// `register_mismatch` implicates the candidate simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub name: String,
    pub passed: bool,
    pub failure_reason: Option<String>,
    pub detail: Option<String>,
    pub diffs: Vec<RegisterDiff>,
}

impl ScenarioOutcome {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            failure_reason: None,
            detail: None,
            diffs: Vec::new(),
        }
    }

    fn tooling_failure(name: &str, backend_label: &str, err: &HarnessError) -> Self {
        // Assembly happens before the backend runs, so its failures carry no
        // backend label; execution and parse failures name the simulator.
        let detail = match err {
            HarnessError::Assembly(_) => err.to_string(),
            HarnessError::BackendExecution(_) | HarnessError::TraceParse(_) => {
                format!("{backend_label}: {err}")
            }
        };
        Self {
            name: name.to_string(),
            passed: false,
            failure_reason: Some(err.reason_code().to_string()),
            detail: Some(detail),
            diffs: Vec::new(),
        }
    }

    fn mismatch(name: &str, diffs: Vec<RegisterDiff>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            failure_reason: Some("register_mismatch".to_string()),
            detail: None,
            diffs,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteRunReport {
    pub schema_version: u8,
    pub generated_at_unix_ms: u128,
    pub total_scenarios: usize,
    pub passed_scenarios: usize,
    pub failed_scenarios: usize,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteRunReport {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_scenarios == 0 && self.passed_scenarios == self.total_scenarios
    }
}

/// Executes one scenario end to end: assemble and run on the reference,
/// assemble and run on the candidate, then evaluate every declared assertion.
/// The first tooling error short-circuits to a failed outcome; a completed
/// pair of snapshots goes to the equivalence oracle.
pub fn run_scenario(
    config: &HarnessConfig,
    scenario: &TestScenario,
    reference: &dyn Backend,
    candidate: &dyn Backend,
) -> ScenarioOutcome {
    let reference_snapshot = match runner::run_program(config, &scenario.program, reference) {
        Ok(snapshot) => snapshot,
        Err(err) => return ScenarioOutcome::tooling_failure(&scenario.name, reference.label(), &err),
    };

    let candidate_snapshot = match runner::run_program(config, &scenario.program, candidate) {
        Ok(snapshot) => snapshot,
        Err(err) => return ScenarioOutcome::tooling_failure(&scenario.name, candidate.label(), &err),
    };

    match oracle::evaluate(&scenario.assertions, &reference_snapshot, &candidate_snapshot) {
        Verdict::Passed => ScenarioOutcome::pass(&scenario.name),
        Verdict::Failed(diffs) => ScenarioOutcome::mismatch(&scenario.name, diffs),
    }
}

/// Runs every scenario against the configured external backends. Scenario
/// failures are recorded, never fatal: the report always covers the whole
/// catalogue.
#[must_use]
pub fn run_register_suite(config: &HarnessConfig, catalogue: &[TestScenario]) -> SuiteRunReport {
    let reference = ReferenceBackend::from_config(config);
    let candidate = CandidateBackend::from_config(config);
    run_register_suite_with(config, catalogue, &reference, &candidate)
}

/// Suite execution with injected backends, so harness tests can substitute
/// stubs for the external simulators.
#[must_use]
pub fn run_register_suite_with(
    config: &HarnessConfig,
    catalogue: &[TestScenario],
    reference: &dyn Backend,
    candidate: &dyn Backend,
) -> SuiteRunReport {
    let outcomes: Vec<ScenarioOutcome> = catalogue
        .iter()
        .map(|scenario| run_scenario(config, scenario, reference, candidate))
        .collect();

    let passed = outcomes.iter().filter(|outcome| outcome.passed).count();
    SuiteRunReport {
        schema_version: 1,
        generated_at_unix_ms: now_unix_ms(),
        total_scenarios: outcomes.len(),
        passed_scenarios: passed,
        failed_scenarios: outcomes.len() - passed,
        outcomes,
    }
}

pub fn write_suite_report(path: &Path, report: &SuiteRunReport) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|err| format!("failed creating {}: {err}", parent.display()))?;
    }
    let raw = serde_json::to_string_pretty(report)
        .map_err(|err| format!("failed to serialize suite report: {err}"))?;
    fs::write(path, raw).map_err(|err| format!("failed writing {}: {err}", path.display()))
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}
