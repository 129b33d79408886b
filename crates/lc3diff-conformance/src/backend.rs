#![forbid(unsafe_code)]

use crate::artifacts::{ArtifactKind, TempArtifact};
use crate::assembler::AssembledImage;
use crate::process::{CapturedOutput, run_with_timeout};
use crate::{HarnessConfig, HarnessError};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

/// A simulator capable of running an assembled image to completion and
/// reporting its final state as a raw trace. Injected at every call site so
/// harness tests can substitute stubs for the external executables.
pub trait Backend {
    /// Short label used in failure reports ("reference", "candidate").
    fn label(&self) -> &'static str;

    /// Runs the image and returns the simulator's stdout unmodified. Grammar
    /// conformance of the trace is the candidate's contractual obligation,
    /// not something enforced here.
    fn execute(&self, image: &AssembledImage) -> Result<String, HarnessError>;
}

/// The trusted oracle: drives the canonical `lc3sim` through a scripted
/// load / run-to-completion / quit sequence.
#[derive(Debug, Clone)]
pub struct ReferenceBackend {
    simulator: PathBuf,
    scratch_root: PathBuf,
    timeout: Duration,
    keep_artifacts: bool,
}

impl ReferenceBackend {
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            simulator: config.reference_simulator.clone(),
            scratch_root: config.scratch_root.clone(),
            timeout: config.timeout,
            keep_artifacts: config.keep_artifacts,
        }
    }
}

impl Backend for ReferenceBackend {
    fn label(&self) -> &'static str {
        "reference"
    }

    fn execute(&self, image: &AssembledImage) -> Result<String, HarnessError> {
        let script_text = format!("file {}\ncontinue\nquit\n", image.object_path().display());
        let script = TempArtifact::create(
            &self.scratch_root,
            ArtifactKind::Script,
            &script_text,
            self.keep_artifacts,
        )
        .map_err(HarnessError::BackendExecution)?;

        let mut command = Command::new(&self.simulator);
        command.arg("-s").arg(script.path());
        let captured =
            run_with_timeout(command, self.timeout).map_err(HarnessError::BackendExecution)?;
        trace_from_capture(self.label(), &self.simulator, self.timeout, captured)
    }
}

/// The simulator under development, invoked with the image path as its sole
/// argument.
#[derive(Debug, Clone)]
pub struct CandidateBackend {
    simulator: PathBuf,
    timeout: Duration,
}

impl CandidateBackend {
    #[must_use]
    pub fn from_config(config: &HarnessConfig) -> Self {
        Self {
            simulator: config.candidate_simulator.clone(),
            timeout: config.timeout,
        }
    }
}

impl Backend for CandidateBackend {
    fn label(&self) -> &'static str {
        "candidate"
    }

    fn execute(&self, image: &AssembledImage) -> Result<String, HarnessError> {
        let mut command = Command::new(&self.simulator);
        command.arg(image.object_path());
        let captured =
            run_with_timeout(command, self.timeout).map_err(HarnessError::BackendExecution)?;
        trace_from_capture(self.label(), &self.simulator, self.timeout, captured)
    }
}

/// Shared tail for both variants: a timeout or a run that produced no output
/// at all is a backend failure; a nonzero exit that still emitted a trace is
/// left for the parser and the oracle to judge.
fn trace_from_capture(
    label: &str,
    simulator: &std::path::Path,
    timeout: Duration,
    captured: CapturedOutput,
) -> Result<String, HarnessError> {
    if captured.timed_out {
        return Err(HarnessError::BackendExecution(format!(
            "{label} simulator '{}' timed out after {}ms",
            simulator.display(),
            timeout.as_millis()
        )));
    }
    if captured.stdout.trim().is_empty() {
        return Err(HarnessError::BackendExecution(format!(
            "{label} simulator '{}' produced no output ({:?}): {}",
            simulator.display(),
            captured.status,
            captured.stderr.trim()
        )));
    }
    Ok(captured.stdout)
}

#[cfg(test)]
mod tests {
    use super::{Backend, CandidateBackend, ReferenceBackend};
    use crate::assembler::assemble;
    use crate::HarnessConfig;
    use lc3diff_trace::HALT_BANNER;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use std::time::Duration;

    fn stub_tool(name: &str, body: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_nanos());
        let path = std::env::temp_dir().join(format!("lc3diff_{name}_{nanos}.sh"));
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write stub tool");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod stub tool");
        path
    }

    fn stub_config() -> (HarnessConfig, Vec<PathBuf>) {
        let assembler = stub_tool(
            "be_as",
            "obj=$(printf %s \"$1\" | sed 's/\\.asm$/.obj/')\nprintf binary > \"$obj\"",
        );
        let reference = stub_tool(
            "be_ref",
            // First line of the -s script names the object file; echo it back
            // so the test can assert the script plumbing works.
            &format!(
                "head -n 1 \"$2\"\necho 'step log'\necho '{HALT_BANNER}'\necho 'R0=x0000 R1=x0000 R2=x0000 R3=x0000 R4=x0000 R5=x0001 R6=x0000 R7=x0000 '"
            ),
        );
        let candidate = stub_tool(
            "be_cand",
            &format!(
                "echo \"running $1\"\necho '{HALT_BANNER}'\necho 'R0=x0000 R1=x0000 R2=x0000 R3=x0000 R4=x0000 R5=x0001 R6=x0000 R7=x0000 '"
            ),
        );
        let config = HarnessConfig {
            assembler: assembler.clone(),
            reference_simulator: reference.clone(),
            candidate_simulator: candidate.clone(),
            scratch_root: std::env::temp_dir(),
            timeout: Duration::from_secs(5),
            keep_artifacts: false,
        };
        (config, vec![assembler, reference, candidate])
    }

    fn cleanup(tools: Vec<PathBuf>) {
        for tool in tools {
            let _ = fs::remove_file(tool);
        }
    }

    #[test]
    fn reference_backend_scripts_the_simulator() {
        let (config, tools) = stub_config();
        let image = assemble(&config, ".ORIG x3000\nHALT\n.END\n").expect("assemble");

        let backend = ReferenceBackend::from_config(&config);
        let trace = backend.execute(&image).expect("reference run");
        // The script's first line is `file <object>`; the stub echoed it.
        assert!(trace.starts_with("file "));
        assert!(trace.contains(HALT_BANNER));
        assert!(trace.contains("R5=x0001"));
        cleanup(tools);
    }

    #[test]
    fn candidate_backend_passes_the_image_path() {
        let (config, tools) = stub_config();
        let image = assemble(&config, ".ORIG x3000\nHALT\n.END\n").expect("assemble");

        let backend = CandidateBackend::from_config(&config);
        let trace = backend.execute(&image).expect("candidate run");
        assert!(trace.contains(&format!("running {}", image.object_path().display())));
        assert!(trace.contains(HALT_BANNER));
        cleanup(tools);
    }

    #[test]
    fn silent_simulator_is_a_backend_error() {
        let (mut config, tools) = stub_config();
        let silent = stub_tool("be_silent", "exit 1");
        config.candidate_simulator = silent.clone();
        let image = assemble(&config, ".ORIG x3000\nHALT\n.END\n").expect("assemble");

        let backend = CandidateBackend::from_config(&config);
        let err = backend.execute(&image).expect_err("silent simulator must fail");
        assert_eq!(err.reason_code(), "backend_execution_failed");
        assert!(err.to_string().contains("no output"));
        cleanup(tools);
        let _ = fs::remove_file(silent);
    }

    #[test]
    fn hung_simulator_times_out() {
        let (mut config, tools) = stub_config();
        let hung = stub_tool("be_hang", "exec sleep 30");
        config.candidate_simulator = hung.clone();
        let image = assemble(&config, ".ORIG x3000\nHALT\n.END\n").expect("assemble");
        config.timeout = Duration::from_millis(100);

        let backend = CandidateBackend::from_config(&config);
        let err = backend.execute(&image).expect_err("hung simulator must fail");
        assert_eq!(err.reason_code(), "backend_execution_failed");
        assert!(err.to_string().contains("timed out"));
        cleanup(tools);
        let _ = fs::remove_file(hung);
    }

    #[test]
    fn unstartable_simulator_is_a_backend_error() {
        let (mut config, tools) = stub_config();
        config.candidate_simulator = PathBuf::from("/nonexistent/lc3diff-no-such-sim");
        let image = assemble(&config, ".ORIG x3000\nHALT\n.END\n").expect("assemble");

        let backend = CandidateBackend::from_config(&config);
        let err = backend.execute(&image).expect_err("spawn must fail");
        assert_eq!(err.reason_code(), "backend_execution_failed");
        cleanup(tools);
    }
}
