#![forbid(unsafe_code)]

use crate::assembler::assemble;
use crate::backend::Backend;
use crate::scenarios::SourceProgram;
use crate::{HarnessConfig, HarnessError};
use lc3diff_trace::{RegisterSnapshot, parse_trace};

/// Runs one program on one backend: write source, assemble, execute, parse.
///
/// All artifacts acquired here (source file, object image, and the reference
/// backend's command script) are scoped to this call and dropped on every
/// exit path, so the first error can propagate via `?` without leaking
/// anything. Cleanup problems are logged by the artifact drops and never
/// replace the error that ended the run.
pub fn run_program(
    config: &HarnessConfig,
    program: &SourceProgram,
    backend: &dyn Backend,
) -> Result<RegisterSnapshot, HarnessError> {
    let image = assemble(config, &program.to_source_text())?;
    let raw_trace = backend.execute(&image)?;
    let snapshot = parse_trace(&raw_trace)?;
    Ok(snapshot)
}
