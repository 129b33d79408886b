#![forbid(unsafe_code)]

use crate::artifacts::{ArtifactKind, TempArtifact};
use crate::process::run_with_timeout;
use crate::{HarnessConfig, HarnessError};
use std::path::Path;
use std::process::Command;

/// An assembled binary image on disk plus whatever the assembler said while
/// producing it. The object file is owned by the run that assembled it and
/// is deleted when the run completes, success or not.
#[derive(Debug)]
pub struct AssembledImage {
    object: TempArtifact,
    diagnostics: String,
}

impl AssembledImage {
    #[must_use]
    pub fn object_path(&self) -> &Path {
        self.object.path()
    }

    #[must_use]
    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }
}

/// Writes `source_text` to a transient source file and invokes the external
/// assembler on it. The object image is expected at the source path with its
/// extension replaced by `obj` (the assembler's convention).
///
/// Hardened on both counts the original driver skipped: a nonzero exit status
/// and a missing object image are each an [`HarnessError::Assembly`] instead
/// of a silent run against a stale or nonexistent image.
pub fn assemble(config: &HarnessConfig, source_text: &str) -> Result<AssembledImage, HarnessError> {
    let source = TempArtifact::create(
        &config.scratch_root,
        ArtifactKind::Source,
        source_text,
        config.keep_artifacts,
    )
    .map_err(HarnessError::Assembly)?;

    // Adopt the object path before invoking the tool so that a partial image
    // from a failed assembly is still cleaned up.
    let object_path = source.path().with_extension("obj");
    let object = TempArtifact::adopt(object_path, config.keep_artifacts);

    let mut command = Command::new(&config.assembler);
    command.arg(source.path());
    let captured = run_with_timeout(command, config.timeout).map_err(HarnessError::Assembly)?;

    let diagnostics = format!("{}{}", captured.stdout, captured.stderr);
    if captured.timed_out {
        return Err(HarnessError::Assembly(format!(
            "assembler '{}' timed out after {}ms",
            config.assembler.display(),
            config.timeout.as_millis()
        )));
    }
    if !captured.succeeded() {
        return Err(HarnessError::Assembly(format!(
            "assembler '{}' exited abnormally ({:?}): {}",
            config.assembler.display(),
            captured.status,
            diagnostics.trim()
        )));
    }
    if !object.path().exists() {
        return Err(HarnessError::Assembly(format!(
            "assembler '{}' reported success but produced no object image at {}: {}",
            config.assembler.display(),
            object.path().display(),
            diagnostics.trim()
        )));
    }

    Ok(AssembledImage {
        object,
        diagnostics,
    })
}
