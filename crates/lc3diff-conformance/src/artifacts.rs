#![forbid(unsafe_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Transient file flavors the harness creates directly. Object images are
/// produced by the external assembler and enter via [`TempArtifact::adopt`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Assembly source text handed to the assembler.
    Source,
    /// Command script handed to the reference simulator.
    Script,
}

impl ArtifactKind {
    const fn stem(self) -> &'static str {
        match self {
            Self::Source => "lc3_src",
            Self::Script => "lc3_script",
        }
    }

    const fn extension(self) -> &'static str {
        match self {
            Self::Source => "asm",
            Self::Script => "sim",
        }
    }
}

// Per-process sequence number. Combined with the pid and a nanosecond stamp
// this keeps names collision-free even when the same scenario runs against
// both backends concurrently.
static SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn unique_path(scratch_root: &Path, kind: ArtifactKind) -> PathBuf {
    let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    scratch_root.join(format!(
        "{}_{}_{}_{}.{}",
        kind.stem(),
        std::process::id(),
        sequence,
        nanos,
        kind.extension()
    ))
}

/// A scoped transient file: deleted when dropped, so release happens on every
/// exit path of the run that owns it, including early `?` returns and panics
/// during unwinding. Deletion problems are logged and never shadow the error
/// that ended the run.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
    keep: bool,
}

impl TempArtifact {
    /// Creates a uniquely named file under `scratch_root` holding `content`.
    pub fn create(
        scratch_root: &Path,
        kind: ArtifactKind,
        content: &str,
        keep: bool,
    ) -> Result<Self, String> {
        let path = unique_path(scratch_root, kind);
        fs::write(&path, content)
            .map_err(|err| format!("failed writing artifact {}: {err}", path.display()))?;
        Ok(Self { path, keep })
    }

    /// Takes ownership of a file some external tool produced (or will
    /// produce) at `path`. The file need not exist yet; a missing file at
    /// drop time is not an error.
    #[must_use]
    pub fn adopt(path: PathBuf, keep: bool) -> Self {
        Self { path, keep }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                eprintln!("failed removing artifact {}: {err}", self.path.display());
            }
        }
    }
}
