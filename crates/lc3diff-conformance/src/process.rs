#![forbid(unsafe_code)]

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub(crate) struct CapturedOutput {
    /// None when the child was killed on timeout.
    pub status: Option<ExitStatus>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl CapturedOutput {
    pub(crate) fn succeeded(&self) -> bool {
        self.status.is_some_and(|status| status.success())
    }
}

/// Spawns `command` with piped output and waits at most `timeout` for it to
/// terminate. Output pipes are drained on reader threads so a chatty child
/// can never deadlock against a full pipe buffer. On expiry the child is
/// killed and reaped; whatever it wrote before dying is still returned.
pub(crate) fn run_with_timeout(
    mut command: Command,
    timeout: Duration,
) -> Result<CapturedOutput, String> {
    let program = command.get_program().to_string_lossy().to_string();
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = command
        .spawn()
        .map_err(|err| format!("failed to spawn '{program}': {err}"))?;

    let mut stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| format!("missing stdout pipe for '{program}'"))?;
    let mut stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| format!("missing stderr pipe for '{program}'"))?;

    let stdout_reader = thread::spawn(move || {
        let mut buffer = String::new();
        let _ = stdout_pipe.read_to_string(&mut buffer);
        buffer
    });
    let stderr_reader = thread::spawn(move || {
        let mut buffer = String::new();
        let _ = stderr_pipe.read_to_string(&mut buffer);
        buffer
    });

    let deadline = Instant::now() + timeout;
    let (status, timed_out) = loop {
        match child.try_wait() {
            Ok(Some(status)) => break (Some(status), false),
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    break (None, true);
                }
                thread::sleep(Duration::from_millis(5));
            }
            Err(err) => return Err(format!("failed waiting for '{program}': {err}")),
        }
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(CapturedOutput {
        status,
        stdout,
        stderr,
        timed_out,
    })
}
