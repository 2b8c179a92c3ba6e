use std::ffi::OsString;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Diagnostics kept from a failed tool run (tail end, where the error usually is).
const MAX_DIAGNOSTIC_CHARS: usize = 2000;

/// An external program plus the arguments always passed before per-call ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Split a configured command line on whitespace. `None` when blank.
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;

        Some(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

pub(super) struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ToolOutput {
    /// stderr followed by stdout, trimmed to the last `MAX_DIAGNOSTIC_CHARS`.
    pub fn diagnostics(&self) -> String {
        let stderr = String::from_utf8_lossy(&self.stderr);
        let stdout = String::from_utf8_lossy(&self.stdout);

        let text = [stderr.trim(), stdout.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if text.is_empty() {
            return format!("exited with {}", self.status);
        }

        let len = text.chars().count();
        if len > MAX_DIAGNOSTIC_CHARS {
            text.chars().skip(len - MAX_DIAGNOSTIC_CHARS).collect()
        } else {
            text
        }
    }
}

#[derive(Debug)]
pub(super) enum RunError {
    Spawn(std::io::Error),
    TimedOut,
    Cancelled,
}

/// Kills the child's process group on drop, taking along anything the tool
/// started (the extractor's transcoder, a launcher's worker).
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    /// The tool finished on its own; leave the group alone.
    fn release(mut self) {
        self.0 = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(pgid) = self.0 {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    if let Ok(pgid) = libc::pid_t::try_from(pgid) {
        // SAFETY: killpg only takes integer arguments.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Run `tool` with `extra` appended to its configured args and wait for it.
///
/// The tool leads its own process group. Cancellation, timeout, or dropping the
/// returned future kills the whole group.
pub(super) async fn run(
    tool: &ToolCommand,
    extra: &[OsString],
    cancel: &CancellationToken,
    timeout: Duration,
) -> Result<ToolOutput, RunError> {
    if cancel.is_cancelled() {
        return Err(RunError::Cancelled);
    }

    let mut command = Command::new(&tool.program);
    command
        .args(&tool.args)
        .args(extra)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let child = command.spawn().map_err(RunError::Spawn)?;
    let group = ProcessGroup(child.id());

    tokio::select! {
        output = child.wait_with_output() => {
            group.release();
            let output = output.map_err(RunError::Spawn)?;
            Ok(ToolOutput {
                status: output.status,
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
        _ = cancel.cancelled() => Err(RunError::Cancelled),
        _ = tokio::time::sleep(timeout) => Err(RunError::TimedOut),
    }
}
