//! Subprocess execution with line relay and a hard timeout.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{ProvisionError, ProvisionResult};

/// Captured result of a finished child process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Run `argv` to completion, relaying each output line to the log as
/// `[prefix] line` while also capturing it.
///
/// The child is killed if it outlives `timeout`.
pub async fn run_command(argv: &[String], prefix: &str, timeout: Duration) -> ProvisionResult<CommandOutput> {
    let (program, args) = argv.split_first().ok_or(ProvisionError::NoCommand("subprocess"))?;
    debug!(%program, ?args, "spawning");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProvisionError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let run = async {
        let (stdout, stderr) = tokio::join!(relay(stdout, prefix, false), relay(stderr, prefix, true));
        let status = child.wait().await;
        (status, stdout, stderr)
    };

    let waited = tokio::time::timeout(timeout, run).await;
    let (status, stdout, stderr) = match waited {
        Ok(done) => done,
        Err(_) => {
            let _ = child.start_kill();
            return Err(ProvisionError::Timeout {
                program: program.clone(),
                secs: timeout.as_secs(),
            });
        }
    };
    let status = status.map_err(|source| ProvisionError::Wait {
        program: program.clone(),
        source,
    })?;

    Ok(CommandOutput {
        code: status.code(),
        stdout,
        stderr,
    })
}

async fn relay<R: AsyncRead + Unpin>(pipe: Option<R>, prefix: &str, is_stderr: bool) -> String {
    let mut captured = String::new();
    let Some(pipe) = pipe else {
        return captured;
    };
    let mut lines = BufReader::new(pipe).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if is_stderr {
                    info!(target: "simfleet::child", stream = "stderr", "[{prefix}] {line}");
                } else {
                    info!(target: "simfleet::child", "[{prefix}] {line}");
                }
                captured.push_str(&line);
                captured.push('\n');
            }
            Ok(None) => break,
            Err(e) => {
                warn!(%prefix, error = %e, "unreadable child output");
                break;
            }
        }
    }
    captured
}
