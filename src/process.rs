//! Bounded execution of external commands
//!
//! Every command run on behalf of a step has a wall-clock limit covering the
//! command and anything it leaves holding its output. A command that exceeds
//! it is killed along with its process group and reported as failed.

use crate::error::{ReleaseError, Result};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// Captured result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last non-empty line of stderr, or stdout when stderr is empty
    pub fn summary(&self) -> &str {
        last_line(&self.stderr)
            .or_else(|| last_line(&self.stdout))
            .unwrap_or("")
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|l| !l.is_empty())
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Wait for a drained pipe until `deadline`; `None` when it is still open
fn collect(rx: &Receiver<String>, deadline: Instant) -> Option<String> {
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(text) => Some(text),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

#[cfg(unix)]
fn own_process_group(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    cmd.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_cmd: &mut Command) {}

/// Kill the child and every process left in its group
fn kill_group(child: &mut Child) {
    #[cfg(unix)]
    {
        use nix::errno::Errno;
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        if let Err(e) = killpg(Pid::from_raw(child.id() as i32), Signal::SIGKILL) {
            if e != Errno::ESRCH {
                log::warn!("Failed to kill process group {}: {}", child.id(), e);
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

/// Run a command to completion, killing it after `timeout`.
///
/// A non-zero exit is not an error here; callers inspect [CommandOutput].
/// Failing to spawn and exceeding the timeout are errors. The timeout also
/// covers background processes that keep the output pipes open after the
/// command itself exits.
pub fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<CommandOutput> {
    let program = format!("{:?}", cmd.get_program());
    log::debug!("Running {:?} (timeout {}s)", cmd, timeout.as_secs());

    own_process_group(&mut cmd);
    let deadline = Instant::now() + timeout;
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ReleaseError::command(format!("Failed to execute {}: {}", program, e)))?;

    // Drain both pipes concurrently so a chatty child cannot block on a full pipe
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            kill_group(&mut child);
            return Err(ReleaseError::command(format!(
                "{} timed out after {} seconds",
                program,
                timeout.as_secs()
            )));
        }
        Err(e) => {
            kill_group(&mut child);
            return Err(e.into());
        }
    };

    match (collect(&stdout, deadline), collect(&stderr, deadline)) {
        (Some(stdout), Some(stderr)) => Ok(CommandOutput {
            code: status.code(),
            stdout,
            stderr,
        }),
        _ => {
            kill_group(&mut child);
            Err(ReleaseError::command(format!(
                "{} timed out after {} seconds: background processes kept its output open",
                program,
                timeout.as_secs()
            )))
        }
    }
}

/// Run a shell command line through `sh -c`
pub fn shell(script: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(script);
    cmd
}
