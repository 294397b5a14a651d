//! User-triggered side effects: opening favorites and web shortcuts, and
//! running shell commands.
//!
//! `run_command` hands the string straight to the platform shell. The command
//! is typed by the user of the desktop session, so it runs with that user's
//! privileges and no filtering is applied.

use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use tracing::{info, warn};

use crate::services::Launcher;

pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(20);

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// The only failure kind an action reports; callers show the message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    fn failed(message: impl Into<String>) -> Self {
        ActionError::Failed(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// The negated signal number when the process was killed by a signal.
    pub exit_code: i32,
    /// Stdout followed by stderr, trimmed.
    pub output: String,
}

pub fn open_path(launcher: &dyn Launcher, path: &str) -> Result<(), ActionError> {
    let target = expand_home(path);
    if !target.exists() {
        warn!(event = "action.open_path_missing", path = %target.display());
        return Err(ActionError::failed(format!(
            "Path does not exist: {}",
            target.display()
        )));
    }

    launcher
        .open_path(&target)
        .map_err(|error| ActionError::failed(error.to_string()))?;
    info!(event = "action.open_path", path = %target.display());
    Ok(())
}

pub fn open_web(launcher: &dyn Launcher, url: &str) -> Result<(), ActionError> {
    launcher.open_url(url).map_err(|error| {
        warn!(event = "action.open_web_failed", url, error = %error);
        ActionError::failed(format!("Failed to open URL: {url}"))
    })?;
    info!(event = "action.open_web", url);
    Ok(())
}

pub fn run_command(command: &str) -> Result<CommandOutput, ActionError> {
    run_command_with_timeout(command, COMMAND_TIMEOUT)
}

/// Blocks until the command has exited and both output streams have closed,
/// or until `timeout` elapses. On timeout the command's whole process group
/// is killed, including anything it left running in the background.
pub fn run_command_with_timeout(
    command: &str,
    timeout: Duration,
) -> Result<CommandOutput, ActionError> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut child = shell(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|error| ActionError::failed(format!("Failed to start command: {error}")))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = match wait_until(&mut child, deadline) {
        Ok(Some(status)) => status,
        Ok(None) => return Err(timed_out(&mut child, command, timeout)),
        Err(error) => {
            kill_tree(&mut child);
            return Err(ActionError::failed(format!("Failed to wait for command: {error}")));
        }
    };

    // A background job can keep the pipes open after the shell exits; the
    // reads share the same deadline.
    let (Some(out), Some(err)) = (collect(stdout, deadline), collect(stderr, deadline)) else {
        return Err(timed_out(&mut child, command, timeout));
    };
    let mut output = out;
    output.push_str(&err);
    let exit_code = exit_code(status);

    info!(
        event = "action.command_finished",
        command,
        exit_code,
        duration_ms = started.elapsed().as_millis() as u64
    );

    Ok(CommandOutput {
        exit_code,
        output: output.trim().to_string(),
    })
}

fn timed_out(child: &mut Child, command: &str, timeout: Duration) -> ActionError {
    kill_tree(child);
    warn!(event = "action.command_timeout", command, timeout_ms = timeout.as_millis() as u64);
    ActionError::failed(format!(
        "Command timed out after {}s: {command}",
        timeout.as_secs()
    ))
}

#[cfg(not(unix))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.args(["/C", command]);
    cmd
}

#[cfg(unix)]
fn shell(command: &str) -> Command {
    use std::os::unix::process::CommandExt;

    let mut cmd = Command::new("sh");
    cmd.args(["-c", command]).process_group(0);
    cmd
}

#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    use nix::{
        sys::signal::{killpg, Signal},
        unistd::Pid,
    };

    // The shell leads its own group, so its pid is the group id.
    if let Ok(pid) = i32::try_from(child.id()) {
        if let Err(error) = killpg(Pid::from_raw(pid), Signal::SIGKILL) {
            warn!(event = "action.kill_group_failed", pid, error = %error);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

/// Signal deaths report the negated signal number.
#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;

    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn wait_until(child: &mut Child, deadline: Instant) -> io::Result<Option<ExitStatus>> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(WAIT_POLL_INTERVAL);
    }
}

// Pipes are read on their own threads so a child that fills one cannot stall.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<Receiver<Vec<u8>>> {
    pipe.map(|mut pipe| {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            let _ = tx.send(buf);
        });
        rx
    })
}

/// `None` when the stream is still open at `deadline`.
fn collect(stream: Option<Receiver<Vec<u8>>>, deadline: Instant) -> Option<String> {
    let Some(rx) = stream else {
        return Some(String::new());
    };
    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(RecvTimeoutError::Disconnected) => Some(String::new()),
        Err(RecvTimeoutError::Timeout) => None,
    }
}

fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    Path::new(path).to_path_buf()
}
