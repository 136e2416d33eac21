use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use memoh_core::observability;

use crate::cancel::CancelToken;
use crate::error::{ExecError, Result};

const POLL_INTERVAL_MS: u64 = 20;

/// One command invocation. `args` are passed verbatim, no shell involved.
#[derive(Debug, Clone, Default)]
pub struct ExecRequest {
    pub command: String,
    pub args: Vec<String>,
    /// Working directory; inherited from this process when `None`.
    pub cwd: Option<PathBuf>,
    /// Wall-clock limit. On expiry the process is killed as on cancellation.
    pub timeout: Option<Duration>,
}

impl ExecRequest {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
    pub success: bool,
    /// Process exit code, `-1` when terminated by a signal.
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Run `request` to completion, or until `cancel` fires or the timeout
/// elapses. Stdin is closed; stdout and stderr are drained concurrently so a
/// chatty child never blocks on a full pipe.
pub fn run(request: &ExecRequest, cancel: &CancelToken) -> Result<ExecResult> {
    if request.command.trim().is_empty() {
        return Err(ExecError::InvalidCommand);
    }

    let mut cmd = Command::new(&request.command);
    cmd.args(&request.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = &request.cwd {
        cmd.current_dir(dir);
    }
    // Own process group, so a kill also reaches anything the command spawned.
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        cmd.process_group(0);
    }

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
        command: request.command.clone(),
        source,
    })?;
    tracing::debug!(
        command = %request.command,
        args = ?request.args,
        pid = child.id(),
        "Spawned subprocess"
    );

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                terminate(&mut child);
                return Err(ExecError::Wait(e));
            }
        }

        let reason = if cancel.is_cancelled() {
            Some("cancelled by client".to_string())
        } else {
            request
                .timeout
                .filter(|limit| start.elapsed() > *limit)
                .map(|limit| format!("timed out after {}s", limit.as_secs_f64()))
        };
        if let Some(reason) = reason {
            terminate(&mut child);
            observability::audit_exec_cancelled(&request.command, &reason);
            return Err(ExecError::Cancelled { reason });
        }

        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));
    };

    let exit_code = status.code().unwrap_or(-1);
    let duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(command = %request.command, exit_code, duration_ms, "Subprocess exited");
    observability::audit_exec_completed(&request.command, exit_code, duration_ms);

    Ok(ExecResult {
        success: status.success(),
        exit_code,
        stdout: join(stdout),
        stderr: join(stderr),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle
        .map(|h| h.join().unwrap_or_default())
        .unwrap_or_default()
}

/// Kill the child's process group and reap the child. The reader threads are
/// left detached: a descendant that escaped the group may still hold the pipes.
fn terminate(child: &mut Child) {
    #[cfg(unix)]
    unsafe {
        if libc::killpg(child.id() as i32, libc::SIGKILL) == -1 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::ESRCH) {
                tracing::warn!(pid = child.id(), error = %err, "Failed to kill process group");
            }
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn req(command: &str, args: &[&str]) -> ExecRequest {
        ExecRequest::new(command, args.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_run_captures_output() {
        let request = req("sh", &["-c", "echo out; echo err >&2"]);
        let result = run(&request, &CancelToken::new()).unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, b"out\n");
        assert_eq!(result.stderr, b"err\n");
    }

    #[test]
    fn test_non_zero_exit_is_not_an_error() {
        let result = run(&req("false", &[]), &CancelToken::new()).unwrap();
        assert!(!result.success);
        assert_ne!(result.exit_code, 0);

        let result = run(&req("sh", &["-c", "exit 7"]), &CancelToken::new()).unwrap();
        assert_eq!(result.exit_code, 7);
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(
            run(&req("", &[]), &CancelToken::new()),
            Err(ExecError::InvalidCommand)
        ));
        assert!(matches!(
            run(&req("   ", &[]), &CancelToken::new()),
            Err(ExecError::InvalidCommand)
        ));
    }

    #[test]
    fn test_missing_command_is_spawn_error() {
        let request = req("memoh-definitely-not-a-command", &[]);
        let err = run(&request, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ExecError::Spawn { .. }));
    }

    #[test]
    fn test_large_output_does_not_block() {
        let result = run(
            &req("sh", &["-c", "head -c 300000 /dev/zero"]),
            &CancelToken::new(),
        )
        .unwrap();
        assert_eq!(result.stdout.len(), 300000);
    }

    #[test]
    fn test_cancel_kills_process() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.cancel();
        });
        let start = Instant::now();
        let err = run(&req("sleep", &["5"]), &token).unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, ExecError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_cancel_kills_grandchildren() {
        let token = CancelToken::new();
        let remote = token.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(200));
            remote.cancel();
        });
        let start = Instant::now();
        let err = run(&req("sh", &["-c", "sleep 6; echo done"]), &token).unwrap_err();
        canceller.join().unwrap();
        assert!(matches!(err, ExecError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(3), "took {:?}", start.elapsed());
    }

    #[test]
    fn test_timeout_kills_background_pipeline() {
        let mut request = req("sh", &["-c", "sleep 6 | cat; echo done"]);
        request.timeout = Some(Duration::from_millis(200));
        let start = Instant::now();
        let err = run(&request, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ExecError::Cancelled { .. }));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_kills_process() {
        let mut request = req("sleep", &["5"]);
        request.timeout = Some(Duration::from_millis(150));
        let start = Instant::now();
        let err = run(&request, &CancelToken::new()).unwrap_err();
        match err {
            ExecError::Cancelled { reason } => assert!(reason.starts_with("timed out")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn test_runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let mut request = req("ls", &[]);
        request.cwd = Some(dir.path().to_path_buf());
        let result = run(&request, &CancelToken::new()).unwrap();
        assert_eq!(result.stdout, b"marker.txt\n");
    }

    #[test]
    fn test_signal_exit_reports_minus_one() {
        let result = run(&req("sh", &["-c", "kill -9 $$"]), &CancelToken::new()).unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, -1);
    }
}
