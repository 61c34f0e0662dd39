//! Run one external command against files with a hard time bound.
//!
//! The command's stdin is the input file and its stdout is the output file;
//! stderr is drained on a helper thread so a chatty tool cannot block on a
//! full pipe. The wait is a [`MonitoredChild`] polled against a deadline; a
//! child still running when its handle is dropped is killed and reaped.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

/// First `try_wait` back-off step; doubles up to [`POLL_INTERVAL`].
const MIN_POLL_INTERVAL: Duration = Duration::from_micros(100);
const POLL_INTERVAL: Duration = Duration::from_millis(5);
/// How long an exited child's stderr may stay open before the reader is
/// abandoned. A descendant can inherit the pipe and outlive the tool.
const STDERR_GRACE: Duration = Duration::from_millis(100);
/// Captured stderr is cut to this many bytes in error messages.
const STDERR_LIMIT: usize = 4096;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("empty command line")]
    EmptyCommand,

    #[error("failed to open {role} file '{}': {source}", .path.display())]
    Open {
        role: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to start '{program}': {source}")]
    Spawn { program: String, source: io::Error },

    #[error("waiting on '{program}' failed: {source}")]
    Wait { program: String, source: io::Error },

    /// The command ran to completion but reported failure.
    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The command was still running at the deadline and has been killed.
    #[error("'{program}' exceeded its {}s limit", .timeout.as_secs_f64())]
    TimedOut { program: String, timeout: Duration },
}

impl RunError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RunError::TimedOut { .. })
    }
}

/// A command that exited successfully within its limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedRun {
    pub elapsed: Duration,
    /// Size of the output file after the command exited.
    pub output_size: u64,
}

pub enum WaitOutcome {
    Exited { status: ExitStatus, elapsed: Duration },
    DeadlineExceeded,
}

/// Child process with a deadline and a background stderr reader.
pub struct MonitoredChild {
    child: Child,
    stderr: Option<Receiver<Vec<u8>>>,
    started: Instant,
    deadline: Instant,
}

impl MonitoredChild {
    /// Spawn `cmd` with stderr piped. The clock starts just before spawning.
    pub fn spawn(cmd: &mut Command, timeout: Duration) -> io::Result<Self> {
        cmd.stderr(Stdio::piped());
        let started = Instant::now();
        let mut child = cmd.spawn()?;
        let stderr = child.stderr.take().map(|mut pipe| {
            let (tx, rx) = mpsc::channel();
            thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                let _ = tx.send(buf);
            });
            rx
        });
        Ok(Self {
            child,
            stderr,
            started,
            deadline: started + timeout,
        })
    }

    /// Block until the child exits or the deadline passes. On deadline the
    /// child is killed and reaped before returning.
    pub fn wait_deadline(&mut self) -> io::Result<WaitOutcome> {
        let mut interval = MIN_POLL_INTERVAL;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(WaitOutcome::Exited {
                    status,
                    elapsed: self.started.elapsed(),
                });
            }
            let now = Instant::now();
            if now >= self.deadline {
                self.kill();
                return Ok(WaitOutcome::DeadlineExceeded);
            }
            thread::sleep(interval.min(self.deadline - now));
            interval = next_poll_interval(interval);
        }
    }

    /// Collected stderr, lossily decoded and truncated. Only call after the
    /// child has exited. Gives up after [`STDERR_GRACE`] if the pipe is
    /// still held open, leaving the reader thread detached.
    pub fn stderr_text(&mut self) -> String {
        let bytes = self
            .stderr
            .take()
            .and_then(|rx| rx.recv_timeout(STDERR_GRACE).ok())
            .unwrap_or_default();
        let cut = bytes.len().min(STDERR_LIMIT);
        String::from_utf8_lossy(&bytes[..cut]).trim().to_string()
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        // A grandchild may still hold the pipe open; detach the reader.
        self.stderr.take();
    }
}

/// Short polls catch fast tools early; long runs settle at [`POLL_INTERVAL`].
fn next_poll_interval(current: Duration) -> Duration {
    (current * 2).min(POLL_INTERVAL)
}

impl Drop for MonitoredChild {
    fn drop(&mut self) {
        if let Ok(None) = self.child.try_wait() {
            self.kill();
        }
    }
}

/// Run `argv` with `input` on stdin and `output` (created or truncated) on
/// stdout, giving up after `timeout`.
pub fn run_timed(
    argv: &[String],
    input: &Path,
    output: &Path,
    timeout: Duration,
) -> Result<TimedRun, RunError> {
    let (program, args) = argv.split_first().ok_or(RunError::EmptyCommand)?;
    let stdin = File::open(input).map_err(|source| RunError::Open {
        role: "input",
        path: input.to_path_buf(),
        source,
    })?;
    let stdout = File::create(output).map_err(|source| RunError::Open {
        role: "output",
        path: output.to_path_buf(),
        source,
    })?;

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(stdin).stdout(stdout);
    let mut child = MonitoredChild::spawn(&mut cmd, timeout).map_err(|source| RunError::Spawn {
        program: program.clone(),
        source,
    })?;

    let outcome = child.wait_deadline().map_err(|source| RunError::Wait {
        program: program.clone(),
        source,
    })?;
    match outcome {
        WaitOutcome::DeadlineExceeded => Err(RunError::TimedOut {
            program: program.clone(),
            timeout,
        }),
        WaitOutcome::Exited { status, .. } if !status.success() => Err(RunError::Failed {
            program: program.clone(),
            status,
            stderr: child.stderr_text(),
        }),
        WaitOutcome::Exited { elapsed, .. } => {
            let stderr = child.stderr_text();
            if !stderr.is_empty() {
                debug!(program = %program, %stderr, "tool wrote to stderr");
            }
            let output_size = fs::metadata(output)
                .map_err(|source| RunError::Open {
                    role: "output",
                    path: output.to_path_buf(),
                    source,
                })?
                .len();
            Ok(TimedRun {
                elapsed,
                output_size,
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn copies_input_to_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        let output = dir.path().join("out.txt");
        fs::write(&input, b"hello world").unwrap();

        let run = run_timed(&argv("cat"), &input, &output, Duration::from_secs(10)).unwrap();
        assert_eq!(run.output_size, 11);
        assert_eq!(fs::read(&output).unwrap(), b"hello world");
    }

    #[test]
    fn non_zero_exit_is_failure_not_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"x").unwrap();

        let err = run_timed(
            &argv("false"),
            &input,
            &dir.path().join("out"),
            Duration::from_secs(10),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Failed { .. }));
        assert!(!err.is_timeout());
    }

    #[test]
    fn slow_command_is_killed_at_deadline() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"x").unwrap();

        let start = Instant::now();
        let err = run_timed(
            &argv("sleep 5"),
            &input,
            &dir.path().join("out"),
            Duration::from_millis(100),
        )
        .unwrap_err();
        assert!(err.is_timeout());
        assert!(start.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"x").unwrap();

        let err = run_timed(
            &argv("definitely-not-a-real-compressor"),
            &input,
            &dir.path().join("out"),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Spawn { .. }));
    }

    #[test]
    fn missing_input_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run_timed(
            &argv("cat"),
            &dir.path().join("absent"),
            &dir.path().join("out"),
            Duration::from_secs(1),
        )
        .unwrap_err();
        assert!(matches!(err, RunError::Open { role: "input", .. }));
    }

    #[test]
    fn poll_interval_backs_off_to_cap() {
        let mut interval = MIN_POLL_INTERVAL;
        let mut steps = 0;
        while interval < POLL_INTERVAL {
            interval = next_poll_interval(interval);
            steps += 1;
        }
        assert_eq!(interval, POLL_INTERVAL);
        assert!(steps > 1);
        assert_eq!(next_poll_interval(POLL_INTERVAL), POLL_INTERVAL);
    }

    #[test]
    fn lingering_stderr_holder_does_not_stall_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"payload").unwrap();
        let argv: Vec<String> = ["sh", "-c", "(sleep 3 >&2 &); cat"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let start = Instant::now();
        let run = run_timed(&argv, &input, &dir.path().join("out"), Duration::from_millis(500))
            .unwrap();
        assert_eq!(run.output_size, 7);
        assert!(start.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn stderr_is_captured_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        fs::write(&input, b"x").unwrap();

        let err = run_timed(
            &argv("ls /definitely/not/here"),
            &input,
            &dir.path().join("out"),
            Duration::from_secs(10),
        )
        .unwrap_err();
        match err {
            RunError::Failed { stderr, .. } => assert!(!stderr.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
