use super::error::{BestEffortReport, PipelineError};
use crate::config::ServiceConfig;
use crate::process::{wait_for_exit, ChildProcess, ExitState, ProcessHandle};
use crate::shared::logging::PipelineLog;
use crate::workspace::Workspace;
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const SERVICE_LOG_FILE_NAME: &str = "benchmark-service.log";

const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

#[derive(Debug)]
enum Readiness {
    Ready,
    Closed,
    ReadFailed(String),
}

/// The running benchmark service. Stopping consumes the handle, so shutdown can only be
/// requested once per run.
#[derive(Debug)]
pub struct ServiceHandle {
    process: ChildProcess,
    stdin: Option<ChildStdin>,
    drain: Option<JoinHandle<()>>,
    path: PathBuf,
    shutdown_token: String,
    shutdown_timeout: Option<Duration>,
}

/// Launches the benchmark service and blocks until its readiness marker shows up on stderr.
///
/// Every stderr line, before and after readiness, is appended to the service log in the
/// workspace logs area so the pipe never fills up while strategies run.
pub fn start_service(
    workspace: &Workspace,
    config: &ServiceConfig,
    log: &PipelineLog,
) -> Result<ServiceHandle, PipelineError> {
    let path = workspace.root.join(&config.executable);
    log.info(
        "service.boot",
        &format!("booting benchmark service {}", path.display()),
    );

    let mut command = Command::new(&path);
    command
        .current_dir(&workspace.root)
        .stdin(Stdio::piped())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped());
    let mut process =
        ChildProcess::spawn(&mut command).map_err(|source| PipelineError::ServiceSpawn {
            path: path.display().to_string(),
            source,
        })?;

    let stdin = process.take_stdin();
    let Some(stderr) = process.take_stderr() else {
        let _ = process.kill();
        let _ = process.wait();
        return Err(PipelineError::ServiceNotReady {
            path: path.display().to_string(),
            reason: "missing stderr pipe".to_string(),
        });
    };

    let (ready_tx, ready_rx) = mpsc::channel::<Readiness>();
    let marker = config.readiness_marker.clone();
    let service_log = workspace.logs.join(SERVICE_LOG_FILE_NAME);
    let drain = thread::spawn(move || drain_stderr(stderr, &marker, &service_log, ready_tx));

    let outcome = match config.readiness_timeout() {
        Some(timeout) => match ready_rx.recv_timeout(timeout) {
            Ok(signal) => signal,
            Err(RecvTimeoutError::Timeout) => {
                Readiness::ReadFailed(format!("no readiness marker within {}s", timeout.as_secs()))
            }
            Err(RecvTimeoutError::Disconnected) => Readiness::Closed,
        },
        None => ready_rx.recv().unwrap_or(Readiness::Closed),
    };

    let reason = match outcome {
        Readiness::Ready => {
            log.info(
                "service.ready",
                &format!("benchmark service up (pid={})", process.id()),
            );
            return Ok(ServiceHandle {
                process,
                stdin,
                drain: Some(drain),
                path,
                shutdown_token: config.shutdown_token.clone(),
                shutdown_timeout: config.shutdown_timeout(),
            });
        }
        Readiness::Closed => "stderr closed before the readiness marker appeared".to_string(),
        Readiness::ReadFailed(reason) => reason,
    };

    let _ = process.kill();
    let _ = process.wait();
    log.error("service.boot.failed", &reason);
    Err(PipelineError::ServiceNotReady {
        path: path.display().to_string(),
        reason,
    })
}

fn drain_stderr(
    stderr: impl std::io::Read,
    marker: &str,
    service_log: &Path,
    ready_tx: mpsc::Sender<Readiness>,
) {
    if let Some(parent) = service_log.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let mut sink = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(service_log)
        .ok();

    let mut ready = false;
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                if !ready {
                    let _ = ready_tx.send(Readiness::ReadFailed(err.to_string()));
                }
                return;
            }
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\r', '\n']);
        if let Some(file) = sink.as_mut() {
            let _ = writeln!(file, "{line}");
        }
        if !ready && line.contains(marker) {
            ready = true;
            let _ = ready_tx.send(Readiness::Ready);
        }
    }
    if !ready {
        let _ = ready_tx.send(Readiness::Closed);
    }
}

impl ServiceHandle {
    pub fn id(&self) -> u32 {
        self.process.id()
    }

    /// Sends the shutdown token, closes stdin and waits for the process to exit. After a
    /// clean exit the stderr drain is joined so the service log is complete.
    /// Failures are collected, never raised.
    pub fn stop(mut self, log: &PipelineLog) -> BestEffortReport {
        let mut report = BestEffortReport::default();
        let path = self.path.display().to_string();
        log.info("service.shutdown", "shutting down benchmark service");

        match self.stdin.take() {
            Some(mut stdin) => {
                let written = writeln!(stdin, "{}", self.shutdown_token).and_then(|_| stdin.flush());
                if let Err(err) = written {
                    log.warn(
                        "service.shutdown.write_failed",
                        &format!("could not send shutdown token: {err}"),
                    );
                    report.push("service.shutdown.write", &path, err.to_string());
                }
            }
            None => report.push("service.shutdown.write", &path, "stdin pipe unavailable"),
        }

        let exited = match self.shutdown_timeout {
            Some(timeout) => match wait_for_exit(&mut self.process, SHUTDOWN_POLL, Some(timeout)) {
                ExitState::Exited { exit } => {
                    log.info(
                        "service.stopped",
                        &format!("benchmark service exited (code={:?})", exit.code),
                    );
                    true
                }
                ExitState::TimedOut => {
                    let message = format!("killed after {}s shutdown timeout", timeout.as_secs());
                    log.warn("service.shutdown.timeout", &message);
                    report.push("service.shutdown.wait", &path, message);
                    false
                }
                ExitState::Lost { reason } => {
                    log.warn("service.shutdown.lost", &reason);
                    report.push("service.shutdown.wait", &path, reason);
                    false
                }
            },
            None => match self.process.wait() {
                Ok(exit) => {
                    log.info(
                        "service.stopped",
                        &format!("benchmark service exited (code={:?})", exit.code),
                    );
                    true
                }
                Err(err) => {
                    log.warn("service.shutdown.wait_failed", &err.to_string());
                    report.push("service.shutdown.wait", &path, err.to_string());
                    false
                }
            },
        };

        // Joined only after a clean exit; a killed service's children may still hold stderr.
        if exited {
            if let Some(drain) = self.drain.take() {
                if drain.join().is_err() {
                    report.push("service.shutdown.drain", &path, "stderr drain panicked");
                }
            }
        }
        report
    }
}
