//! Minimal handle over an opaque external process.
//!
//! The pipeline only ever needs to spawn, poll liveness, kill and reap. Keeping that
//! behind [`ProcessHandle`] lets the fan-in logic run against scripted handles in tests.

pub mod child;
pub mod wait;

pub use child::ChildProcess;
pub use wait::{wait_for_all, wait_for_exit, ExitState};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessExit {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

pub trait ProcessHandle {
    fn id(&self) -> u32;

    /// Non-blocking liveness check; `Some` once the process has exited.
    fn try_exit(&mut self) -> std::io::Result<Option<ProcessExit>>;

    fn kill(&mut self) -> std::io::Result<()>;

    fn wait(&mut self) -> std::io::Result<ProcessExit>;
}
