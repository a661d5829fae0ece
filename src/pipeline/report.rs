use super::error::BestEffortReport;
use super::grounding::WinningArtifactSet;
use super::selector::Selection;
use super::strategies::StrategyRun;
use crate::process::ProcessExit;
use crate::shared::ids::ExecutionId;
use crate::shared::fs_atomic::atomic_write_file;
use crate::shared::time::now_rfc3339;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseTiming {
    pub phase: String,
    pub millis: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

/// Everything observed during one run, persisted next to the grounded output.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub execution_id: ExecutionId,
    pub prototype: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub phases: Vec<PhaseTiming>,
    pub strategies: Vec<StrategyRun>,
    pub selection: Option<Selection>,
    pub artifacts: Option<WinningArtifactSet>,
    pub grounding_exit: Option<ProcessExit>,
    pub best_effort: BestEffortReport,
}

impl RunReport {
    pub fn new(execution_id: &ExecutionId) -> Self {
        Self {
            execution_id: execution_id.clone(),
            prototype: execution_id.prototype_name().to_string(),
            started_at: now_rfc3339(),
            finished_at: None,
            status: RunStatus::Running,
            error: None,
            phases: Vec::new(),
            strategies: Vec::new(),
            selection: None,
            artifacts: None,
            grounding_exit: None,
            best_effort: BestEffortReport::default(),
        }
    }

    /// Runs `phase`, recording its wall-clock duration whether or not it succeeds.
    pub fn timed<T>(&mut self, phase: &str, run: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = run();
        self.phases.push(PhaseTiming {
            phase: phase.to_string(),
            millis: start.elapsed().as_millis(),
        });
        out
    }

    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(|p| p.phase.as_str()).collect()
    }

    pub fn finish(&mut self, error: Option<String>) {
        self.finished_at = Some(now_rfc3339());
        self.status = if error.is_some() {
            RunStatus::Failed
        } else {
            RunStatus::Succeeded
        };
        self.error = error;
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let encoded = serde_json::to_vec_pretty(self).map_err(std::io::Error::other)?;
        atomic_write_file(path, &encoded)
    }
}
