use crate::workspace::WorkspaceError;
use serde::Serialize;

/// Fatal conditions. Any of these ends the run with a non-zero outcome.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),
    #[error("could not boot benchmark service {path}: {source}")]
    ServiceSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("benchmark service {path} never reported readiness: {reason}")]
    ServiceNotReady { path: String, reason: String },
    #[error("no strategy produced a usable fitness value under {strategy_dir}")]
    NoUsableFitness { strategy_dir: String },
    #[error("failed to copy winning artifact {from} to {to}: {source}")]
    CopyArtifact {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not start grounding process {path}: {source}")]
    GroundingSpawn {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("grounding process {path} exited with {}", render_code(.exit_code))]
    GroundingFailed {
        path: String,
        exit_code: Option<i32>,
    },
    #[error("grounding process {path} timed out after {timeout_secs}s")]
    GroundingTimeout { path: String, timeout_secs: u64 },
    #[error("grounding process {path} could not be observed: {reason}")]
    GroundingLost { path: String, reason: String },
}

fn render_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "a signal".to_string(),
    }
}

/// A failure that was logged and tolerated. Shutdown and cleanup collect these
/// instead of swallowing them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestEffortFailure {
    pub action: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BestEffortReport {
    pub failures: Vec<BestEffortFailure>,
}

impl BestEffortReport {
    pub fn push(&mut self, action: &str, path: impl Into<String>, message: impl Into<String>) {
        self.failures.push(BestEffortFailure {
            action: action.to_string(),
            path: path.into(),
            message: message.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn extend(&mut self, other: BestEffortReport) {
        self.failures.extend(other.failures);
    }
}
