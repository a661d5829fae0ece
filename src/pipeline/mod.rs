pub mod driver;
pub mod error;
pub mod grounding;
pub mod reclaim;
pub mod report;
pub mod selector;
pub mod service;
pub mod strategies;

pub use driver::{Pipeline, RunSummary};
pub use error::{BestEffortFailure, BestEffortReport, PipelineError};
pub use grounding::{file_digest, run_grounding, stage_artifacts, StagedArtifact, WinningArtifactSet};
pub use reclaim::{reclaim_workspace, sweep_placeholders};
pub use report::{PhaseTiming, RunReport, RunStatus};
pub use selector::{
    parse_fitness, pick_winner, read_fitness, select_winner, Candidate, FitnessReading, Selection,
};
pub use service::{start_service, ServiceHandle, SERVICE_LOG_FILE_NAME};
pub use strategies::{
    discover_tasks, run_strategies, strategy_argv, StrategyOutcome, StrategyPhase, StrategyRun,
    StrategyTask,
};
