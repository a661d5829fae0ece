use super::error::PipelineError;
use crate::config::StrategyConfig;
use crate::process::{wait_for_all, ChildProcess, ExitState, ProcessHandle};
use crate::shared::logging::PipelineLog;
use crate::workspace::{StrategySandbox, Workspace};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// One strategy sandbox together with the files the pipeline reads and writes for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyTask {
    pub name: String,
    pub sandbox: PathBuf,
    pub entry_point: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
    pub output_dir: PathBuf,
    pub fitness_file: PathBuf,
}

impl StrategyTask {
    pub fn new(sandbox: &StrategySandbox, config: &StrategyConfig) -> Self {
        let output_dir = sandbox.dir.join(&config.output_dir);
        Self {
            name: sandbox.name.clone(),
            sandbox: sandbox.dir.clone(),
            entry_point: sandbox.dir.join(&config.runnable),
            stdout_log: sandbox.dir.join(&config.stdout_file),
            stderr_log: sandbox.dir.join(&config.stderr_file),
            fitness_file: output_dir.join(&config.fitness_file),
            output_dir,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StrategyOutcome {
    SpawnFailed { reason: String },
    Finished { state: ExitState },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyRun {
    pub name: String,
    #[serde(flatten)]
    pub outcome: StrategyOutcome,
}

/// Result of the strategy phase: the tasks in enumeration order and what happened to each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyPhase {
    pub tasks: Vec<StrategyTask>,
    pub runs: Vec<StrategyRun>,
}

pub fn discover_tasks(
    workspace: &Workspace,
    config: &StrategyConfig,
) -> Result<Vec<StrategyTask>, PipelineError> {
    Ok(workspace
        .strategy_sandboxes()?
        .iter()
        .map(|sandbox| StrategyTask::new(sandbox, config))
        .collect())
}

/// Argument vector for one strategy: its entry point followed by every interview resource.
pub fn strategy_argv(task: &StrategyTask, resources: &[PathBuf]) -> Vec<PathBuf> {
    let mut argv = Vec::with_capacity(resources.len() + 1);
    argv.push(task.entry_point.clone());
    argv.extend(resources.iter().cloned());
    argv
}

/// Fans out one process per strategy sandbox and blocks until all of them have finished.
///
/// A strategy that cannot be spawned is logged and left out of the live set; the others
/// still run. Output and error streams go to per-sandbox log files opened in append mode.
pub fn run_strategies(
    workspace: &Workspace,
    config: &StrategyConfig,
    log: &PipelineLog,
) -> Result<StrategyPhase, PipelineError> {
    let tasks = discover_tasks(workspace, config)?;
    let resources = workspace.interview_resources()?;
    if tasks.is_empty() {
        log.warn(
            "strategies.none",
            &format!("no strategy sandboxes under {}", workspace.strategy.display()),
        );
        return Ok(StrategyPhase {
            tasks,
            runs: Vec::new(),
        });
    }

    let mut outcomes: Vec<Option<StrategyOutcome>> = vec![None; tasks.len()];
    let mut live: Vec<(usize, ChildProcess)> = Vec::new();
    for (slot, task) in tasks.iter().enumerate() {
        match spawn_strategy(task, &resources) {
            Ok(process) => {
                log.info(
                    "strategy.started",
                    &format!("started strategy {} (pid={})", task.name, process.id()),
                );
                live.push((slot, process));
            }
            Err(err) => {
                log.warn(
                    "strategy.spawn_failed",
                    &format!("could not create process for strategy {}: {err}", task.name),
                );
                outcomes[slot] = Some(StrategyOutcome::SpawnFailed {
                    reason: err.to_string(),
                });
            }
        }
    }

    log.info(
        "strategies.waiting",
        &format!("waiting for {} strategies to terminate", live.len()),
    );
    let (slots, mut handles): (Vec<usize>, Vec<ChildProcess>) = live.into_iter().unzip();
    let states = wait_for_all(&mut handles, config.poll_interval(), config.timeout());

    for (slot, state) in slots.into_iter().zip(states) {
        let name = &tasks[slot].name;
        match &state {
            ExitState::Exited { exit } => log.info(
                "strategy.finished",
                &format!("strategy {name} exited (code={:?})", exit.code),
            ),
            ExitState::TimedOut => log.warn(
                "strategy.timed_out",
                &format!("strategy {name} killed at the phase deadline"),
            ),
            ExitState::Lost { reason } => log.warn(
                "strategy.lost",
                &format!("strategy {name} could not be observed: {reason}"),
            ),
        }
        outcomes[slot] = Some(StrategyOutcome::Finished { state });
    }
    log.info("strategies.finished", "all strategies terminated");

    let runs = tasks
        .iter()
        .zip(outcomes)
        .filter_map(|(task, outcome)| {
            outcome.map(|outcome| StrategyRun {
                name: task.name.clone(),
                outcome,
            })
        })
        .collect();
    Ok(StrategyPhase { tasks, runs })
}

fn spawn_strategy(task: &StrategyTask, resources: &[PathBuf]) -> std::io::Result<ChildProcess> {
    let stdout = open_append(&task.stdout_log)?;
    let stderr = open_append(&task.stderr_log)?;
    let argv = strategy_argv(task, resources);

    let mut command = Command::new(&argv[0]);
    command
        .args(&argv[1..])
        .current_dir(&task.sandbox)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    ChildProcess::spawn(&mut command)
}

fn open_append(path: &Path) -> std::io::Result<File> {
    fs::OpenOptions::new().create(true).append(true).open(path)
}
