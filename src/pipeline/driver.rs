use super::error::PipelineError;
use super::grounding::{run_grounding, stage_artifacts};
use super::reclaim::reclaim_workspace;
use super::report::RunReport;
use super::selector::select_winner;
use super::service::start_service;
use super::strategies::run_strategies;
use crate::config::Settings;
use crate::shared::ids::ExecutionId;
use crate::shared::logging::PipelineLog;
use crate::workspace::Workspace;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub winner: String,
    pub fitness: f64,
    pub report: RunReport,
    pub report_path: Option<PathBuf>,
}

/// Drives one execution through its phases in strict sequence:
/// service boot, strategies, service shutdown, selection, grounding, cleanup.
#[derive(Debug, Clone)]
pub struct Pipeline {
    settings: Settings,
    execution_id: ExecutionId,
    workspace: Workspace,
    log: PipelineLog,
}

impl Pipeline {
    pub fn new(settings: Settings, execution_id: ExecutionId) -> Self {
        let workspace = Workspace::for_execution(&settings, &execution_id);
        let log = PipelineLog::new(&workspace.logs);
        Self {
            settings,
            execution_id,
            workspace,
            log,
        }
    }

    /// Silences console output; the JSON log file is still written.
    pub fn quiet(mut self) -> Self {
        self.log = self.log.quiet();
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn report_path(&self) -> PathBuf {
        self.workspace.root.join(&self.settings.report.file_name)
    }

    pub fn run(&self) -> Result<RunSummary, PipelineError> {
        let started = Instant::now();
        let mut report = RunReport::new(&self.execution_id);
        self.log.info(
            "pipeline.start",
            &format!(
                "composing execution {} (prototype {})",
                self.execution_id,
                self.execution_id.prototype_name()
            ),
        );

        let outcome = self.run_phases(&mut report);
        report.phases.push(super::report::PhaseTiming {
            phase: "total".to_string(),
            millis: started.elapsed().as_millis(),
        });
        report.finish(outcome.as_ref().err().map(ToString::to_string));

        match &outcome {
            Ok(_) => self
                .log
                .info("pipeline.finished", "execution of the composition pipeline successful"),
            Err(err) => self.log.error("pipeline.failed", &err.to_string()),
        }

        let report_path = self.persist_report(&report);
        let (winner, fitness) = outcome?;
        Ok(RunSummary {
            winner,
            fitness,
            report,
            report_path,
        })
    }

    fn run_phases(&self, report: &mut RunReport) -> Result<(String, f64), PipelineError> {
        let settings = &self.settings;
        let log = &self.log;
        let workspace = &self.workspace;

        workspace.verify()?;

        let service = report.timed("service_boot", || {
            start_service(workspace, &settings.service, log)
        })?;

        let phase = report.timed("strategies", || {
            run_strategies(workspace, &settings.strategy, log)
        });

        // Shutdown happens exactly once, after the fan-in, even if the strategy phase failed.
        let shutdown = report.timed("service_shutdown", || service.stop(log));
        report.best_effort.extend(shutdown);

        let phase = phase?;
        report.strategies = phase.runs;

        let selection = report.timed("selection", || {
            select_winner(&phase.tasks, &workspace.strategy, log)
        })?;
        let winner = selection.winner.clone();
        let fitness = selection.fitness;
        let output_dir = selection.output_dir.clone();
        report.selection = Some(selection);

        let (artifacts, exit) = report.timed("grounding", || {
            let artifacts = stage_artifacts(&output_dir, &workspace.grounding, log)?;
            let exit = run_grounding(workspace, &settings.grounding, log)?;
            Ok::<_, PipelineError>((artifacts, exit))
        })?;
        report.artifacts = Some(artifacts);
        report.grounding_exit = Some(exit);

        if settings.cleanup.enabled {
            let cleanup = report.timed("cleanup", || {
                reclaim_workspace(workspace, &settings.cleanup, log)
            });
            report.best_effort.extend(cleanup);
        } else {
            log.info("cleanup.skipped", "cleanup disabled by configuration");
        }

        Ok((winner, fitness))
    }

    fn persist_report(&self, report: &RunReport) -> Option<PathBuf> {
        if !self.settings.report.enabled {
            return None;
        }
        let path = self.report_path();
        match report.write(&path) {
            Ok(()) => Some(path),
            Err(err) => {
                self.log.warn(
                    "report.write_failed",
                    &format!("could not write run report {}: {err}", path.display()),
                );
                None
            }
        }
    }
}
