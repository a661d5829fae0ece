use crate::app::command_support::{parse_command_options, resolve_settings};
use crate::pipeline::Pipeline;

pub fn cmd_run(args: &[String]) -> Result<String, String> {
    let options = parse_command_options(
        "run <execution_id> [--config <path>] [--executions-path <path>] [--no-cleanup]",
        args,
        true,
    )?;
    let settings = resolve_settings(&options)?;
    let pipeline = Pipeline::new(settings, options.execution_id.clone());
    let summary = pipeline.run().map_err(|e| e.to_string())?;

    let mut lines = vec![
        "status=ok".to_string(),
        format!("execution_id={}", options.execution_id),
        format!("winner={}", summary.winner),
        format!("fitness={}", summary.fitness),
    ];
    if let Some(path) = &summary.report_path {
        lines.push(format!("report={}", path.display()));
    }
    if !summary.report.best_effort.is_clean() {
        lines.push(format!(
            "best_effort_failures={}",
            summary.report.best_effort.failures.len()
        ));
    }
    Ok(lines.join("\n"))
}
