use crate::app::command_support::{parse_command_options, resolve_settings};
use crate::pipeline::discover_tasks;
use crate::workspace::Workspace;

/// Verifies an execution workspace without launching anything.
pub fn cmd_check(args: &[String]) -> Result<String, String> {
    let options = parse_command_options(
        "check <execution_id> [--config <path>] [--executions-path <path>]",
        args,
        false,
    )?;
    let settings = resolve_settings(&options)?;
    let workspace = Workspace::for_execution(&settings, &options.execution_id);
    workspace.verify().map_err(|e| e.to_string())?;

    let tasks = discover_tasks(&workspace, &settings.strategy).map_err(|e| e.to_string())?;
    let resources = workspace.interview_resources().map_err(|e| e.to_string())?;
    let service = workspace.root.join(&settings.service.executable);
    let grounding = workspace.root.join(&settings.grounding.executable);

    let mut lines = vec![
        "workspace=ok".to_string(),
        format!("root={}", workspace.root.display()),
        format!("prototype={}", options.execution_id.prototype_name()),
        format!("service_executable={}", presence(service.is_file())),
        format!("grounding_executable={}", presence(grounding.is_file())),
        format!("strategies={}", tasks.len()),
    ];
    for task in &tasks {
        lines.push(format!(
            "strategy.{}={}",
            task.name,
            presence(task.entry_point.is_file())
        ));
    }
    lines.push(format!("interview_resources={}", resources.len()));
    Ok(lines.join("\n"))
}

fn presence(found: bool) -> &'static str {
    if found {
        "present"
    } else {
        "missing"
    }
}
