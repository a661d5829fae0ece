use crate::config::{load_settings, Settings};
use crate::shared::ids::ExecutionId;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptions {
    pub execution_id: ExecutionId,
    pub config: Option<PathBuf>,
    pub executions_path: Option<PathBuf>,
    pub no_cleanup: bool,
}

pub fn parse_command_options(
    usage: &str,
    args: &[String],
    allow_no_cleanup: bool,
) -> Result<CommandOptions, String> {
    let Some(raw_id) = args.first().filter(|arg| !arg.starts_with("--")) else {
        return Err(format!("usage: {usage}"));
    };
    let execution_id = ExecutionId::parse(raw_id)?;

    let mut config = None;
    let mut executions_path = None;
    let mut no_cleanup = false;
    let mut i = 1usize;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --config".to_string());
                }
                config = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--executions-path" => {
                if i + 1 >= args.len() {
                    return Err("missing value for --executions-path".to_string());
                }
                executions_path = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            "--no-cleanup" if allow_no_cleanup => {
                no_cleanup = true;
                i += 1;
            }
            other => return Err(format!("unknown option `{other}`")),
        }
    }

    Ok(CommandOptions {
        execution_id,
        config,
        executions_path,
        no_cleanup,
    })
}

/// Loads settings and applies command-line overrides on top.
pub fn resolve_settings(options: &CommandOptions) -> Result<Settings, String> {
    let mut settings = load_settings(options.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(path) = &options.executions_path {
        settings.executions_path = path.clone();
    }
    if options.no_cleanup {
        settings.cleanup.enabled = false;
    }
    Ok(settings)
}
