#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Run,
    Check,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "run" => CliVerb::Run,
        "check" => CliVerb::Check,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Usage: stratcomp <command> [options]".to_string(),
        String::new(),
        "Commands:".to_string(),
        "  run <execution_id>                   Run strategies, select a winner, ground and clean up"
            .to_string(),
        "  check <execution_id>                 Verify the workspace and list what a run would use"
            .to_string(),
        "  help                                 Show this message".to_string(),
        String::new(),
        "Options:".to_string(),
        "  --config <path>                      Settings file (default ~/.stratcomp/config.yaml)"
            .to_string(),
        "  --executions-path <path>             Directory holding execution workspaces".to_string(),
        "  --no-cleanup                         Keep intermediate areas after a run (run only)"
            .to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
