use super::{default_executions_path, ConfigError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default = "default_executions_path")]
    pub executions_path: PathBuf,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub grounding: GroundingConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            executions_path: default_executions_path(),
            layout: LayoutConfig::default(),
            service: ServiceConfig::default(),
            strategy: StrategyConfig::default(),
            grounding: GroundingConfig::default(),
            cleanup: CleanupConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Workspace-relative names of the areas inside an execution root.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LayoutConfig {
    pub service: PathBuf,
    pub config: PathBuf,
    pub grounding: PathBuf,
    pub params: PathBuf,
    pub strategy: PathBuf,
    pub libs: PathBuf,
    pub interview: PathBuf,
    pub interview_resources: PathBuf,
    pub source: PathBuf,
    pub logs: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            service: PathBuf::from("benchmarks"),
            config: PathBuf::from("config"),
            grounding: PathBuf::from("grounding"),
            params: PathBuf::from("params"),
            strategy: PathBuf::from("strategy"),
            libs: PathBuf::from("libs"),
            interview: PathBuf::from("interview"),
            interview_resources: PathBuf::from("interview-resources"),
            source: PathBuf::from("src"),
            logs: PathBuf::from("logs"),
        }
    }
}

impl LayoutConfig {
    fn named_paths(&self) -> [(&'static str, &Path); 10] {
        [
            ("layout.service", &self.service),
            ("layout.config", &self.config),
            ("layout.grounding", &self.grounding),
            ("layout.params", &self.params),
            ("layout.strategy", &self.strategy),
            ("layout.libs", &self.libs),
            ("layout.interview", &self.interview),
            ("layout.interview_resources", &self.interview_resources),
            ("layout.source", &self.source),
            ("layout.logs", &self.logs),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    pub executable: PathBuf,
    pub readiness_marker: String,
    pub shutdown_token: String,
    pub readiness_timeout_secs: Option<u64>,
    pub shutdown_timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("benchmarks/benchmarkservice"),
            readiness_marker: "Service up and running".to_string(),
            shutdown_token: "q".to_string(),
            readiness_timeout_secs: None,
            shutdown_timeout_secs: None,
        }
    }
}

impl ServiceConfig {
    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.readiness_timeout_secs.map(Duration::from_secs)
    }

    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct StrategyConfig {
    pub runnable: String,
    pub stdout_file: String,
    pub stderr_file: String,
    pub output_dir: String,
    pub fitness_file: String,
    pub poll_interval_ms: u64,
    pub timeout_secs: Option<u64>,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            runnable: "strategy".to_string(),
            stdout_file: "systemout.log".to_string(),
            stderr_file: "systemerr.log".to_string(),
            output_dir: "output".to_string(),
            fitness_file: "f.value".to_string(),
            poll_interval_ms: 2000,
            timeout_secs: None,
        }
    }
}

impl StrategyConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct GroundingConfig {
    pub executable: PathBuf,
    pub poll_interval_ms: u64,
    pub timeout_secs: Option<u64>,
    pub fail_on_nonzero_exit: bool,
}

impl Default for GroundingConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("groundingroutine.sh"),
            poll_interval_ms: 1000,
            timeout_secs: None,
            fail_on_nonzero_exit: true,
        }
    }
}

impl GroundingConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub placeholder_extension: String,
    pub intermediate_files: Vec<PathBuf>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            placeholder_extension: "ph".to_string(),
            intermediate_files: [
                "contTrainingInstances.serialized",
                "testInstances.serialized",
                "GroundingRoutine.jar",
                "InitConfiguration.jar",
                "initconfiguration.bat",
                "groundingroutine.bat",
                "src/contTrainingInstances.serialized",
                "src/testInstances.serialized",
                "src/compile.bat",
                "src/train.bat",
            ]
            .into_iter()
            .map(PathBuf::from)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    pub enabled: bool,
    pub file_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: "stratcomp_performance.json".to_string(),
        }
    }
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        // An empty document deserializes to unit, not to a mapping.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, path) in self.layout.named_paths() {
            validate_relative(field, path)?;
        }
        validate_relative("service.executable", &self.service.executable)?;
        validate_relative("grounding.executable", &self.grounding.executable)?;
        for path in &self.cleanup.intermediate_files {
            validate_relative("cleanup.intermediate_files", path)?;
        }

        if self.service.readiness_marker.is_empty() {
            return Err(ConfigError::Settings(
                "service.readiness_marker must be non-empty".to_string(),
            ));
        }
        if self.service.shutdown_token.is_empty() || self.service.shutdown_token.contains('\n') {
            return Err(ConfigError::Settings(
                "service.shutdown_token must be a single non-empty line".to_string(),
            ));
        }

        for (field, value) in [
            ("strategy.runnable", &self.strategy.runnable),
            ("strategy.stdout_file", &self.strategy.stdout_file),
            ("strategy.stderr_file", &self.strategy.stderr_file),
            ("strategy.output_dir", &self.strategy.output_dir),
            ("strategy.fitness_file", &self.strategy.fitness_file),
            ("report.file_name", &self.report.file_name),
        ] {
            validate_file_name(field, value)?;
        }

        if self.strategy.poll_interval_ms == 0 {
            return Err(ConfigError::Settings(
                "strategy.poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.grounding.poll_interval_ms == 0 {
            return Err(ConfigError::Settings(
                "grounding.poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        let ext = &self.cleanup.placeholder_extension;
        if ext.is_empty() || ext.starts_with('.') || ext.contains('/') {
            return Err(ConfigError::Settings(
                "cleanup.placeholder_extension must be non-empty and given without a leading dot"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_relative(field: &str, path: &Path) -> Result<(), ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::Settings(format!("{field} must be non-empty")));
    }
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ConfigError::Settings(format!(
            "{field} must be a relative path inside the workspace: {}",
            path.display()
        )));
    }
    Ok(())
}

fn validate_file_name(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() || value.contains('/') || value == "." || value == ".." {
        return Err(ConfigError::Settings(format!(
            "{field} must be a plain file name, got `{value}`"
        )));
    }
    Ok(())
}
