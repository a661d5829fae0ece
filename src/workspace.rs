use crate::config::{LayoutConfig, Settings};
use crate::shared::ids::ExecutionId;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("workspace area `{area}` is missing: {path}")]
    MissingArea { area: &'static str, path: String },
    #[error("failed to list {path}: {source}")]
    List {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// The per-execution directory tree. Every area is resolved once from the layout so
/// phases only ever see absolute paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    pub root: PathBuf,
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

/// One strategy sandbox directory inside the strategy area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategySandbox {
    pub name: String,
    pub dir: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, layout: &LayoutConfig) -> Self {
        let root: PathBuf = root.into();
        let root = if root.is_relative() {
            std::env::current_dir()
                .map(|cwd| cwd.join(&root))
                .unwrap_or(root)
        } else {
            root
        };
        Self {
            service: root.join(&layout.service),
            config: root.join(&layout.config),
            grounding: root.join(&layout.grounding),
            params: root.join(&layout.params),
            strategy: root.join(&layout.strategy),
            libs: root.join(&layout.libs),
            interview: root.join(&layout.interview),
            interview_resources: root.join(&layout.interview_resources),
            source: root.join(&layout.source),
            logs: root.join(&layout.logs),
            root,
        }
    }

    pub fn for_execution(settings: &Settings, id: &ExecutionId) -> Self {
        Self::new(settings.executions_path.join(id.as_str()), &settings.layout)
    }

    /// Areas the pipeline reads from; all of them must exist before the run starts.
    pub fn required_areas(&self) -> Vec<(&'static str, &Path)> {
        vec![
            ("service", self.service.as_path()),
            ("strategy", self.strategy.as_path()),
            ("grounding", self.grounding.as_path()),
            ("interview-resources", self.interview_resources.as_path()),
        ]
    }

    /// Intermediate areas removed once the run has been grounded.
    pub fn reclaimable_areas(&self) -> Vec<&Path> {
        vec![
            self.service.as_path(),
            self.config.as_path(),
            self.grounding.as_path(),
            self.params.as_path(),
            self.strategy.as_path(),
            self.libs.as_path(),
            self.interview.as_path(),
            self.interview_resources.as_path(),
        ]
    }

    pub fn verify(&self) -> Result<(), WorkspaceError> {
        for (area, path) in self.required_areas() {
            if !path.is_dir() {
                return Err(WorkspaceError::MissingArea {
                    area,
                    path: path.display().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Immediate subdirectories of the strategy area, sorted by name. The order is part
    /// of the winner-selection contract: later entries win ties.
    pub fn strategy_sandboxes(&self) -> Result<Vec<StrategySandbox>, WorkspaceError> {
        let mut sandboxes = Vec::new();
        for path in list_dir(&self.strategy)? {
            if !path.is_dir() {
                continue;
            }
            let Some(name) = path.file_name().and_then(|v| v.to_str()) else {
                continue;
            };
            sandboxes.push(StrategySandbox {
                name: name.to_string(),
                dir: path.clone(),
            });
        }
        sandboxes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sandboxes)
    }

    /// Absolute paths of the regular files in the interview-resources area, sorted by name.
    pub fn interview_resources(&self) -> Result<Vec<PathBuf>, WorkspaceError> {
        let mut resources: Vec<PathBuf> = list_dir(&self.interview_resources)?
            .into_iter()
            .filter(|path| path.is_file())
            .map(|path| fs::canonicalize(&path).unwrap_or(path))
            .collect();
        resources.sort();
        Ok(resources)
    }
}

pub(crate) fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, WorkspaceError> {
    let entries = fs::read_dir(dir).map_err(|source| WorkspaceError::List {
        path: dir.display().to_string(),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| WorkspaceError::List {
            path: dir.display().to_string(),
            source,
        })?;
        paths.push(entry.path());
    }
    Ok(paths)
}
