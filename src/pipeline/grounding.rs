use super::error::PipelineError;
use crate::config::GroundingConfig;
use crate::process::{wait_for_exit, ChildProcess, ExitState, ProcessExit};
use crate::shared::fs_atomic::atomic_copy_file;
use crate::shared::logging::PipelineLog;
use crate::workspace::{list_dir, Workspace};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedArtifact {
    pub file_name: String,
    pub bytes: u64,
    pub sha256: String,
}

/// Files copied from the winner's output directory into the grounding area.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WinningArtifactSet {
    pub source_dir: PathBuf,
    pub artifacts: Vec<StagedArtifact>,
}

/// Copies every regular file of `output_dir` into `grounding_dir`, overwriting by name.
/// Directories and other entries are ignored; the originals stay in place.
pub fn stage_artifacts(
    output_dir: &Path,
    grounding_dir: &Path,
    log: &PipelineLog,
) -> Result<WinningArtifactSet, PipelineError> {
    log.info(
        "grounding.stage",
        &format!(
            "copying winning artifacts from {} to {}",
            output_dir.display(),
            grounding_dir.display()
        ),
    );
    let mut files: Vec<PathBuf> = list_dir(output_dir)?
        .into_iter()
        .filter(|path| path.is_file())
        .collect();
    files.sort();

    let mut staged = Vec::with_capacity(files.len());
    for from in files {
        let Some(file_name) = from.file_name() else {
            continue;
        };
        let to = grounding_dir.join(file_name);
        let bytes = atomic_copy_file(&from, &to).map_err(|source| PipelineError::CopyArtifact {
            from: from.display().to_string(),
            to: to.display().to_string(),
            source,
        })?;
        let sha256 = file_digest(&to).map_err(|source| PipelineError::CopyArtifact {
            from: from.display().to_string(),
            to: to.display().to_string(),
            source,
        })?;
        staged.push(StagedArtifact {
            file_name: file_name.to_string_lossy().into_owned(),
            bytes,
            sha256,
        });
    }
    log.info(
        "grounding.staged",
        &format!("{} artifacts staged for grounding", staged.len()),
    );
    Ok(WinningArtifactSet {
        source_dir: output_dir.to_path_buf(),
        artifacts: staged,
    })
}

pub fn file_digest(path: &Path) -> std::io::Result<String> {
    let content = std::fs::read(path)?;
    let digest = Sha256::digest(&content);
    Ok(digest.iter().map(|byte| format!("{byte:02x}")).collect())
}

/// Runs the grounding executable with no arguments and waits for it to exit.
///
/// A non-zero exit is fatal unless `fail_on_nonzero_exit` is switched off, in which case
/// it is only logged.
pub fn run_grounding(
    workspace: &Workspace,
    config: &GroundingConfig,
    log: &PipelineLog,
) -> Result<ProcessExit, PipelineError> {
    let path = workspace.root.join(&config.executable);
    log.info(
        "grounding.start",
        &format!("executing grounding process {}", path.display()),
    );

    let mut command = Command::new(&path);
    command
        .current_dir(&workspace.root)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    let mut process =
        ChildProcess::spawn(&mut command).map_err(|source| PipelineError::GroundingSpawn {
            path: path.display().to_string(),
            source,
        })?;

    let exit = match wait_for_exit(&mut process, config.poll_interval(), config.timeout()) {
        ExitState::Exited { exit } => exit,
        ExitState::TimedOut => {
            log.error("grounding.timed_out", "grounding process killed at deadline");
            return Err(PipelineError::GroundingTimeout {
                path: path.display().to_string(),
                timeout_secs: config.timeout_secs.unwrap_or_default(),
            });
        }
        ExitState::Lost { reason } => {
            log.error("grounding.lost", &reason);
            return Err(PipelineError::GroundingLost {
                path: path.display().to_string(),
                reason,
            });
        }
    };

    if !exit.success() {
        if config.fail_on_nonzero_exit {
            log.error(
                "grounding.failed",
                &format!("grounding exited with code {:?}", exit.code),
            );
            return Err(PipelineError::GroundingFailed {
                path: path.display().to_string(),
                exit_code: exit.code,
            });
        }
        log.warn(
            "grounding.nonzero_exit",
            &format!("grounding exited with code {:?}; continuing", exit.code),
        );
    } else {
        log.info("grounding.finished", "grounding process finished");
    }
    Ok(exit)
}
