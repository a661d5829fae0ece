use super::error::BestEffortReport;
use crate::config::CleanupConfig;
use crate::shared::logging::PipelineLog;
use crate::workspace::{list_dir, Workspace};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

/// Deletes intermediate areas and well-known leftover files, then placeholder files directly
/// under the execution root and the source area.
/// Every step runs regardless of earlier failures; failures are collected, not raised.
pub fn reclaim_workspace(
    workspace: &Workspace,
    config: &CleanupConfig,
    log: &PipelineLog,
) -> BestEffortReport {
    let mut report = BestEffortReport::default();
    log.info("cleanup.start", "cleaning up execution directory");

    for area in workspace.reclaimable_areas() {
        if !area.exists() {
            continue;
        }
        if let Err(err) = fs::remove_dir_all(area) {
            log.warn(
                "cleanup.area_failed",
                &format!("could not delete {}: {err}", area.display()),
            );
            report.push("cleanup.remove_area", area.display().to_string(), err.to_string());
        }
    }

    for relative in &config.intermediate_files {
        remove_file_if_present(&workspace.root.join(relative), log, &mut report);
    }

    for dir in [&workspace.root, &workspace.source] {
        report.extend(sweep_placeholders(dir, &config.placeholder_extension, log));
    }

    if report.is_clean() {
        log.info("cleanup.finished", "execution directory cleaned");
    } else {
        log.warn(
            "cleanup.finished_with_failures",
            &format!("{} cleanup steps failed", report.failures.len()),
        );
    }
    report
}

/// Removes every regular file directly under `dir` whose extension is `extension`.
pub fn sweep_placeholders(dir: &Path, extension: &str, log: &PipelineLog) -> BestEffortReport {
    let mut report = BestEffortReport::default();
    if !dir.is_dir() {
        return report;
    }
    let entries = match list_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            log.warn("cleanup.placeholders_unlisted", &err.to_string());
            report.push("cleanup.list_placeholders", dir.display().to_string(), err.to_string());
            return report;
        }
    };
    for path in entries {
        let is_placeholder = path.is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(extension);
        if is_placeholder {
            remove_file_if_present(&path, log, &mut report);
        }
    }
    report
}

fn remove_file_if_present(path: &Path, log: &PipelineLog, report: &mut BestEffortReport) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => {
            log.warn(
                "cleanup.file_failed",
                &format!("could not delete file {}: {err}", path.display()),
            );
            report.push("cleanup.remove_file", path.display().to_string(), err.to_string());
        }
    }
}
