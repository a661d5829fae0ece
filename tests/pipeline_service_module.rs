use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use stratcomp::config::{LayoutConfig, ServiceConfig};
use stratcomp::pipeline::{start_service, PipelineError, SERVICE_LOG_FILE_NAME};
use stratcomp::shared::logging::PipelineLog;
use stratcomp::workspace::Workspace;
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn workspace(root: &Path) -> Workspace {
    Workspace::new(root, &LayoutConfig::default())
}

#[test]
fn service_blocks_until_ready_and_receives_shutdown_token() {
    let dir = tempdir().expect("tempdir");
    let ws = workspace(dir.path());
    let config = ServiceConfig::default();
    write_script(
        &ws.root.join(&config.executable),
        "#!/bin/sh\necho 'loading models' >&2\necho 'Service up and running on 8080' >&2\nread token\necho \"$token\" > service-token.txt\necho 'bye' >&2\n",
    );
    let log = PipelineLog::new(&ws.logs).quiet();

    let service = start_service(&ws, &config, &log).expect("service starts");
    assert!(service.id() > 0);
    let report = service.stop(&log);

    assert!(report.is_clean(), "unexpected failures: {report:?}");
    let token = fs::read_to_string(ws.root.join("service-token.txt")).expect("token written");
    assert_eq!(token.trim(), "q");

    let service_log =
        fs::read_to_string(ws.logs.join(SERVICE_LOG_FILE_NAME)).expect("service log");
    assert!(service_log.contains("loading models"));
    assert!(service_log.contains("Service up and running"));
}

#[test]
fn service_exiting_before_readiness_is_fatal() {
    let dir = tempdir().expect("tempdir");
    let ws = workspace(dir.path());
    let config = ServiceConfig::default();
    write_script(
        &ws.root.join(&config.executable),
        "#!/bin/sh\necho 'port already in use' >&2\nexit 3\n",
    );
    let log = PipelineLog::new(&ws.logs).quiet();

    match start_service(&ws, &config, &log) {
        Err(PipelineError::ServiceNotReady { reason, .. }) => {
            assert!(reason.contains("readiness marker"), "reason: {reason}")
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn missing_service_executable_is_fatal() {
    let dir = tempdir().expect("tempdir");
    let ws = workspace(dir.path());
    let log = PipelineLog::new(&ws.logs).quiet();

    let err = start_service(&ws, &ServiceConfig::default(), &log).expect_err("spawn fails");
    assert!(matches!(err, PipelineError::ServiceSpawn { .. }));
    assert!(err.to_string().contains("benchmarkservice"));
}

#[test]
fn readiness_timeout_kills_a_silent_service() {
    let dir = tempdir().expect("tempdir");
    let ws = workspace(dir.path());
    let config = ServiceConfig {
        readiness_timeout_secs: Some(1),
        ..ServiceConfig::default()
    };
    write_script(&ws.root.join(&config.executable), "#!/bin/sh\nexec sleep 30\n");
    let log = PipelineLog::new(&ws.logs).quiet();

    let started = std::time::Instant::now();
    let err = start_service(&ws, &config, &log).expect_err("must time out");
    assert!(matches!(err, PipelineError::ServiceNotReady { .. }));
    assert!(started.elapsed() < std::time::Duration::from_secs(10));
}

#[test]
fn shutdown_timeout_is_reported_not_raised() {
    let dir = tempdir().expect("tempdir");
    let ws = workspace(dir.path());
    let config = ServiceConfig {
        shutdown_timeout_secs: Some(1),
        ..ServiceConfig::default()
    };
    // Ignores the shutdown token entirely.
    write_script(
        &ws.root.join(&config.executable),
        "#!/bin/sh\necho 'Service up and running' >&2\nexec sleep 30\n",
    );
    let log = PipelineLog::new(&ws.logs).quiet();

    let service = start_service(&ws, &config, &log).expect("service starts");
    let report = service.stop(&log);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].action, "service.shutdown.wait");
    assert!(report.failures[0].message.contains("timeout"));
}

#[test]
fn stderr_written_during_shutdown_reaches_the_service_log() {
    let dir = tempdir().expect("tempdir");
    let ws = workspace(dir.path());
    let config = ServiceConfig::default();
    write_script(
        &ws.root.join(&config.executable),
        "#!/bin/sh\necho 'Service up and running' >&2\nread token\nsleep 1\necho 'flushed 12 benchmark results' >&2\necho 'service stopped' >&2\n",
    );
    let log = PipelineLog::new(&ws.logs).quiet();

    let service = start_service(&ws, &config, &log).expect("service starts");
    let report = service.stop(&log);

    assert!(report.is_clean(), "unexpected failures: {report:?}");
    let service_log =
        fs::read_to_string(ws.logs.join(SERVICE_LOG_FILE_NAME)).expect("service log");
    assert!(service_log.contains("flushed 12 benchmark results"));
    assert!(service_log.ends_with("service stopped\n"));
}
