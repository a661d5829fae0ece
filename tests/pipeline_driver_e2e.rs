use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use stratcomp::config::Settings;
use stratcomp::pipeline::{Pipeline, PipelineError, RunStatus};
use stratcomp::shared::ids::ExecutionId;
use stratcomp::workspace::Workspace;
use tempfile::tempdir;

const SERVICE: &str = "#!/bin/sh\necho 'Service up and running' >&2\nread token\necho \"$token\" >> service-shutdowns.txt\n";
const GROUNDING: &str = "#!/bin/sh\necho run >> grounding-runs.txt\nfor f in grounding/*.ph; do cp \"$f\" src/\"$(basename \"$f\" .ph).java\"; done\n";

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, body).expect("write script");
    let mut perms = fs::metadata(path).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("chmod");
}

fn strategy_body(fitness: &str, artifact: &str) -> String {
    format!(
        "#!/bin/sh\nmkdir -p output\nprintf '{fitness}' > output/f.value\nprintf '{artifact}' > output/Solver.ph\n"
    )
}

fn settings(executions: &Path) -> Settings {
    let mut settings = Settings {
        executions_path: executions.to_path_buf(),
        ..Settings::default()
    };
    settings.strategy.poll_interval_ms = 10;
    settings.grounding.poll_interval_ms = 10;
    settings
}

/// Builds a provisioned workspace with the given strategies (name, fitness, artifact).
fn provision(settings: &Settings, id: &ExecutionId, strategies: &[(&str, &str, &str)]) -> Workspace {
    let ws = Workspace::for_execution(settings, id);
    for area in ws.reclaimable_areas() {
        fs::create_dir_all(area).expect("create area");
    }
    fs::create_dir_all(&ws.source).expect("source area");
    fs::write(ws.source.join("Solver.ph"), "template slot").expect("placeholder");
    fs::write(ws.interview_resources.join("answers.json"), "{}").expect("resource");
    write_script(&ws.root.join(&settings.service.executable), SERVICE);
    write_script(&ws.root.join(&settings.grounding.executable), GROUNDING);
    for (name, fitness, artifact) in strategies {
        write_script(
            &ws.strategy.join(name).join(&settings.strategy.runnable),
            &strategy_body(fitness, artifact),
        );
    }
    ws
}

#[test]
fn full_run_grounds_the_winner_and_cleans_up() {
    let dir = tempdir().expect("tempdir");
    let settings = settings(dir.path());
    let id = ExecutionId::parse("iris-42").expect("id");
    let ws = provision(
        &settings,
        &id,
        &[
            ("A", "3.0", "a"),
            ("B", "5.0", "b"),
            ("C", "5.0", "c"),
            ("D", "2.0", "d"),
        ],
    );

    fs::write(ws.root.join("Skeleton.ph"), "placeholder").expect("root placeholder");

    let summary = Pipeline::new(settings.clone(), id).quiet().run().expect("run succeeds");

    assert_eq!(summary.winner, "C");
    assert_eq!(summary.fitness, 5.0);
    assert_eq!(
        fs::read_to_string(ws.source.join("Solver.java")).expect("grounded output"),
        "c"
    );
    assert!(!ws.source.join("Solver.ph").exists());
    assert!(!ws.root.join("Skeleton.ph").exists());
    for area in ws.reclaimable_areas() {
        assert!(!area.exists(), "area survived: {}", area.display());
    }
    let shutdowns = fs::read_to_string(ws.root.join("service-shutdowns.txt")).expect("token");
    assert_eq!(shutdowns, "q\n");

    assert_eq!(summary.report.status, RunStatus::Succeeded);
    assert_eq!(
        summary.report.phase_names(),
        vec![
            "service_boot",
            "strategies",
            "service_shutdown",
            "selection",
            "grounding",
            "cleanup",
            "total"
        ]
    );
    let report_path = summary.report_path.expect("report written");
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).expect("read report"))
            .expect("report json");
    assert_eq!(report["status"], "succeeded");
    assert_eq!(report["selection"]["winner"], "C");
    assert_eq!(report["artifacts"]["artifacts"].as_array().map(Vec::len), Some(2));
    assert_eq!(report["execution_id"], "iris-42");
    assert_eq!(report["prototype"], "iris");
}

#[test]
fn run_without_usable_fitness_fails_before_grounding() {
    let dir = tempdir().expect("tempdir");
    let settings = settings(dir.path());
    let id = ExecutionId::parse("iris-7").expect("id");
    let ws = provision(&settings, &id, &[("A", "oops", "a"), ("B", "", "b")]);

    let err = Pipeline::new(settings, id).quiet().run().expect_err("fatal");

    assert!(matches!(err, PipelineError::NoUsableFitness { .. }));
    assert!(!ws.root.join("grounding-runs.txt").exists());
    // Service was still shut down exactly once, and nothing was reclaimed.
    let shutdowns = fs::read_to_string(ws.root.join("service-shutdowns.txt")).expect("token");
    assert_eq!(shutdowns.lines().count(), 1);
    assert!(ws.strategy.is_dir());
    assert!(ws.source.join("Solver.ph").is_file());

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(ws.root.join(&Settings::default().report.file_name))
            .expect("report written on failure"),
    )
    .expect("report json");
    assert_eq!(report["status"], "failed");
    assert!(report["error"]
        .as_str()
        .expect("error text")
        .contains("usable fitness"));
}

#[test]
fn service_boot_failure_prevents_strategy_launch() {
    let dir = tempdir().expect("tempdir");
    let settings = settings(dir.path());
    let id = ExecutionId::parse("iris-9").expect("id");
    let ws = provision(&settings, &id, &[("A", "1.0", "a")]);
    write_script(
        &ws.root.join(&settings.service.executable),
        "#!/bin/sh\necho 'fatal: no license' >&2\nexit 1\n",
    );

    let err = Pipeline::new(settings, id).quiet().run().expect_err("fatal");

    assert!(matches!(err, PipelineError::ServiceNotReady { .. }));
    assert!(!ws.strategy.join("A/output").exists());
}

#[test]
fn disabled_cleanup_keeps_intermediate_areas() {
    let dir = tempdir().expect("tempdir");
    let mut settings = settings(dir.path());
    settings.cleanup.enabled = false;
    let id = ExecutionId::parse("iris-11").expect("id");
    let ws = provision(&settings, &id, &[("solo", "1.5", "s")]);

    let summary = Pipeline::new(settings, id).quiet().run().expect("run succeeds");

    assert_eq!(summary.winner, "solo");
    assert!(ws.strategy.join("solo/output/Solver.ph").is_file());
    assert!(ws.grounding.join("Solver.ph").is_file());
    assert!(ws.source.join("Solver.ph").is_file());
    assert!(!summary.report.phase_names().contains(&"cleanup"));
}

#[test]
fn incomplete_workspace_is_rejected_before_any_process_starts() {
    let dir = tempdir().expect("tempdir");
    let settings = settings(dir.path());
    let id = ExecutionId::parse("ghost").expect("id");

    let err = Pipeline::new(settings, id).quiet().run().expect_err("fatal");
    assert!(matches!(err, PipelineError::Workspace(_)));
}
