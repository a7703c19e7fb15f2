mod common;

use std::fs;

use common::{script_runs, Fixture, BUILD_AND_TEST, GAME_REGISTRY, GAME_REGISTRY_DECLARED_ORDER};
use ensemble_core::RepoName;
use ensemble_exec::testing::{command, command_in, ScriptedRunner};
use ensemble_ops::{build, BuildOptions, RepoOutcome, Silent};
use rstest::rstest;

fn name(s: &str) -> RepoName {
    RepoName::from(s)
}

#[rstest]
#[case::computed_order(GAME_REGISTRY)]
#[case::declared_order(GAME_REGISTRY_DECLARED_ORDER)]
fn core_failure_aborts_remaining_builds(#[case] registry: &str) {
    let fixture = Fixture::cloned(registry, BUILD_AND_TEST);
    assert_eq!(
        fixture.registry.has_declared_order(),
        registry == GAME_REGISTRY_DECLARED_ORDER
    );
    let runner = ScriptedRunner::new();
    runner.exit_with(command_in("npm run build", "builder"), 2);

    let report = build::build(&fixture.ctx(&runner), &BuildOptions::default(), &mut Silent)
        .expect("build");

    assert_eq!(script_runs(&runner, "build"), vec!["builder"]);
    assert_eq!(report.aborted, Some(name("builder")));
    assert!(matches!(
        report.report.get(&name("builder")),
        Some(RepoOutcome::Failed { .. })
    ));
    assert_eq!(report.report.get(&name("battle")), Some(&RepoOutcome::Skipped));
    assert_eq!(report.report.get(&name("composer")), Some(&RepoOutcome::Skipped));
    assert_eq!(report.exit_code(), 1);
}

#[rstest]
#[case::computed_order(GAME_REGISTRY)]
#[case::declared_order(GAME_REGISTRY_DECLARED_ORDER)]
fn non_core_failure_is_recorded_and_run_continues(#[case] registry: &str) {
    let fixture = Fixture::cloned(registry, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();
    runner.exit_with(command_in("npm run build", "composer"), 1);

    let report = build::build(&fixture.ctx(&runner), &BuildOptions::default(), &mut Silent)
        .expect("build");

    assert_eq!(
        script_runs(&runner, "build"),
        vec!["builder", "battle", "composer"]
    );
    assert_eq!(report.aborted, None);
    let tally = report.report.tally();
    assert_eq!(tally.success, 2);
    assert_eq!(tally.failed, 1);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn selection_runs_in_build_order_once_each() {
    let fixture = Fixture::cloned(GAME_REGISTRY, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();
    let options = BuildOptions {
        selection: vec![name("composer"), name("builder"), name("composer")],
        ..BuildOptions::default()
    };

    let report = build::build(&fixture.ctx(&runner), &options, &mut Silent).expect("build");

    assert_eq!(script_runs(&runner, "build"), vec!["builder", "composer"]);
    assert_eq!(report.report.entries().len(), 2);
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn unknown_selection_is_fatal_before_anything_runs() {
    let fixture = Fixture::cloned(GAME_REGISTRY, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();
    let options = BuildOptions {
        selection: vec![name("nope")],
        ..BuildOptions::default()
    };

    let err = build::build(&fixture.ctx(&runner), &options, &mut Silent).unwrap_err();
    assert!(err.to_string().contains("nope"));
    assert!(runner.calls().is_empty());
}

#[test]
fn missing_clone_and_missing_script_are_distinguished() {
    let fixture = Fixture::new(GAME_REGISTRY);
    fixture.project("builder", Some(BUILD_AND_TEST));
    fixture.project("battle", Some(r#"{ "scripts": { "test": "jest" } }"#));
    let runner = ScriptedRunner::new();

    let report = build::build(&fixture.ctx(&runner), &BuildOptions::default(), &mut Silent)
        .expect("build");

    assert_eq!(report.report.get(&name("builder")), Some(&RepoOutcome::Success));
    assert_eq!(report.report.get(&name("battle")), Some(&RepoOutcome::NoScript));
    assert_eq!(report.report.get(&name("composer")), Some(&RepoOutcome::Missing));
    assert_eq!(report.exit_code(), 0);
}

#[test]
fn clean_build_runs_clean_script_and_drops_dist_even_when_clean_fails() {
    let fixture = Fixture::new(GAME_REGISTRY);
    let dir = fixture.project(
        "builder",
        Some(r#"{ "scripts": { "build": "tsc", "clean": "rimraf dist" } }"#),
    );
    fs::create_dir_all(dir.join("dist")).expect("dist");
    fs::write(dir.join("dist/index.js"), "old").expect("artifact");

    let runner = ScriptedRunner::new();
    runner.exit_with(command("npm run clean"), 1);
    let options = BuildOptions {
        selection: vec![name("builder")],
        clean: true,
        ..BuildOptions::default()
    };

    let report = build::build(&fixture.ctx(&runner), &options, &mut Silent).expect("build");

    assert_eq!(script_runs(&runner, "clean"), vec!["builder"]);
    assert!(!dir.join("dist").exists());
    assert_eq!(report.report.get(&name("builder")), Some(&RepoOutcome::Success));
}

#[test]
fn affected_build_covers_transitive_dependents_only() {
    let fixture = Fixture::cloned(GAME_REGISTRY, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();

    let report = build::build_affected(
        &fixture.ctx(&runner),
        &name("battle"),
        ensemble_exec::OutputMode::Capture,
        &mut Silent,
    );

    assert_eq!(script_runs(&runner, "build"), vec!["battle", "composer"]);
    assert!(report.succeeded());
}
