mod common;

use common::{script_runs, Fixture, BUILD_AND_TEST, GAME_REGISTRY};
use ensemble_core::RepoName;
use ensemble_exec::testing::{command_in, ScriptedRunner};
use ensemble_exec::OutputMode;
use ensemble_ops::{test, RepoOutcome, Silent, TestOptions};

fn name(s: &str) -> RepoName {
    RepoName::from(s)
}

#[test]
fn core_test_failure_does_not_abort() {
    let fixture = Fixture::cloned(GAME_REGISTRY, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();
    runner.exit_with(command_in("npm run test", "builder"), 1);

    let report = test::test(&fixture.ctx(&runner), &TestOptions::default(), &mut Silent)
        .expect("test");

    assert_eq!(
        script_runs(&runner, "test"),
        vec!["builder", "battle", "composer"]
    );
    assert_eq!(report.report.tally().failed, 1);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn fail_fast_skips_the_rest() {
    let fixture = Fixture::cloned(GAME_REGISTRY, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();
    runner.exit_with(command_in("npm run test", "battle"), 1);
    let options = TestOptions {
        fail_fast: true,
        ..TestOptions::default()
    };

    let report = test::test(&fixture.ctx(&runner), &options, &mut Silent).expect("test");

    assert_eq!(script_runs(&runner, "test"), vec!["builder", "battle"]);
    assert_eq!(report.stopped_at, Some(name("battle")));
    assert_eq!(report.report.get(&name("composer")), Some(&RepoOutcome::Skipped));
}

#[test]
fn spawn_failure_is_an_error_not_a_failure() {
    let fixture = Fixture::cloned(GAME_REGISTRY, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();
    runner.spawn_error(command_in("npm run test", "composer"));

    let report = test::test(&fixture.ctx(&runner), &TestOptions::default(), &mut Silent)
        .expect("test");

    assert!(matches!(
        report.report.get(&name("composer")),
        Some(RepoOutcome::Error { .. })
    ));
    let tally = report.report.tally();
    assert_eq!((tally.success, tally.error), (2, 1));
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn verbose_streams_child_output() {
    let fixture = Fixture::cloned(GAME_REGISTRY, BUILD_AND_TEST);
    let runner = ScriptedRunner::new();
    let options = TestOptions {
        selection: vec![name("builder")],
        verbose: true,
        ..TestOptions::default()
    };

    test::test(&fixture.ctx(&runner), &options, &mut Silent).expect("test");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].output, OutputMode::Stream);
}

#[test]
fn projects_without_test_script_are_counted_separately() {
    let fixture = Fixture::cloned(GAME_REGISTRY, r#"{ "scripts": { "build": "tsc" } }"#);
    let runner = ScriptedRunner::new();

    let report = test::test(&fixture.ctx(&runner), &TestOptions::default(), &mut Silent)
        .expect("test");

    assert_eq!(report.report.tally().no_script, 3);
    assert_eq!(report.exit_code(), 0);
    assert!(runner.calls().is_empty());
}
