mod common;

use std::fs;
use std::path::Path;

use common::{Fixture, GAME_REGISTRY};
use ensemble_core::RepoName;
use ensemble_exec::testing::{command, ScriptedRunner};
use ensemble_exec::ProcessOutput;
use ensemble_ops::{clean, CleanOptions, Silent};
use sha2::{Digest, Sha256};

const WITH_CLEAN: &str = r#"{ "scripts": { "build": "tsc", "clean": "rimraf dist" } }"#;

/// Digest of every path, file type and file body under `root`.
fn tree_digest(root: &Path) -> String {
    fn walk(dir: &Path, root: &Path, hasher: &mut Sha256) {
        let mut entries: Vec<_> = fs::read_dir(dir)
            .expect("read_dir")
            .map(|e| e.expect("entry").path())
            .collect();
        entries.sort();
        for path in entries {
            let relative = path.strip_prefix(root).expect("under root");
            hasher.update(relative.to_string_lossy().as_bytes());
            if path.is_dir() {
                hasher.update(b"/");
                walk(&path, root, hasher);
            } else {
                hasher.update(fs::read(&path).expect("read file"));
            }
        }
    }
    let mut hasher = Sha256::new();
    walk(root, root, &mut hasher);
    hex::encode(hasher.finalize())
}

fn populate(fixture: &Fixture) {
    for name in ["builder", "battle", "composer"] {
        let dir = fixture.project(name, Some(WITH_CLEAN));
        fs::create_dir_all(dir.join("dist/lib")).expect("dist");
        fs::write(dir.join("dist/lib/index.js"), "compiled").expect("artifact");
        fs::create_dir_all(dir.join("coverage")).expect("coverage");
        fs::write(dir.join("coverage/lcov.info"), "TN:").expect("coverage file");
        fs::create_dir_all(dir.join("node_modules/left-pad")).expect("node_modules");
        fs::write(dir.join("node_modules/left-pad/index.js"), "pad").expect("dep");
        fs::write(dir.join("package-lock.json"), "{}").expect("lock");
        fs::write(dir.join("npm-debug.log"), "log").expect("log");
        fs::create_dir_all(dir.join("src")).expect("src");
        fs::write(dir.join("src/index.ts"), "export {}").expect("source");
    }
    fixture.write("node_modules/typescript/package.json", "{}");
    fixture.write("package-lock.json", "{}");
    fixture.write("package.json", r#"{ "private": true }"#);
}

#[test]
fn dry_run_leaves_the_tree_byte_for_byte_unchanged() {
    let fixture = Fixture::new(GAME_REGISTRY);
    populate(&fixture);
    let before = tree_digest(fixture.root());

    let runner = ScriptedRunner::new();
    let options = CleanOptions {
        deep: true,
        dry_run: true,
        ..CleanOptions::default()
    };
    let report = clean::clean(&fixture.ctx(&runner), &options, &mut Silent).expect("clean");

    assert_eq!(tree_digest(fixture.root()), before);
    assert!(runner.calls().is_empty(), "dry run must not run scripts");
    // dist, coverage, node_modules, package-lock.json, npm-debug.log per project
    assert_eq!(report.projects[0].paths.len(), 5);
    assert_eq!(report.root_paths.len(), 2);
    assert!(report.total_bytes() > 0);
}

#[test]
fn dry_run_reports_what_a_real_run_removes() {
    let fixture = Fixture::new(GAME_REGISTRY);
    populate(&fixture);
    let runner = ScriptedRunner::new();
    // Like `"clean": "rimraf dist"`: the script deletes part of the target set.
    runner.on(command("npm run clean"), |inv| {
        fs::remove_dir_all(inv.cwd.join("dist")).expect("script removes dist");
        Ok(ProcessOutput::default())
    });
    let mut options = CleanOptions {
        dry_run: true,
        ..CleanOptions::default()
    };

    let planned = clean::clean(&fixture.ctx(&runner), &options, &mut Silent).expect("plan");
    options.dry_run = false;
    let done = clean::clean(&fixture.ctx(&runner), &options, &mut Silent).expect("clean");

    let planned_paths: Vec<_> = planned.projects.iter().map(|p| p.paths.clone()).collect();
    let done_paths: Vec<_> = done.projects.iter().map(|p| p.paths.clone()).collect();
    assert_eq!(planned_paths, done_paths);
    assert_eq!(planned.total_bytes(), done.total_bytes());
    for paths in done_paths.iter().flatten() {
        assert!(!paths.exists(), "{} should be gone", paths.display());
    }
    assert!(done.projects.iter().all(|p| p.failures.is_empty()));
    assert!(runner
        .calls()
        .iter()
        .any(|inv| inv.to_string() == "npm run clean"));
}

#[test]
fn shallow_clean_keeps_dependencies_and_sources() {
    let fixture = Fixture::new(GAME_REGISTRY);
    populate(&fixture);
    let runner = ScriptedRunner::new();
    let options = CleanOptions {
        selection: vec![RepoName::from("battle")],
        ..CleanOptions::default()
    };

    let report = clean::clean(&fixture.ctx(&runner), &options, &mut Silent).expect("clean");

    let battle = fixture.workspace.projects_dir().join("battle");
    assert!(!battle.join("dist").exists());
    assert!(!battle.join("npm-debug.log").exists());
    assert!(battle.join("node_modules").exists());
    assert!(battle.join("src/index.ts").exists());
    assert!(fixture.workspace.projects_dir().join("builder/dist").exists());
    assert!(report.root_paths.is_empty());
    assert_eq!(report.projects.len(), 1);
    assert_eq!(
        report.projects[0].script,
        Some(ensemble_ops::StepOutcome::Success)
    );
}

#[test]
fn deep_clean_removes_root_dependencies() {
    let fixture = Fixture::new(GAME_REGISTRY);
    populate(&fixture);
    let runner = ScriptedRunner::new();
    let options = CleanOptions {
        deep: true,
        ..CleanOptions::default()
    };

    clean::clean(&fixture.ctx(&runner), &options, &mut Silent).expect("clean");

    assert!(!fixture.root().join("node_modules").exists());
    assert!(!fixture.root().join("package-lock.json").exists());
    assert!(fixture.root().join("package.json").exists());
}

#[test]
fn missing_clone_is_reported_not_fatal() {
    let fixture = Fixture::new(GAME_REGISTRY);
    let runner = ScriptedRunner::new();

    let report =
        clean::clean(&fixture.ctx(&runner), &CleanOptions::default(), &mut Silent).expect("clean");

    assert!(report.projects.iter().all(|p| p.missing));
    assert_eq!(report.total_bytes(), 0);
}
