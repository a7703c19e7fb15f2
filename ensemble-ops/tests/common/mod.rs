#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use ensemble_core::{registry, Registry, Workspace};
use ensemble_exec::testing::ScriptedRunner;
use ensemble_ops::Context;
use tempfile::TempDir;

/// builder (core) ← battle ← composer; composer also depends on builder.
pub const GAME_REGISTRY: &str = r#"{
  "repositories": {
    "builder":  { "url": "https://example.com/builder.git", "core": true },
    "battle":   { "url": "https://example.com/battle.git", "dependencies": ["builder"] },
    "composer": { "url": "https://example.com/composer.git", "dependencies": ["builder", "battle"] }
  }
}"#;

/// The same repositories with the order declared rather than computed.
pub const GAME_REGISTRY_DECLARED_ORDER: &str = r#"{
  "repositories": {
    "builder":  { "url": "https://example.com/builder.git", "core": true },
    "battle":   { "url": "https://example.com/battle.git", "dependencies": ["builder"] },
    "composer": { "url": "https://example.com/composer.git", "dependencies": ["builder", "battle"] }
  },
  "build_order": ["builder", "battle", "composer"]
}"#;

/// A strict chain: base ← mid ← leaf, leaf depending on mid only.
pub const CHAIN_REGISTRY: &str = r#"{
  "repositories": {
    "base": { "url": "https://example.com/base.git", "core": true },
    "mid":  { "url": "https://example.com/mid.git", "dependencies": ["base"] },
    "leaf": { "url": "https://example.com/leaf.git", "dependencies": ["mid"] }
  }
}"#;

pub const BUILD_AND_TEST: &str = r#"{ "scripts": { "build": "tsc", "test": "jest" } }"#;

pub struct Fixture {
    pub dir: TempDir,
    pub workspace: Workspace,
    pub registry: Registry,
}

impl Fixture {
    pub fn new(registry_json: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let workspace = Workspace::new(dir.path());
        fs::create_dir_all(dir.path().join("config")).expect("config dir");
        fs::write(&workspace.registry_path, registry_json).expect("write registry");
        let registry = registry::load(&workspace).expect("load registry");
        Self {
            dir,
            workspace,
            registry,
        }
    }

    /// Every repository cloned with `manifest` as its package.json.
    pub fn cloned(registry_json: &str, manifest: &str) -> Self {
        let fixture = Self::new(registry_json);
        let names: Vec<String> = fixture
            .registry
            .build_order()
            .iter()
            .map(|n| n.to_string())
            .collect();
        for name in names {
            fixture.project(&name, Some(manifest));
        }
        fixture
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Create `projects/<name>/`, optionally with a package.json.
    pub fn project(&self, name: &str, manifest: Option<&str>) -> PathBuf {
        let dir = self.workspace.projects_dir().join(name);
        fs::create_dir_all(&dir).expect("project dir");
        if let Some(manifest) = manifest {
            fs::write(dir.join("package.json"), manifest).expect("write manifest");
        }
        dir
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent dir");
        }
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn ctx<'a>(&'a self, runner: &'a ScriptedRunner) -> Context<'a, ScriptedRunner> {
        Context::new(&self.workspace, &self.registry, runner)
    }
}

/// Names of the repositories `npm run <script>` ran in, in call order.
pub fn script_runs(runner: &ScriptedRunner, script: &str) -> Vec<String> {
    let command = format!("npm run {script}");
    runner
        .dirs_for(&command)
        .iter()
        .filter_map(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}
