//! `package.json` reading and local-link rewriting.
//!
//! The rewrite is textual: a dependency entry whose key is the package name
//! of another managed repository gets its version replaced by a `file:`
//! reference to the sibling clone. No version resolution is performed.
//! Key order is preserved (`serde_json` is built with `preserve_order`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{io_err, ExecError};

pub const MANIFEST_FILE: &str = "package.json";

/// Dependency tables that may reference sibling packages.
pub const DEPENDENCY_SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// A parsed `package.json`.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    root: Map<String, Value>,
}

/// One rewritten dependency entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkChange {
    pub section: String,
    pub package: String,
    pub from: String,
    pub to: String,
}

/// `file:../<directory>` — a sibling clone as seen from another clone.
pub fn local_reference(directory: &Path) -> String {
    format!("file:../{}", directory.to_string_lossy().replace('\\', "/"))
}

impl Manifest {
    /// Load `<dir>/package.json`. `Ok(None)` when the file does not exist.
    pub fn load(dir: &Path) -> Result<Option<Self>, ExecError> {
        let path = dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| ExecError::Manifest {
            path: path.clone(),
            source: e,
        })?;
        let Value::Object(root) = value else {
            return Err(ExecError::Manifest {
                path,
                source: serde::de::Error::custom("package.json is not a JSON object"),
            });
        };
        Ok(Some(Self { path, root }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `name` field, if present.
    pub fn name(&self) -> Option<&str> {
        self.root.get("name").and_then(Value::as_str)
    }

    pub fn script(&self, script: &str) -> Option<&str> {
        self.root
            .get("scripts")
            .and_then(Value::as_object)
            .and_then(|scripts| scripts.get(script))
            .and_then(Value::as_str)
    }

    pub fn has_script(&self, script: &str) -> bool {
        self.script(script).is_some()
    }

    /// Replace versions of managed sibling packages with local references.
    ///
    /// `targets` maps package name → reference (see [`local_reference`]).
    /// The package's own name is never rewritten. Returns what changed.
    pub fn link_local(&mut self, targets: &BTreeMap<String, String>) -> Vec<LinkChange> {
        let own_name = self.name().map(str::to_string);
        let mut changes = Vec::new();
        for section in DEPENDENCY_SECTIONS {
            let Some(Value::Object(deps)) = self.root.get_mut(section) else {
                continue;
            };
            for (package, version) in deps.iter_mut() {
                if own_name.as_deref() == Some(package.as_str()) {
                    continue;
                }
                let Some(reference) = targets.get(package) else {
                    continue;
                };
                let current = version.as_str().unwrap_or_default().to_string();
                if current == *reference {
                    continue;
                }
                changes.push(LinkChange {
                    section: section.to_string(),
                    package: package.clone(),
                    from: current,
                    to: reference.clone(),
                });
                *version = Value::String(reference.clone());
            }
        }
        changes
    }

    /// Atomically write the manifest back (`.tmp` sibling + rename).
    pub fn save(&self) -> Result<(), ExecError> {
        let mut json = serde_json::to_string_pretty(&self.root)?;
        json.push('\n');
        let tmp = self.path.with_extension("json.ensemble.tmp");
        std::fs::write(&tmp, json).map_err(|e| io_err(&tmp, e))?;
        if let Err(e) = std::fs::rename(&tmp, &self.path) {
            let _ = std::fs::remove_file(&tmp);
            return Err(io_err(&self.path, e));
        }
        Ok(())
    }
}
