//! Which filesystem events matter, and which repository they belong to.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::EventKind;
use tokio::time::Instant;

use ensemble_core::RepoName;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// Directories whose churn never triggers a rebuild.
pub const IGNORED_DIRS: [&str; 6] = ["node_modules", "dist", "build", ".git", "coverage", "tmp"];

pub fn is_relevant_event_kind(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Repository owning `path`, unless the path sits under an ignored directory.
///
/// `roots` are canonical clone directories; the longest matching root wins so
/// nested layouts resolve to the innermost clone.
pub fn repo_for_path(path: &Path, roots: &[(RepoName, PathBuf)]) -> Option<RepoName> {
    let (name, root) = roots
        .iter()
        .filter(|(_, root)| path.starts_with(root))
        .max_by_key(|(_, root)| root.components().count())?;

    let relative = path.strip_prefix(root).ok()?;
    let ignored = relative.components().any(|component| match component {
        Component::Normal(part) => part
            .to_str()
            .is_some_and(|part| IGNORED_DIRS.contains(&part)),
        _ => false,
    });
    if ignored {
        None
    } else {
        Some(name.clone())
    }
}

/// Per-repository debounce: at most one trigger per window.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    seen: HashMap<RepoName, Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_WINDOW)
    }
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    pub fn should_trigger(&mut self, name: &RepoName, now: Instant) -> bool {
        match self.seen.get(name) {
            Some(last) if now.duration_since(*last) < self.window => false,
            _ => {
                self.seen.insert(name.clone(), now);
                true
            }
        }
    }
}
