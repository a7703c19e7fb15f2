//! Advisory workspace lock at `<root>/.ensemble/lock`.
//!
//! Mutating commands hold it for their whole run so two orchestrators never
//! interleave installs or builds in the same tree. The file carries the
//! holder's pid and start time; a lock left by a dead process is reclaimed.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, warn};

use ensemble_core::Workspace;

use crate::error::{io_err, OpsError};

pub const LOCK_FILE: &str = "lock";

/// Held until dropped.
#[derive(Debug)]
pub struct WorkspaceLock {
    path: PathBuf,
}

impl WorkspaceLock {
    pub fn acquire(workspace: &Workspace) -> Result<Self, OpsError> {
        Self::acquire_at(&workspace.state_dir().join(LOCK_FILE))
    }

    pub fn acquire_at(path: &Path) -> Result<Self, OpsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }

        // Second attempt only after reclaiming a stale lock.
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(path) {
                Ok(mut file) => {
                    let stamp = format!("{}\n{}\n", std::process::id(), Utc::now().to_rfc3339());
                    file.write_all(stamp.as_bytes()).map_err(|e| io_err(path, e))?;
                    debug!(path = %path.display(), "workspace lock acquired");
                    return Ok(Self {
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let holder = read_holder(path);
                    match holder {
                        Some(pid) if process_alive(pid) => {
                            return Err(OpsError::LockHeld {
                                path: path.to_path_buf(),
                                pid,
                            });
                        }
                        _ => {
                            warn!(path = %path.display(), pid = ?holder, "reclaiming stale workspace lock");
                            fs::remove_file(path).map_err(|e| io_err(path, e))?;
                        }
                    }
                }
                Err(e) => return Err(io_err(path, e)),
            }
        }

        Err(OpsError::LockHeld {
            path: path.to_path_buf(),
            pid: read_holder(path).unwrap_or(0),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkspaceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to release workspace lock");
        }
    }
}

fn read_holder(path: &Path) -> Option<u32> {
    let contents = fs::read_to_string(path).ok()?;
    contents.lines().next()?.trim().parse().ok()
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
    Path::new("/proc").join(pid.to_string()).exists()
}

// Without procfs a foreign lock is always treated as live.
#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
    true
}
