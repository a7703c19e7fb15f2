use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use ensemble_core::{Registry, RepoName, Workspace};
use ensemble_ops::{BuildReport, OpsError};

use crate::error::{io_err, WatchError};
use crate::filter::{is_relevant_event_kind, repo_for_path, Debouncer};

/// Runs the build for one changed repository. Called on a blocking thread,
/// one at a time.
pub trait Rebuilder: Send + Sync + 'static {
    fn rebuild(&self, changed: &RepoName) -> Result<BuildReport, OpsError>;
}

/// Clone directories to watch, canonicalized so notify's real paths match.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub roots: Vec<(RepoName, PathBuf)>,
}

impl WatchConfig {
    /// Present clones among `selection` (empty = all), in build order.
    pub fn for_workspace(
        workspace: &Workspace,
        registry: &Registry,
        selection: &[RepoName],
    ) -> Result<Self, WatchError> {
        let mut roots = Vec::new();
        for name in registry.select(selection)? {
            let Some(descriptor) = registry.get(&name) else {
                continue;
            };
            let dir = workspace.clone_dir(descriptor);
            if !dir.is_dir() {
                tracing::warn!(repo = %name, "not cloned, not watching");
                continue;
            }
            let canonical = fs::canonicalize(&dir).map_err(|e| io_err(&dir, e))?;
            roots.push((name, canonical));
        }
        if roots.is_empty() {
            return Err(WatchError::NothingToWatch);
        }
        Ok(Self { roots })
    }
}

/// Start watch mode and block the current thread until it exits.
pub fn start_blocking(config: WatchConfig, rebuilder: Arc<dyn Rebuilder>) -> Result<(), WatchError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(config, rebuilder))
}

/// Watch until SIGINT/SIGTERM or until a task fails.
pub async fn run(config: WatchConfig, rebuilder: Arc<dyn Rebuilder>) -> Result<(), WatchError> {
    let (build_tx, build_rx) = mpsc::channel::<RepoName>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let watcher_handle = {
        let shutdown = shutdown_tx.clone();
        let config = config.clone();
        tokio::spawn(async move {
            let result = watcher_task(config, build_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let result = build_processor_task(rebuilder, build_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = shutdown_signal() => {
                    match signal {
                        Ok(name) => {
                            tracing::info!(signal = name, "shutting down watch mode");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(WatchError::Runtime(format!("signal handler failed: {err}"))),
                    }
                }
            }
        })
    };

    let (watcher_result, processor_result, signal_result) =
        tokio::join!(watcher_handle, processor_handle, signal_handle);

    handle_join("watcher", watcher_result)?;
    handle_join("build_processor", processor_result)?;
    handle_join("signal_handler", signal_result)?;
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}

async fn watcher_task(
    config: WatchConfig,
    build_tx: mpsc::Sender<RepoName>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError> {
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event| {
        let _ = event_tx.send(event);
    })?;
    for (name, root) in &config.roots {
        watcher.watch(root, RecursiveMode::Recursive)?;
        tracing::info!(repo = %name, path = %root.display(), "watching");
    }

    let mut debounce = Debouncer::default();

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            event = event_rx.recv() => {
                let Some(event) = event else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::warn!(error = %err, "watcher event error");
                        continue;
                    }
                };
                if !is_relevant_event_kind(&event.kind) {
                    continue;
                }

                for path in event.paths {
                    let Some(name) = repo_for_path(&path, &config.roots) else {
                        continue;
                    };
                    if !debounce.should_trigger(&name, Instant::now()) {
                        continue;
                    }
                    tracing::debug!(repo = %name, path = %path.display(), "change detected");
                    enqueue(&build_tx, name)?;
                }
            }
        }
    }

    Ok(())
}

/// Queue a rebuild without waiting. Returns `false` when the queue is full
/// and the change was dropped; the queued builds already cover the backlog.
fn enqueue(build_tx: &mpsc::Sender<RepoName>, name: RepoName) -> Result<bool, WatchError> {
    match build_tx.try_send(name) {
        Ok(()) => Ok(true),
        Err(mpsc::error::TrySendError::Full(name)) => {
            tracing::warn!(repo = %name, "build queue full, dropping change");
            Ok(false)
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(WatchError::ChannelClosed("build queue")),
    }
}

async fn build_processor_task(
    rebuilder: Arc<dyn Rebuilder>,
    mut build_rx: mpsc::Receiver<RepoName>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), WatchError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_name = build_rx.recv() => {
                let Some(name) = maybe_name else { break };
                let started = Instant::now();
                let rebuilder = rebuilder.clone();
                let changed = name.clone();
                let result = tokio::task::spawn_blocking(move || rebuilder.rebuild(&changed))
                    .await
                    .map_err(|err| WatchError::Runtime(format!("build task join error: {err}")))?;

                match result {
                    Ok(report) => {
                        let tally = report.report.tally();
                        tracing::info!(
                            repo = %name,
                            built = tally.success,
                            failed = tally.failed,
                            aborted = report.aborted.is_some(),
                            duration_ms = started.elapsed().as_millis() as u64,
                            "watch-triggered build completed",
                        );
                    }
                    Err(err) => {
                        tracing::error!(repo = %name, error = %err, "watch-triggered build failed");
                    }
                }
            }
        }
    }

    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), WatchError>, tokio::task::JoinError>,
) -> Result<(), WatchError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(WatchError::Runtime(format!("{task} task join failure: {err}"))),
    }
}
