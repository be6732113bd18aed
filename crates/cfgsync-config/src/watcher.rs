//! Background tasks that keep a [`ConfigStore`] in sync with its source.

use notify::{Event as NotifyEvent, EventKind, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::locator::Source;
use crate::store::ConfigStore;
use cfgsync_core::{CfgError, Result};

/// Default delay between remote re-fetches.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Quiet period after a filesystem event before reloading, so a burst of
/// writes from one save collapses into one reload.
const SETTLE_DELAY: Duration = Duration::from_millis(50);

/// Where a watcher is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for the next timer tick or filesystem event.
    Idle,
    /// Re-reading the source.
    Fetching,
    /// Swapping in a freshly loaded snapshot.
    Applying,
    /// The last refresh failed; waiting for the next attempt.
    Backoff,
    /// Shut down.
    Stopped,
}

/// Owns a running watcher task. Dropping the handle signals shutdown;
/// [`WatcherHandle::shutdown`] also waits for the task to finish.
pub struct WatcherHandle {
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<WatchState>,
    task: Option<JoinHandle<()>>,
    _fs_watcher: Option<notify::RecommendedWatcher>,
}

impl WatcherHandle {
    pub fn state(&self) -> WatchState {
        *self.state_rx.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<WatchState> {
        self.state_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signal the task to stop and wait for it.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "config watcher task ended abnormally");
            }
        }
    }
}

impl Drop for WatcherHandle {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

/// Start the watcher variant matching the store's source.
pub fn spawn(store: ConfigStore, poll_interval: Duration) -> Result<WatcherHandle> {
    match store.source().clone() {
        Source::Local { path } => spawn_file_watcher(store, &path),
        Source::Remote(_) => Ok(spawn_remote_watcher(store, poll_interval)),
    }
}

/// Re-fetch the remote source every `interval`. Failures are logged and the
/// previous snapshot stays in effect.
pub fn spawn_remote_watcher(store: ConfigStore, interval: Duration) -> WatcherHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let (state_tx, state_rx) = watch::channel(WatchState::Idle);

    info!(source = %store.source(), ?interval, "starting remote config watcher");

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = ticker.tick() => {}
            }

            state_tx.send_replace(WatchState::Fetching);
            let fetched = tokio::select! {
                _ = shutdown_rx.changed() => break,
                res = store.load_snapshot() => res,
            };

            match fetched {
                Ok(snapshot) => {
                    state_tx.send_replace(WatchState::Applying);
                    let applied = store.apply(snapshot);
                    info!(generation = applied.generation(), "remote config refreshed");
                    state_tx.send_replace(WatchState::Idle);
                }
                Err(e) => {
                    let e = CfgError::RefreshFailed(e.to_string());
                    warn!(error = %e, "unable to read remote config, keeping current snapshot");
                    state_tx.send_replace(WatchState::Backoff);
                }
            }
        }

        state_tx.send_replace(WatchState::Stopped);
        debug!("remote config watcher stopped");
    });

    WatcherHandle {
        shutdown_tx,
        state_rx,
        task: Some(task),
        _fs_watcher: None,
    }
}

/// Reload whenever the config file is modified or recreated.
///
/// The parent directory is watched, since editors often save by writing a
/// temp file and renaming it over the original.
pub fn spawn_file_watcher(store: ConfigStore, path: &Path) -> Result<WatcherHandle> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let (state_tx, state_rx) = watch::channel(WatchState::Idle);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PathBuf>();

    let file_name = path.file_name().map(ToOwned::to_owned);
    let mut fs_watcher = notify::recommended_watcher(
        move |res: std::result::Result<NotifyEvent, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                if let Some(p) = event
                    .paths
                    .iter()
                    .find(|p| p.file_name() == file_name.as_deref())
                {
                    let _ = event_tx.send(p.clone());
                }
            }
            Err(e) => warn!(error = %e, "file watcher error"),
        },
    )
    .map_err(|e| CfgError::Watch(format!("failed to create file watcher: {e}")))?;

    let watch_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    fs_watcher
        .watch(watch_dir, RecursiveMode::NonRecursive)
        .map_err(|e| CfgError::Watch(format!("failed to watch {}: {e}", watch_dir.display())))?;

    info!(path = %path.display(), "starting config file watcher");

    let task = tokio::spawn(async move {
        loop {
            let changed = tokio::select! {
                _ = shutdown_rx.changed() => break,
                ev = event_rx.recv() => match ev {
                    Some(p) => p,
                    None => break,
                },
            };

            tokio::time::sleep(SETTLE_DELAY).await;
            while event_rx.try_recv().is_ok() {}

            info!(path = %changed.display(), "config file changed, reloading");
            state_tx.send_replace(WatchState::Fetching);
            match store.load_snapshot().await {
                Ok(snapshot) => {
                    state_tx.send_replace(WatchState::Applying);
                    let applied = store.apply(snapshot);
                    info!(generation = applied.generation(), "configuration hot-reloaded");
                    state_tx.send_replace(WatchState::Idle);
                }
                Err(e) => {
                    let e = CfgError::RefreshFailed(e.to_string());
                    warn!(error = %e, "config file has errors, keeping current snapshot");
                    state_tx.send_replace(WatchState::Backoff);
                }
            }
        }

        state_tx.send_replace(WatchState::Stopped);
        debug!("config file watcher stopped");
    });

    Ok(WatcherHandle {
        shutdown_tx,
        state_rx,
        task: Some(task),
        _fs_watcher: Some(fs_watcher),
    })
}
