//! Debounced file watching bound to a cancellation token.

use crate::error::{ProvisioningError, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Watches dashboard definition files and reports settled bursts of changes.
///
/// Paths are registered with [`watch`](Self::watch), then
/// [`spawn`](Self::spawn) hands the watcher to a background task that runs
/// until its token is cancelled.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_provisioning::watch::ChangeWatcher;
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
///
/// # fn example() -> hotswap_provisioning::error::Result<()> {
/// let mut watcher = ChangeWatcher::new(Duration::from_millis(500))?;
/// watcher.watch("/etc/app/provisioning/dashboards")?;
///
/// let token = CancellationToken::new();
/// watcher.spawn(token.clone(), || async {
///     println!("dashboards changed on disk");
/// });
///
/// // Stop watching
/// token.cancel();
/// # Ok(())
/// # }
/// ```
pub struct ChangeWatcher {
    watcher: RecommendedWatcher,
    events: mpsc::UnboundedReceiver<Event>,
    debounce_duration: Duration,
    watched_paths: Vec<PathBuf>,
}

impl ChangeWatcher {
    /// Create a new watcher.
    ///
    /// `debounce_duration` is how long events must stop arriving before a
    /// burst counts as one change. Each new event restarts the wait.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file watcher cannot be created.
    pub fn new(debounce_duration: Duration) -> Result<Self> {
        let (event_tx, events) = mpsc::unbounded_channel::<Event>();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                ) {
                    let _ = event_tx.send(event);
                }
            }
        })
        .map_err(|e| ProvisioningError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        Ok(Self {
            watcher,
            events,
            debounce_duration,
            watched_paths: Vec::new(),
        })
    }

    /// Add a file or directory to watch. Directories are watched recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or watched.
    pub fn watch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let canonical_path = path
            .as_ref()
            .canonicalize()
            .map_err(|e| ProvisioningError::WatchError(format!("Failed to resolve path: {}", e)))?;

        let mode = if canonical_path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        self.watcher
            .watch(&canonical_path, mode)
            .map_err(|e| ProvisioningError::WatchError(format!("Failed to watch path: {}", e)))?;

        if !self.watched_paths.contains(&canonical_path) {
            self.watched_paths.push(canonical_path);
        }

        Ok(())
    }

    /// Stop watching a path.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or unwatched.
    pub fn unwatch(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let canonical_path = path.as_ref().canonicalize().map_err(|e| {
            ProvisioningError::WatchError(format!("Failed to resolve path for unwatching: {}", e))
        })?;

        self.watcher
            .unwatch(&canonical_path)
            .map_err(|e| ProvisioningError::WatchError(format!("Failed to unwatch path: {}", e)))?;

        self.watched_paths.retain(|p| p != &canonical_path);
        Ok(())
    }

    /// Get the debounce duration for this watcher.
    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }

    /// Get the currently watched paths.
    pub fn watched_paths(&self) -> &[PathBuf] {
        &self.watched_paths
    }

    /// Move the watcher into a background task.
    ///
    /// `on_change` is awaited once per settled burst of events. The task
    /// ends, and the OS watch is released, when `token` is cancelled.
    pub fn spawn<F, Fut>(self, token: CancellationToken, on_change: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Self {
            watcher,
            mut events,
            debounce_duration,
            watched_paths,
        } = self;

        tokio::spawn(async move {
            let _watcher = watcher;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    event = events.recv() => {
                        if event.is_none() {
                            break;
                        }

                        if !settle(&mut events, debounce_duration, &token).await {
                            break;
                        }

                        on_change().await;
                    }
                }
            }

            tracing::debug!(paths = ?watched_paths, "Stopped watching for changes");
        })
    }
}

/// Wait until no event has arrived for `window`.
///
/// Returns `false` if the token was cancelled or the event channel closed.
async fn settle(
    events: &mut mpsc::UnboundedReceiver<Event>,
    window: Duration,
    token: &CancellationToken,
) -> bool {
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return false,
            event = events.recv() => {
                if event.is_none() {
                    return false;
                }
            }
            _ = sleep(window) => return true,
        }
    }
}
