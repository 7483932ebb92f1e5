//! Example: dashboards kept in sync with a directory tree.
//!
//! This example shows how to:
//! - Implement a dashboard provisioner backed by a directory per source
//! - Watch those directories with `ChangeWatcher` inside `poll_changes`
//! - Swap the whole dashboard set on SIGHUP without restarting
//!
//! Run with: cargo run --example directory_dashboards -- conf/provisioning
//!
//! Each subdirectory of `<root>/dashboards` is a dashboard source. A source
//! containing a file named `allow-ui-updates` may be edited from the UI.

use async_trait::async_trait;
use hotswap_provisioning::prelude::*;
use hotswap_provisioning::watch::ChangeWatcher;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

struct DirectoryDashboards {
    sources: HashMap<String, PathBuf>,
    editable: HashSet<String>,
}

#[async_trait]
impl DashboardProvisioner for DirectoryDashboards {
    async fn provision(&self) -> Result<(), BoxError> {
        for (name, dir) in &self.sources {
            let mut entries = tokio::fs::read_dir(dir).await?;
            let mut dashboards = 0;
            while let Some(entry) = entries.next_entry().await? {
                if entry.path().extension().is_some_and(|ext| ext == "json") {
                    dashboards += 1;
                }
            }
            tracing::info!(source = %name, dashboards, "Applied dashboards");
        }
        Ok(())
    }

    fn poll_changes(self: Arc<Self>, token: CancellationToken) {
        let mut watcher = match ChangeWatcher::new(Duration::from_millis(300)) {
            Ok(watcher) => watcher,
            Err(err) => {
                tracing::warn!(error = %err, "Dashboard changes will not be picked up");
                return;
            }
        };
        for dir in self.sources.values() {
            if let Err(err) = watcher.watch(dir) {
                tracing::warn!(error = %err, dir = %dir.display(), "Not watching dashboard source");
            }
        }

        watcher.spawn(token, move || {
            let dashboards = Arc::clone(&self);
            async move {
                if let Err(err) = dashboards.provision().await {
                    tracing::warn!(error = %err, "Failed to re-apply changed dashboards");
                }
            }
        });
    }

    fn resolved_path(&self, name: &str) -> Option<PathBuf> {
        self.sources.get(name).cloned()
    }

    fn allow_ui_updates(&self, name: &str) -> bool {
        self.editable.contains(name)
    }
}

struct DirectoryFactory;

#[async_trait]
impl DashboardProvisionerFactory for DirectoryFactory {
    type Provisioner = DirectoryDashboards;

    async fn create(&self, path: &Path) -> Result<DirectoryDashboards, BoxError> {
        let mut sources = HashMap::new();
        let mut editable = HashSet::new();

        let mut entries = tokio::fs::read_dir(path).await?;
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let dir = tokio::fs::canonicalize(entry.path()).await?;
            if tokio::fs::try_exists(dir.join("allow-ui-updates")).await? {
                editable.insert(name.clone());
            }
            sources.insert(name, dir);
        }

        Ok(DirectoryDashboards { sources, editable })
    }
}

fn log_directory(
    stage: &'static str,
) -> impl Fn(&Path) -> Result<(), BoxError> + Send + Sync + 'static {
    move |path: &Path| -> Result<(), BoxError> {
        tracing::info!(stage, path = %path.display(), "Nothing to apply in this example");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let root = std::env::args().nth(1).unwrap_or_else(|| "conf/provisioning".to_string());
    let paths = ProvisioningPaths::builder()
        .with_root(root)
        .with_env_overrides("DEMO_PROVISIONING", "__")
        .build()?;

    let service = ProvisioningService::builder(paths, DirectoryFactory)
        .with_datasources(log_directory("datasources"))
        .with_plugins(log_directory("plugins"))
        .with_notifiers(log_directory("notifiers"))
        .build()?;
    service.init().await?;

    let service = Arc::new(service);
    let shutdown = CancellationToken::new();
    let watch_loop = tokio::spawn({
        let service = Arc::clone(&service);
        let shutdown = shutdown.clone();
        async move { service.run(shutdown).await }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut hangup = signal(SignalKind::hangup())?;
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            while hangup.recv().await.is_some() {
                match service.provision_dashboards().await {
                    Ok(()) => tracing::info!("Dashboard configuration reloaded"),
                    Err(err) => tracing::warn!(error = %err, "Dashboard reload failed"),
                }
            }
        });
    }

    tokio::signal::ctrl_c().await?;
    shutdown.cancel();

    match watch_loop.await? {
        Err(err) if err.is_shutdown() => Ok(()),
        Err(err) => Err(err.into()),
        Ok(()) => Ok(()),
    }
}
