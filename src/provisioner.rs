//! Capability traits implemented by the resource loaders.
//!
//! The service never parses configuration itself. Each resource type is
//! loaded by a collaborator implementing one of these traits, so alternate
//! implementations (or test doubles) can be plugged in without touching the
//! orchestration logic.

use crate::error::BoxError;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A provisioning stage, used for error labels, logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Data source definitions.
    Datasources,
    /// Plugin definitions.
    Plugins,
    /// Alert notification channel definitions.
    Notifiers,
    /// Dashboard definitions.
    Dashboards,
}

impl Stage {
    /// Short lowercase name of the stage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Datasources => "datasources",
            Stage::Plugins => "plugins",
            Stage::Notifiers => "notifiers",
            Stage::Dashboards => "dashboards",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stateless loader that applies the definitions found under a path once.
///
/// Any `Fn(&Path) -> Result<(), BoxError>` closure implements this trait.
///
/// # Examples
///
/// ```rust
/// use hotswap_provisioning::error::BoxError;
/// use hotswap_provisioning::provisioner::ResourceProvisioner;
/// use std::path::Path;
///
/// fn assert_provisioner<P: ResourceProvisioner>(_: P) {}
///
/// assert_provisioner(|_path: &Path| -> Result<(), BoxError> { Ok(()) });
/// ```
#[async_trait]
pub trait ResourceProvisioner: Send + Sync {
    /// Read the definitions under `path` and apply them to the running system.
    ///
    /// # Errors
    ///
    /// Returns the loader's error if the definitions cannot be read or applied.
    async fn provision(&self, path: &Path) -> Result<(), BoxError>;
}

#[async_trait]
impl<F> ResourceProvisioner for F
where
    F: Fn(&Path) -> Result<(), BoxError> + Send + Sync,
{
    async fn provision(&self, path: &Path) -> Result<(), BoxError> {
        self(path)
    }
}

/// One fully loaded set of dashboard definitions.
///
/// Instances are immutable once constructed. A newer instance replaces an
/// older one wholesale when dashboards are reprovisioned.
#[async_trait]
pub trait DashboardProvisioner: Send + Sync {
    /// Apply the loaded dashboards now.
    async fn provision(&self) -> Result<(), BoxError>;

    /// Start watching the dashboard sources for changes.
    ///
    /// Must return without blocking. Monitoring continues in the background
    /// until `token` is cancelled, at which point it should stop promptly.
    fn poll_changes(self: Arc<Self>, token: CancellationToken);

    /// Resolved on-disk path of the named dashboard source.
    fn resolved_path(&self, name: &str) -> Option<PathBuf>;

    /// Whether dashboards from the named source may be edited from the UI.
    fn allow_ui_updates(&self, name: &str) -> bool;
}

/// Builds a [`DashboardProvisioner`] from a dashboard configuration path.
#[async_trait]
pub trait DashboardProvisionerFactory: Send + Sync {
    /// The provisioner type produced by this factory.
    type Provisioner: DashboardProvisioner + 'static;

    /// Read the dashboard configuration under `path` and build a provisioner.
    ///
    /// This may be slow (file I/O, parsing) and is never called while the
    /// service holds its swap lock.
    async fn create(&self, path: &Path) -> Result<Self::Provisioner, BoxError>;
}
