//! Builder for constructing ProvisioningService instances.

use super::ProvisioningService;
use crate::error::{ProvisioningError, Result};
use crate::provisioner::{DashboardProvisionerFactory, ResourceProvisioner};
use crate::settings::ProvisioningPaths;

#[cfg(feature = "metrics")]
use crate::metrics::ProvisioningMetrics;

/// Builder for a [`ProvisioningService`].
///
/// The dashboard factory and paths are required up front. The three
/// one-shot provisioners must be supplied before [`build`](Self::build).
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_provisioning::prelude::*;
/// use std::path::Path;
///
/// fn load_datasources(path: &Path) -> Result<(), BoxError> {
///     // read and apply data source definitions
///     Ok(())
/// }
///
/// # fn example<F: DashboardProvisionerFactory>(factory: F) -> hotswap_provisioning::error::Result<()> {
/// let service = ProvisioningService::builder(ProvisioningPaths::from_root("conf/provisioning"), factory)
///     .with_datasources(load_datasources)
///     .with_plugins(|_: &Path| -> Result<(), BoxError> { Ok(()) })
///     .with_notifiers(|_: &Path| -> Result<(), BoxError> { Ok(()) })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ProvisioningServiceBuilder<F> {
    paths: ProvisioningPaths,
    dashboard_factory: F,
    datasources: Option<Box<dyn ResourceProvisioner>>,
    plugins: Option<Box<dyn ResourceProvisioner>>,
    notifiers: Option<Box<dyn ResourceProvisioner>>,
    #[cfg(feature = "metrics")]
    metrics: Option<ProvisioningMetrics>,
}

impl<F: DashboardProvisionerFactory> ProvisioningServiceBuilder<F> {
    /// Create a new builder.
    pub fn new(paths: ProvisioningPaths, dashboard_factory: F) -> Self {
        Self {
            paths,
            dashboard_factory,
            datasources: None,
            plugins: None,
            notifiers: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Set the data source provisioner.
    pub fn with_datasources<P: ResourceProvisioner + 'static>(mut self, provisioner: P) -> Self {
        self.datasources = Some(Box::new(provisioner));
        self
    }

    /// Set the plugin provisioner.
    pub fn with_plugins<P: ResourceProvisioner + 'static>(mut self, provisioner: P) -> Self {
        self.plugins = Some(Box::new(provisioner));
        self
    }

    /// Set the notification channel provisioner.
    pub fn with_notifiers<P: ResourceProvisioner + 'static>(mut self, provisioner: P) -> Self {
        self.notifiers = Some(Box::new(provisioner));
        self
    }

    /// Record OpenTelemetry metrics for every provisioning stage.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: ProvisioningMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the service.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisioningError::MissingCollaborator`] naming the first
    /// one-shot provisioner that was not supplied.
    pub fn build(self) -> Result<ProvisioningService<F>> {
        let datasources = self
            .datasources
            .ok_or(ProvisioningError::MissingCollaborator("datasources"))?;
        let plugins = self
            .plugins
            .ok_or(ProvisioningError::MissingCollaborator("plugins"))?;
        let notifiers = self
            .notifiers
            .ok_or(ProvisioningError::MissingCollaborator("notifiers"))?;

        let service = ProvisioningService::from_parts(
            self.paths,
            datasources,
            plugins,
            notifiers,
            self.dashboard_factory,
        );

        #[cfg(feature = "metrics")]
        let service = service.with_metrics(self.metrics);

        Ok(service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BoxError;
    use crate::provisioner::DashboardProvisioner;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    struct EmptyDashboards;

    #[async_trait]
    impl DashboardProvisioner for EmptyDashboards {
        async fn provision(&self) -> std::result::Result<(), BoxError> {
            Ok(())
        }

        fn poll_changes(self: Arc<Self>, _token: CancellationToken) {}

        fn resolved_path(&self, _name: &str) -> Option<PathBuf> {
            None
        }

        fn allow_ui_updates(&self, _name: &str) -> bool {
            false
        }
    }

    struct EmptyFactory;

    #[async_trait]
    impl DashboardProvisionerFactory for EmptyFactory {
        type Provisioner = EmptyDashboards;

        async fn create(&self, _path: &Path) -> std::result::Result<EmptyDashboards, BoxError> {
            Ok(EmptyDashboards)
        }
    }

    fn noop(_: &Path) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    #[test]
    fn test_missing_collaborator() {
        let result = ProvisioningServiceBuilder::new(ProvisioningPaths::from_root("/p"), EmptyFactory)
            .with_datasources(noop)
            .with_notifiers(noop)
            .build();

        assert!(matches!(
            result,
            Err(ProvisioningError::MissingCollaborator("plugins"))
        ));
    }

    #[test]
    fn test_build_keeps_paths() {
        let paths = ProvisioningPaths::from_root("/p");
        let service = ProvisioningServiceBuilder::new(paths.clone(), EmptyFactory)
            .with_datasources(noop)
            .with_plugins(noop)
            .with_notifiers(noop)
            .build()
            .unwrap();

        assert_eq!(service.paths(), &paths);
    }

    #[cfg(feature = "metrics")]
    #[tokio::test]
    async fn test_build_with_metrics() {
        let metrics = ProvisioningMetrics::new(opentelemetry::global::meter("test"));
        let service = ProvisioningServiceBuilder::new(ProvisioningPaths::from_root("/p"), EmptyFactory)
            .with_datasources(noop)
            .with_plugins(noop)
            .with_notifiers(noop)
            .with_metrics(metrics)
            .build()
            .unwrap();

        service.init().await.unwrap();
        service.provision_dashboards().await.unwrap();
        assert!(service.active_dashboards().is_some());
    }
}
