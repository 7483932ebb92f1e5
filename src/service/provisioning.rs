//! Startup provisioning and the live dashboard watch loop.

use super::ProvisioningServiceBuilder;
use crate::error::{BoxError, ProvisioningError, Result};
use crate::provisioner::{
    DashboardProvisioner, DashboardProvisionerFactory, ResourceProvisioner, Stage,
};
use crate::settings::ProvisioningPaths;
use arc_swap::ArcSwapOption;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "metrics")]
use crate::metrics::ProvisioningMetrics;
#[cfg(feature = "metrics")]
use std::time::Instant;

/// Provisions resources at startup and keeps dashboards in sync afterwards.
///
/// Data sources, plugins and notification channels are applied once by
/// [`init`](Self::init). Dashboards are applied by [`run`](Self::run), which
/// then keeps exactly one dashboard watch armed until shutdown. Calling
/// [`provision_dashboards`](Self::provision_dashboards) at any time replaces
/// the watched dashboard set; if the new set fails to apply, the previous
/// one stays active and is watched again.
///
/// # Examples
///
/// ```rust,no_run
/// # use hotswap_provisioning::prelude::*;
/// # use std::sync::Arc;
/// # use tokio_util::sync::CancellationToken;
/// # async fn example<F: DashboardProvisionerFactory + 'static>(
/// #     service: ProvisioningService<F>,
/// # ) -> hotswap_provisioning::error::Result<()> {
/// service.init().await?;
///
/// let service = Arc::new(service);
/// let shutdown = CancellationToken::new();
/// let watcher = tokio::spawn({
///     let service = Arc::clone(&service);
///     let shutdown = shutdown.clone();
///     async move { service.run(shutdown).await }
/// });
///
/// // Later: pick up edited dashboard configuration without a restart
/// service.provision_dashboards().await?;
///
/// shutdown.cancel();
/// let _ = watcher.await;
/// # Ok(())
/// # }
/// ```
pub struct ProvisioningService<F: DashboardProvisionerFactory> {
    paths: ProvisioningPaths,
    datasources: Box<dyn ResourceProvisioner>,
    plugins: Box<dyn ResourceProvisioner>,
    notifiers: Box<dyn ResourceProvisioner>,
    dashboard_factory: F,
    /// The active dashboard set. Only stored while `polling` is locked.
    dashboards: ArcSwapOption<F::Provisioner>,
    /// Swap lock. Holds the cancel handle of the armed watch, if any.
    polling: Mutex<Option<CancellationToken>>,
    running: AtomicBool,
    #[cfg(feature = "metrics")]
    metrics: Option<ProvisioningMetrics>,
}

impl<F: DashboardProvisionerFactory> ProvisioningService<F> {
    /// Create a builder for a service reading from `paths`.
    pub fn builder(paths: ProvisioningPaths, dashboard_factory: F) -> ProvisioningServiceBuilder<F> {
        ProvisioningServiceBuilder::new(paths, dashboard_factory)
    }

    pub(crate) fn from_parts(
        paths: ProvisioningPaths,
        datasources: Box<dyn ResourceProvisioner>,
        plugins: Box<dyn ResourceProvisioner>,
        notifiers: Box<dyn ResourceProvisioner>,
        dashboard_factory: F,
    ) -> Self {
        Self {
            paths,
            datasources,
            plugins,
            notifiers,
            dashboard_factory,
            dashboards: ArcSwapOption::empty(),
            polling: Mutex::new(None),
            running: AtomicBool::new(false),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    #[cfg(feature = "metrics")]
    pub(crate) fn with_metrics(mut self, metrics: Option<ProvisioningMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// The resource paths this service reads from.
    pub fn paths(&self) -> &ProvisioningPaths {
        &self.paths
    }

    /// Provision data sources, plugins and notification channels, in order.
    ///
    /// Dashboards are not part of this sequence; they are provisioned by
    /// [`run`](Self::run).
    ///
    /// # Errors
    ///
    /// Returns the first stage failure. Later stages are not attempted.
    pub async fn init(&self) -> Result<()> {
        self.provision_datasources().await?;
        self.provision_plugins().await?;
        self.provision_notifications().await?;
        Ok(())
    }

    /// Apply the data source definitions once.
    pub async fn provision_datasources(&self) -> Result<()> {
        self.provision_once(Stage::Datasources, self.datasources.as_ref(), &self.paths.datasources)
            .await
            .map_err(ProvisioningError::DatasourceError)
    }

    /// Apply the plugin definitions once.
    pub async fn provision_plugins(&self) -> Result<()> {
        self.provision_once(Stage::Plugins, self.plugins.as_ref(), &self.paths.plugins)
            .await
            .map_err(ProvisioningError::PluginError)
    }

    /// Apply the notification channel definitions once.
    pub async fn provision_notifications(&self) -> Result<()> {
        self.provision_once(Stage::Notifiers, self.notifiers.as_ref(), &self.paths.notifiers)
            .await
            .map_err(ProvisioningError::NotifierError)
    }

    async fn provision_once(
        &self,
        stage: Stage,
        provisioner: &dyn ResourceProvisioner,
        path: &Path,
    ) -> std::result::Result<(), BoxError> {
        tracing::debug!(stage = %stage, path = %path.display(), "Provisioning resources");

        #[cfg(feature = "metrics")]
        let timer = self.start_stage(stage);

        let result = provisioner.provision(path).await;

        #[cfg(feature = "metrics")]
        self.finish_stage(stage, timer, result.is_ok());

        result
    }

    /// Load the dashboard definitions again and make them the active set.
    ///
    /// The new provisioner is built before any lock is taken. The armed
    /// watch is cancelled before the new set is applied; the watch loop
    /// then re-arms against whichever set is active afterwards.
    ///
    /// # Errors
    ///
    /// - [`ProvisioningError::DashboardFactoryError`] if the provisioner
    ///   cannot be built. Nothing changes, the armed watch keeps running.
    /// - [`ProvisioningError::DashboardError`] if the new set fails to apply.
    ///   The previous set stays active and the watch loop re-arms on it.
    pub async fn provision_dashboards(&self) -> Result<()> {
        #[cfg(feature = "metrics")]
        let timer = self.start_stage(Stage::Dashboards);

        let result = self.swap_dashboards().await;

        #[cfg(feature = "metrics")]
        self.finish_stage(Stage::Dashboards, timer, result.is_ok());

        result
    }

    async fn swap_dashboards(&self) -> Result<()> {
        let path = &self.paths.dashboards;
        let provisioner = self
            .dashboard_factory
            .create(path)
            .await
            .map_err(ProvisioningError::DashboardFactoryError)?;

        let mut polling = self.polling.lock().await;
        cancel_polling(&mut polling);

        if let Err(err) = provisioner.provision().await {
            tracing::warn!(error = %err, "New dashboards failed to apply, keeping the previous set");
            return Err(ProvisioningError::DashboardError(err));
        }

        self.dashboards.store(Some(Arc::new(provisioner)));
        tracing::debug!(path = %path.display(), "Dashboard provisioner swapped");
        Ok(())
    }

    /// Provision dashboards, then keep them watched until `shutdown` is cancelled.
    ///
    /// Each watch gets its own cancellation token that is never a child of
    /// `shutdown`, so a reprovision and a shutdown arriving together cannot
    /// re-arm a watch on the way out.
    ///
    /// # Errors
    ///
    /// - The initial dashboard provisioning error, if it fails.
    /// - [`ProvisioningError::AlreadyRunning`] if the loop is already running.
    /// - [`ProvisioningError::Shutdown`] once `shutdown` is cancelled. The
    ///   armed watch is cancelled first.
    ///
    /// Dropping the returned future (for example by aborting its task) also
    /// cancels the armed watch, and `run` may then be called again.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(ProvisioningError::AlreadyRunning);
        }
        let _running = RunningGuard(&self.running);

        if let Err(err) = self.provision_dashboards().await {
            tracing::error!(error = %err, "Failed to provision dashboards");
            return Err(err);
        }

        loop {
            let watch = self.arm_watch().await;
            // Cancels the watch if this future is dropped mid-wait.
            let _disarm = watch.clone().drop_guard();

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    cancel_polling(&mut *self.polling.lock().await);
                    tracing::info!("Shutdown requested, stopped watching dashboards");
                    return Err(ProvisioningError::Shutdown);
                }
                _ = watch.cancelled() => {
                    tracing::debug!("Dashboard watch cancelled, re-arming");
                }
            }
        }
    }

    async fn arm_watch(&self) -> CancellationToken {
        let mut polling = self.polling.lock().await;
        cancel_polling(&mut polling);

        let token = CancellationToken::new();
        *polling = Some(token.clone());

        if let Some(provisioner) = self.dashboards.load_full() {
            tracing::debug!("Start polling for dashboard changes");
            provisioner.poll_changes(token.clone());

            #[cfg(feature = "metrics")]
            self.record_watch_armed();
        }

        token
    }

    /// Whether a dashboard watch is currently armed.
    pub async fn is_watching(&self) -> bool {
        let polling = self.polling.lock().await;
        matches!(&*polling, Some(token) if !token.is_cancelled())
    }

    /// Snapshot of the active dashboard provisioner.
    ///
    /// `None` until dashboards have been provisioned successfully once.
    pub fn active_dashboards(&self) -> Option<Arc<F::Provisioner>> {
        self.dashboards.load_full()
    }

    /// Resolved path of the named dashboard source in the active set.
    ///
    /// Reads a snapshot of the active provisioner, so a concurrent swap is
    /// observed either entirely or not at all.
    pub fn dashboard_resolved_path(&self, name: &str) -> Option<PathBuf> {
        self.active_dashboards()
            .and_then(|provisioner| provisioner.resolved_path(name))
    }

    /// Whether the named dashboard source in the active set allows UI edits.
    ///
    /// `false` if no dashboards have been provisioned yet.
    pub fn allow_ui_updates(&self, name: &str) -> bool {
        self.active_dashboards()
            .is_some_and(|provisioner| provisioner.allow_ui_updates(name))
    }

    #[cfg(feature = "metrics")]
    fn start_stage(&self, stage: Stage) -> Option<Instant> {
        self.metrics.as_ref().map(|metrics| metrics.start_stage(stage))
    }

    #[cfg(feature = "metrics")]
    fn record_watch_armed(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.record_watch_armed();
        }
    }

    #[cfg(feature = "metrics")]
    fn finish_stage(&self, stage: Stage, timer: Option<Instant>, succeeded: bool) {
        if let (Some(metrics), Some(start)) = (&self.metrics, timer) {
            if succeeded {
                metrics.record_stage_success(stage, start);
            } else {
                metrics.record_stage_failure(stage, start);
            }
        }
    }
}

fn cancel_polling(polling: &mut Option<CancellationToken>) {
    if let Some(token) = polling.take() {
        tracing::debug!("Stop polling for dashboard changes");
        token.cancel();
    }
}

struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct NamedDashboards {
        generation: usize,
        arms: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DashboardProvisioner for NamedDashboards {
        async fn provision(&self) -> std::result::Result<(), BoxError> {
            Ok(())
        }

        fn poll_changes(self: Arc<Self>, _token: CancellationToken) {
            self.arms.fetch_add(1, Ordering::SeqCst);
        }

        fn resolved_path(&self, name: &str) -> Option<PathBuf> {
            Some(PathBuf::from(format!("/gen-{}/{}", self.generation, name)))
        }

        fn allow_ui_updates(&self, name: &str) -> bool {
            name == "editable"
        }
    }

    struct CountingFactory {
        created: AtomicUsize,
        arms: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DashboardProvisionerFactory for CountingFactory {
        type Provisioner = NamedDashboards;

        async fn create(&self, _path: &Path) -> std::result::Result<NamedDashboards, BoxError> {
            let generation = self.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(NamedDashboards {
                generation,
                arms: Arc::clone(&self.arms),
            })
        }
    }

    fn noop(_: &Path) -> std::result::Result<(), BoxError> {
        Ok(())
    }

    fn service() -> (ProvisioningService<CountingFactory>, Arc<AtomicUsize>) {
        let arms = Arc::new(AtomicUsize::new(0));
        let factory = CountingFactory {
            created: AtomicUsize::new(0),
            arms: Arc::clone(&arms),
        };
        let service = ProvisioningService::builder(ProvisioningPaths::from_root("/provisioning"), factory)
            .with_datasources(noop)
            .with_plugins(noop)
            .with_notifiers(noop)
            .build()
            .unwrap();
        (service, arms)
    }

    #[tokio::test]
    async fn test_accessors_before_provisioning() {
        let (service, _) = service();
        assert!(service.active_dashboards().is_none());
        assert_eq!(service.dashboard_resolved_path("default"), None);
        assert!(!service.allow_ui_updates("editable"));
        assert!(!service.is_watching().await);
    }

    #[tokio::test]
    async fn test_provision_dashboards_without_run() {
        let (service, arms) = service();

        service.provision_dashboards().await.unwrap();
        service.provision_dashboards().await.unwrap();

        assert_eq!(
            service.dashboard_resolved_path("default"),
            Some(PathBuf::from("/gen-2/default"))
        );
        assert!(service.allow_ui_updates("editable"));
        assert!(!service.allow_ui_updates("locked"));
        assert_eq!(arms.load(Ordering::SeqCst), 0);
        assert!(!service.is_watching().await);
    }

    #[tokio::test]
    async fn test_run_arms_and_stops() {
        let (service, arms) = service();
        let service = Arc::new(service);
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn({
            let service = Arc::clone(&service);
            let shutdown = shutdown.clone();
            async move { service.run(shutdown).await }
        });

        tokio::time::timeout(Duration::from_secs(2), async {
            while arms.load(Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert!(service.is_watching().await);

        let second = service.run(CancellationToken::new()).await;
        assert!(matches!(second, Err(ProvisioningError::AlreadyRunning)));

        shutdown.cancel();
        let result = handle.await.unwrap();
        assert!(result.unwrap_err().is_shutdown());
        assert!(!service.is_watching().await);
    }

    #[tokio::test]
    async fn test_run_can_restart_after_shutdown() {
        let (service, _) = service();

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        assert!(service.run(shutdown).await.unwrap_err().is_shutdown());

        let shutdown = CancellationToken::new();
        shutdown.cancel();
        assert!(service.run(shutdown).await.unwrap_err().is_shutdown());
    }
}
