//! Error types for hotswap-provisioning.

use crate::provisioner::Stage;

/// Boxed error returned by provisioning collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for hotswap-provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisioningError>;

/// Errors that can occur while provisioning resources.
///
/// Stage failures wrap the collaborator's error, which stays reachable
/// through [`std::error::Error::source`].
#[derive(Debug, thiserror::Error)]
pub enum ProvisioningError {
    /// The data source provisioner failed.
    #[error("datasource provisioning error: {0}")]
    DatasourceError(#[source] BoxError),

    /// The plugin provisioner failed.
    #[error("plugin provisioning error: {0}")]
    PluginError(#[source] BoxError),

    /// The notification channel provisioner failed.
    #[error("alert notification provisioning error: {0}")]
    NotifierError(#[source] BoxError),

    /// A dashboard provisioner could not be constructed.
    #[error("failed to create dashboard provisioner: {0}")]
    DashboardFactoryError(#[source] BoxError),

    /// A freshly constructed dashboard provisioner failed to apply.
    #[error("failed to provision dashboards: {0}")]
    DashboardError(#[source] BoxError),

    /// The shutdown token was cancelled while the watch loop was running.
    #[error("dashboard watch loop stopped: shutdown requested")]
    Shutdown,

    /// The watch loop is already running for this service.
    #[error("dashboard watch loop is already running")]
    AlreadyRunning,

    /// The service builder is missing a required collaborator.
    #[error("missing provisioning collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// File watching failed to initialize.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// Resource path configuration could not be loaded.
    #[error("provisioning configuration error: {0}")]
    ConfigError(String),
}

impl ProvisioningError {
    /// The provisioning stage that failed, if this is a stage failure.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::DatasourceError(_) => Some(Stage::Datasources),
            Self::PluginError(_) => Some(Stage::Plugins),
            Self::NotifierError(_) => Some(Stage::Notifiers),
            Self::DashboardFactoryError(_) | Self::DashboardError(_) => Some(Stage::Dashboards),
            _ => None,
        }
    }

    /// Whether this is the terminal result of a requested shutdown.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, Self::Shutdown)
    }
}

impl From<config::ConfigError> for ProvisioningError {
    fn from(err: config::ConfigError) -> Self {
        ProvisioningError::ConfigError(err.to_string())
    }
}
