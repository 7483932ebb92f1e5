//! # hotswap-provisioning
//!
//! Startup provisioning of infrastructure resources, with dashboards kept in
//! sync with their on-disk definitions for the life of the process.
//!
//! ## Overview
//!
//! `hotswap-provisioning` orchestrates four resource loaders:
//! - Data sources, plugins and notification channels are applied once, in
//!   that order, failing fast on the first error
//! - Dashboards are applied, then watched for changes by exactly one armed
//!   watch at a time
//! - The watched dashboard set can be replaced at any time without a restart
//! - A replacement that fails to apply leaves the previous set active and
//!   watched
//!
//! The loaders themselves are supplied by the application through the
//! traits in [`provisioner`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hotswap_provisioning::prelude::*;
//! use std::path::Path;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! fn apply(_path: &Path) -> Result<(), BoxError> {
//!     Ok(())
//! }
//!
//! # async fn example<F: DashboardProvisionerFactory + 'static>(factory: F) -> hotswap_provisioning::error::Result<()> {
//! let paths = ProvisioningPaths::builder()
//!     .with_root("conf/provisioning")
//!     .with_env_overrides("APP_PROVISIONING", "__")
//!     .build()?;
//!
//! let service = ProvisioningService::builder(paths, factory)
//!     .with_datasources(apply)
//!     .with_plugins(apply)
//!     .with_notifiers(apply)
//!     .build()?;
//!
//! service.init().await?;
//!
//! let service = Arc::new(service);
//! let shutdown = CancellationToken::new();
//! tokio::spawn({
//!     let service = Arc::clone(&service);
//!     async move { service.run(shutdown).await }
//! });
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): [`watch::ChangeWatcher`] for dashboard
//!   provisioners that watch files on disk
//! - `metrics`: OpenTelemetry metrics for every provisioning stage

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod error;
pub mod provisioner;
pub mod service;
pub mod settings;

#[cfg(feature = "file-watch")]
pub mod watch;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::error::{BoxError, ProvisioningError};
    pub use crate::provisioner::{
        DashboardProvisioner, DashboardProvisionerFactory, ResourceProvisioner, Stage,
    };
    pub use crate::service::{ProvisioningService, ProvisioningServiceBuilder};
    pub use crate::settings::ProvisioningPaths;
}
