//! Built-in metrics for provisioning operations.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Attempts and failures per provisioning stage
//! - Dashboard reprovision duration
//! - Dashboard watch arms
//! - Time since the last successful dashboard swap
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotswap_provisioning::metrics::ProvisioningMetrics;
//! use opentelemetry::global;
//!
//! let metrics = ProvisioningMetrics::new(global::meter("my-app"));
//! // Pass to ProvisioningServiceBuilder::with_metrics
//! # let _ = metrics;
//! ```

mod provisioning_metrics;

pub use provisioning_metrics::ProvisioningMetrics;
