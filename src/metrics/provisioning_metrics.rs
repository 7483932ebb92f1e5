//! Provisioning metrics tracking using OpenTelemetry.

use crate::provisioner::Stage;
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metrics collector for provisioning operations.
///
/// Every stage counter carries a `stage` attribute
/// (`datasources`, `plugins`, `notifiers`, `dashboards`).
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_provisioning::metrics::ProvisioningMetrics;
/// use hotswap_provisioning::provisioner::Stage;
/// use opentelemetry::global;
///
/// let metrics = ProvisioningMetrics::new(global::meter("hotswap-provisioning"));
///
/// let timer = metrics.start_stage(Stage::Dashboards);
/// // ... reprovision dashboards ...
/// metrics.record_stage_success(Stage::Dashboards, timer);
/// ```
#[derive(Clone)]
pub struct ProvisioningMetrics {
    stage_attempts: Counter<u64>,
    stage_failures: Counter<u64>,
    dashboard_swap_duration: Histogram<f64>,
    watch_arms: Counter<u64>,
    dashboards_age_seconds: Gauge<i64>,
    /// `None` until the first dashboard set is swapped in.
    last_swap: Arc<parking_lot::Mutex<Option<Instant>>>,
}

impl ProvisioningMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let stage_attempts = meter
            .u64_counter("hotswap_provisioning.stage.attempts")
            .with_description("Number of provisioning attempts per stage")
            .build();

        let stage_failures = meter
            .u64_counter("hotswap_provisioning.stage.failures")
            .with_description("Number of failed provisioning attempts per stage")
            .build();

        let dashboard_swap_duration = meter
            .f64_histogram("hotswap_provisioning.dashboards.reprovision.duration")
            .with_description("Duration of dashboard reprovisioning in seconds")
            .with_unit("s")
            .build();

        let watch_arms = meter
            .u64_counter("hotswap_provisioning.dashboards.watch.arms")
            .with_description("Number of times a dashboard watch was armed")
            .build();

        let dashboards_age_seconds = meter
            .i64_gauge("hotswap_provisioning.dashboards.age")
            .with_description("Time since the active dashboard set was swapped in")
            .with_unit("s")
            .build();

        Self {
            stage_attempts,
            stage_failures,
            dashboard_swap_duration,
            watch_arms,
            dashboards_age_seconds,
            last_swap: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// Record the start of a stage and return its timer.
    pub fn start_stage(&self, stage: Stage) -> Instant {
        self.stage_attempts.add(1, &[stage_attr(stage)]);
        Instant::now()
    }

    /// Record a successful stage.
    ///
    /// For dashboards this also records the reprovision duration and resets
    /// the age of the active dashboard set.
    pub fn record_stage_success(&self, stage: Stage, start: Instant) {
        if stage == Stage::Dashboards {
            self.dashboard_swap_duration
                .record(start.elapsed().as_secs_f64(), &[]);
            *self.last_swap.lock() = Some(Instant::now());
        }
    }

    /// Record a failed stage.
    pub fn record_stage_failure(&self, stage: Stage, start: Instant) {
        self.stage_failures.add(1, &[stage_attr(stage)]);
        if stage == Stage::Dashboards {
            self.dashboard_swap_duration
                .record(start.elapsed().as_secs_f64(), &[]);
        }
    }

    /// Record that a dashboard watch was armed.
    pub fn record_watch_armed(&self) {
        self.watch_arms.add(1, &[]);
    }

    /// Update the dashboard age gauge.
    ///
    /// This should be called periodically to track how stale the active
    /// dashboard set is. Nothing is recorded before the first successful
    /// dashboard swap.
    pub fn update_dashboards_age(&self) {
        if let Some(age) = self.dashboards_age() {
            self.dashboards_age_seconds.record(age.as_secs() as i64, &[]);
        }
    }

    fn dashboards_age(&self) -> Option<Duration> {
        (*self.last_swap.lock()).map(|swapped| swapped.elapsed())
    }
}

fn stage_attr(stage: Stage) -> KeyValue {
    KeyValue::new("stage", stage.as_str())
}
