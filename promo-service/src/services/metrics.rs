//! Metrics collection for promo-service.
//!
//! HTTP request metrics come from the `metrics` recorder installed here;
//! redemption counters live in a separate Prometheus registry.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prometheus::{IntCounterVec, Opts, Registry};
use std::sync::OnceLock;

pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
pub static PROMETHEUS_REGISTRY: OnceLock<Registry> = OnceLock::new();
pub static PROMO_REDEMPTIONS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static PROMO_APPLIER_CALLS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();

/// Initialize metrics collection. Safe to call more than once.
pub fn init_metrics() {
    if METRICS_HANDLE.get().is_none() {
        match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                let _ = METRICS_HANDLE.set(handle);
            }
            Err(e) => tracing::warn!("Failed to install Prometheus recorder: {}", e),
        }
    }

    if PROMETHEUS_REGISTRY.get().is_some() {
        return;
    }

    let registry = Registry::new();

    let redemptions = match IntCounterVec::new(
        Opts::new(
            "promo_redemptions_total",
            "Token redemption attempts by outcome",
        ),
        &["outcome"],
    ) {
        Ok(counter) => counter,
        Err(e) => {
            tracing::warn!("Failed to create promo_redemptions_total: {}", e);
            return;
        }
    };

    let applier_calls = match IntCounterVec::new(
        Opts::new(
            "promo_applier_calls_total",
            "External code applier calls by applier and status",
        ),
        &["applier", "status"],
    ) {
        Ok(counter) => counter,
        Err(e) => {
            tracing::warn!("Failed to create promo_applier_calls_total: {}", e);
            return;
        }
    };

    for collector in [redemptions.clone(), applier_calls.clone()] {
        if let Err(e) = registry.register(Box::new(collector)) {
            tracing::warn!("Failed to register promo metric: {}", e);
        }
    }

    let _ = PROMETHEUS_REGISTRY.set(registry);
    let _ = PROMO_REDEMPTIONS_TOTAL.set(redemptions);
    let _ = PROMO_APPLIER_CALLS_TOTAL.set(applier_calls);
}

/// Get metrics output in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_else(|| "# Metrics recorder not initialized\n".to_string());

    if let Some(registry) = PROMETHEUS_REGISTRY.get() {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&registry.gather(), &mut buffer).ok();
        if let Ok(custom_metrics) = String::from_utf8(buffer) {
            output.push_str(&custom_metrics);
        }
    }

    output
}

/// Outcome labels: `applied`, `failed`, or the rejection code.
pub fn record_redemption(outcome: &str) {
    if let Some(counter) = PROMO_REDEMPTIONS_TOTAL.get() {
        counter.with_label_values(&[outcome]).inc();
    }
}

pub fn record_applier_call(applier: &str, status: &str) {
    if let Some(counter) = PROMO_APPLIER_CALLS_TOTAL.get() {
        counter.with_label_values(&[applier, status]).inc();
    }
}
