//! # Prometheus Metrics
//!
//! Operational metrics for the ledger host. Scraped by Prometheus at the
//! `/metrics` HTTP endpoint on the configured metrics port.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] with
//! the `luigi` prefix so they do not collide with any default global
//! registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Gauge, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

use luigi_protocol::config::{NATIVE_DECIMALS, TOKEN_DECIMALS};

/// Holds all Prometheus metric handles for the host.
///
/// Clone-friendly (prometheus handles are reference-counted) so it can be
/// shared across request handlers and the ledger service.
#[derive(Clone)]
pub struct LedgerMetrics {
    registry: Registry,
    /// Committed operations, by operation name.
    pub operations_total: IntCounterVec,
    /// Rejected operations, by error kind.
    pub rejections_total: IntCounterVec,
    /// Current total supply in whole tokens.
    pub total_supply_tokens: Gauge,
    /// Aggregate custody balance in whole ether.
    pub custody_balance_ether: Gauge,
    /// 1 while the transfer gate is closed.
    pub paused: IntGauge,
    /// Wall time per operation, including the storage commit.
    pub operation_latency_seconds: Histogram,
}

impl LedgerMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("luigi".into()), None)?;

        let operations_total = IntCounterVec::new(
            Opts::new("operations_total", "Committed ledger operations"),
            &["op"],
        )?;
        registry.register(Box::new(operations_total.clone()))?;

        let rejections_total = IntCounterVec::new(
            Opts::new("rejections_total", "Rejected ledger operations by error kind"),
            &["kind"],
        )?;
        registry.register(Box::new(rejections_total.clone()))?;

        let total_supply_tokens =
            Gauge::new("total_supply_tokens", "Total token supply in whole tokens")?;
        registry.register(Box::new(total_supply_tokens.clone()))?;

        let custody_balance_ether = Gauge::new(
            "custody_balance_ether",
            "Native value held in custody, in whole ether",
        )?;
        registry.register(Box::new(custody_balance_ether.clone()))?;

        let paused = IntGauge::new("paused", "1 while transfers and minting are paused")?;
        registry.register(Box::new(paused.clone()))?;

        let operation_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "operation_latency_seconds",
                "Ledger operation latency including the storage commit, in seconds",
            )
            .buckets(vec![
                0.0001, 0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
            ]),
        )?;
        registry.register(Box::new(operation_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            operations_total,
            rejections_total,
            total_supply_tokens,
            custody_balance_ether,
            paused,
            operation_latency_seconds,
        })
    }

    /// Records a committed operation.
    pub fn record_success(&self, op: &str, elapsed: Duration) {
        self.operations_total.with_label_values(&[op]).inc();
        self.operation_latency_seconds.observe(elapsed.as_secs_f64());
    }

    /// Records a rejected operation.
    pub fn record_rejection(&self, kind: &str, elapsed: Duration) {
        self.rejections_total.with_label_values(&[kind]).inc();
        self.operation_latency_seconds.observe(elapsed.as_secs_f64());
    }

    /// Refreshes the ledger gauges.
    pub fn observe_ledger(&self, total_supply: u128, custody: u128, paused: bool) {
        self.total_supply_tokens
            .set(whole_units(total_supply, TOKEN_DECIMALS));
        self.custody_balance_ether
            .set(whole_units(custody, NATIVE_DECIMALS));
        self.paused.set(paused as i64);
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Lossy conversion for gauges; exact figures come from the RPC reads.
fn whole_units(value: u128, decimals: u8) -> f64 {
    value as f64 / 10u128.pow(decimals as u32) as f64
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<LedgerMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
