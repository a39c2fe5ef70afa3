//! Metrics collection and export module

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::time::Instant;

/// Process-wide batch metrics
pub struct Metrics {
    registry: Registry,

    // Counters
    pub batches_submitted: IntCounter,
    pub batches_succeeded: IntCounter,
    pub batches_failed: IntCounterVec,
    pub instructions_planned: IntCounter,
    pub accounts_created: IntCounter,

    // Gauges
    pub batches_in_flight: IntGauge,

    // Histograms
    pub submit_latency: Histogram,
    pub confirm_latency: Histogram,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let batches_submitted = IntCounter::with_opts(Opts::new(
            "multisend_batches_submitted_total",
            "Batches handed to the executor",
        ))?;

        let batches_succeeded = IntCounter::with_opts(Opts::new(
            "multisend_batches_succeeded_total",
            "Batches confirmed on chain",
        ))?;

        let batches_failed = IntCounterVec::new(
            Opts::new(
                "multisend_batches_failed_total",
                "Batches that failed, by error category",
            ),
            &["category"],
        )?;

        let instructions_planned = IntCounter::with_opts(Opts::new(
            "multisend_instructions_planned_total",
            "Instructions produced by the planner",
        ))?;

        let accounts_created = IntCounter::with_opts(Opts::new(
            "multisend_token_accounts_created_total",
            "Associated token account creations planned",
        ))?;

        let batches_in_flight = IntGauge::with_opts(Opts::new(
            "multisend_batches_in_flight",
            "Batches currently being submitted",
        ))?;

        let submit_latency = Histogram::with_opts(
            HistogramOpts::new(
                "multisend_submit_latency_seconds",
                "Time from plan to confirmation",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let confirm_latency = Histogram::with_opts(
            HistogramOpts::new(
                "multisend_confirm_latency_seconds",
                "Time spent waiting for confirmation",
            )
            .buckets(vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        registry.register(Box::new(batches_submitted.clone()))?;
        registry.register(Box::new(batches_succeeded.clone()))?;
        registry.register(Box::new(batches_failed.clone()))?;
        registry.register(Box::new(instructions_planned.clone()))?;
        registry.register(Box::new(accounts_created.clone()))?;
        registry.register(Box::new(batches_in_flight.clone()))?;
        registry.register(Box::new(submit_latency.clone()))?;
        registry.register(Box::new(confirm_latency.clone()))?;

        Ok(Self {
            registry,
            batches_submitted,
            batches_succeeded,
            batches_failed,
            instructions_planned,
            accounts_created,
            batches_in_flight,
            submit_latency,
            confirm_latency,
        })
    }

    pub fn record_failure(&self, category: &str) {
        self.batches_failed.with_label_values(&[category]).inc();
    }

    /// Prometheus text exposition of every registered metric
    pub fn render(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
