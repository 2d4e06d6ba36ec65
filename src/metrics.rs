//! Metrics collection for the mint pipeline

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub submissions_total: IntCounter,
    pub submissions_confirmed: IntCounter,
    pub submissions_failed: IntCounterVec,
    pub airdrops_requested: IntCounter,
    pub airdrop_lamports: IntCounter,

    // Histograms
    pub confirmation_latency: Histogram,
    pub confirmation_polls: Histogram,
    pub build_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let submissions_total = IntCounter::with_opts(Opts::new(
            "mint_submissions_total",
            "Mint transactions transmitted",
        ))?;

        let submissions_confirmed = IntCounter::with_opts(Opts::new(
            "mint_submissions_confirmed",
            "Mint transactions that reached the target commitment",
        ))?;

        let submissions_failed = IntCounterVec::new(
            Opts::new(
                "mint_submissions_failed",
                "Mint transactions that failed, by error category",
            ),
            &["category"],
        )?;

        let airdrops_requested = IntCounter::with_opts(Opts::new(
            "airdrops_requested",
            "Airdrops requested to fund the payer",
        ))?;

        let airdrop_lamports = IntCounter::with_opts(Opts::new(
            "airdrop_lamports",
            "Lamports requested through airdrops",
        ))?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "confirmation_latency_seconds",
                "Time from transmission to terminal status",
            )
            .buckets(vec![0.4, 0.8, 1.6, 3.2, 6.4, 12.8, 25.6, 51.2]),
        )?;

        let confirmation_polls = Histogram::with_opts(
            HistogramOpts::new("confirmation_polls", "Status queries per submission")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0]),
        )?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new("build_latency_seconds", "Transaction build latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
        )?;

        // Register all metrics
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_confirmed.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(airdrops_requested.clone()))?;
        registry.register(Box::new(airdrop_lamports.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;
        registry.register(Box::new(confirmation_polls.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;

        Ok(Self {
            registry,
            submissions_total,
            submissions_confirmed,
            submissions_failed,
            airdrops_requested,
            airdrop_lamports,
            confirmation_latency,
            confirmation_polls,
            build_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Count a failed submission under its error category
    pub fn record_failure(&self, category: &str) {
        self.submissions_failed.with_label_values(&[category]).inc();
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

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
