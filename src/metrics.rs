//! Metric collection and exposition.
//!
//! Three series exist, each labelled by `(operation, phase)`:
//! `operations_total` and `operations_failed_total` counters and the
//! `operation_duration_milliseconds` histogram. They live in a non-global
//! [`Registry`] scraped over HTTP.
//!
//! Every runner holds the same recorder; prometheus handles are internally
//! atomic, so concurrent increments from tens of thousands of tasks need no
//! further locking. The `(operation, phase)` handle table is built once when
//! the recorder is created, never looked up per iteration.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use tracing::info;

use crate::error::Error;
use crate::phase::{PHASES, Phase};

/// Fixed well-known scrape port.
pub const METRICS_PORT: u16 = 2112;

/// Histogram bucket schedule: ~0.15 ms up to ~2.5 s, factor 1.5.
fn duration_buckets() -> Vec<f64> {
    prometheus::exponential_buckets(0.15, 1.5, 25).expect("static bucket schedule")
}

/// Where runners record outcomes. Implementations never block; metric
/// updates sit on the runner hot path.
pub trait Recorder: Send + Sync {
    /// Count one attempt of operation `op` in `phase`.
    fn attempted(&self, op: usize, phase: Phase);

    /// Count one failure of operation `op` in `phase`.
    fn failed(&self, op: usize, phase: Phase);

    /// Record the latency of one invocation of operation `op` in `phase`.
    fn observe(&self, op: usize, phase: Phase, elapsed: Duration);
}

/// A recorder that discards every observation. Lets the engine run in unit
/// tests without a registry or an HTTP port.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {
    fn attempted(&self, _op: usize, _phase: Phase) {}
    fn failed(&self, _op: usize, _phase: Phase) {}
    fn observe(&self, _op: usize, _phase: Phase, _elapsed: Duration) {}
}

struct Cells {
    attempted: IntCounter,
    failed: IntCounter,
    duration: Histogram,
}

/// Prometheus-backed [`Recorder`]: one bound handle per
/// `(operation, phase)`, resolved up front so the hot path is two atomic
/// adds and a histogram observe.
pub struct PromRecorder {
    registry: Registry,
    cells: Vec<[Cells; 3]>,
}

impl PromRecorder {
    /// Create the three series in a fresh registry and bind a handle for
    /// every `(operation, phase)` pair.
    pub fn new(operations: &[&'static str]) -> Result<Self, Error> {
        let registry = Registry::new();
        let labels = ["operation", "phase"];

        let attempted = IntCounterVec::new(
            Opts::new(
                "operations_total",
                "How many user operations were attempted, partitioned by operation and phase.",
            ),
            &labels,
        )
        .map_err(|e| Error::Setup(e.to_string()))?;
        let failed = IntCounterVec::new(
            Opts::new(
                "operations_failed_total",
                "How many user operations failed, partitioned by operation and phase.",
            ),
            &labels,
        )
        .map_err(|e| Error::Setup(e.to_string()))?;
        let duration = HistogramVec::new(
            HistogramOpts::new(
                "operation_duration_milliseconds",
                "Duration of user operations in milliseconds, partitioned by operation and phase.",
            )
            .buckets(duration_buckets()),
            &labels,
        )
        .map_err(|e| Error::Setup(e.to_string()))?;

        registry
            .register(Box::new(attempted.clone()))
            .and_then(|_| registry.register(Box::new(failed.clone())))
            .and_then(|_| registry.register(Box::new(duration.clone())))
            .map_err(|e| Error::Setup(e.to_string()))?;

        let cells = operations
            .iter()
            .map(|op| {
                PHASES.map(|phase| {
                    let values = [*op, phase.as_label()];
                    Cells {
                        attempted: attempted.with_label_values(&values),
                        failed: failed.with_label_values(&values),
                        duration: duration.with_label_values(&values),
                    }
                })
            })
            .collect();

        Ok(Self { registry, cells })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Scrape-side accessor, mainly for assertions.
    pub fn attempted_count(&self, op: usize, phase: Phase) -> u64 {
        self.cells[op][phase.index()].attempted.get()
    }

    /// Scrape-side accessor, mainly for assertions.
    pub fn failed_count(&self, op: usize, phase: Phase) -> u64 {
        self.cells[op][phase.index()].failed.get()
    }

    /// Number of latency observations for one `(operation, phase)`.
    pub fn observation_count(&self, op: usize, phase: Phase) -> u64 {
        self.cells[op][phase.index()].duration.get_sample_count()
    }
}

impl Recorder for PromRecorder {
    fn attempted(&self, op: usize, phase: Phase) {
        self.cells[op][phase.index()].attempted.inc();
    }

    fn failed(&self, op: usize, phase: Phase) {
        self.cells[op][phase.index()].failed.inc();
    }

    fn observe(&self, op: usize, phase: Phase, elapsed: Duration) {
        self.cells[op][phase.index()]
            .duration
            .observe(elapsed.as_secs_f64() * 1000.0);
    }
}

async fn render(registry: Registry) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&registry.gather(), &mut buffer) {
        Ok(()) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
            .body(Body::from(buffer))
            .unwrap(),
        Err(e) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Body::from(format!("failed to encode metrics: {e}")))
            .unwrap(),
    }
}

/// Serve `/metrics` for the given registry on the fixed port. Runs until the
/// process exits; spawn it alongside the run.
pub async fn serve(registry: Registry) -> std::io::Result<()> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let registry = registry.clone();
            async move { render(registry).await }
        }),
    );
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", METRICS_PORT)).await?;
    info!(port = METRICS_PORT, "serving metrics");
    axum::serve(listener, app).await
}
