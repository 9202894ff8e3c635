//! End-to-end engine scenarios: whole runs driven through the public API
//! against scripted workloads, with time paused so wall-clock windows are
//! exact.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use swarmperf::error::{Error, OpError};
use swarmperf::phase::PHASES;
use swarmperf::{
    Document, ExecutionContext, FleetExecutor, Matrix, Phase, PromRecorder, Runctx, ThinkTime,
    Workload,
};

type Body = dyn Fn(&mut Runctx) -> Result<(), OpError> + Send + Sync;

/// A workload with instant, scripted operation bodies that logs every
/// execution per user.
struct Scripted {
    ops: &'static [&'static str],
    matrix: Matrix,
    body: Box<Body>,
    log: Mutex<HashMap<usize, Vec<(String, Instant)>>>,
}

impl Scripted {
    fn new(
        ops: &'static [&'static str],
        matrix: Matrix,
        body: impl Fn(&mut Runctx) -> Result<(), OpError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            ops,
            matrix,
            body: Box::new(body),
            log: Mutex::new(HashMap::new()),
        }
    }

    fn uniform(ops: &'static [&'static str]) -> Self {
        let k = ops.len();
        let matrix = Matrix(vec![vec![1.0 / k as f64; k]; k]);
        Self::new(ops, matrix, |_| Ok(()))
    }

    fn trace_of(&self, user: usize) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .get(&user)
            .map(|entries| entries.iter().map(|(op, _)| op.clone()).collect())
            .unwrap_or_default()
    }

    fn instants_of(&self, user: usize) -> Vec<Instant> {
        self.log
            .lock()
            .unwrap()
            .get(&user)
            .map(|entries| entries.iter().map(|(_, at)| *at).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Workload for Scripted {
    fn operations(&self) -> &'static [&'static str] {
        self.ops
    }

    fn probabilities(&self) -> Matrix {
        self.matrix.clone()
    }

    fn generate_document(&self, id: u64) -> Document {
        Document {
            name: format!("u{id}"),
            data: serde_json::Value::Null,
        }
    }

    async fn execute(
        &self,
        operation: &str,
        _ctx: &ExecutionContext,
        rctx: &mut Runctx,
    ) -> Result<(), OpError> {
        let result = (self.body)(rctx);
        self.log
            .lock()
            .unwrap()
            .entry(rctx.user())
            .or_default()
            .push((operation.to_string(), Instant::now()));
        result
    }

    async fn setup(&self) -> Result<(), Error> {
        Ok(())
    }
}

fn executor(
    workload: Arc<Scripted>,
    recorder: Arc<PromRecorder>,
    users: usize,
    run: Duration,
    ramp: Duration,
) -> FleetExecutor<PromRecorder> {
    FleetExecutor::builder()
        .workload(workload)
        .recorder(recorder)
        .users(users)
        .run_time(run)
        .ramp_time(ramp)
        .think(ThinkTime::Fixed(Duration::from_millis(100)))
        .build()
}

#[tokio::test(start_paused = true)]
async fn single_operation_override_collapses_the_chain() {
    const OPS: [&str; 3] = ["a", "b", "c"];
    let workload = Arc::new(Scripted::uniform(&OPS));
    let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());

    let mut exec = executor(
        workload.clone(),
        recorder.clone(),
        4,
        Duration::from_secs(1),
        Duration::ZERO,
    );
    exec.only_operation = Some("b".to_string());
    let (ctx, control) = ExecutionContext::new();
    exec.run_with(ctx, control).await.unwrap();

    assert!(recorder.attempted_count(1, Phase::Steady) > 0);
    assert_eq!(recorder.failed_count(1, Phase::Steady), 0);
    for phase in PHASES {
        // Operations a and c are never selected, in any phase.
        assert_eq!(recorder.attempted_count(0, phase), 0);
        assert_eq!(recorder.attempted_count(2, phase), 0);
        if phase != Phase::Steady {
            assert_eq!(recorder.attempted_count(1, phase), 0);
        }
    }
    // Every executed operation was b.
    for user in 0..4 {
        assert!(workload.trace_of(user).iter().all(|op| op == "b"));
    }
}

#[tokio::test(start_paused = true)]
async fn markov_walks_are_reproducible_from_the_seed() {
    const OPS: [&str; 3] = ["a", "b", "c"];

    async fn trace(seed: u64) -> Vec<String> {
        let workload = Arc::new(Scripted::uniform(&OPS));
        let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());
        let mut exec = executor(
            workload.clone(),
            recorder,
            1,
            Duration::from_secs(5),
            Duration::ZERO,
        );
        exec.seed = seed;
        let (ctx, control) = ExecutionContext::new();
        exec.run_with(ctx, control).await.unwrap();
        workload.trace_of(0)
    }

    let first = trace(7).await;
    let again = trace(7).await;
    let other = trace(8).await;

    assert!(!first.is_empty());
    assert_eq!(first, again);
    assert_ne!(first, other);
}

#[tokio::test(start_paused = true)]
async fn ramp_windows_label_observations() {
    const OPS: [&str; 1] = ["a"];
    let workload = Arc::new(Scripted::uniform(&OPS));
    let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());

    let exec = executor(
        workload,
        recorder.clone(),
        1,
        Duration::from_secs(3),
        Duration::from_secs(1),
    );
    let (ctx, control) = ExecutionContext::new();
    exec.run_with(ctx, control).await.unwrap();

    for phase in PHASES {
        assert!(
            recorder.observation_count(0, phase) > 0,
            "no observations in {phase:?}"
        );
        assert!(recorder.attempted_count(0, phase) > 0);
        assert_eq!(recorder.failed_count(0, phase), 0);
    }
    // Roughly a third of the run in each phase with a 100ms cadence.
    let steady = recorder.observation_count(0, Phase::Steady);
    assert!((5..=15).contains(&steady), "steady observations: {steady}");
}

#[tokio::test(start_paused = true)]
async fn zero_ramp_stays_steady() {
    const OPS: [&str; 1] = ["a"];
    let workload = Arc::new(Scripted::uniform(&OPS));
    let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());

    let exec = executor(
        workload,
        recorder.clone(),
        2,
        Duration::from_secs(2),
        Duration::ZERO,
    );
    let (ctx, control) = ExecutionContext::new();
    exec.run_with(ctx, control).await.unwrap();

    assert!(recorder.observation_count(0, Phase::Steady) > 0);
    for phase in [Phase::RampUp, Phase::RampDown] {
        assert_eq!(recorder.observation_count(0, phase), 0);
        assert_eq!(recorder.attempted_count(0, phase), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn failures_are_counted_and_still_timed() {
    const OPS: [&str; 1] = ["flaky"];
    let workload = Arc::new(Scripted::new(
        &OPS,
        Matrix(vec![vec![1.0]]),
        |rctx: &mut Runctx| {
            use rand::Rng;
            if rctx.rng().gen_bool(0.5) {
                Err("injected failure".into())
            } else {
                Ok(())
            }
        },
    ));
    let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());

    let exec = executor(
        workload,
        recorder.clone(),
        1,
        Duration::from_secs(5),
        Duration::ZERO,
    );
    let (ctx, control) = ExecutionContext::new();
    exec.run_with(ctx, control).await.unwrap();

    let attempted = recorder.attempted_count(0, Phase::Steady);
    let failed = recorder.failed_count(0, Phase::Steady);
    let observed = recorder.observation_count(0, Phase::Steady);

    assert!(failed <= attempted);
    // A latency observation exists for every completed attempt, success or
    // failure. The final attempt may have been cancelled mid-think.
    assert!(observed >= attempted.saturating_sub(1));
    // ~50 attempts at a fair coin: statistically comfortable bounds.
    assert!((10..=40).contains(&failed), "failed: {failed}");
}

#[tokio::test(start_paused = true)]
async fn fixed_think_time_spaces_operations() {
    const OPS: [&str; 1] = ["a"];
    let workload = Arc::new(Scripted::uniform(&OPS));
    let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());

    let exec = executor(
        workload.clone(),
        recorder,
        1,
        Duration::from_secs(2),
        Duration::ZERO,
    );
    let (ctx, control) = ExecutionContext::new();
    exec.run_with(ctx, control).await.unwrap();

    let instants = workload.instants_of(0);
    assert!(instants.len() > 1);
    for pair in instants.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(100));
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_a_large_fleet_promptly() {
    const OPS: [&str; 2] = ["a", "b"];
    let workload = Arc::new(Scripted::uniform(&OPS));
    let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());

    let mut exec = executor(
        workload,
        recorder.clone(),
        1000,
        Duration::from_secs(60),
        Duration::from_secs(10),
    );
    exec.think = ThinkTime::Random;

    let (ctx, control) = ExecutionContext::new();
    let canceller = control.canceller();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(2)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    exec.run_with(ctx, control).await.unwrap();
    let elapsed = started.elapsed();

    // Cancel at 2s, plus at most one maximum think time and a grace window.
    assert!(
        elapsed <= Duration::from_secs(2) + Duration::from_millis(5200),
        "run took {elapsed:?} after cancel"
    );

    // Nothing ran long enough to leave the ramp-up window.
    for op in 0..OPS.len() {
        assert_eq!(recorder.attempted_count(op, Phase::Steady), 0);
        assert_eq!(recorder.attempted_count(op, Phase::RampDown), 0);
    }
}

#[tokio::test(start_paused = true)]
#[should_panic(expected = "user runner panicked")]
async fn a_panicking_workload_body_is_loud() {
    const OPS: [&str; 1] = ["boom"];
    let workload = Arc::new(Scripted::new(&OPS, Matrix(vec![vec![1.0]]), |_| {
        panic!("broken workload body")
    }));
    let recorder = Arc::new(PromRecorder::new(&OPS).unwrap());

    let exec = executor(
        workload,
        recorder,
        1,
        Duration::from_secs(1),
        Duration::ZERO,
    );
    let (ctx, control) = ExecutionContext::new();
    let _ = exec.run_with(ctx, control).await;
}
