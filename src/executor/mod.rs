//! Executor — orchestration of one workload run.
//!
//! The [`FleetExecutor`] spawns one Tokio task per virtual user and joins
//! them when the run ends. Users are cheap cooperative tasks, so fleets of
//! tens of thousands are fine. There is no rate control anywhere: load is
//! shaped purely by user count and think time, which is what keeps the
//! generator open-loop.
//!
//! # High-level flow
//! 1. Validate the run frame (`ramp ≤ run/2`) and resolve the probability
//!    matrix (single-operation override, explicit config, or the workload
//!    default).
//! 2. Create the shared [`ExecutionContext`]: a start signal plus a shutdown
//!    signal, both `watch` channels observed by every runner.
//! 3. Spawn the deadline task (cancels at `start + run_time`) and the `U`
//!    user loops, each seeded `(seed + user)`.
//! 4. Fire the start signal so all users begin at the same wall-clock time.
//!    Ramp behavior is produced by phase-labelling outcomes, not by gradual
//!    spawning.
//! 5. Wait for every runner to finish. Cancellation (deadline or interrupt)
//!    stops a runner before its next operation; an operation already in
//!    flight completes and is still recorded.
//!
//! Panics inside a workload body are not recovered: a programming error in a
//! workload must be loud, so runner joins propagate them.

pub mod user;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::info;
use typed_builder::TypedBuilder;

use crate::error::Error;
use crate::matrix::{self, Matrix};
use crate::metrics::Recorder;
use crate::phase::RunWindow;
use crate::think::ThinkTime;
use crate::workload::Workload;

/// Default global seed; per-user streams derive from `seed + user`.
pub const DEFAULT_SEED: u64 = 11211;

/// Handles shared by every runner: the collective start signal and the
/// cancellation signal. Clone one per task; `watch` receivers are
/// independent cursors.
#[derive(Clone)]
pub struct ExecutionContext {
    pub start: watch::Receiver<bool>,
    pub shutdown: watch::Receiver<bool>,
}

impl ExecutionContext {
    pub fn new() -> (Self, RunControl) {
        let (start_tx, start) = watch::channel(false);
        let (shutdown_tx, shutdown) = watch::channel(false);
        (
            Self { start, shutdown },
            RunControl {
                start: start_tx,
                shutdown: Arc::new(shutdown_tx),
            },
        )
    }

    /// Has the run been cancelled?
    pub fn is_cancelled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolve once the run is cancelled. Long-running operation bodies can
    /// select against this.
    pub async fn cancelled(&self) {
        let mut shutdown = self.shutdown.clone();
        // An error means the control side is gone, which is as good as
        // cancelled.
        let _ = shutdown.wait_for(|cancelled| *cancelled).await;
    }
}

/// The sending side of an [`ExecutionContext`]. Held by the supervisor.
pub struct RunControl {
    start: watch::Sender<bool>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl RunControl {
    /// A handle that cancels the run. Cloneable; cancelling twice is a
    /// no-op.
    pub fn canceller(&self) -> Canceller {
        Canceller(self.shutdown.clone())
    }

    fn begin(&self) {
        let _ = self.start.send(true);
    }
}

/// Cancels the run it was taken from. The deadline timer, the interrupt
/// handler, and tests all funnel through this one idempotent signal.
#[derive(Clone)]
pub struct Canceller(Arc<watch::Sender<bool>>);

impl Canceller {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

/// Drives a fleet of virtual users through one workload run.
#[derive(TypedBuilder)]
pub struct FleetExecutor<R: Recorder + 'static> {
    pub workload: Arc<dyn Workload>,
    pub recorder: Arc<R>,
    /// Number of concurrent virtual users.
    pub users: usize,
    /// Total wall-clock duration of the run.
    pub run_time: Duration,
    /// RampUp/RampDown labelling window. Must not exceed half the run time.
    #[builder(default = Duration::ZERO)]
    pub ramp_time: Duration,
    #[builder(default)]
    pub think: ThinkTime,
    #[builder(default = DEFAULT_SEED)]
    pub seed: u64,
    /// Collapse the Markov chain to this one operation.
    #[builder(default, setter(strip_option, into))]
    pub only_operation: Option<String>,
    /// Explicit transition matrix overriding the workload default.
    #[builder(default, setter(strip_option))]
    pub chain: Option<Matrix>,
}

impl<R: Recorder + 'static> FleetExecutor<R> {
    /// Run with an interrupt handler installed: Ctrl-C cancels the fleet the
    /// same way the deadline does.
    pub async fn run(&self) -> Result<(), Error> {
        let (ctx, control) = ExecutionContext::new();
        let canceller = control.canceller();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling run");
                canceller.cancel();
            }
        });
        self.run_with(ctx, control).await
    }

    /// Run with caller-supplied control, for embedding and tests. Returns
    /// once every runner has stopped, whether by deadline or cancellation.
    pub async fn run_with(&self, ctx: ExecutionContext, control: RunControl) -> Result<(), Error> {
        if self.users == 0 {
            return Err(Error::NoUsers);
        }
        if self.run_time.is_zero() {
            return Err(Error::NoRunTime);
        }
        if self.ramp_time > self.run_time / 2 {
            return Err(Error::RampTooLong);
        }

        let operations = self.workload.operations();
        let matrix = matrix::resolve(
            operations,
            self.only_operation.as_deref(),
            self.chain.as_ref(),
            self.workload.probabilities(),
        )?;

        let window = RunWindow::begin(self.run_time, self.ramp_time);
        let shared = Arc::new(user::Shared {
            workload: self.workload.clone(),
            recorder: self.recorder.clone(),
            operations,
            matrix,
            window,
            think: self.think,
            seed: self.seed,
        });

        let deadline = {
            let canceller = control.canceller();
            tokio::spawn(async move {
                tokio::time::sleep_until(window.end()).await;
                info!("run time reached, cancelling run");
                canceller.cancel();
            })
        };

        info!(users = self.users, "spawning user runners");
        let runners: Vec<_> = (0..self.users)
            .map(|u| tokio::spawn(user::user_loop(ctx.clone(), shared.clone(), u)))
            .collect();

        info!("running workload");
        control.begin();

        for joined in join_all(runners).await {
            joined.expect("user runner panicked");
        }
        deadline.abort();

        info!("all runners stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::OpError;
    use crate::metrics::NoopRecorder;
    use crate::workload::{Document, Runctx};

    struct Idle;

    #[async_trait]
    impl Workload for Idle {
        fn operations(&self) -> &'static [&'static str] {
            &["noop"]
        }

        fn probabilities(&self) -> Matrix {
            Matrix(vec![vec![1.0]])
        }

        fn generate_document(&self, id: u64) -> Document {
            Document {
                name: format!("u{id}"),
                data: serde_json::Value::Null,
            }
        }

        async fn execute(
            &self,
            _operation: &str,
            _ctx: &ExecutionContext,
            _rctx: &mut Runctx,
        ) -> Result<(), OpError> {
            Ok(())
        }

        async fn setup(&self) -> Result<(), Error> {
            Ok(())
        }
    }

    fn executor(run: Duration, ramp: Duration) -> FleetExecutor<NoopRecorder> {
        FleetExecutor::builder()
            .workload(Arc::new(Idle))
            .recorder(Arc::new(NoopRecorder))
            .users(2)
            .run_time(run)
            .ramp_time(ramp)
            .think(ThinkTime::Fixed(Duration::from_millis(100)))
            .build()
    }

    #[tokio::test(start_paused = true)]
    async fn ramp_of_half_the_run_time_is_accepted() {
        let exec = executor(Duration::from_secs(2), Duration::from_secs(1));
        let (ctx, control) = ExecutionContext::new();
        exec.run_with(ctx, control).await.unwrap();
    }

    #[tokio::test]
    async fn ramp_beyond_half_the_run_time_is_rejected() {
        let exec = executor(Duration::from_secs(2), Duration::from_millis(1001));
        let (ctx, control) = ExecutionContext::new();
        let err = exec.run_with(ctx, control).await.unwrap_err();
        assert!(matches!(err, Error::RampTooLong));
    }

    #[tokio::test]
    async fn zero_users_is_rejected() {
        let mut exec = executor(Duration::from_secs(1), Duration::ZERO);
        exec.users = 0;
        let (ctx, control) = ExecutionContext::new();
        assert!(matches!(
            exec.run_with(ctx, control).await,
            Err(Error::NoUsers)
        ));
    }

    #[tokio::test]
    async fn unknown_only_operation_is_fatal() {
        let mut exec = executor(Duration::from_secs(1), Duration::ZERO);
        exec.only_operation = Some("absent".to_string());
        let (ctx, control) = ExecutionContext::new();
        assert!(matches!(
            exec.run_with(ctx, control).await,
            Err(Error::UnknownOperation(_))
        ));
    }

    #[tokio::test]
    async fn cancelling_twice_is_a_no_op() {
        let (ctx, control) = ExecutionContext::new();
        let canceller = control.canceller();
        canceller.cancel();
        canceller.cancel();
        assert!(ctx.is_cancelled());
    }
}
