//! One virtual user's perpetual loop.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{Instrument, debug, error, info_span};

use crate::matrix::Matrix;
use crate::metrics::Recorder;
use crate::phase::RunWindow;
use crate::think::ThinkTime;
use crate::workload::{Runctx, Workload};

use super::ExecutionContext;

/// Read-only state shared by every runner in a fleet.
pub struct Shared<R: Recorder> {
    pub workload: Arc<dyn Workload>,
    pub recorder: Arc<R>,
    pub operations: &'static [&'static str],
    pub matrix: Matrix,
    pub window: RunWindow,
    pub think: ThinkTime,
    pub seed: u64,
}

/// Run one user until cancellation or the deadline.
///
/// Each iteration: sample the next operation, count the attempt, sleep the
/// think time, execute, then attribute the latency (and any failure) to the
/// phase the operation *finished* in. The think sleep is cancellable so a
/// fleet mid-think shuts down promptly; the operation itself is not, so
/// work in flight completes and is recorded.
pub async fn user_loop<R: Recorder>(
    mut ctx: ExecutionContext,
    shared: Arc<Shared<R>>,
    user: usize,
) {
    if ctx.start.wait_for(|started| *started).await.is_err() {
        return;
    }

    debug!(user, "starting runner");
    let mut rctx = Runctx::new(user, shared.seed);
    let mut current = 0;

    loop {
        // Stop before starting a new operation.
        if *ctx.shutdown.borrow() {
            break;
        }

        let next = shared.matrix.sample(current, rctx.rng());
        let name = shared.operations[next];
        shared.recorder.attempted(next, shared.window.phase_now());

        let pause = shared.think.sample(rctx.rng());
        tokio::select! {
            _ = tokio::time::sleep(pause) => {}
            _ = ctx.shutdown.wait_for(|cancelled| *cancelled) => break,
        }

        let started = Instant::now();
        let result = shared
            .workload
            .execute(name, &ctx, &mut rctx)
            .instrument(info_span!("operation", operation = name, user))
            .await;
        let finished = Instant::now();

        let phase = shared.window.phase(finished);
        shared.recorder.observe(next, phase, finished - started);
        if let Err(error) = result {
            error!(user, operation = name, %error, "operation failed");
            shared.recorder.failed(next, phase);
        }

        current = next;
    }

    debug!(user, "runner stopped");
}
