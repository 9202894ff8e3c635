//! The [`Workload`] contract: the seam between the execution engine and the
//! code that actually talks to the system under test.
//!
//! A workload is defined by:
//! - the documents it operates on,
//! - the named operations it performs on those documents,
//! - the probability matrix giving the likelihood of one operation following
//!   another.
//!
//! The engine treats operation bodies as black boxes: it samples the next
//! operation, sleeps the think time, invokes the body, and records the
//! outcome. Bodies must draw all randomness from [`Runctx::rng`] so a user's
//! trace is reproducible from its seed, and must not sleep on their own.

use async_trait::async_trait;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde_json::Value;

use crate::error::{Error, OpError};
use crate::executor::ExecutionContext;
use crate::matrix::Matrix;

/// A named document handed to the setup loader. The payload schema is opaque
/// to the engine; it is whatever the workload's generator produces.
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub name: String,
    pub data: Value,
}

/// Per-runner state with immutable identity: the user's index and its own
/// seeded RNG. Each runner exclusively owns its `Runctx`; nothing here is
/// shared. All workload-side randomness must come from [`Runctx::rng`].
#[derive(Debug)]
pub struct Runctx {
    user: usize,
    rng: SmallRng,
}

impl Runctx {
    /// Seed the context for one user. Runners are seeded `(seed + user)` so
    /// their streams are deterministic and non-correlated.
    pub fn new(user: usize, seed: u64) -> Self {
        Self {
            user,
            rng: SmallRng::seed_from_u64(seed.wrapping_add(user as u64)),
        }
    }

    pub fn user(&self) -> usize {
        self.user
    }

    pub fn rng(&mut self) -> &mut SmallRng {
        &mut self.rng
    }
}

/// One mixed workload: operations, transition probabilities, operation
/// bodies, a document generator, and a one-shot setup hook.
///
/// Invariant: `operations().len()` equals both dimensions of
/// `probabilities()`, and `execute` accepts exactly the names in
/// `operations()`.
#[async_trait]
pub trait Workload: Send + Sync {
    /// The ordered operation names. Stable; indices into this slice are the
    /// Markov state.
    fn operations(&self) -> &'static [&'static str];

    /// The workload's default transition matrix.
    fn probabilities(&self) -> Matrix;

    /// Produce the document for id `id`, deterministic given the run seed.
    /// Only the setup loader calls this.
    fn generate_document(&self, id: u64) -> Document;

    /// Run one operation. `ctx` carries cancellation for long-running bodies
    /// to observe; `rctx` is the invoking user's own state. A returned error
    /// is counted and logged by the runner, never retried.
    async fn execute(
        &self,
        operation: &str,
        ctx: &ExecutionContext,
        rctx: &mut Runctx,
    ) -> Result<(), OpError>;

    /// Workload-specific preconditions (schema indexes, search indexes).
    /// Idempotent: an index that already exists succeeds without
    /// modification, one that is building is waited on, and an unavailable
    /// auxiliary service is logged as a warning and tolerated.
    async fn setup(&self) -> Result<(), Error>;
}
