//! Swarmperf — a mixed-workload generator for document databases.
//!
//! Swarmperf simulates a fleet of virtual users whose behavior is governed by
//! a Markov chain over a named set of operations. Each user issues work on an
//! open-loop schedule: the think time before every operation is drawn from
//! the user's own seeded RNG and never depends on how long the previous
//! operation took, so a slow system under test is observed as elevated
//! latency rather than suppressed throughput (no coordinated omission).
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`Workload`]: one concrete mixed workload: named operations, a
//!   transition matrix, operation bodies, a document generator, and a
//!   one-shot setup hook. Built-ins live in [`workloads`] and are selected
//!   by name.
//! - [`DocumentStore`](store::DocumentStore): the declared interface of the
//!   database under test. Constructing real clients is the caller's job.
//! - [`FleetExecutor`]: the run supervisor. Spawns one cheap async task per
//!   user, wires the deadline and interrupt to a single idempotent
//!   cancellation, and joins the fleet.
//! - [`Recorder`]: where runners record attempts, failures, and latency,
//!   labelled by `(operation, phase)`. [`PromRecorder`] exposes the series
//!   for scraping on port 2112; [`NoopRecorder`] discards everything for
//!   tests.
//! - [`Phase`]: RampUp/Steady/RampDown labelling computed from wall-clock.
//!   Ramp is an accounting window, not admission control; all users start
//!   together.
//!
//! A run proceeds as: load the document corpus ([`setup`]), resolve the
//! probability matrix, then drive the fleet until the deadline or a cancel
//! signal.

pub mod config;
pub mod error;
/// The run supervisor and per-user loops
pub mod executor;
/// The probability matrix driving the Markov chain
pub mod matrix;
pub mod metrics;
pub mod phase;
/// Corpus loading before a run
pub mod setup;
pub mod store;
pub mod think;
/// The workload contract
pub mod workload;
/// Built-in workloads, registered by name
pub mod workloads;

pub use config::Config;
pub use error::Error;
pub use executor::{Canceller, ExecutionContext, FleetExecutor, RunControl};
pub use matrix::Matrix;
pub use metrics::{NoopRecorder, PromRecorder, Recorder};
pub use phase::Phase;
pub use think::ThinkTime;
pub use workload::{Document, Runctx, Workload};
