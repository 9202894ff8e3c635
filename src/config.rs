//! The resolved configuration record for one run.
//!
//! The engine consumes a fully-resolved record; assembling it from flags,
//! files, and environment is the caller's concern. The binary reads a TOML
//! file straight into [`Config`]. Cross-field constraints are checked once,
//! at startup, and any violation is fatal.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::executor::DEFAULT_SEED;
use crate::matrix::Matrix;
use crate::think::ThinkTime;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which registered workload to run.
    pub workload: String,
    /// Count of concurrent virtual users.
    pub num_users: usize,
    /// Count of documents pre-loaded by setup.
    pub num_items: u64,
    /// Total wall-clock duration of the run, in seconds.
    pub run_time_secs: u64,
    /// RampUp/RampDown window, in seconds. At most half the run time.
    pub ramp_time_secs: u64,
    /// Fixed think time in milliseconds; unset means the random policy.
    pub sleep_ms: Option<u64>,
    /// Collapse the Markov chain to this operation. Mutually exclusive with
    /// `markov_chain`.
    pub only_operation: Option<String>,
    /// Explicit transition matrix overriding the workload default.
    pub markov_chain: Option<Matrix>,
    /// Global seed; user `u` draws from a stream seeded `seed + u`.
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workload: String::new(),
            num_users: 500,
            num_items: 500,
            run_time_secs: 300,
            ramp_time_secs: 60,
            sleep_ms: None,
            only_operation: None,
            markov_chain: None,
            seed: DEFAULT_SEED,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    pub fn run_time(&self) -> Duration {
        Duration::from_secs(self.run_time_secs)
    }

    pub fn ramp_time(&self) -> Duration {
        Duration::from_secs(self.ramp_time_secs)
    }

    /// The single-operation override, with the empty string treated as
    /// unset.
    pub fn only_operation(&self) -> Option<&str> {
        self.only_operation.as_deref().filter(|s| !s.is_empty())
    }

    /// The explicit matrix, with an empty array treated as unset.
    pub fn markov_chain(&self) -> Option<&Matrix> {
        self.markov_chain.as_ref().filter(|m| !m.is_empty())
    }

    /// The think-time policy, enforcing the 100 ms floor on fixed sleeps.
    pub fn think_time(&self) -> Result<ThinkTime, Error> {
        match self.sleep_ms {
            Some(ms) => ThinkTime::fixed(Duration::from_millis(ms)),
            None => Ok(ThinkTime::Random),
        }
    }

    /// Cross-field constraint checks, all fatal at startup.
    pub fn validate(&self) -> Result<(), Error> {
        if self.num_users == 0 {
            return Err(Error::NoUsers);
        }
        if self.run_time_secs == 0 {
            return Err(Error::NoRunTime);
        }
        if self.ramp_time() > self.run_time() / 2 {
            return Err(Error::RampTooLong);
        }
        self.think_time()?;
        if self.only_operation().is_some() && self.markov_chain().is_some() {
            return Err(Error::ConflictingChain);
        }
        Ok(())
    }
}
