//! Think-time scheduling.
//!
//! The sleep before every operation is what keeps the generator open-loop: it
//! is drawn from the user's own RNG and never looks at how long the previous
//! operation took, so a slow system under test shows up as elevated latency
//! rather than suppressed throughput.

use std::time::Duration;

use rand::Rng;
use rand::rngs::SmallRng;

use crate::error::Error;

/// Lower bound of the random think-time draw.
pub const RANDOM_THINK_MIN: Duration = Duration::from_millis(400);
/// Exclusive upper bound of the random think-time draw.
pub const RANDOM_THINK_MAX: Duration = Duration::from_millis(5000);
/// Smallest accepted fixed think time.
pub const MIN_FIXED_THINK: Duration = Duration::from_millis(100);

/// Think-time policy for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThinkTime {
    /// Sleep a uniformly random duration in `[400, 5000)` ms. The default.
    Random,
    /// Sleep exactly this long before every operation.
    Fixed(Duration),
}

impl Default for ThinkTime {
    fn default() -> Self {
        ThinkTime::Random
    }
}

impl ThinkTime {
    /// Build a fixed policy, rejecting durations under 100 ms.
    pub fn fixed(sleep: Duration) -> Result<Self, Error> {
        if sleep < MIN_FIXED_THINK {
            return Err(Error::SleepTooShort {
                min: MIN_FIXED_THINK,
                got: sleep,
            });
        }
        Ok(ThinkTime::Fixed(sleep))
    }

    /// Draw the next think time from the user's RNG.
    pub fn sample(&self, rng: &mut SmallRng) -> Duration {
        match self {
            ThinkTime::Random => {
                let ms = rng.gen_range(
                    RANDOM_THINK_MIN.as_millis() as u64..RANDOM_THINK_MAX.as_millis() as u64,
                );
                Duration::from_millis(ms)
            }
            ThinkTime::Fixed(sleep) => *sleep,
        }
    }
}
