//! Phase accounting: every observation is labelled with the part of the run
//! it finished in.

use std::time::Duration;

use tokio::time::Instant;

/// The part of the run an observation belongs to. With a ramp time of `R`,
/// the first and last `R` of the run are `RampUp` and `RampDown`; everything
/// else is `Steady`. A ramp time of zero makes the whole run `Steady`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    RampUp,
    Steady,
    RampDown,
}

/// All phases, in label-table order. Indexable via [`Phase::index`].
pub const PHASES: [Phase; 3] = [Phase::RampUp, Phase::Steady, Phase::RampDown];

impl Phase {
    /// The exact label value exported on every metric series.
    pub fn as_label(self) -> &'static str {
        match self {
            Phase::RampUp => "RampUp",
            Phase::Steady => "Steady",
            Phase::RampDown => "RampDown",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Phase::RampUp => 0,
            Phase::Steady => 1,
            Phase::RampDown => 2,
        }
    }
}

/// The wall-clock frame of one run. Built by the supervisor right before the
/// runners start and shared read-only with all of them.
#[derive(Clone, Copy, Debug)]
pub struct RunWindow {
    start: Instant,
    end: Instant,
    ramp: Duration,
}

impl RunWindow {
    /// Open a window starting now.
    pub fn begin(run_time: Duration, ramp: Duration) -> Self {
        let start = Instant::now();
        Self {
            start,
            end: start + run_time,
            ramp,
        }
    }

    pub fn end(&self) -> Instant {
        self.end
    }

    /// Classify an instant. Saturating arithmetic keeps instants outside the
    /// window well-defined: before `start` is `RampUp` territory, after `end`
    /// is `RampDown` (both only when a ramp is configured).
    pub fn phase(&self, now: Instant) -> Phase {
        if now.saturating_duration_since(self.start) < self.ramp {
            Phase::RampUp
        } else if self.end.saturating_duration_since(now) < self.ramp {
            Phase::RampDown
        } else {
            Phase::Steady
        }
    }

    /// Classify the current instant.
    pub fn phase_now(&self) -> Phase {
        self.phase(Instant::now())
    }
}
