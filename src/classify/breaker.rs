//! Circuit breaker around the remote classifier. Explicit state machine,
//! clock passed in by the caller so tests stay deterministic.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Normal operation; counts consecutive failures.
    Closed { failures: u32 },
    /// Short-circuit everything until the cooldown elapses.
    Open { since: DateTime<Utc> },
    /// Cooldown elapsed; one probe call is allowed through.
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    state: State,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown_secs: i64) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown: Duration::seconds(cooldown_secs),
            state: State::Closed { failures: 0 },
        }
    }

    /// Whether a call may proceed at time `now`. An open breaker flips to
    /// half-open once the cooldown has elapsed and lets the next call probe.
    pub fn allow(&mut self, now: DateTime<Utc>) -> bool {
        match self.state {
            State::Closed { .. } | State::HalfOpen => true,
            State::Open { since } => {
                if now - since >= self.cooldown {
                    info!("circuit breaker cooldown elapsed, probing");
                    self.state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        self.state = State::Closed { failures: 0 };
    }

    /// A half-open probe failure reopens immediately; closed-state failures
    /// accumulate until the threshold trips.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        match self.state {
            State::Closed { failures } => {
                let failures = failures + 1;
                if failures >= self.threshold {
                    warn!(failures, "circuit breaker opened");
                    self.state = State::Open { since: now };
                } else {
                    self.state = State::Closed { failures };
                }
            }
            State::HalfOpen => {
                warn!("circuit breaker probe failed, reopening");
                self.state = State::Open { since: now };
            }
            State::Open { .. } => {
                self.state = State::Open { since: now };
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open { .. })
    }
}
