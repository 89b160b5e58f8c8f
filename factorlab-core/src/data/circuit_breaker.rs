//! Request gate for the live quote provider.
//!
//! Yahoo answers abuse with 429s and, eventually, a 403 IP ban. The breaker
//! counts consecutive failed requests; at the policy threshold, or on a ban,
//! it opens and refuses requests until the cooldown ends. After the cooldown a
//! single trial request is let through (half-open): success closes the
//! breaker, failure reopens it for another full cooldown.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Thresholds for opening and reopening the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerPolicy {
    /// Consecutive failures that open the breaker.
    pub max_failures: u32,
    pub cooldown: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            max_failures: 3,
            cooldown: Duration::from_secs(30 * 60),
        }
    }
}

/// Why the breaker last opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripCause {
    /// HTTP 403 from the provider.
    Banned,
    /// `max_failures` consecutive failed requests.
    Failures(u32),
    /// The half-open trial request failed.
    TrialFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed { failures: u32 },
    Open { since: Instant, cause: TripCause },
    /// Cooldown over; one trial request is in flight.
    HalfOpen,
}

/// Shared between every request a provider makes.
#[derive(Debug)]
pub struct CircuitBreaker {
    policy: BreakerPolicy,
    state: Mutex<BreakerState>,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerPolicy::default())
    }
}

impl CircuitBreaker {
    pub fn new(policy: BreakerPolicy) -> Self {
        Self {
            policy: BreakerPolicy {
                max_failures: policy.max_failures.max(1),
                ..policy
            },
            state: Mutex::new(BreakerState::Closed { failures: 0 }),
        }
    }

    pub fn policy(&self) -> BreakerPolicy {
        self.policy
    }

    fn state_guard(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> BreakerState {
        *self.state_guard()
    }

    /// Whether a request may be sent now. Moves an expired open breaker to
    /// half-open and admits exactly one trial request.
    pub fn allow_request(&self) -> bool {
        let mut state = self.state_guard();
        match *state {
            BreakerState::Closed { .. } => true,
            BreakerState::HalfOpen => false,
            BreakerState::Open { since, .. } => {
                if since.elapsed() < self.policy.cooldown {
                    return false;
                }
                info!("quote provider cooldown over; sending trial request");
                *state = BreakerState::HalfOpen;
                true
            }
        }
    }

    pub fn on_success(&self) {
        let mut state = self.state_guard();
        if *state == BreakerState::HalfOpen {
            info!("trial request succeeded; breaker closed");
        }
        *state = BreakerState::Closed { failures: 0 };
    }

    pub fn on_failure(&self) {
        let mut state = self.state_guard();
        let next = match *state {
            BreakerState::Closed { failures } if failures + 1 >= self.policy.max_failures => {
                BreakerState::Open {
                    since: Instant::now(),
                    cause: TripCause::Failures(failures + 1),
                }
            }
            BreakerState::Closed { failures } => BreakerState::Closed {
                failures: failures + 1,
            },
            BreakerState::HalfOpen => BreakerState::Open {
                since: Instant::now(),
                cause: TripCause::TrialFailed,
            },
            open @ BreakerState::Open { .. } => open,
        };
        if let BreakerState::Open { cause, .. } = next {
            if !matches!(*state, BreakerState::Open { .. }) {
                warn!(
                    ?cause,
                    cooldown_secs = self.policy.cooldown.as_secs(),
                    "quote provider breaker opened"
                );
            }
        }
        *state = next;
    }

    /// Open immediately; the provider has banned this client.
    pub fn on_ban(&self) {
        warn!(
            cooldown_secs = self.policy.cooldown.as_secs(),
            "quote provider returned 403; breaker opened"
        );
        *self.state_guard() = BreakerState::Open {
            since: Instant::now(),
            cause: TripCause::Banned,
        };
    }

    /// Time until a trial request is allowed; zero unless open.
    pub fn retry_in(&self) -> Duration {
        match self.state() {
            BreakerState::Open { since, .. } => self.policy.cooldown.saturating_sub(since.elapsed()),
            _ => Duration::ZERO,
        }
    }
}
