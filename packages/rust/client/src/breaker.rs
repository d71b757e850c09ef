//! Per-endpoint circuit breaker.
//!
//! Tracks abuse-signal failures per endpoint URL and short-circuits calls to
//! endpoints that keep failing. After a cooldown the circuit goes half-open
//! and exactly one trial call is permitted: success closes the circuit,
//! failure reopens it.
//!
//! Only server-side/abuse responses count as failures (HTTP 403, 422, and
//! 5xx). Empty results and 404s are normal outcomes and never trip the
//! breaker.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

use sourcedock_shared::BreakerConfig;
use tracing::{debug, warn};

/// Circuit state for a single endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Endpoint is healthy — calls flow through.
    Closed,
    /// Too many failures — calls are skipped until cooldown expires.
    Open,
    /// Cooldown elapsed — one trial call decides recovery.
    HalfOpen,
}

/// Health record for one endpoint, created lazily on first failure.
#[derive(Debug)]
struct EndpointHealth {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Whether the single half-open trial slot is still unclaimed.
    trial_available: bool,
}

impl Default for EndpointHealth {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_available: false,
        }
    }
}

/// Whether an HTTP status is an abuse/server-side signal that should count
/// toward opening the circuit.
pub fn is_breaker_failure(status: u16) -> bool {
    status == 403 || status == 422 || (500..600).contains(&status)
}

/// Per-endpoint failure tracker shared by all of a client's fetches.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    endpoints: Mutex<HashMap<String, EndpointHealth>>,
}

impl CircuitBreaker {
    /// Create a breaker with the given threshold/cooldown tuning.
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            endpoints: Mutex::new(HashMap::new()),
        }
    }

    /// Consulted before any network call. When this returns `true` the call
    /// is skipped and a synthetic error returned to the caller.
    ///
    /// An open circuit whose cooldown has elapsed transitions to half-open
    /// here and releases exactly one trial slot.
    pub fn is_open(&self, endpoint: &str) -> bool {
        let Ok(mut endpoints) = self.endpoints.lock() else {
            return false;
        };
        let Some(health) = endpoints.get_mut(endpoint) else {
            // Never-failed endpoints have no record and are closed.
            return false;
        };

        match health.state {
            CircuitState::Closed => false,
            CircuitState::HalfOpen => {
                // Exactly one caller claims the trial slot per cooldown.
                if health.trial_available {
                    health.trial_available = false;
                    false
                } else {
                    true
                }
            }
            CircuitState::Open => {
                let cooled = health
                    .opened_at
                    .is_none_or(|t| t.elapsed().as_secs() >= self.config.cooldown_secs);
                if cooled {
                    debug!(endpoint, "circuit cooldown elapsed, permitting trial call");
                    health.state = CircuitState::HalfOpen;
                    health.trial_available = false;
                    false
                } else {
                    true
                }
            }
        }
    }

    /// Record a successful call. Closes the circuit and resets the failure
    /// count, whatever the previous state.
    pub fn record_success(&self, endpoint: &str) {
        let Ok(mut endpoints) = self.endpoints.lock() else {
            return;
        };
        if let Some(health) = endpoints.get_mut(endpoint) {
            health.state = CircuitState::Closed;
            health.consecutive_failures = 0;
            health.opened_at = None;
            health.trial_available = false;
        }
    }

    /// Record an abuse-signal failure. Callers are expected to gate on
    /// [`is_breaker_failure`] first.
    pub fn record_failure(&self, endpoint: &str) {
        let Ok(mut endpoints) = self.endpoints.lock() else {
            return;
        };
        let health = endpoints.entry(endpoint.to_string()).or_default();
        health.consecutive_failures += 1;

        let trip = health.state == CircuitState::HalfOpen
            || health.consecutive_failures >= self.config.failure_threshold;
        if trip {
            warn!(
                endpoint,
                failures = health.consecutive_failures,
                "circuit opened"
            );
            health.state = CircuitState::Open;
            health.opened_at = Some(Instant::now());
            health.trial_available = false;
        }
    }

    /// Current state for an endpoint, for introspection and tests.
    pub fn state(&self, endpoint: &str) -> CircuitState {
        self.endpoints
            .lock()
            .ok()
            .and_then(|e| e.get(endpoint).map(|h| h.state))
            .unwrap_or(CircuitState::Closed)
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(BreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EP: &str = "https://forum.example.com/search";

    fn breaker(threshold: u32, cooldown_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold: threshold,
            cooldown_secs,
        })
    }

    #[test]
    fn unknown_endpoint_is_closed() {
        let b = breaker(3, 60);
        assert!(!b.is_open(EP));
        assert_eq!(b.state(EP), CircuitState::Closed);
    }

    #[test]
    fn stays_closed_below_threshold() {
        let b = breaker(3, 60);
        b.record_failure(EP);
        b.record_failure(EP);
        assert!(!b.is_open(EP));
        assert_eq!(b.state(EP), CircuitState::Closed);
    }

    #[test]
    fn opens_at_threshold_and_blocks() {
        let b = breaker(3, 600);
        for _ in 0..3 {
            b.record_failure(EP);
        }
        assert_eq!(b.state(EP), CircuitState::Open);
        assert!(b.is_open(EP));
        assert!(b.is_open(EP));
    }

    #[test]
    fn cooldown_permits_exactly_one_trial() {
        let b = breaker(2, 0); // zero cooldown = immediately half-open
        b.record_failure(EP);
        b.record_failure(EP);
        assert_eq!(b.state(EP), CircuitState::Open);

        // First check after cooldown claims the trial slot.
        assert!(!b.is_open(EP));
        assert_eq!(b.state(EP), CircuitState::HalfOpen);
        // A second concurrent caller is still blocked.
        assert!(b.is_open(EP));
    }

    #[test]
    fn trial_success_closes() {
        let b = breaker(1, 0);
        b.record_failure(EP);
        assert!(!b.is_open(EP)); // trial
        b.record_success(EP);
        assert_eq!(b.state(EP), CircuitState::Closed);
        assert!(!b.is_open(EP));
    }

    #[test]
    fn trial_failure_reopens() {
        let b = breaker(5, 0);
        for _ in 0..5 {
            b.record_failure(EP);
        }
        assert!(!b.is_open(EP)); // trial claimed
        b.record_failure(EP); // trial failed — reopen regardless of threshold
        assert_eq!(b.state(EP), CircuitState::Open);
    }

    #[test]
    fn success_resets_failure_count() {
        let b = breaker(3, 60);
        b.record_failure(EP);
        b.record_failure(EP);
        b.record_success(EP);
        b.record_failure(EP);
        b.record_failure(EP);
        assert_eq!(b.state(EP), CircuitState::Closed);
    }

    #[test]
    fn endpoints_are_independent() {
        let b = breaker(1, 600);
        b.record_failure(EP);
        assert!(b.is_open(EP));
        assert!(!b.is_open("https://wiki.example.com/api"));
    }

    #[test]
    fn failure_classification_matches_abuse_signals() {
        assert!(is_breaker_failure(403));
        assert!(is_breaker_failure(422));
        assert!(is_breaker_failure(500));
        assert!(is_breaker_failure(503));
        assert!(is_breaker_failure(599));

        // Normal outcomes never trip the breaker.
        assert!(!is_breaker_failure(200));
        assert!(!is_breaker_failure(404));
        assert!(!is_breaker_failure(400));
        assert!(!is_breaker_failure(401));
        assert!(!is_breaker_failure(429));
    }
}
