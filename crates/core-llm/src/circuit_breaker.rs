// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

const FAILURE_THRESHOLD: u32 = 5;
const COOLDOWN: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Entry {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    /// Set the instant a half-open probe is handed out, cleared by
    /// whichever of `record_success`/`record_failure` resolves it. Gates
    /// `is_available` so exactly one caller past cooldown gets through.
    probe_in_flight: bool,
}

impl Default for Entry {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            probe_in_flight: false,
        }
    }
}

/// Per-endpoint circuit breaker (§3 `CircuitState`, §4.3 "Circuit
/// breaker"). Keyed by the resolved base URL string rather than a closed
/// enum of providers, so any number of endpoints share one breaker.
pub struct CircuitBreaker {
    entries: Mutex<HashMap<String, Entry>>,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if a call may proceed: the circuit is closed, or
    /// open but past its cooldown, in which case it is moved to
    /// half-open and exactly one caller is handed the probe. Every other
    /// caller sees `false` until that probe resolves via
    /// `record_success`/`record_failure`.
    pub fn is_available(&self, endpoint: &str) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(endpoint.to_string()).or_default();

        match entry.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if entry.probe_in_flight {
                    false
                } else {
                    entry.probe_in_flight = true;
                    true
                }
            }
            CircuitState::Open => {
                let opened_at = entry.opened_at.expect("open implies opened_at set");
                if opened_at.elapsed() >= COOLDOWN {
                    entry.state = CircuitState::HalfOpen;
                    entry.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, endpoint: &str) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(endpoint.to_string()).or_default();
        entry.state = CircuitState::Closed;
        entry.consecutive_failures = 0;
        entry.opened_at = None;
        entry.probe_in_flight = false;
    }

    pub fn record_failure(&self, endpoint: &str) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.entry(endpoint.to_string()).or_default();

        match entry.state {
            CircuitState::HalfOpen => {
                entry.state = CircuitState::Open;
                entry.opened_at = Some(Instant::now());
                entry.probe_in_flight = false;
            }
            CircuitState::Closed => {
                entry.consecutive_failures += 1;
                if entry.consecutive_failures >= FAILURE_THRESHOLD {
                    entry.state = CircuitState::Open;
                    entry.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state_of(&self, endpoint: &str) -> CircuitState {
        let mut entries = self.entries.lock().unwrap();
        entries.entry(endpoint.to_string()).or_default().state
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_endpoint_is_available() {
        let breaker = CircuitBreaker::new();
        assert!(breaker.is_available("https://a"));
    }

    #[test]
    fn single_failure_does_not_trip() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure("https://a");
        assert!(breaker.is_available("https://a"));
        assert_eq!(breaker.state_of("https://a"), CircuitState::Closed);
    }

    #[test]
    fn threshold_failures_trip_circuit() {
        let breaker = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            breaker.record_failure("https://a");
        }
        assert_eq!(breaker.state_of("https://a"), CircuitState::Open);
        assert!(!breaker.is_available("https://a"));
    }

    #[test]
    fn success_resets_failure_count() {
        let breaker = CircuitBreaker::new();
        breaker.record_failure("https://a");
        breaker.record_failure("https://a");
        breaker.record_success("https://a");
        for _ in 0..FAILURE_THRESHOLD - 1 {
            breaker.record_failure("https://a");
        }
        assert_eq!(breaker.state_of("https://a"), CircuitState::Closed);
    }

    #[test]
    fn endpoints_are_independent() {
        let breaker = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            breaker.record_failure("https://a");
        }
        assert!(!breaker.is_available("https://a"));
        assert!(breaker.is_available("https://b"));
    }

    #[test]
    fn half_open_success_closes_circuit() {
        let breaker = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            breaker.record_failure("https://a");
        }
        {
            let mut entries = breaker.entries.lock().unwrap();
            let entry = entries.get_mut("https://a").unwrap();
            entry.opened_at = Some(Instant::now() - COOLDOWN - Duration::from_secs(1));
        }
        assert!(breaker.is_available("https://a"));
        assert_eq!(breaker.state_of("https://a"), CircuitState::HalfOpen);
        breaker.record_success("https://a");
        assert_eq!(breaker.state_of("https://a"), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_retrips_circuit() {
        let breaker = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            breaker.record_failure("https://a");
        }
        {
            let mut entries = breaker.entries.lock().unwrap();
            let entry = entries.get_mut("https://a").unwrap();
            entry.opened_at = Some(Instant::now() - COOLDOWN - Duration::from_secs(1));
        }
        assert!(breaker.is_available("https://a"));
        breaker.record_failure("https://a");
        assert_eq!(breaker.state_of("https://a"), CircuitState::Open);
    }

    #[test]
    fn half_open_grants_exactly_one_probe() {
        let breaker = CircuitBreaker::new();
        for _ in 0..FAILURE_THRESHOLD {
            breaker.record_failure("https://a");
        }
        {
            let mut entries = breaker.entries.lock().unwrap();
            let entry = entries.get_mut("https://a").unwrap();
            entry.opened_at = Some(Instant::now() - COOLDOWN - Duration::from_secs(1));
        }
        assert!(breaker.is_available("https://a"));
        assert!(!breaker.is_available("https://a"));
        assert!(!breaker.is_available("https://a"));
        breaker.record_failure("https://a");
        assert_eq!(breaker.state_of("https://a"), CircuitState::Open);
    }
}
