//! Quota Governor
//!
//! Owns one [`ProviderQuotaState`] per provider key behind its own mutex.
//! A check and the matching record happen inside the same critical section
//! (see [`QuotaGovernor::acquire`]) so concurrent callers cannot both observe
//! "allowed" and overrun a cap.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::clock::{Clock, SystemClock};
use super::config::ProviderTable;
use super::state::{ProviderQuotaState, ProviderStatus, QuotaDecision};

/// Floor for a throttle wait so a zero-length wait cannot spin
const MIN_WAIT: Duration = Duration::from_millis(1);

pub struct QuotaGovernor {
    table: ProviderTable,
    states: DashMap<String, Arc<Mutex<ProviderQuotaState>>>,
    clock: Arc<dyn Clock>,
}

impl QuotaGovernor {
    /// Create a governor driven by the wall clock
    pub fn new(table: ProviderTable) -> Self {
        Self::with_clock(table, Arc::new(SystemClock))
    }

    pub fn with_clock(table: ProviderTable, clock: Arc<dyn Clock>) -> Self {
        Self {
            table,
            states: DashMap::new(),
            clock,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// State for `provider`, created on first reference
    fn state_for(&self, provider: &str) -> Arc<Mutex<ProviderQuotaState>> {
        if let Some(state) = self.states.get(provider) {
            return Arc::clone(state.value());
        }
        let now = self.clock.now();
        let entry = self
            .states
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ProviderQuotaState::new(now))));
        Arc::clone(entry.value())
    }

    /// Whether a request to `provider` may go out now. Records nothing.
    pub async fn can_proceed(&self, provider: &str) -> QuotaDecision {
        let state = self.state_for(provider);
        let mut state = state.lock().await;
        state.check(self.table.get(provider), self.clock.now())
    }

    /// Count a request and clear any backoff
    pub async fn record_success(&self, provider: &str) {
        let state = self.state_for(provider);
        let mut state = state.lock().await;
        state.record_success(self.clock.now());
    }

    /// Count a request without touching the backoff
    pub async fn record_request(&self, provider: &str) {
        let state = self.state_for(provider);
        let mut state = state.lock().await;
        state.record_request(self.clock.now());
    }

    /// Escalate the backoff after a 429 and return the new value in ms
    pub async fn record_rate_limited(&self, provider: &str) -> u64 {
        let state = self.state_for(provider);
        let mut state = state.lock().await;
        let backoff_ms = state.record_rate_limited(self.table.get(provider));
        warn!(provider, backoff_ms, "Provider rate limited, backing off");
        backoff_ms
    }

    pub async fn clear_backoff(&self, provider: &str) {
        let state = self.state_for(provider);
        let mut state = state.lock().await;
        state.clear_backoff();
    }

    /// Wait until `provider` allows a request, then record it.
    ///
    /// The check and the record share one lock acquisition; between waits
    /// the lock is released so other callers can make progress. Returns the
    /// total time spent waiting.
    pub async fn acquire(&self, provider: &str) -> Duration {
        let state = self.state_for(provider);
        let config = self.table.get(provider);
        let mut waited = Duration::ZERO;

        loop {
            let decision = {
                let mut guard = state.lock().await;
                let now = self.clock.now();
                let decision = guard.check(config, now);
                if decision.allowed {
                    guard.record_request(now);
                    return waited;
                }
                decision
            };

            let wait = decision.wait.max(MIN_WAIT);
            debug!(
                provider,
                wait_ms = wait.as_millis() as u64,
                reason = ?decision.reason,
                minute_used = decision.minute_used,
                daily_used = decision.daily_used,
                "Throttling request"
            );
            self.clock.sleep(wait).await;
            waited += wait;
        }
    }

    /// Diagnostics for one provider. Does not register unknown providers.
    pub async fn status_snapshot(&self, provider: &str) -> ProviderStatus {
        let config = self.table.get(provider);
        let now = self.clock.now();
        let existing = self.states.get(provider).map(|s| Arc::clone(s.value()));

        match existing {
            Some(state) => state.lock().await.status(provider, config, now),
            None => ProviderQuotaState::new(now).status(provider, config, now),
        }
    }

    /// Diagnostics for every provider referenced so far, sorted by key
    pub async fn all_statuses(&self) -> Vec<ProviderStatus> {
        let mut keys: Vec<String> = self.states.iter().map(|e| e.key().clone()).collect();
        keys.sort();

        let mut statuses = Vec::with_capacity(keys.len());
        for key in keys {
            statuses.push(self.status_snapshot(&key).await);
        }
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::clock::ManualClock;
    use crate::quota::config::ProviderConfig;
    use crate::quota::state::ThrottleReason;
    use chrono::Utc;

    fn governor(config: ProviderConfig) -> (QuotaGovernor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let table = ProviderTable::new(config);
        (QuotaGovernor::with_clock(table, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_acquire_waits_out_min_interval() {
        let (governor, clock) = governor(ProviderConfig {
            min_interval_ms: 2000,
            ..Default::default()
        });
        let start = clock.now();

        assert_eq!(governor.acquire("odds").await, Duration::ZERO);
        let waited = governor.acquire("odds").await;

        assert_eq!(waited, Duration::from_millis(2000));
        assert_eq!(clock.now() - start, chrono::Duration::milliseconds(2000));
        assert_eq!(governor.status_snapshot("odds").await.daily_used, 2);
    }

    #[tokio::test]
    async fn test_status_snapshot_does_not_register() {
        let (governor, _clock) = governor(ProviderConfig::default());

        let status = governor.status_snapshot("ghost").await;
        assert_eq!(status.daily_used, 0);
        assert!(governor.all_statuses().await.is_empty());
    }

    #[tokio::test]
    async fn test_providers_are_independent() {
        let (governor, _clock) = governor(ProviderConfig::default());

        governor.record_success("a").await;
        let a = governor.can_proceed("a").await;
        let b = governor.can_proceed("b").await;

        assert_eq!(a.reason, Some(ThrottleReason::MinInterval));
        assert!(b.allowed);

        let statuses = governor.all_statuses().await;
        let names: Vec<&str> = statuses.iter().map(|s| s.provider.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
