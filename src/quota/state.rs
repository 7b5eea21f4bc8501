//! Per-provider quota bookkeeping.
//!
//! The state is plain data mutated under the governor's per-provider lock.
//! Both windows are maintained lazily: the minute window is pruned and the
//! daily counter rolled over whenever the state is inspected.

use chrono::{DateTime, Duration as ChronoDuration, Local, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;

use super::config::ProviderConfig;

/// Width of the per-minute window in seconds
pub const MINUTE_WINDOW_SECS: i64 = 60;

fn minute_window() -> ChronoDuration {
    ChronoDuration::seconds(MINUTE_WINDOW_SECS)
}

/// Why a request was held back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThrottleReason {
    DailyLimit,
    MinuteLimit,
    MinInterval,
    Backoff,
}

impl ThrottleReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThrottleReason::DailyLimit => "daily limit reached",
            ThrottleReason::MinuteLimit => "per-minute limit reached",
            ThrottleReason::MinInterval => "minimum request interval",
            ThrottleReason::Backoff => "rate-limit backoff",
        }
    }
}

impl std::fmt::Display for ThrottleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuotaDecision {
    pub allowed: bool,
    /// Time to wait before asking again (zero when allowed)
    #[serde(with = "duration_ms")]
    pub wait: Duration,
    pub reason: Option<ThrottleReason>,
    pub minute_used: u32,
    pub daily_used: u32,
    pub daily_limit: u32,
}

impl QuotaDecision {
    pub fn wait_ms(&self) -> u64 {
        self.wait.as_millis() as u64
    }
}

/// Diagnostics view of one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub provider: String,
    pub minute_used: u32,
    pub minute_limit: u32,
    pub daily_used: u32,
    pub daily_limit: u32,
    pub daily_reset_at: DateTime<Utc>,
    pub current_backoff_ms: u64,
    pub last_request_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct ProviderQuotaState {
    recent_requests: VecDeque<DateTime<Utc>>,
    daily_count: u32,
    daily_reset_at: DateTime<Utc>,
    current_backoff_ms: u64,
    last_request_at: Option<DateTime<Utc>>,
}

impl ProviderQuotaState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            recent_requests: VecDeque::new(),
            daily_count: 0,
            daily_reset_at: next_local_midnight(now),
            current_backoff_ms: 0,
            last_request_at: None,
        }
    }

    pub fn daily_count(&self) -> u32 {
        self.daily_count
    }

    pub fn current_backoff_ms(&self) -> u64 {
        self.current_backoff_ms
    }

    /// Drop minute-window entries that have aged out and roll the daily
    /// counter over if the reset instant has passed.
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        while let Some(oldest) = self.recent_requests.front() {
            if now - *oldest >= minute_window() {
                self.recent_requests.pop_front();
            } else {
                break;
            }
        }

        if now >= self.daily_reset_at {
            self.daily_count = 0;
            self.daily_reset_at = next_local_midnight(now);
        }
    }

    /// Decide whether a request may go out at `now`. First match wins:
    /// daily cap, minute cap, then spacing (interval or backoff).
    pub fn check(&mut self, config: &ProviderConfig, now: DateTime<Utc>) -> QuotaDecision {
        self.refresh(now);

        let minute_used = self.recent_requests.len() as u32;
        let decision = |allowed, wait, reason| QuotaDecision {
            allowed,
            wait,
            reason,
            minute_used,
            daily_used: self.daily_count,
            daily_limit: config.max_per_day,
        };

        if self.daily_count >= config.max_per_day {
            let wait = to_std(self.daily_reset_at - now);
            return decision(false, wait, Some(ThrottleReason::DailyLimit));
        }

        if minute_used >= config.max_per_minute {
            // a zero cap has no entry to age out, so re-check after a full window
            let wait = match self.recent_requests.front() {
                Some(oldest) => to_std(*oldest + minute_window() - now),
                None => to_std(minute_window()),
            };
            return decision(false, wait, Some(ThrottleReason::MinuteLimit));
        }

        if let Some(last) = self.last_request_at {
            let spacing_ms = config.min_interval_ms.max(self.current_backoff_ms);
            let spacing = ChronoDuration::milliseconds(spacing_ms as i64);
            let elapsed = now - last;
            if elapsed < spacing {
                let reason = if self.current_backoff_ms > config.min_interval_ms {
                    ThrottleReason::Backoff
                } else {
                    ThrottleReason::MinInterval
                };
                return decision(false, to_std(spacing - elapsed), Some(reason));
            }
        }

        decision(true, Duration::ZERO, None)
    }

    /// Count a request against both windows.
    pub fn record_request(&mut self, now: DateTime<Utc>) {
        self.refresh(now);
        self.recent_requests.push_back(now);
        self.daily_count = self.daily_count.saturating_add(1);
        self.last_request_at = Some(now);
    }

    /// A clean response: count it and drop any backoff.
    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.record_request(now);
        self.clear_backoff();
    }

    /// Escalate the backoff after a 429. Counters are left untouched.
    pub fn record_rate_limited(&mut self, config: &ProviderConfig) -> u64 {
        self.current_backoff_ms = config.next_backoff_ms(self.current_backoff_ms);
        self.current_backoff_ms
    }

    pub fn clear_backoff(&mut self) {
        self.current_backoff_ms = 0;
    }

    pub fn status(
        &mut self,
        provider: &str,
        config: &ProviderConfig,
        now: DateTime<Utc>,
    ) -> ProviderStatus {
        self.refresh(now);
        ProviderStatus {
            provider: provider.to_string(),
            minute_used: self.recent_requests.len() as u32,
            minute_limit: config.max_per_minute,
            daily_used: self.daily_count,
            daily_limit: config.max_per_day,
            daily_reset_at: self.daily_reset_at,
            current_backoff_ms: self.current_backoff_ms,
            last_request_at: self.last_request_at,
        }
    }
}

/// First local midnight strictly after `now`
pub fn next_local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let local_date = now.with_timezone(&Local).date_naive();
    local_date
        .succ_opt()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.with_timezone(&Utc))
        .filter(|midnight| *midnight > now)
        .unwrap_or_else(|| now + ChronoDuration::hours(24))
}

fn to_std(duration: ChronoDuration) -> Duration {
    duration.to_std().unwrap_or(Duration::ZERO)
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}
