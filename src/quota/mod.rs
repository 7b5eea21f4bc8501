//! Per-provider request throttling for third-party odds APIs.

pub mod clock;
pub mod config;
pub mod fetch;
pub mod governor;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ProviderConfig, ProviderTable};
pub use fetch::{FetchRequest, FetchResponse, GuardedFetcher, HttpTransport, RetryPhase};
pub use governor::QuotaGovernor;
pub use state::{ProviderQuotaState, ProviderStatus, QuotaDecision, ThrottleReason};
