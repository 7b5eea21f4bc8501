//! Guarded HTTP fetch
//!
//! Every outbound odds request goes through [`GuardedFetcher::fetch`], which
//! waits for quota, issues the call and retries exactly once when the provider
//! answers 429. The retry policy is modelled as [`RetryPhase`] so the
//! "one retry, never two" contract is checkable without a network.
//!
//! Note: the retried attempt is counted against the minute and daily quota
//! like any other request. A provider that keeps answering 429 can therefore
//! drain the daily budget through retries alone.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use super::governor::QuotaGovernor;
use crate::error::Result;

/// Transport-agnostic request description
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_string(), value.into()));
        self
    }
}

/// Status and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub body: String,
}

impl FetchResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

#[async_trait]
impl HttpTransport for Client {
    async fn send(&self, request: &FetchRequest) -> Result<FetchResponse> {
        let mut builder = self
            .request(request.method.clone(), &request.url)
            .query(&request.query);
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(FetchResponse { status, body })
    }
}

/// Single-retry policy for rate-limited responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPhase {
    /// No attempt made yet
    Idle,
    /// First attempt was rate limited; one retry remains
    Retried,
    /// The response in hand goes back to the caller
    Done,
}

impl RetryPhase {
    /// Transition after a response arrives
    pub fn on_response(self, rate_limited: bool) -> Self {
        match (self, rate_limited) {
            (RetryPhase::Idle, true) => RetryPhase::Retried,
            (RetryPhase::Idle, false) => RetryPhase::Done,
            (RetryPhase::Retried, _) => RetryPhase::Done,
            (RetryPhase::Done, _) => RetryPhase::Done,
        }
    }
}

pub struct GuardedFetcher<T: HttpTransport = Client> {
    governor: Arc<QuotaGovernor>,
    transport: T,
}

impl GuardedFetcher<Client> {
    pub fn with_client(governor: Arc<QuotaGovernor>, client: Client) -> Self {
        Self::new(governor, client)
    }
}

impl<T: HttpTransport> GuardedFetcher<T> {
    pub fn new(governor: Arc<QuotaGovernor>, transport: T) -> Self {
        Self {
            governor,
            transport,
        }
    }

    pub fn governor(&self) -> &Arc<QuotaGovernor> {
        &self.governor
    }

    /// Issue `request` against `provider` under its quota.
    ///
    /// A 429 escalates the provider's backoff and triggers one retry after the
    /// backoff has elapsed; whatever the retry returns is handed back as-is.
    /// Transport errors propagate without retry. Both attempts count against the
    /// minute and daily quota.
    pub async fn fetch(&self, provider: &str, request: &FetchRequest) -> Result<FetchResponse> {
        let mut phase = RetryPhase::Idle;

        loop {
            let waited = self.governor.acquire(provider).await;
            debug!(
                provider,
                url = %request.url,
                waited_ms = waited.as_millis() as u64,
                ?phase,
                "Sending guarded request"
            );

            let response = self.transport.send(request).await?;
            let rate_limited = response.is_rate_limited();

            if rate_limited {
                self.governor.record_rate_limited(provider).await;
            } else {
                self.governor.clear_backoff(provider).await;
            }

            phase = phase.on_response(rate_limited);
            if phase == RetryPhase::Done {
                if rate_limited {
                    warn!(provider, "Still rate limited after retry, giving up");
                }
                return Ok(response);
            }
        }
    }
}
