//! Retry policy shared by the async and blocking executors.
//!
//! Both executors feed each attempt's outcome through [`RetryPolicy`] so that
//! classification and backoff timing cannot drift between them.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::{ClientConfig, RawResponse, TursoError};

/// What the executor should do after one HTTP attempt.
#[derive(Debug)]
pub(crate) enum Step {
    Done(RawResponse),
    Retry(Duration),
    Fail(TursoError),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct RetryPolicy {
    pub max_retries: usize,
    pub backoff_base: Duration,
}

impl From<&ClientConfig> for RetryPolicy {
    fn from(config: &ClientConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: config.backoff_base,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: `backoff_base * 2^attempt`.
    pub fn backoff(&self, attempt: usize) -> Duration {
        let exp = attempt.min(16) as u32;
        self.backoff_base.saturating_mul(1u32 << exp)
    }

    /// Classifies a completed HTTP exchange.
    ///
    /// A 200 body is returned whatever it contains; application errors inside
    /// it are left to the caller. Only 5xx statuses are retried.
    pub fn on_response(&self, attempt: usize, status: StatusCode, body: String) -> Step {
        if status == StatusCode::OK {
            return match serde_json::from_str::<JsonValue>(&body) {
                Ok(json) => Step::Done(RawResponse::new(json)),
                Err(err) => Step::Fail(TursoError::Decode(format!(
                    "invalid pipeline response JSON: {err}; body: {body}"
                ))),
            };
        }

        if status.is_server_error() && attempt < self.max_retries {
            let delay = self.backoff(attempt);
            warn!(
                status = status.as_u16(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying pipeline request after server error"
            );
            return Step::Retry(delay);
        }

        Step::Fail(TursoError::Transport {
            status: status.as_u16(),
            body,
        })
    }

    /// Classifies a request that failed before a status was received.
    pub fn on_transport_error(&self, attempt: usize, err: reqwest::Error, limit: Duration) -> Step {
        if err.is_timeout() {
            return Step::Fail(TursoError::Timeout { limit });
        }
        if is_transient(&err) && attempt < self.max_retries {
            let delay = self.backoff(attempt);
            warn!(
                error = %err,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying pipeline request after transport error"
            );
            return Step::Retry(delay);
        }
        Step::Fail(TursoError::Connection(err))
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_request() || err.is_body()
}
