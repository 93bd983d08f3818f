//! Thread-blocking counterpart of [`crate::TursoClient`].
//!
//! Same encoding, retry classification, backoff and timeout bound; each call
//! holds the calling thread for the whole round trip, retry sleeps included.
//! Must not be used from inside an async runtime.

use std::{
    fmt, thread,
    time::{Duration, Instant},
};

use reqwest::header;
use tracing::debug;

use crate::{
    retry::{RetryPolicy, Step},
    ClientConfig, NormalizedResult, Params, PipelineEnvelope, RawResponse, Result, Statement,
    StatementOutcome, TursoError,
};

/// Blocking HTTP client for the `/v2/pipeline` endpoint.
pub struct TursoClient {
    http: reqwest::blocking::Client,
    pipeline_url: String,
    config: ClientConfig,
}

impl fmt::Debug for TursoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("blocking::TursoClient")
            .field("pipeline_url", &self.pipeline_url)
            .field("config", &self.config)
            .finish()
    }
}

impl TursoClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .build()
            .map_err(TursoError::Connection)?;
        Ok(Self::with_http_client(config, http))
    }

    pub fn with_http_client(config: ClientConfig, http: reqwest::blocking::Client) -> Self {
        Self {
            http,
            pipeline_url: config.pipeline_url(),
            config,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// See [`crate::TursoClient::execute`].
    pub fn execute<P: Into<Params>>(&self, sql: &str, params: P) -> Result<NormalizedResult> {
        let envelope = PipelineEnvelope::single(sql, params)?;
        let raw = self.send_pipeline(&envelope)?;
        match raw.application_error(envelope.len()) {
            Some(err) => Err(err),
            None => Ok(raw.normalize()),
        }
    }

    pub fn execute_raw<P: Into<Params>>(&self, sql: &str, params: P) -> Result<RawResponse> {
        let envelope = PipelineEnvelope::single(sql, params)?;
        self.send_pipeline(&envelope)
    }

    /// See [`crate::TursoClient::execute_pipeline`].
    pub fn execute_pipeline<I>(&self, statements: I) -> Result<Vec<StatementOutcome>>
    where
        I: IntoIterator<Item = Statement>,
    {
        let envelope = PipelineEnvelope::build(statements)?;
        let raw = self.send_pipeline(&envelope)?;
        Ok(raw.outcomes(envelope.len()))
    }

    pub fn ping(&self) -> Result<()> {
        self.send_pipeline(&PipelineEnvelope::close_only())
            .map(|_| ())
    }

    /// Sends `envelope`, retrying transient failures. Each attempt's request
    /// timeout and each backoff sleep are clipped to what is left of the
    /// round-trip budget.
    pub fn send_pipeline(&self, envelope: &PipelineEnvelope) -> Result<RawResponse> {
        let limit = self.config.timeout;
        let deadline = Instant::now() + limit;
        let policy = RetryPolicy::from(&self.config);
        let mut attempt = 0usize;
        loop {
            let remaining = time_left(deadline).ok_or(TursoError::Timeout { limit })?;
            debug!(
                url = %self.pipeline_url,
                statements = envelope.len(),
                attempt,
                "sending pipeline request"
            );
            let response = self
                .http
                .post(&self.pipeline_url)
                .header(header::AUTHORIZATION, self.config.authorization())
                .header(header::CONTENT_TYPE, "application/json")
                .timeout(remaining)
                .json(envelope)
                .send();

            let step = match response {
                Ok(response) => {
                    let status = response.status();
                    match response.text() {
                        Ok(body) => policy.on_response(attempt, status, body),
                        Err(err) => policy.on_transport_error(attempt, err, limit),
                    }
                }
                Err(err) => policy.on_transport_error(attempt, err, limit),
            };

            match step {
                Step::Done(raw) => return Ok(raw),
                Step::Fail(err) => return Err(err),
                Step::Retry(delay) => {
                    let remaining = time_left(deadline).ok_or(TursoError::Timeout { limit })?;
                    if delay >= remaining {
                        thread::sleep(remaining);
                        return Err(TursoError::Timeout { limit });
                    }
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    pub fn close(self) {}
}

fn time_left(deadline: Instant) -> Option<Duration> {
    let left = deadline.saturating_duration_since(Instant::now());
    (!left.is_zero()).then_some(left)
}
