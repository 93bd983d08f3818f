use std::fmt;

use reqwest::header;
use tokio::time::{sleep, timeout};
use tracing::debug;

use crate::{
    retry::{RetryPolicy, Step},
    ClientConfig, NormalizedResult, Params, PipelineEnvelope, RawResponse, Result, Statement,
    StatementOutcome, TursoError,
};

/// Async HTTP client for the `/v2/pipeline` endpoint.
///
/// Owns one `reqwest::Client`, which is released when the last clone is
/// dropped. Every call sends its own pipeline, so each call runs in its own
/// server-side session.
#[derive(Clone)]
pub struct TursoClient {
    http: reqwest::Client,
    pipeline_url: String,
    config: ClientConfig,
}

impl fmt::Debug for TursoClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TursoClient")
            .field("pipeline_url", &self.pipeline_url)
            .field("config", &self.config)
            .finish()
    }
}

impl TursoClient {
    /// Creates a client with its own HTTP connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(TursoError::Connection)?;
        Ok(Self::with_http_client(config, http))
    }

    /// Creates a client on top of a caller-supplied HTTP client.
    pub fn with_http_client(config: ClientConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            pipeline_url: config.pipeline_url(),
            config,
        }
    }

    /// Creates a client from `TURSO_DATABASE_URL` and `TURSO_AUTH_TOKEN`
    /// (plus the optional `TURSO_*` tuning variables).
    ///
    /// # Example
    ///
    /// ```no_run
    /// use turso_pipeline::TursoClient;
    ///
    /// let db = TursoClient::from_env().expect("missing TURSO_* env vars");
    /// ```
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Executes one statement and returns its normalized rows.
    ///
    /// A statement-level SQL error is returned as
    /// [`TursoError::Application`].
    pub async fn execute<P: Into<Params>>(&self, sql: &str, params: P) -> Result<NormalizedResult> {
        let envelope = PipelineEnvelope::single(sql, params)?;
        let raw = self.send_pipeline(&envelope).await?;
        match raw.application_error(envelope.len()) {
            Some(err) => Err(err),
            None => Ok(raw.normalize()),
        }
    }

    /// Executes one statement and returns the response body untouched.
    pub async fn execute_raw<P: Into<Params>>(&self, sql: &str, params: P) -> Result<RawResponse> {
        let envelope = PipelineEnvelope::single(sql, params)?;
        self.send_pipeline(&envelope).await
    }

    /// Sends multiple statements in one pipeline, sharing one session.
    ///
    /// SQL errors at statement level are returned as
    /// [`StatementOutcome::SqlError`] instead of failing the entire batch.
    pub async fn execute_pipeline<I>(&self, statements: I) -> Result<Vec<StatementOutcome>>
    where
        I: IntoIterator<Item = Statement>,
    {
        let envelope = PipelineEnvelope::build(statements)?;
        let raw = self.send_pipeline(&envelope).await?;
        Ok(raw.outcomes(envelope.len()))
    }

    /// Sends a close-only pipeline to check that the endpoint and credential
    /// are usable.
    pub async fn ping(&self) -> Result<()> {
        self.send_pipeline(&PipelineEnvelope::close_only())
            .await
            .map(|_| ())
    }

    /// Sends `envelope`, retrying transient failures, within the configured
    /// round-trip timeout.
    pub async fn send_pipeline(&self, envelope: &PipelineEnvelope) -> Result<RawResponse> {
        let limit = self.config.timeout;
        timeout(limit, self.send_with_retry(envelope))
            .await
            .map_err(|_| TursoError::Timeout { limit })?
    }

    /// Releases the HTTP client. Equivalent to dropping `self`.
    pub fn close(self) {}

    async fn send_with_retry(&self, envelope: &PipelineEnvelope) -> Result<RawResponse> {
        let policy = RetryPolicy::from(&self.config);
        let mut attempt = 0usize;
        loop {
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
                .json(envelope)
                .send()
                .await;

            let step = match response {
                Ok(response) => {
                    let status = response.status();
                    match response.text().await {
                        Ok(body) => policy.on_response(attempt, status, body),
                        Err(err) => policy.on_transport_error(attempt, err, self.config.timeout),
                    }
                }
                Err(err) => policy.on_transport_error(attempt, err, self.config.timeout),
            };

            match step {
                Step::Done(raw) => return Ok(raw),
                Step::Fail(err) => return Err(err),
                Step::Retry(delay) => {
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
