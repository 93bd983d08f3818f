use std::time::Duration;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum TursoError {
    /// A statement argument has no wire representation. Raised before any
    /// network call is made.
    #[error("unsupported argument type: {kind}")]
    UnsupportedArgumentType { kind: String },
    /// Non-200 HTTP status, either non-retryable or after retries ran out.
    #[error("transport error {status}: {body}")]
    Transport { status: u16, body: String },
    /// Connection-level failure from `reqwest` after retries ran out.
    #[error("connection error: {0}")]
    Connection(#[source] reqwest::Error),
    /// The whole round trip, retries included, exceeded the configured bound.
    #[error("request timed out after {limit:?}")]
    Timeout { limit: Duration },
    /// HTTP 200, but a statement in the pipeline reported `type: "error"`.
    #[error("application error at request {request_index}: {message}")]
    Application {
        /// Index of the failing statement in the pipeline payload.
        request_index: usize,
        /// Error message text from the service.
        message: String,
        /// Optional engine-specific error code (e.g. `SQLITE_CONSTRAINT`).
        code: Option<String>,
    },
    /// HTTP 200 with a body that is not JSON at all.
    #[error("decode error: {0}")]
    Decode(String),
    /// Missing or invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

impl TursoError {
    pub(crate) fn unsupported(kind: impl Into<String>) -> Self {
        Self::UnsupportedArgumentType { kind: kind.into() }
    }
}
