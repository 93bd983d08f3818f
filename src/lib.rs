//! `turso-pipeline` is an HTTP client for the Turso / libSQL SQL API.
//!
//! The crate wraps the `/v2/pipeline` endpoint: statements and their typed
//! arguments are encoded into one ordered pipeline request (always closed by
//! a trailing `close`), transient failures are retried with exponential
//! backoff, and the loosely shaped JSON reply is normalized into
//! [`NormalizedResult`] rows and columns.
//!
//! - [`TursoClient::execute`]
//! - [`TursoClient::execute_pipeline`]
//! - [`TursoClient::send_pipeline`]
//!
//! With the default `blocking` feature, [`blocking::TursoClient`] offers the
//! same operations for synchronous callers.

#[cfg(feature = "blocking")]
pub mod blocking;
mod client;
pub mod codec;
mod config;
mod error;
pub mod normalize;
mod params;
mod pipeline;
mod raw;
mod retry;
mod row_map;
mod types;
mod value;
mod wire;

pub use client::TursoClient;
pub use config::{
    ClientConfig, ClientConfigBuilder, AUTH_TOKEN_ENV, BACKOFF_BASE_ENV, DATABASE_URL_ENV,
    MAX_RETRIES_ENV, TIMEOUT_ENV,
};
pub use error::TursoError;
pub use params::{Params, Statement};
pub use pipeline::{PipelineEnvelope, StatementOp};
pub use raw::RawResponse;
pub use row_map::RowRef;
pub use types::{ExecStats, NormalizedResult, StatementOutcome};
pub use value::Value;
pub use wire::TypedValue;

pub type Result<T> = std::result::Result<T, TursoError>;
