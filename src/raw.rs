//! Untyped pipeline response payload.

use serde_json::Value as JsonValue;

use crate::{normalize, ExecStats, NormalizedResult, StatementOutcome, TursoError};

/// The JSON body of an HTTP 200 pipeline response, kept as-is.
///
/// It may carry per-statement errors; use [`RawResponse::application_error`]
/// to check. The projection helpers all go through [`RawResponse::normalize`].
#[derive(Clone, Debug, PartialEq)]
pub struct RawResponse(JsonValue);

impl RawResponse {
    pub fn new(json: JsonValue) -> Self {
        Self(json)
    }

    pub fn as_json(&self) -> &JsonValue {
        &self.0
    }

    pub fn into_json(self) -> JsonValue {
        self.0
    }

    /// Rows and columns of the first statement.
    pub fn normalize(&self) -> NormalizedResult {
        normalize::normalize(&self.0)
    }

    /// Rows and columns of statement `index`.
    pub fn normalize_at(&self, index: usize) -> NormalizedResult {
        normalize::normalize_at(&self.0, index)
    }

    pub fn rows(&self) -> Vec<Vec<JsonValue>> {
        self.normalize().into_rows()
    }

    pub fn first_row(&self) -> Option<Vec<JsonValue>> {
        self.normalize().into_rows().into_iter().next()
    }

    pub fn row_count(&self) -> usize {
        self.normalize().count()
    }

    pub fn exec_stats(&self, index: usize) -> ExecStats {
        normalize::exec_stats(&self.0, index)
    }

    /// First of the `statements` statements that reported `type: "error"`,
    /// if any. An error on the trailing close is logged, not returned.
    pub fn application_error(&self, statements: usize) -> Option<TursoError> {
        normalize::application_error(&self.0, statements)
    }

    /// One outcome per statement, for a pipeline of `statements` statements.
    pub fn outcomes(&self, statements: usize) -> Vec<StatementOutcome> {
        normalize::outcomes(&self.0, statements)
    }
}

impl From<JsonValue> for RawResponse {
    fn from(json: JsonValue) -> Self {
        Self(json)
    }
}
