//! Extraction of rows and columns from pipeline responses.
//!
//! The response shape belongs to the service and any level of it may be
//! missing. Every lookup here returns an `Option`, and a missing piece
//! collapses the whole extraction to an empty result instead of an error.

use serde_json::Value as JsonValue;
use tracing::{debug, warn};

use crate::{codec, ExecStats, NormalizedResult, StatementOutcome, TursoError};

/// Normalizes the first result of a pipeline response.
pub fn normalize(raw: &JsonValue) -> NormalizedResult {
    normalize_at(raw, 0)
}

/// Normalizes the result at `index`.
///
/// Returns an empty result when the entry is missing, its `type` is not
/// `"ok"`, the nested response is not an `"execute"` response, or it has no
/// `rows` array.
pub fn normalize_at(raw: &JsonValue, index: usize) -> NormalizedResult {
    let Some(result) = result_entry(raw, index).and_then(execute_result) else {
        return NormalizedResult::default();
    };
    let Some(raw_rows) = result.get("rows").and_then(JsonValue::as_array) else {
        return NormalizedResult::default();
    };

    let columns: Vec<String> = result
        .get("cols")
        .and_then(JsonValue::as_array)
        .map(|cols| {
            cols.iter()
                .map(|col| {
                    col.get("name")
                        .and_then(JsonValue::as_str)
                        .unwrap_or_default()
                        .to_owned()
                })
                .collect()
        })
        .unwrap_or_default();

    let rows = raw_rows
        .iter()
        .enumerate()
        .filter_map(|(row_index, row)| {
            let decoded = decode_row(row)
                .filter(|cells| columns.is_empty() || cells.len() == columns.len());
            if decoded.is_none() {
                debug!(index, row_index, "skipping malformed row in pipeline response");
            }
            decoded
        })
        .collect::<Vec<_>>();

    debug!(index, rows = rows.len(), "normalized pipeline result");
    NormalizedResult::new(columns, rows)
}

/// Reads `affected_row_count` and `last_insert_rowid` from the result at
/// `index`.
pub fn exec_stats(raw: &JsonValue, index: usize) -> ExecStats {
    let Some(result) = result_entry(raw, index).and_then(execute_result) else {
        return ExecStats::default();
    };
    ExecStats {
        affected_row_count: result
            .get("affected_row_count")
            .and_then(JsonValue::as_u64)
            .unwrap_or_default(),
        last_insert_rowid: result.get("last_insert_rowid").and_then(|value| match value {
            JsonValue::String(text) => text.parse().ok(),
            other => other.as_i64(),
        }),
    }
}

/// First statement reporting `type: "error"`, as [`TursoError::Application`].
/// `statements` excludes the trailing close, whose errors are only logged.
pub(crate) fn application_error(raw: &JsonValue, statements: usize) -> Option<TursoError> {
    warn_on_close_error(raw, statements);
    (0..statements).find_map(|request_index| {
        result_entry(raw, request_index)
            .and_then(sql_error)
            .map(|(message, code)| TursoError::Application {
                request_index,
                message,
                code,
            })
    })
}

/// One outcome per statement, in envelope order. `statements` excludes the
/// trailing close.
pub(crate) fn outcomes(raw: &JsonValue, statements: usize) -> Vec<StatementOutcome> {
    let outcomes: Vec<_> = (0..statements)
        .map(|index| {
            match result_entry(raw, index).and_then(sql_error) {
                Some((message, code)) => StatementOutcome::SqlError {
                    request_index: index,
                    message,
                    code,
                },
                None => StatementOutcome::Rows(normalize_at(raw, index)),
            }
        })
        .collect();

    warn_on_close_error(raw, statements);
    outcomes
}

fn warn_on_close_error(raw: &JsonValue, close_index: usize) {
    if let Some((message, _)) = result_entry(raw, close_index).and_then(sql_error) {
        warn!(request_index = close_index, %message, "pipeline close reported an error");
    }
}

fn result_entry(raw: &JsonValue, index: usize) -> Option<&JsonValue> {
    raw.get("results")?.as_array()?.get(index)
}

fn execute_result(entry: &JsonValue) -> Option<&JsonValue> {
    if entry.get("type")?.as_str()? != "ok" {
        return None;
    }
    let response = entry.get("response")?;
    if response.get("type")?.as_str()? != "execute" {
        return None;
    }
    response.get("result")
}

fn sql_error(entry: &JsonValue) -> Option<(String, Option<String>)> {
    if entry.get("type")?.as_str()? != "error" {
        return None;
    }
    let error = entry.get("error");
    let message = match error {
        Some(error) => error
            .get("message")
            .and_then(JsonValue::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| error.to_string()),
        None => "pipeline request failed without an error payload".to_owned(),
    };
    let code = error
        .and_then(|error| error.get("code"))
        .and_then(JsonValue::as_str)
        .map(str::to_owned);
    Some((message, code))
}

fn decode_row(row: &JsonValue) -> Option<Vec<JsonValue>> {
    let cells = match row {
        JsonValue::Array(cells) => cells,
        JsonValue::Object(fields) => fields.get("values")?.as_array()?,
        _ => return None,
    };
    Some(cells.iter().map(codec::decode_cell).collect())
}
