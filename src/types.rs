use serde_json::Value as JsonValue;

use crate::{row_map::RowRef, Result, TursoError};

/// Flat row/column view of one execute result.
///
/// Cells are the unwrapped wire values: an integer column comes back as the
/// JSON string `"1"`, not a number. In normalized responses every row has
/// one cell per column whenever columns are present; columns may be empty
/// while rows are not.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NormalizedResult {
    columns: Vec<String>,
    rows: Vec<Vec<JsonValue>>,
}

impl NormalizedResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<JsonValue>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<JsonValue>> {
        self.rows
    }

    /// Always equal to `rows().len()`.
    pub fn count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row, or `None` when the result has no rows.
    pub fn first_row(&self) -> Option<&[JsonValue]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// First cell of the first row.
    pub fn first_value(&self) -> Option<&JsonValue> {
        self.first_row()?.first()
    }

    /// Row `index` with name-based cell access.
    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = RowRef<'_>> {
        self.rows.iter().map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }
}

/// Write metadata of an execute result. Absent fields read as zero / `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecStats {
    pub affected_row_count: u64,
    pub last_insert_rowid: Option<i64>,
}

/// Per-statement result of a pipeline.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementOutcome {
    Rows(NormalizedResult),
    SqlError {
        request_index: usize,
        message: String,
        code: Option<String>,
    },
}

impl StatementOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::SqlError { .. })
    }

    /// Converts a SQL error into [`TursoError::Application`].
    pub fn into_result(self) -> Result<NormalizedResult> {
        match self {
            Self::Rows(result) => Ok(result),
            Self::SqlError {
                request_index,
                message,
                code,
            } => Err(TursoError::Application {
                request_index,
                message,
                code,
            }),
        }
    }
}
