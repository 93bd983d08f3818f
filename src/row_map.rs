//! Name-based access to normalized rows.

use serde_json::Value as JsonValue;

/// Borrowed view of one normalized row alongside its column names.
#[derive(Clone, Copy, Debug)]
pub struct RowRef<'a> {
    /// Column names of the result; may be empty.
    pub columns: &'a [String],
    /// Cell values in column order.
    pub values: &'a [JsonValue],
}

impl<'a> RowRef<'a> {
    /// Returns a cell by case-insensitive column name.
    pub fn get(&self, name: &str) -> Option<&'a JsonValue> {
        let idx = self
            .columns
            .iter()
            .position(|column| column.eq_ignore_ascii_case(name))?;
        self.values.get(idx)
    }

    /// Returns a cell as `i64`, parsing the textual wire form when needed.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            JsonValue::Number(number) => number.as_i64(),
            JsonValue::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Returns a cell as `f64`, parsing the textual wire form when needed.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            JsonValue::Number(number) => number.as_f64(),
            JsonValue::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn get_str(&self, name: &str) -> Option<&'a str> {
        self.get(name)?.as_str()
    }
}
