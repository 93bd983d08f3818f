use serde::{Deserialize, Serialize};

use crate::pipeline::StatementOp;

pub(crate) const PIPELINE_PATH: &str = "/v2/pipeline";

#[derive(Debug, Serialize)]
pub(crate) struct PipelineRequest<'a> {
    pub requests: Vec<Request<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Request<'a> {
    Execute { stmt: &'a StatementOp },
    Close {},
}

/// Wire representation of a single argument or returned cell.
///
/// Serialized as `{"type": "<kind>", "value": "<text>"}`; `null` carries no
/// value field and blobs carry a `base64` field instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TypedValue {
    Null {},
    Integer { value: String },
    Float { value: String },
    Text { value: String },
    Blob { base64: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct NamedArg {
    pub name: String,
    pub value: TypedValue,
}
