//! Assembly of ordered statements into one pipeline request body.

use serde::{Serialize, Serializer};

use crate::{
    codec,
    wire::{NamedArg, PipelineRequest, Request, TypedValue},
    Params, Result, Statement, TursoError,
};

/// One encoded `execute` operation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatementOp {
    sql: String,
    args: Vec<TypedValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    named_args: Vec<NamedArg>,
}

impl StatementOp {
    /// Encodes `params` and pairs them with `sql`. The SQL text is not
    /// inspected or rewritten.
    pub fn new(sql: impl Into<String>, params: Params) -> Result<Self> {
        let sql = sql.into();
        match params {
            Params::Positional(values) => Ok(Self {
                sql,
                args: codec::encode_all(values)?,
                named_args: Vec::new(),
            }),
            Params::Named(values) => {
                let named_args = values
                    .into_iter()
                    .map(|(name, value)| {
                        Ok(NamedArg {
                            name: normalize_named_parameter_name(&name)?,
                            value: codec::encode_value(value)?,
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Self {
                    sql,
                    args: Vec::new(),
                    named_args,
                })
            }
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn args(&self) -> &[TypedValue] {
        &self.args
    }
}

/// Ordered `execute` operations followed by exactly one `close`.
///
/// The close is implicit: it is appended when the envelope is serialized and
/// cannot be omitted or duplicated. An envelope without statements serializes
/// to a lone close, which is how liveness checks are sent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PipelineEnvelope {
    ops: Vec<StatementOp>,
}

impl PipelineEnvelope {
    /// Encodes every statement in order. Fails on the first argument that
    /// cannot be encoded, before anything is sent.
    pub fn build<I>(statements: I) -> Result<Self>
    where
        I: IntoIterator<Item = Statement>,
    {
        let ops = statements
            .into_iter()
            .map(|statement| StatementOp::new(statement.sql, statement.params))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ops })
    }

    /// Envelope holding a single statement.
    pub fn single<P: Into<Params>>(sql: &str, params: P) -> Result<Self> {
        Ok(Self {
            ops: vec![StatementOp::new(sql, params.into())?],
        })
    }

    /// Envelope holding only the trailing close.
    pub fn close_only() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: StatementOp) {
        self.ops.push(op);
    }

    pub fn statements(&self) -> &[StatementOp] {
        &self.ops
    }

    /// Number of `execute` operations, not counting the close.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Serialize for PipelineEnvelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let requests = self
            .ops
            .iter()
            .map(|stmt| Request::Execute { stmt })
            .chain(std::iter::once(Request::Close {}))
            .collect();
        PipelineRequest { requests }.serialize(serializer)
    }
}

fn normalize_named_parameter_name(name: &str) -> Result<String> {
    let normalized = name.trim_start_matches([':', '@', '$']);
    if normalized.is_empty() {
        return Err(TursoError::unsupported("empty named parameter name"));
    }
    Ok(normalized.to_owned())
}
