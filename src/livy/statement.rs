//! Livy statements and their outputs

use super::session::SessionKind;
use crate::error::{Error, Result};
use crate::output::{infer_schema, json_to_arrow};
use crate::types::{JsonObject, JsonValue};
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Column name used for scalar results
pub const VALUE_COLUMN: &str = "value";

/// Scala REPL echo, e.g. `res0: Int = 2`
static SCALA_RESULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^res\d+: [^=]+ = (.*)$").expect("valid regex"));

/// Execution state of a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementState {
    Waiting,
    Running,
    Available,
    Error,
    Cancelling,
    Cancelled,
}

impl StatementState {
    /// No further transitions happen from this state
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            StatementState::Available | StatementState::Error | StatementState::Cancelled
        )
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementState::Waiting => "waiting",
            StatementState::Running => "running",
            StatementState::Available => "available",
            StatementState::Error => "error",
            StatementState::Cancelling => "cancelling",
            StatementState::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Body of a statement submission
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementRequest {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<SessionKind>,
}

impl StatementRequest {
    pub fn new(code: impl Into<String>, kind: Option<SessionKind>) -> Self {
        Self {
            code: code.into(),
            kind,
        }
    }
}

/// Output of a finished statement
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatementOutput {
    /// `ok` or `error`
    pub status: String,
    #[serde(default)]
    pub execution_count: Option<i64>,
    /// MIME type → payload
    #[serde(default)]
    pub data: Option<JsonObject>,
    #[serde(default)]
    pub ename: Option<String>,
    #[serde(default)]
    pub evalue: Option<String>,
    #[serde(default)]
    pub traceback: Vec<String>,
}

impl StatementOutput {
    pub fn is_error(&self) -> bool {
        self.status == "error"
    }

    fn error_message(&self) -> String {
        let mut message = match (&self.ename, &self.evalue) {
            (Some(name), Some(value)) => format!("{name}: {value}"),
            (Some(name), None) => name.clone(),
            (None, Some(value)) => value.clone(),
            (None, None) => "remote execution failed".to_string(),
        };
        if !self.traceback.is_empty() {
            message.push('\n');
            message.push_str(self.traceback.concat().trim_end());
        }
        message
    }
}

/// Snapshot of a statement
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Statement {
    pub id: i64,
    pub state: StatementState,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub output: Option<StatementOutput>,
    #[serde(default)]
    pub progress: Option<f64>,
}

impl Statement {
    /// Parse a statement from its JSON representation
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        Statement::deserialize(value)
            .map_err(|e| Error::decode(format!("Invalid statement: {e}")))
    }

    /// Fail unless the statement finished successfully
    pub fn check(&self) -> Result<()> {
        match self.state {
            StatementState::Cancelled | StatementState::Cancelling => {
                Err(Error::statement(self.id, "statement was cancelled"))
            }
            StatementState::Error => Err(Error::statement(
                self.id,
                self.output
                    .as_ref()
                    .map_or_else(|| "statement failed".to_string(), StatementOutput::error_message),
            )),
            _ => match &self.output {
                Some(output) if output.is_error() => {
                    Err(Error::statement(self.id, output.error_message()))
                }
                _ => Ok(()),
            },
        }
    }

    /// Convert the statement output to a record batch
    ///
    /// Tabular `application/json` payloads (`{schema, data}` or a list of
    /// objects) keep their columns; anything else becomes a one-cell batch
    /// with a single `value` column.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        self.check()?;

        let Some(data) = self.output.as_ref().and_then(|o| o.data.as_ref()) else {
            return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
        };

        if let Some(payload) = data.get("application/json") {
            return json_payload_to_batch(payload);
        }

        match data.get("text/plain") {
            Some(JsonValue::String(text)) => {
                records_to_batch(&[json!({ VALUE_COLUMN: parse_scalar(text) })], &[VALUE_COLUMN])
            }
            Some(other) => records_to_batch(&[json!({ VALUE_COLUMN: other })], &[VALUE_COLUMN]),
            None => Ok(RecordBatch::new_empty(Arc::new(Schema::empty()))),
        }
    }
}

fn json_payload_to_batch(payload: &JsonValue) -> Result<RecordBatch> {
    if let (Some(fields), Some(rows)) = (
        payload.pointer("/schema/fields").and_then(JsonValue::as_array),
        payload.get("data").and_then(JsonValue::as_array),
    ) {
        let columns: Vec<&str> = fields
            .iter()
            .map(|f| {
                f.get("name")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| Error::decode("Schema field without a name"))
            })
            .collect::<Result<_>>()?;

        let records = rows
            .iter()
            .map(|row| {
                let cells = row
                    .as_array()
                    .ok_or_else(|| Error::decode("Table row is not an array"))?;
                let record: JsonObject = columns
                    .iter()
                    .zip(cells)
                    .map(|(name, cell)| ((*name).to_string(), cell.clone()))
                    .collect();
                Ok(JsonValue::Object(record))
            })
            .collect::<Result<Vec<_>>>()?;

        return records_to_batch(&records, &columns);
    }

    if let Some(rows) = payload.as_array() {
        if rows.iter().all(JsonValue::is_object) {
            let mut columns: Vec<&str> = Vec::new();
            for row in rows.iter().filter_map(JsonValue::as_object) {
                for key in row.keys() {
                    if !columns.contains(&key.as_str()) {
                        columns.push(key);
                    }
                }
            }
            return records_to_batch(rows, &columns);
        }
    }

    records_to_batch(&[json!({ VALUE_COLUMN: payload })], &[VALUE_COLUMN])
}

/// Build a batch whose columns follow `columns` order
fn records_to_batch(records: &[JsonValue], columns: &[&str]) -> Result<RecordBatch> {
    let inferred = infer_schema(records)?;
    let fields = columns
        .iter()
        .map(|name| {
            inferred
                .field_with_name(name)
                .cloned()
                .unwrap_or_else(|_| {
                    arrow::datatypes::Field::new(*name, arrow::datatypes::DataType::Null, true)
                })
        })
        .collect::<Vec<_>>();
    let schema: SchemaRef = Arc::new(Schema::new(fields));
    json_to_arrow(records, Some(schema.as_ref()))
}

/// Interpret a `text/plain` result as the most specific JSON scalar
pub fn parse_scalar(text: &str) -> JsonValue {
    let text = text.trim();
    let text = SCALA_RESULT
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str().trim());

    if let Ok(i) = text.parse::<i64>() {
        return JsonValue::from(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        if f.is_finite() {
            return JsonValue::from(f);
        }
    }
    match text {
        "true" | "True" => JsonValue::Bool(true),
        "false" | "False" => JsonValue::Bool(false),
        _ => JsonValue::String(text.to_string()),
    }
}
