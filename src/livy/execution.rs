//! Running code on a ready session

use super::manager::LivySession;
use super::session::SessionKind;
use super::statement::{Statement, StatementRequest};
use crate::error::{Error, Result};
use crate::types::IfExists;
use arrow::record_batch::RecordBatch;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

static NAME_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("valid regex"));

static VARIABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

impl LivySession {
    /// Run code in the session's default interpreter
    pub async fn run(&self, code: &str) -> Result<RecordBatch> {
        self.run_with_kind(code, None).await
    }

    /// Run code with an explicit interpreter kind
    pub async fn run_with_kind(&self, code: &str, kind: Option<SessionKind>) -> Result<RecordBatch> {
        let statement = self.execute(code, kind).await?;
        statement.to_record_batch()
    }

    /// Submit code and wait for the statement to finish
    ///
    /// Returns the finished statement without interpreting its output.
    pub async fn execute(&self, code: &str, kind: Option<SessionKind>) -> Result<Statement> {
        let state = self.state().await?;
        if !state.is_active() {
            return Err(Error::SessionNotReady {
                id: self.id(),
                state: state.to_string(),
            });
        }

        let request = StatementRequest::new(code, kind);
        let mut statement = self.client().submit_statement(self.id(), &request).await?;
        debug!(
            "Submitted statement {} to Livy session {}",
            statement.id,
            self.id()
        );

        let mut schedule = self.polling().schedule()?;
        while !statement.state.is_finished() {
            match schedule.next() {
                Some(interval) => tokio::time::sleep(interval).await,
                None => {
                    if let Err(e) = self.client().cancel_statement(self.id(), statement.id).await {
                        warn!("Failed to cancel statement {}: {}", statement.id, e);
                    }
                    return Err(Error::StatementTimeout {
                        statement_id: statement.id,
                        elapsed: schedule.elapsed(),
                    });
                }
            }
            statement = self.client().get_statement(self.id(), statement.id).await?;
            debug!("Statement {} is {}", statement.id, statement.state);
        }

        statement.check()?;
        Ok(statement)
    }
}

/// Build a dotted table name from its parts
///
/// Empty parts count as missing. A database without a schema is ignored.
pub fn qualified_name(
    table: Option<&str>,
    schema: Option<&str>,
    database: Option<&str>,
) -> Result<String> {
    fn present(part: Option<&str>) -> Option<&str> {
        part.filter(|p| !p.is_empty())
    }

    let table = present(table).ok_or_else(|| Error::invalid_name("table name is required"))?;
    let parts: Vec<&str> = match (present(schema), present(database)) {
        (Some(schema), Some(database)) => vec![database, schema, table],
        (Some(schema), None) => vec![schema, table],
        (None, _) => vec![table],
    };

    for part in &parts {
        if !NAME_PART.is_match(part) {
            return Err(Error::invalid_name(format!(
                "'{part}' is not a valid identifier"
            )));
        }
    }

    Ok(parts.join("."))
}

/// Writes a remote DataFrame to a catalog table
///
/// The DataFrame must already exist as a variable in the session's Python
/// interpreter.
#[derive(Debug)]
pub struct TableWriter<'a> {
    session: &'a LivySession,
    dataframe: String,
}

impl<'a> TableWriter<'a> {
    pub fn new(session: &'a LivySession, dataframe: impl Into<String>) -> Self {
        Self {
            session,
            dataframe: dataframe.into(),
        }
    }

    /// PySpark code performing the write
    pub fn write_statement(&self, name: &str, if_exists: IfExists) -> Result<String> {
        if !VARIABLE.is_match(&self.dataframe) {
            return Err(Error::invalid_name(format!(
                "'{}' is not a valid variable name",
                self.dataframe
            )));
        }

        let create = format!("{}.writeTo(\"{name}\").create()", self.dataframe);
        let code = match if_exists {
            IfExists::Fail => create,
            IfExists::Replace => format!("{}.writeTo(\"{name}\").createOrReplace()", self.dataframe),
            IfExists::Append => format!("{}.writeTo(\"{name}\").append()", self.dataframe),
            IfExists::Skip => format!("if not spark.catalog.tableExists(\"{name}\"):\n    {create}"),
            IfExists::Delete => format!("spark.sql(\"DROP TABLE IF EXISTS {name}\")\n{create}"),
        };
        Ok(code)
    }

    /// Write the DataFrame, returning the qualified table name
    pub async fn write_table(
        &self,
        table: &str,
        schema: Option<&str>,
        database: Option<&str>,
        if_exists: IfExists,
    ) -> Result<String> {
        let name = qualified_name(Some(table), schema, database)?;
        let code = self.write_statement(&name, if_exists)?;

        self.session
            .run_with_kind(&code, Some(SessionKind::Pyspark))
            .await?;
        info!("Wrote {} to {} ({})", self.dataframe, name, if_exists);
        Ok(name)
    }
}
