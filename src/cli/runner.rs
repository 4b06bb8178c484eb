//! CLI runner - executes commands

use crate::cli::commands::{
    BusinessCoreCommand, Cli, Commands, LivyCommand, LivyTarget, OutputArgs, WikiCommand,
};
use crate::config::Settings;
use crate::error::{Result, ResultExt};
use crate::livy::{LivySession, SessionKind, TableWriter};
use crate::output::{arrow_to_json, write_parquet, WriteOutcome};
use crate::sources::{BusinessCore, Filters, GitlabWiki};
use crate::types::TlsVerify;
use arrow::record_batch::RecordBatch;
use serde_json::{json, Value};
use std::path::Path;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        let settings = Settings::load(self.cli.config.as_deref())?;

        match &self.cli.command {
            Commands::Livy(command) => self.livy(&settings, command).await,
            Commands::Wiki(command) => self.wiki(&settings, command).await,
            Commands::BusinessCore(command) => self.business_core(&settings, command).await,
        }
    }

    async fn livy(&self, settings: &Settings, command: &LivyCommand) -> Result<()> {
        match command {
            LivyCommand::Version { target } => {
                let client = livy_client(settings, target)?;
                let version = client.server_version().await?;
                self.output_message(&json!({ "url": client.url(), "version": version }));
                Ok(())
            }
            LivyCommand::Run {
                code,
                kind,
                name,
                target,
                output,
            } => {
                let mut session = start_session(settings, target, name.as_deref()).await?;

                let result = session.run_with_kind(code, *kind).await;
                let closed = session.close().await;
                let batch = result?;
                closed?;

                self.emit_batch(&batch, output)
            }
            LivyCommand::WriteTable {
                code,
                dataframe,
                table,
                schema,
                database,
                if_exists,
                target,
            } => {
                let mut session = start_session(settings, target, None).await?;

                let result: Result<String> = async {
                    session
                        .run_with_kind(code, Some(SessionKind::Pyspark))
                        .await?;
                    TableWriter::new(&session, dataframe.as_str())
                        .write_table(table, schema.as_deref(), database.as_deref(), *if_exists)
                        .await
                }
                .await;
                let closed = session.close().await;
                let name = result?;
                closed?;

                self.output_message(&json!({ "table": name, "if_exists": if_exists }));
                Ok(())
            }
        }
    }

    async fn wiki(&self, settings: &Settings, command: &WikiCommand) -> Result<()> {
        match command {
            WikiCommand::Get {
                url,
                path,
                list,
                no_verify,
            } => {
                let wiki = GitlabWiki::new(url, None, settings, tls(*no_verify))?;
                if *list {
                    let pages = wiki.list_pages().await?;
                    self.output_message(&serde_json::to_value(pages)?);
                } else if let Some(path) = path {
                    println!("{}", wiki.get_content(path).await?);
                }
                Ok(())
            }
            WikiCommand::Update {
                url,
                path,
                content,
                file,
                no_verify,
            } => {
                let content = match content {
                    Some(content) => content.clone(),
                    None => std::io::read_to_string(std::io::stdin())
                        .context("Failed to read page content from stdin")?,
                };
                let wiki = GitlabWiki::new(url, None, settings, tls(*no_verify))?;
                let page = wiki.update_page(path, &content, file.as_deref()).await?;
                self.output_message(&json!({ "slug": page.slug, "title": page.title }));
                Ok(())
            }
        }
    }

    async fn business_core(&self, settings: &Settings, command: &BusinessCoreCommand) -> Result<()> {
        match command {
            BusinessCoreCommand::Fetch {
                url,
                login_url,
                from_date,
                to_date,
                bucket_count,
                bucket_no,
                no_verify,
                output,
            } => {
                let filters = Filters {
                    bucket_count: *bucket_count,
                    bucket_no: *bucket_no,
                    from_date: from_date.clone(),
                    to_date: to_date.clone(),
                };
                let client = match login_url {
                    Some(login_url) => BusinessCore::with_login_url(
                        url.as_str(),
                        filters,
                        None,
                        settings,
                        tls(*no_verify),
                        login_url,
                    )?,
                    None => {
                        BusinessCore::new(url.as_str(), filters, None, settings, tls(*no_verify))?
                    }
                };

                let batch = client.to_record_batch().await?;
                self.emit_batch(&batch, output)
            }
        }
    }

    /// Print rows as JSON, or write them to parquet when an output path is set
    fn emit_batch(&self, batch: &RecordBatch, output: &OutputArgs) -> Result<()> {
        match &output.output {
            Some(path) => {
                let outcome = write_parquet(path, batch, output.if_exists, None)?;
                info!("{} -> {}", describe_outcome(outcome), path.display());
                self.output_message(&outcome_message(path, outcome));
            }
            None => {
                let rows = arrow_to_json(batch)?;
                if self.cli.pretty {
                    self.output_message(&Value::Array(rows));
                } else {
                    for row in &rows {
                        self.output_message(row);
                    }
                }
            }
        }
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        if self.cli.pretty {
            println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
        } else {
            println!("{}", serde_json::to_string(msg).unwrap_or_default());
        }
    }
}

fn tls(no_verify: bool) -> TlsVerify {
    TlsVerify::from(!no_verify)
}

fn livy_client(settings: &Settings, target: &LivyTarget) -> Result<crate::livy::LivyClient> {
    let verify = target.no_verify.then_some(TlsVerify::Disabled);
    settings.livy_client(target.url.as_deref(), None, verify)
}

async fn start_session(
    settings: &Settings,
    target: &LivyTarget,
    name: Option<&str>,
) -> Result<LivySession> {
    let client = livy_client(settings, target)?;
    let mut request = settings.livy.session.to_request();
    if let Some(name) = name {
        request.name = name.to_string();
    }
    LivySession::start(client, &request, settings.livy.polling.clone()).await
}

fn describe_outcome(outcome: WriteOutcome) -> String {
    match outcome {
        WriteOutcome::Written { rows } => format!("Wrote {rows} rows"),
        WriteOutcome::Appended { rows, total_rows } => {
            format!("Appended {rows} rows ({total_rows} total)")
        }
        WriteOutcome::Skipped => "Skipped existing file".to_string(),
    }
}

fn outcome_message(path: &Path, outcome: WriteOutcome) -> Value {
    let status = match outcome {
        WriteOutcome::Written { .. } => "written",
        WriteOutcome::Appended { .. } => "appended",
        WriteOutcome::Skipped => "skipped",
    };
    json!({
        "path": path.display().to_string(),
        "status": status,
        "rows": outcome.rows(),
    })
}
