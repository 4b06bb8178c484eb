//! CLI commands and argument parsing

use crate::livy::SessionKind;
use crate::types::IfExists;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Conduit CDK CLI
#[derive(Parser, Debug)]
#[command(name = "conduit-cdk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (YAML)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(short, long, global = true)]
    pub pretty: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run code on a Livy server
    #[command(subcommand)]
    Livy(LivyCommand),

    /// Read and update GitLab wiki pages
    #[command(subcommand)]
    Wiki(WikiCommand),

    /// Extract views from the Business Core API
    #[command(subcommand)]
    BusinessCore(BusinessCoreCommand),
}

/// Livy server overrides shared by the `livy` subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct LivyTarget {
    /// Livy server URL (overrides the settings file)
    #[arg(long)]
    pub url: Option<String>,

    /// Disable TLS certificate verification
    #[arg(long)]
    pub no_verify: bool,
}

/// Parquet destination for extracted rows
#[derive(Args, Debug, Clone)]
pub struct OutputArgs {
    /// Write rows to this parquet file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// What to do when the output file already exists
    #[arg(long, value_enum, default_value = "fail")]
    pub if_exists: IfExists,
}

#[derive(Subcommand, Debug)]
pub enum LivyCommand {
    /// Print the server version
    Version {
        #[command(flatten)]
        target: LivyTarget,
    },

    /// Start a session, run code and print its result
    Run {
        /// Code to execute
        #[arg(long)]
        code: String,

        /// Statement kind (defaults to the session kind)
        #[arg(long, value_enum)]
        kind: Option<SessionKind>,

        /// Session name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        target: LivyTarget,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Start a session, build a DataFrame and write it to a table
    WriteTable {
        /// PySpark code defining the DataFrame
        #[arg(long)]
        code: String,

        /// Variable holding the DataFrame
        #[arg(long, default_value = "df")]
        dataframe: String,

        #[arg(long)]
        table: String,

        #[arg(long)]
        schema: Option<String>,

        #[arg(long)]
        database: Option<String>,

        #[arg(long, value_enum, default_value = "fail")]
        if_exists: IfExists,

        #[command(flatten)]
        target: LivyTarget,
    },
}

#[derive(Subcommand, Debug)]
pub enum WikiCommand {
    /// Print a page's content, or list all pages
    Get {
        /// Repository URL, e.g. https://gitlab.example.com/group/project
        #[arg(long)]
        url: String,

        /// Page path
        #[arg(long, required_unless_present = "list")]
        path: Option<String>,

        /// List pages instead of reading one
        #[arg(long)]
        list: bool,

        #[arg(long)]
        no_verify: bool,
    },

    /// Replace a page's content
    Update {
        #[arg(long)]
        url: String,

        #[arg(long)]
        path: String,

        /// New content; read from stdin when omitted
        #[arg(long)]
        content: Option<String>,

        /// File to attach below the content
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(long)]
        no_verify: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BusinessCoreCommand {
    /// Fetch a view's rows
    Fetch {
        /// View endpoint URL
        #[arg(long)]
        url: String,

        /// Token endpoint (defaults to the public API)
        #[arg(long)]
        login_url: Option<String>,

        #[arg(long)]
        from_date: Option<String>,

        #[arg(long)]
        to_date: Option<String>,

        #[arg(long)]
        bucket_count: Option<u32>,

        #[arg(long)]
        bucket_no: Option<u32>,

        #[arg(long)]
        no_verify: bool,

        #[command(flatten)]
        output: OutputArgs,
    },
}
