//! CLI module
//!
//! Command-line interface for the Livy session manager and the REST sources.
//!
//! # Commands
//!
//! - `livy version` - Print the Livy server version
//! - `livy run` - Start a session, run code, print or store the result
//! - `livy write-table` - Build a DataFrame remotely and write it to a table
//! - `wiki get` / `wiki update` - Read or replace GitLab wiki pages
//! - `business-core fetch` - Extract a Business Core view

mod commands;
mod runner;

pub use commands::{
    BusinessCoreCommand, Cli, Commands, LivyCommand, LivyTarget, OutputArgs, WikiCommand,
};
pub use runner::Runner;
