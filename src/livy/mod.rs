//! Apache Livy session management
//!
//! Creates interactive Spark sessions on a Livy server, waits for them to
//! become ready, runs code in them and tears them down.
//!
//! # Features
//!
//! - **Transport**: JSON over HTTP with basic auth and TLS verification control
//! - **Lifecycle**: create, wait, state, close with idempotent teardown
//! - **Polling**: warm-up then steady intervals, optionally bounded
//! - **Execution**: statement results decoded into Arrow record batches
//! - **Table writes**: PySpark `DataFrameWriterV2` with an existence policy

mod client;
mod execution;
mod manager;
mod polling;
mod session;
mod statement;

pub use client::{LivyClient, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT};
pub use execution::{qualified_name, TableWriter};
pub use manager::LivySession;
pub use polling::{PollingConfig, PollingSchedule};
pub use session::{Session, SessionKind, SessionRequest, SessionState, FINISHED, NOT_READY};
pub use statement::{
    parse_scalar, Statement, StatementOutput, StatementRequest, StatementState, VALUE_COLUMN,
};

#[cfg(test)]
mod tests;
