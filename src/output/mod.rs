//! Output module
//!
//! Local Parquet sink for tabular results.
//!
//! # Overview
//!
//! - Inferring Arrow schemas from JSON records
//! - Converting between JSON records and Arrow record batches
//! - Writing Parquet files under an [`IfExists`](crate::types::IfExists) policy
//! - Reading Parquet files back

mod schema;
mod writer;

pub use schema::{arrow_to_json, infer_schema, json_to_arrow};
pub use writer::{read_parquet, write_parquet, ParquetWriter, ParquetWriterConfig, WriteOutcome};
