//! Parquet sink
//!
//! Writes record batches to local Parquet files under an existence policy.
//! Files are written next to their destination and renamed into place, so a
//! failed write never leaves a truncated file behind.

use crate::error::{Error, Result};
use crate::types::IfExists;
use arrow::datatypes::{Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::{EnabledStatistics, WriterProperties};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Parquet encoding settings
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
    dictionary_enabled: bool,
    statistics_enabled: bool,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 1024 * 1024,
            dictionary_enabled: true,
            statistics_enabled: true,
        }
    }
}

impl ParquetWriterConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[must_use]
    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    #[must_use]
    pub fn with_dictionary(mut self, enabled: bool) -> Self {
        self.dictionary_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_statistics(mut self, enabled: bool) -> Self {
        self.statistics_enabled = enabled;
        self
    }

    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    #[must_use]
    pub fn zstd(mut self) -> Self {
        self.compression = Compression::ZSTD(ZstdLevel::default());
        self
    }

    #[must_use]
    pub fn gzip(mut self) -> Self {
        self.compression = Compression::GZIP(GzipLevel::default());
        self
    }

    fn properties(&self) -> WriterProperties {
        let statistics = if self.statistics_enabled {
            EnabledStatistics::Page
        } else {
            EnabledStatistics::None
        };
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .set_dictionary_enabled(self.dictionary_enabled)
            .set_statistics_enabled(statistics)
            .build()
    }
}

/// Streaming writer for a single Parquet file
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    schema: SchemaRef,
    rows_written: usize,
}

impl ParquetWriter {
    /// Create (or truncate) `path` and prepare to write batches of `schema`
    pub fn new(path: impl AsRef<Path>, schema: SchemaRef, config: &ParquetWriterConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)
            .map_err(|e| Error::output(format!("Failed to create {}: {e}", path.display())))?;
        let writer = ArrowWriter::try_new(file, Arc::clone(&schema), Some(config.properties()))?;

        Ok(Self {
            writer,
            schema,
            rows_written: 0,
        })
    }

    /// Append a batch; its columns must match the writer's schema
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        if !same_columns(&self.schema, &batch.schema()) {
            return Err(Error::output(format!(
                "Batch schema {} does not match file schema {}",
                describe(&batch.schema()),
                describe(&self.schema)
            )));
        }
        let batch = RecordBatch::try_new(Arc::clone(&self.schema), batch.columns().to_vec())?;
        self.writer.write(&batch)?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    #[must_use]
    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Finish the file, returning the number of rows written
    pub fn close(self) -> Result<usize> {
        self.writer.close()?;
        Ok(self.rows_written)
    }
}

impl std::fmt::Debug for ParquetWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetWriter")
            .field("schema", &describe(&self.schema))
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

/// What [`write_parquet`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// A new file was written (or an old one replaced)
    Written { rows: usize },
    /// Rows were added to an existing file
    Appended { rows: usize, total_rows: usize },
    /// The file existed and was left alone
    Skipped,
}

impl WriteOutcome {
    /// Rows written by this call
    pub fn rows(self) -> usize {
        match self {
            WriteOutcome::Written { rows } | WriteOutcome::Appended { rows, .. } => rows,
            WriteOutcome::Skipped => 0,
        }
    }
}

/// Write a batch to `path`, honoring `if_exists` when the file is already there
pub fn write_parquet(
    path: impl AsRef<Path>,
    batch: &RecordBatch,
    if_exists: IfExists,
    config: Option<&ParquetWriterConfig>,
) -> Result<WriteOutcome> {
    let path = path.as_ref();
    let default_config = ParquetWriterConfig::default();
    let config = config.unwrap_or(&default_config);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut existing = Vec::new();
    if path.exists() {
        match if_exists {
            IfExists::Fail => {
                return Err(Error::output(format!("{} already exists", path.display())));
            }
            IfExists::Skip => {
                info!("Skipping {}: file exists", path.display());
                return Ok(WriteOutcome::Skipped);
            }
            IfExists::Replace | IfExists::Delete => {
                debug!("Replacing {}", path.display());
            }
            IfExists::Append => {
                existing = read_parquet(path)?;
            }
        }
    }

    let schema = existing
        .first()
        .map_or_else(|| batch.schema(), RecordBatch::schema);
    let staging = staging_path(path);

    let total_rows = match write_file(&staging, schema, existing.iter().chain([batch]), config) {
        Ok(rows) => rows,
        Err(e) => {
            let _ = fs::remove_file(&staging);
            return Err(e);
        }
    };
    fs::rename(&staging, path)?;

    let rows = batch.num_rows();
    info!("Wrote {} rows to {}", rows, path.display());
    if existing.is_empty() {
        Ok(WriteOutcome::Written { rows })
    } else {
        Ok(WriteOutcome::Appended { rows, total_rows })
    }
}

/// Read every batch of a Parquet file
pub fn read_parquet(path: impl AsRef<Path>) -> Result<Vec<RecordBatch>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.display().to_string(),
        });
    }

    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
    let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(batches)
}

fn write_file<'a>(
    path: &Path,
    schema: SchemaRef,
    batches: impl Iterator<Item = &'a RecordBatch>,
    config: &ParquetWriterConfig,
) -> Result<usize> {
    let mut writer = ParquetWriter::new(path, schema, config)?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

fn same_columns(a: &Schema, b: &Schema) -> bool {
    a.fields().len() == b.fields().len()
        && a.fields().iter().zip(b.fields().iter()).all(|(x, y)| {
            x.name() == y.name() && x.data_type() == y.data_type()
        })
}

fn describe(schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|f| format!("{}: {}", f.name(), f.data_type()))
        .collect();
    format!("[{}]", columns.join(", "))
}
