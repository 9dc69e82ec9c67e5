//! Spreadsheet export of product lists.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::catalog::Product;

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("failed to encode export: {0}")]
  Csv(#[from] csv::Error),

  #[error("failed to write export: {0}")]
  Io(#[from] std::io::Error),

  #[error("export task failed: {0}")]
  Task(String),
}

/// Turns a list of products into the bytes of an export file.
#[async_trait]
pub trait ExportEncoder: Send + Sync {
  async fn encode(&self, records: &[Product]) -> Result<Vec<u8>, ExportError>;

  /// File extension without the dot
  fn extension(&self) -> &'static str;
}

const HEADERS: [&str; 8] = [
  "ID", "Name", "Category", "Price", "Stock", "Status", "Created", "Updated",
];

/// CSV with display labels for category and status
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder;

impl CsvEncoder {
  fn encode_blocking(records: &[Product]) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADERS)?;
    for p in records {
      writer.write_record([
        p.id.to_string(),
        p.name.clone(),
        p.category.label().to_string(),
        p.price.to_string(),
        p.stock.to_string(),
        p.status.label().to_string(),
        p.created_at.to_string(),
        p.updated_at.to_string(),
      ])?;
    }
    writer
      .into_inner()
      .map_err(|e| ExportError::Io(e.into_error()))
  }
}

#[async_trait]
impl ExportEncoder for CsvEncoder {
  async fn encode(&self, records: &[Product]) -> Result<Vec<u8>, ExportError> {
    // Large exports are CPU-bound, keep them off the runtime threads
    let owned = records.to_vec();
    tokio::task::spawn_blocking(move || Self::encode_blocking(&owned))
      .await
      .map_err(|e| ExportError::Task(e.to_string()))?
  }

  fn extension(&self) -> &'static str {
    "csv"
  }
}

/// `products_YYYYMMDD.<ext>`
pub fn default_filename(date: NaiveDate, extension: &str) -> String {
  format!("products_{}.{}", date.format("%Y%m%d"), extension)
}

/// Encode `records` and write them to `path`, returning the path written.
pub async fn export_to_file(
  encoder: &dyn ExportEncoder,
  records: &[Product],
  path: &Path,
) -> Result<PathBuf, ExportError> {
  let bytes = encoder.encode(records).await?;
  if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
    tokio::fs::create_dir_all(parent).await?;
  }
  tokio::fs::write(path, &bytes).await?;
  info!(path = %path.display(), records = records.len(), bytes = bytes.len(), "export written");
  Ok(path.to_path_buf())
}
