//! Spreadsheet data sources
//!
//! A data source delivers a [`Workbook`] once: a list of named sheets whose
//! `elements` are the rows. What the rows mean is decided by the sheet layer.

pub mod csv;
pub mod file;
pub mod google;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mapsheet_common::Row;
use thiserror::Error;

pub use file::CsvFileSource;
pub use google::GoogleSheetSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("CSV parse error: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("sheet '{0}' not found")]
    SheetNotFound(String),
    #[error("workbook contains no sheets")]
    NoSheets,
}

/// A named table of rows.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub elements: Vec<Row>,
}

/// Everything a data source delivered in one load.
#[derive(Debug, Clone)]
pub struct Workbook {
    /// Spreadsheet key or directory the data came from
    pub key: String,
    pub fetched_at: DateTime<Utc>,
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new(key: impl Into<String>, sheets: Vec<Sheet>) -> Self {
        Self {
            key: key.into(),
            fetched_at: Utc::now(),
            sheets,
        }
    }

    /// Sheet names in source order
    pub fn model_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }
}

/// Single-shot spreadsheet loader.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self) -> Result<Workbook, SourceError>;
}
