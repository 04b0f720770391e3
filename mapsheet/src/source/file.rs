//! Local CSV files as a data source
//!
//! A single file yields one sheet; a directory yields one sheet per `.csv`
//! file, ordered by file name. The sheet name is the file stem.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::csv::parse_sheet;
use super::{DataSource, SourceError, Workbook};

pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    async fn csv_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let io_err = |source| SourceError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let metadata = fs::metadata(&self.path).await.map_err(io_err)?;
        if !metadata.is_dir() {
            return Ok(vec![self.path.clone()]);
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.path).await.map_err(io_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "csv") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DataSource for CsvFileSource {
    async fn fetch(&self) -> Result<Workbook, SourceError> {
        tracing::info!("Loading CSV sheets from {}", self.path.display());

        let mut sheets = Vec::new();
        for file in self.csv_files().await? {
            let content = fs::read_to_string(&file).await.map_err(|source| SourceError::Io {
                path: file.display().to_string(),
                source,
            })?;
            let name = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            sheets.push(parse_sheet(&name, &content)?);
        }

        tracing::info!("Loaded {} sheets from {}", sheets.len(), self.path.display());
        Ok(Workbook::new(self.path.display().to_string(), sheets))
    }
}
