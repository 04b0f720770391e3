//! Published Google spreadsheet as a data source
//!
//! Each configured sheet is fetched through the CSV export of the
//! visualization endpoint. Without configured sheet names only the first
//! sheet of the spreadsheet is fetched.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::csv::parse_sheet;
use super::{DataSource, SourceError, Workbook};

const GOOGLE_DOCS_URL: &str = "https://docs.google.com";
const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Name given to the sheet fetched when no sheet names are configured
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";

pub struct GoogleSheetSource {
    client: Client,
    key: String,
    sheets: Vec<String>,
    /// Replaces the Google Docs base URL, e.g. a caching proxy
    proxy: Option<String>,
}

impl GoogleSheetSource {
    pub fn new(
        key: impl Into<String>,
        sheets: Vec<String>,
        proxy: Option<String>,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .user_agent(concat!("mapsheet/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            key: key.into(),
            sheets,
            proxy,
        })
    }

    fn base_url(&self) -> &str {
        self.proxy
            .as_deref()
            .unwrap_or(GOOGLE_DOCS_URL)
            .trim_end_matches('/')
    }

    /// CSV export URL for a named sheet
    pub fn sheet_url(&self, sheet: &str) -> String {
        format!(
            "{}/spreadsheets/d/{}/gviz/tq?tqx=out:csv&sheet={}",
            self.base_url(),
            self.key,
            urlencoding::encode(sheet)
        )
    }

    /// CSV export URL for the first sheet
    pub fn default_sheet_url(&self) -> String {
        format!("{}/spreadsheets/d/{}/export?format=csv", self.base_url(), self.key)
    }

    async fn fetch_csv(&self, url: &str) -> Result<String, SourceError> {
        tracing::debug!("GET {}", url);
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

#[async_trait]
impl DataSource for GoogleSheetSource {
    async fn fetch(&self) -> Result<Workbook, SourceError> {
        tracing::info!("Fetching spreadsheet {} via {}", self.key, self.base_url());

        let mut sheets = Vec::new();
        if self.sheets.is_empty() {
            let csv = self.fetch_csv(&self.default_sheet_url()).await?;
            sheets.push(parse_sheet(DEFAULT_SHEET_NAME, &csv)?);
        } else {
            for name in &self.sheets {
                let csv = self.fetch_csv(&self.sheet_url(name)).await?;
                sheets.push(parse_sheet(name, &csv)?);
            }
        }

        tracing::info!(
            "Spreadsheet {}: {} sheets, {} rows",
            self.key,
            sheets.len(),
            sheets.iter().map(|s| s.elements.len()).sum::<usize>()
        );

        Ok(Workbook::new(self.key.clone(), sheets))
    }
}
