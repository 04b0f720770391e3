use std::path::Path;

use anyhow::{Context, Result};
use mapsheet::config::{MapsheetConfig, DEFAULT_CONFIG_PATH};
use mapsheet::source::Workbook;
use mapsheet::{Mapsheet, PageRenderer};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = MapsheetConfig::from_file(&config_path)?;

    // Initialize logging
    let _logging_guard =
        mapsheet::logging::init_logging(config.log_dir.as_deref().map(Path::new), &config.log_level)?;

    tracing::info!("Mapsheet starting with {}", config_path);

    let source = config.data_source()?;
    let mut options = config.mapsheet_options()?;
    options.callback = Some(Box::new(|sheet: &Mapsheet, workbook: &Workbook| {
        let valid = sheet.points().iter().filter(|p| p.is_valid()).count();
        tracing::info!(
            "Drew sheet '{}' ({} of {} rows mapped, fetched {})",
            sheet.sheet_name().unwrap_or_default(),
            valid,
            sheet.points().len(),
            workbook.fetched_at
        );
    }));

    let mut sheet = Mapsheet::google(options, config.map.clone(), None);
    sheet
        .load(source.as_ref())
        .await
        .with_context(|| format!("Failed to load spreadsheet {}", config.source_key()))?;

    let map = sheet.map().context("Renderer produced no map")?;
    let page = PageRenderer::new(config.title.clone(), config.api_key.clone());
    let path = page.write(map, &config.output).await?;

    tracing::info!("Map written to {}", path.display());
    Ok(())
}
