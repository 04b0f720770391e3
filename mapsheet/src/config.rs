use std::path::Path;

use anyhow::{bail, Context};
use mapsheet_common::{MarkerOptions, PointOptions, PopupTemplate};
use serde::{Deserialize, Serialize};

use crate::provider::google::MapOptions;
use crate::sheet::MapsheetOptions;
use crate::source::{CsvFileSource, DataSource, GoogleSheetSource};

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Where rows come from. Exactly one of `key` and `directory` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Key of a published Google spreadsheet
    #[serde(default)]
    pub key: Option<String>,

    /// Local CSV file or directory of CSV files
    #[serde(default)]
    pub directory: Option<String>,

    /// Sheets to fetch from the spreadsheet; the first sheet when empty
    #[serde(default)]
    pub sheets: Vec<String>,

    /// Sheet to show; the first fetched sheet when unset
    #[serde(default)]
    pub sheet_name: Option<String>,

    /// Base URL replacing docs.google.com
    #[serde(default)]
    pub proxy: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_element")]
    pub element: String,

    #[serde(default)]
    pub fields: Option<Vec<String>>,

    #[serde(default)]
    pub title_column: Option<String>,

    /// Path of a popup template file
    #[serde(default)]
    pub popup_template: Option<String>,

    /// Popup template markup, used when no template file is given
    #[serde(default)]
    pub popup_template_inline: Option<String>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            element: default_element(),
            fields: None,
            title_column: None,
            popup_template: None,
            popup_template_inline: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapsheetConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for daily log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Where the map page is written
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_title")]
    pub title: String,

    /// Maps JavaScript API key
    #[serde(default)]
    pub api_key: Option<String>,

    pub source: SourceConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub marker: MarkerOptions,

    #[serde(default)]
    pub map: MapOptions,
}

fn default_element() -> String {
    "map".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_output() -> String {
    "map.html".to_string()
}

fn default_title() -> String {
    "Mapsheet".to_string()
}

impl MapsheetConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: MapsheetConfig = toml::from_str(content).context("Failed to parse config")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        match (&self.source.key, &self.source.directory) {
            (Some(_), Some(_)) => bail!("source.key and source.directory are mutually exclusive"),
            (None, None) => bail!("one of source.key or source.directory is required"),
            _ => Ok(()),
        }
    }

    /// Identifier of the data source, for logs and the page
    pub fn source_key(&self) -> &str {
        self.source
            .key
            .as_deref()
            .or(self.source.directory.as_deref())
            .unwrap_or_default()
    }

    /// Sheets requested from the spreadsheet. The shown sheet is always
    /// among them, so it is never lost to the first-sheet fallback.
    pub fn sheets_to_fetch(&self) -> Vec<String> {
        let mut sheets = self.source.sheets.clone();
        if let Some(name) = &self.source.sheet_name {
            if !sheets.contains(name) {
                sheets.push(name.clone());
            }
        }
        sheets
    }

    pub fn data_source(&self) -> anyhow::Result<Box<dyn DataSource>> {
        if let Some(key) = &self.source.key {
            let source = GoogleSheetSource::new(
                key.clone(),
                self.sheets_to_fetch(),
                self.source.proxy.clone(),
            )
            .context("Failed to build spreadsheet client")?;
            return Ok(Box::new(source));
        }
        if let Some(directory) = &self.source.directory {
            return Ok(Box::new(CsvFileSource::new(directory)));
        }
        bail!("no data source configured")
    }

    /// Display options shared by every point. Compiles the popup template.
    pub fn point_options(&self) -> anyhow::Result<PointOptions> {
        let popup_template = match (&self.display.popup_template, &self.display.popup_template_inline) {
            (Some(path), _) => Some(
                PopupTemplate::from_file(path).context("Failed to load popup template")?,
            ),
            (None, Some(source)) => Some(
                PopupTemplate::compile(source).context("Failed to compile popup template")?,
            ),
            (None, None) => None,
        };

        Ok(PointOptions {
            fields: self.display.fields.clone(),
            title_column: self.display.title_column.clone(),
            popup_content: None,
            popup_template,
            marker_options: self.marker.clone(),
            click: None,
        })
    }

    pub fn mapsheet_options(&self) -> anyhow::Result<MapsheetOptions> {
        let mut options = MapsheetOptions::new(self.source_key(), self.display.element.clone());
        options.sheet_name = self.source.sheet_name.clone();
        options.point_options = self.point_options()?;
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::google::MapTypeId;
    use crate::sheet::Mapsheet;
    use crate::source::{Sheet, Workbook};

    const FULL: &str = r#"
        log_level = "debug"
        output = "out/sites.html"
        api_key = "secret"

        [source]
        key = "abc123"
        sheets = ["Sites", "Archive"]
        sheet_name = "Sites"
        proxy = "https://proxy.example"

        [display]
        element = "sites-map"
        fields = ["Name", "Notes"]
        title_column = "name"
        popup_template_inline = "<b>{{ name }}</b>"

        [marker]
        icon_url = "http://x/pin.png"
        severity_field = "IBA"

        [map]
        map_type_id = "terrain"
        zoom = 6
        center = [10.0, 20.0]
        streetViewControl = false
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = MapsheetConfig::parse(FULL).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output, "out/sites.html");
        assert_eq!(config.source_key(), "abc123");
        assert_eq!(config.source.sheets, vec!["Sites", "Archive"]);
        assert_eq!(config.display.element, "sites-map");
        assert_eq!(config.marker.severity_field.as_deref(), Some("IBA"));
        assert_eq!(config.map.map_type_id, MapTypeId::Terrain);
        assert_eq!(config.map.zoom, Some(6));
        assert_eq!(config.map.center, Some([10.0, 20.0]));
        assert_eq!(config.map.extra["streetViewControl"], false);

        let options = config.mapsheet_options().unwrap();
        assert_eq!(options.sheet_name.as_deref(), Some("Sites"));
        assert!(options.point_options.popup_template.is_some());
        assert_eq!(options.point_options.fields.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_defaults() {
        let config = MapsheetConfig::parse("[source]\ndirectory = \"data\"\n").unwrap();
        assert_eq!(config.log_level, "info");
        assert_eq!(config.output, "map.html");
        assert_eq!(config.display.element, "map");
        assert_eq!(config.map.map_type_id, MapTypeId::Satellite);
        assert!(config.map.zoom.is_none());
        assert!(config.point_options().unwrap().popup_template.is_none());
    }

    #[test]
    fn test_source_must_be_unambiguous() {
        assert!(MapsheetConfig::parse("[source]\n").is_err());
        assert!(MapsheetConfig::parse("[source]\nkey = \"k\"\ndirectory = \"d\"\n").is_err());
    }

    #[test]
    fn test_broken_inline_template_is_reported() {
        let config =
            MapsheetConfig::parse("[source]\nkey = \"k\"\n[display]\npopup_template_inline = \"{{ x\"\n").unwrap();
        assert!(config.point_options().is_err());
    }

    #[test]
    fn test_shown_sheet_is_fetched() {
        let config = MapsheetConfig::parse("[source]\nkey = \"k\"\nsheet_name = \"Sites\"\n").unwrap();
        assert_eq!(config.sheets_to_fetch(), vec!["Sites"]);

        let config = MapsheetConfig::parse(FULL).unwrap();
        assert_eq!(config.sheets_to_fetch(), vec!["Sites", "Archive"]);

        let config = MapsheetConfig::parse(
            "[source]\nkey = \"k\"\nsheets = [\"Archive\"]\nsheet_name = \"Sites\"\n",
        )
        .unwrap();
        assert_eq!(config.sheets_to_fetch(), vec!["Archive", "Sites"]);

        let config = MapsheetConfig::parse("[source]\nkey = \"k\"\n").unwrap();
        assert!(config.sheets_to_fetch().is_empty());
    }

    #[test]
    fn test_named_sheet_loads_without_sheet_list() {
        let config = MapsheetConfig::parse("[source]\nkey = \"k\"\nsheet_name = \"Sites\"\n").unwrap();
        let sheets = config
            .sheets_to_fetch()
            .into_iter()
            .map(|name| Sheet {
                name,
                elements: vec![[("lat", "1"), ("lng", "2")].into_iter().collect()],
            })
            .collect();

        let mut mapsheet = Mapsheet::google(config.mapsheet_options().unwrap(), config.map.clone(), None);
        mapsheet.load_points(Workbook::new("k", sheets)).unwrap();
        assert_eq!(mapsheet.sheet_name(), Some("Sites"));
        assert_eq!(mapsheet.points().len(), 1);
    }
}
