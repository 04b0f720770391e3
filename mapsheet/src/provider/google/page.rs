//! HTML page export
//!
//! Turns a drawn [`GoogleMap`] into a standalone page that loads the Maps
//! JavaScript API and recreates the markers, icons and popups from an
//! embedded JSON payload. The page script fans out overlapping markers on
//! click and re-flags overlaps whenever the zoom changes.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Serialize;

use super::geo::LatLng;
use super::icons::Icon;
use super::map::{GoogleMap, MapOptions};
use super::provider::{HINT_MAX_ZOOM, HOVER_DELAY, MULTIPLE_HINT};
use super::spiderfier::SpiderfierOptions;

const MAP_HTML_TEMPLATE: &str = include_str!("../../../resources/map_template.html");

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("placeholder regex is valid"));

#[derive(Serialize)]
struct PagePayload<'a> {
    element: &'a str,
    options: &'a MapOptions,
    zoom: u8,
    center: Option<LatLng>,
    popup_max_width: u32,
    hint: &'a str,
    hint_max_zoom: u8,
    hover_delay_ms: u64,
    spiderfier: &'a SpiderfierOptions,
    markers: Vec<MarkerPayload<'a>>,
}

#[derive(Serialize)]
struct MarkerPayload<'a> {
    position: LatLng,
    title: Option<&'a str>,
    icon: Option<&'a Icon>,
    content: String,
    multiple: bool,
}

/// Escape text for use inside an HTML attribute or element.
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub struct PageRenderer {
    title: String,
    api_key: Option<String>,
    popup_max_width: u32,
    spiderfier: SpiderfierOptions,
}

impl PageRenderer {
    pub fn new(title: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            title: title.into(),
            api_key,
            popup_max_width: 300,
            spiderfier: SpiderfierOptions::default(),
        }
    }

    pub fn with_spiderfier(mut self, options: SpiderfierOptions) -> Self {
        self.spiderfier = options;
        self
    }

    /// Render the page markup for `map`.
    pub fn render(&self, map: &GoogleMap) -> Result<String> {
        let payload = PagePayload {
            element: map.element(),
            options: map.options(),
            zoom: map.zoom(),
            center: map.center(),
            popup_max_width: self.popup_max_width,
            hint: MULTIPLE_HINT,
            hint_max_zoom: HINT_MAX_ZOOM,
            hover_delay_ms: HOVER_DELAY.as_millis() as u64,
            spiderfier: &self.spiderfier,
            markers: map
                .markers()
                .iter()
                .map(|m| MarkerPayload {
                    position: m.position,
                    title: m.title.as_deref(),
                    icon: m.icon.as_ref(),
                    content: m.point().content(),
                    multiple: m.multiple,
                })
                .collect(),
        };

        // `</` would end the inline script early
        let json = serde_json::to_string(&payload)
            .context("Failed to serialize map payload")?
            .replace("</", "<\\/");

        let api_key_param = self
            .api_key
            .as_deref()
            .map(|key| format!("&amp;key={}", urlencoding::encode(key)))
            .unwrap_or_default();

        let title = escape_html(&self.title);
        let element = escape_html(map.element());

        // Single pass, so substituted text is never scanned for placeholders
        let html = PLACEHOLDER.replace_all(MAP_HTML_TEMPLATE, |caps: &Captures| {
            match &caps[1] {
                "TITLE" => title.clone(),
                "ELEMENT" => element.clone(),
                "API_KEY_PARAM" => api_key_param.clone(),
                "PAYLOAD" => json.clone(),
                _ => caps[0].to_string(),
            }
        });
        Ok(html.into_owned())
    }

    /// Render and write the page, creating parent directories as needed.
    pub async fn write(&self, map: &GoogleMap, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .context(format!("Failed to create output directory {:?}", parent))?;
        }

        let html = self.render(map)?;
        tokio::fs::write(&path, html)
            .await
            .context(format!("Failed to write map page {:?}", path))?;

        tracing::info!("Wrote map page with {} markers to {:?}", map.markers().len(), path);
        Ok(path)
    }
}
