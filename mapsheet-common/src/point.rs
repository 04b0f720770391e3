//! Geotagged point derived from one spreadsheet row

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::popup::{ContentFn, PopupTemplate};
use crate::row::Row;

/// Column aliases tried in order for the latitude.
pub const LATITUDE_COLUMNS: &[&str] = &["latitude", "lat", "latitud"];
/// Column aliases tried in order for the longitude.
pub const LONGITUDE_COLUMNS: &[&str] = &["longitude", "lng", "long", "lon", "longitud"];

/// Leading float literal, the same prefix a lenient float parser accepts.
static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:Infinity|(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)")
        .expect("float prefix regex is valid")
});

/// Handle to a marker drawn for a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MarkerId(pub usize);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "marker-{}", self.0)
    }
}

/// Per-call marker customisation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkerOptions {
    /// Icon used for every marker whose row has no `icon url` of its own
    #[serde(default)]
    pub icon_url: Option<String>,
    /// Numeric column driving the five-tier severity pin colors.
    /// When set, the severity color overrides every other icon choice.
    #[serde(default)]
    pub severity_field: Option<String>,
}

/// Called when the marker of a point is clicked.
pub type ClickHandler = Arc<dyn Fn(&Point) + Send + Sync>;

/// Display options shared by every point of a sheet.
#[derive(Clone, Default)]
pub struct PointOptions {
    pub fields: Option<Vec<String>>,
    pub title_column: Option<String>,
    pub popup_content: Option<ContentFn>,
    pub popup_template: Option<PopupTemplate>,
    pub marker_options: MarkerOptions,
    pub click: Option<ClickHandler>,
}

impl fmt::Debug for PointOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PointOptions")
            .field("fields", &self.fields)
            .field("title_column", &self.title_column)
            .field("popup_content", &self.popup_content.is_some())
            .field("popup_template", &self.popup_template.is_some())
            .field("marker_options", &self.marker_options)
            .field("click", &self.click.is_some())
            .finish()
    }
}

/// View over exactly one row plus the shared display options.
#[derive(Debug, Clone)]
pub struct Point {
    row: Row,
    index: usize,
    options: Arc<PointOptions>,
    marker: Option<MarkerId>,
}

impl Point {
    pub fn new(row: Row, index: usize, options: Arc<PointOptions>) -> Self {
        Self {
            row,
            index,
            options,
            marker: None,
        }
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    /// Position of the row within its sheet
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn options(&self) -> &PointOptions {
        &self.options
    }

    pub fn marker(&self) -> Option<MarkerId> {
        self.marker
    }

    pub fn set_marker(&mut self, marker: MarkerId) {
        self.marker = Some(marker);
    }

    pub fn latitude(&self) -> f64 {
        self.coordinate(LATITUDE_COLUMNS)
    }

    pub fn longitude(&self) -> f64 {
        self.coordinate(LONGITUDE_COLUMNS)
    }

    pub fn coords(&self) -> (f64, f64) {
        (self.latitude(), self.longitude())
    }

    fn coordinate(&self, aliases: &[&str]) -> f64 {
        aliases
            .iter()
            .find_map(|alias| self.row.get_non_empty(alias))
            .map(parse_float)
            .unwrap_or(f64::NAN)
    }

    /// Field lookup ignoring case and whitespace, so `"Icon Url"` finds the
    /// `iconurl` column.
    pub fn get(&self, field: Option<&str>) -> Option<&str> {
        let field = field?;
        self.row.get(&normalize_field(field))
    }

    pub fn title(&self) -> Option<&str> {
        self.get(self.options.title_column.as_deref())
    }

    pub fn is_valid(&self) -> bool {
        self.latitude().is_finite() && self.longitude().is_finite()
    }

    /// Popup HTML for this point.
    ///
    /// Tried in order: the content function, the template, the configured
    /// field list. Without any of them the popup is empty.
    pub fn content(&self) -> String {
        let html = if let Some(content) = &self.options.popup_content {
            content(&self.row)
        } else if let Some(template) = &self.options.popup_template {
            match template.render(&self.row) {
                Ok(html) => html,
                Err(e) => {
                    tracing::warn!("Failed to render popup for row {}: {}", self.index, e);
                    return String::new();
                }
            }
        } else if let Some(fields) = &self.options.fields {
            let mut html = String::new();
            if let Some(title) = self.title().filter(|t| !t.is_empty()) {
                html.push_str(&format!("<h3>{}</h3>", title));
            }
            for field in fields {
                html.push_str(&format!(
                    "<p><strong>{}</strong>: {}</p>",
                    field,
                    self.get(Some(field.as_str())).unwrap_or_default()
                ));
            }
            html
        } else {
            return String::new();
        };

        format!("<div class='mapsheet-popup'>{}</div>", html)
    }
}

/// Lowercase and drop whitespace, the shape column keys are stored in.
pub fn normalize_field(field: &str) -> String {
    field
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Parse the leading float of a cell, NaN when there is none.
pub fn parse_float(text: &str) -> f64 {
    let text = text.trim_start();
    let Some(m) = FLOAT_PREFIX.find(text) else {
        return f64::NAN;
    };
    match m.as_str() {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        literal => literal.parse().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(cells: &[(&str, &str)], options: PointOptions) -> Point {
        Point::new(cells.iter().copied().collect(), 0, Arc::new(options))
    }

    #[test]
    fn test_parse_float_prefix() {
        assert_eq!(parse_float("10"), 10.0);
        assert_eq!(parse_float("  -33.45"), -33.45);
        assert_eq!(parse_float("12.5abc"), 12.5);
        assert_eq!(parse_float(".5"), 0.5);
        assert_eq!(parse_float("1e3"), 1000.0);
        assert!(parse_float("bad").is_nan());
        assert!(parse_float("").is_nan());
        assert!(parse_float("Infinity").is_infinite());
    }

    #[test]
    fn test_coordinate_aliases() {
        let p = point(&[("lat", "10"), ("lng", "20")], PointOptions::default());
        assert_eq!(p.coords(), (10.0, 20.0));
        assert!(p.is_valid());

        let p = point(&[("latitud", "-1.5"), ("longitud", "2.25")], PointOptions::default());
        assert_eq!(p.coords(), (-1.5, 2.25));

        let p = point(&[("latitude", "3"), ("lat", "99"), ("lon", "4")], PointOptions::default());
        assert_eq!(p.coords(), (3.0, 4.0));
    }

    #[test]
    fn test_empty_alias_falls_through() {
        let p = point(&[("latitude", ""), ("lat", "7"), ("long", "8")], PointOptions::default());
        assert_eq!(p.coords(), (7.0, 8.0));
    }

    #[test]
    fn test_invalid_points() {
        let p = point(&[("lat", "bad"), ("lng", "20")], PointOptions::default());
        assert!(!p.is_valid());

        let p = point(&[("name", "nowhere")], PointOptions::default());
        assert!(p.latitude().is_nan());
        assert!(p.longitude().is_nan());
        assert!(!p.is_valid());

        let p = point(&[("lat", "Infinity"), ("lng", "1")], PointOptions::default());
        assert!(!p.is_valid());
    }

    #[test]
    fn test_get_ignores_case_and_whitespace() {
        let p = point(&[("iconurl", "http://example.com/pin.png")], PointOptions::default());
        assert_eq!(p.get(Some("Icon Url")), p.get(Some("iconurl")));
        assert_eq!(p.get(Some("ICON  URL")), Some("http://example.com/pin.png"));
        assert_eq!(p.get(None), None);
        assert_eq!(p.get(Some("missing")), None);
    }

    #[test]
    fn test_title_uses_title_column() {
        let options = PointOptions {
            title_column: Some("Name".into()),
            ..Default::default()
        };
        let p = point(&[("name", "Site A")], options);
        assert_eq!(p.title(), Some("Site A"));
        assert_eq!(point(&[("name", "Site A")], PointOptions::default()).title(), None);
    }

    #[test]
    fn test_content_function_wins_over_fields() {
        let options = PointOptions {
            fields: Some(vec!["name".into()]),
            popup_content: Some(Arc::new(|row: &Row| {
                format!("custom {}", row.get("name").unwrap_or_default())
            })),
            ..Default::default()
        };
        let p = point(&[("name", "Site A")], options);
        assert_eq!(p.content(), "<div class='mapsheet-popup'>custom Site A</div>");
    }

    #[test]
    fn test_template_wins_over_fields() {
        let options = PointOptions {
            fields: Some(vec!["name".into()]),
            popup_template: Some(PopupTemplate::compile("T:{{ name }}").unwrap()),
            ..Default::default()
        };
        let p = point(&[("name", "Site A")], options);
        assert_eq!(p.content(), "<div class='mapsheet-popup'>T:Site A</div>");
    }

    #[test]
    fn test_fields_content() {
        let options = PointOptions {
            fields: Some(vec!["Name".into(), "Notes".into()]),
            title_column: Some("name".into()),
            ..Default::default()
        };
        let p = point(&[("name", "Site A"), ("notes", "dry")], options);
        assert_eq!(
            p.content(),
            "<div class='mapsheet-popup'><h3>Site A</h3>\
             <p><strong>Name</strong>: Site A</p>\
             <p><strong>Notes</strong>: dry</p></div>"
        );
    }

    #[test]
    fn test_fields_content_without_title() {
        let options = PointOptions {
            fields: Some(vec!["notes".into(), "missing".into()]),
            title_column: Some("name".into()),
            ..Default::default()
        };
        let p = point(&[("name", ""), ("notes", "dry")], options);
        assert_eq!(
            p.content(),
            "<div class='mapsheet-popup'><p><strong>notes</strong>: dry</p>\
             <p><strong>missing</strong>: </p></div>"
        );
    }

    #[test]
    fn test_title_only_gives_empty_content() {
        let options = PointOptions {
            title_column: Some("name".into()),
            ..Default::default()
        };
        let p = point(&[("name", "Site A"), ("lat", "1"), ("lng", "2")], options);
        assert_eq!(p.content(), "");
    }

    #[test]
    fn test_template_keeps_markup_around_missing_columns() {
        let options = PointOptions {
            popup_template: Some(PopupTemplate::compile("<b>{{ name }}</b> {{ notes }}").unwrap()),
            ..Default::default()
        };
        let p = point(&[("name", "Site A"), ("lat", "1"), ("lng", "2")], options);
        assert_eq!(p.content(), "<div class='mapsheet-popup'><b>Site A</b> </div>");
    }

    #[test]
    fn test_marker_back_reference() {
        let mut p = point(&[("lat", "1"), ("lng", "2")], PointOptions::default());
        assert_eq!(p.marker(), None);
        p.set_marker(MarkerId(3));
        assert_eq!(p.marker(), Some(MarkerId(3)));
    }
}
