//! Marker icons
//!
//! Google Maps only ships a single default pin color, but the Charts pin
//! endpoint draws a pin in any hex color. Icons are picked per point in
//! priority order: the row's `icon url`, the marker options' icon, then a
//! colored pin from the row's `hexcolor`. A configured severity field
//! overrides all of them with a five-tier color scale.

use mapsheet_common::{parse_float, Point};
use serde::Serialize;

use super::geo::Size;

const CHART_PIN_URL: &str = "http://chart.apis.google.com/chart?chst=d_map_pin_letter&chld=|";
const CHART_SHADOW_URL: &str = "http://chart.apis.google.com/chart?chst=d_map_pin_shadow";

pub const DEFAULT_PIN_COLOR: &str = "FE7569";

/// Severity tiers, highest first. A value must be strictly greater than
/// the threshold to land in the tier.
pub const SEVERITY_TIERS: [(f64, &str); 4] = [
    (70.0, "99E6FF"),
    (45.0, "94FF70"),
    (27.0, "FFFA4F"),
    (11.0, "FFAD33"),
];
pub const LOWEST_SEVERITY_COLOR: &str = "F75D63";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

/// Sprite description, same fields as the Maps `MarkerImage`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerImage {
    pub url: String,
    pub size: Size,
    pub origin: ImagePoint,
    pub anchor: ImagePoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaled_size: Option<Size>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Icon {
    Url(String),
    Image(MarkerImage),
}

/// Icon and optional shadow chosen for a marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    pub icon: Icon,
    pub shadow: Option<MarkerImage>,
}

pub fn pin_image(color: &str) -> MarkerImage {
    MarkerImage {
        url: format!("{}{}", CHART_PIN_URL, color),
        size: Size::new(21.0, 34.0),
        origin: ImagePoint { x: 0.0, y: 0.0 },
        anchor: ImagePoint { x: 10.0, y: 34.0 },
        scaled_size: None,
    }
}

pub fn pin_shadow() -> MarkerImage {
    MarkerImage {
        url: CHART_SHADOW_URL.to_string(),
        size: Size::new(40.0, 37.0),
        origin: ImagePoint { x: 0.0, y: 0.0 },
        anchor: ImagePoint { x: 12.0, y: 35.0 },
        scaled_size: None,
    }
}

fn severity_pin_image(color: &str) -> MarkerImage {
    MarkerImage {
        url: format!("{}{}", CHART_PIN_URL, color),
        size: Size::new(31.5, 51.0),
        origin: ImagePoint { x: 0.0, y: 0.0 },
        anchor: ImagePoint { x: 15.75, y: 51.0 },
        scaled_size: Some(Size::new(31.5, 51.0)),
    }
}

fn severity_pin_shadow() -> MarkerImage {
    MarkerImage {
        url: CHART_SHADOW_URL.to_string(),
        size: Size::new(80.0, 74.0),
        origin: ImagePoint { x: 0.0, y: 0.0 },
        anchor: ImagePoint { x: 12.0, y: 70.0 },
        scaled_size: Some(Size::new(80.0, 74.0)),
    }
}

/// Bucket a severity value into its pin color.
pub fn severity_color(value: Option<f64>) -> &'static str {
    let Some(value) = value else {
        return LOWEST_SEVERITY_COLOR;
    };
    SEVERITY_TIERS
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map(|(_, color)| *color)
        .unwrap_or(LOWEST_SEVERITY_COLOR)
}

/// Icon before any severity override.
fn base_style(point: &Point) -> MarkerStyle {
    if let Some(url) = point.get(Some("icon url")).filter(|u| !u.is_empty()) {
        return MarkerStyle {
            icon: Icon::Url(url.to_string()),
            shadow: None,
        };
    }

    if let Some(url) = point
        .options()
        .marker_options
        .icon_url
        .as_deref()
        .filter(|u| !u.is_empty())
    {
        return MarkerStyle {
            icon: Icon::Url(url.to_string()),
            shadow: None,
        };
    }

    let color = point
        .get(Some("hexcolor"))
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_PIN_COLOR)
        .replacen('#', "", 1);

    MarkerStyle {
        icon: Icon::Image(pin_image(&color)),
        shadow: Some(pin_shadow()),
    }
}

/// Pick the icon and shadow for a point's marker.
pub fn marker_style(point: &Point) -> MarkerStyle {
    let Some(field) = point.options().marker_options.severity_field.as_deref() else {
        return base_style(point);
    };

    let value = point.get(Some(field)).map(parse_float).filter(|v| !v.is_nan());
    let color = severity_color(value);
    MarkerStyle {
        icon: Icon::Image(severity_pin_image(color)),
        shadow: Some(severity_pin_shadow()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mapsheet_common::{MarkerOptions, PointOptions, Row};

    use super::*;

    fn point(cells: &[(&str, &str)], marker_options: MarkerOptions) -> Point {
        let options = PointOptions {
            marker_options,
            ..Default::default()
        };
        Point::new(cells.iter().copied().collect::<Row>(), 0, Arc::new(options))
    }

    fn icon_url(style: &MarkerStyle) -> &str {
        match &style.icon {
            Icon::Url(url) => url,
            Icon::Image(image) => &image.url,
        }
    }

    #[test]
    fn test_severity_tiers() {
        assert_eq!(severity_color(Some(80.0)), "99E6FF");
        assert_eq!(severity_color(Some(50.0)), "94FF70");
        assert_eq!(severity_color(Some(30.0)), "FFFA4F");
        assert_eq!(severity_color(Some(15.0)), "FFAD33");
        assert_eq!(severity_color(Some(5.0)), "F75D63");
        assert_eq!(severity_color(None), "F75D63");
    }

    #[test]
    fn test_severity_thresholds_are_strict() {
        assert_eq!(severity_color(Some(70.0)), "94FF70");
        assert_eq!(severity_color(Some(45.0)), "FFFA4F");
        assert_eq!(severity_color(Some(27.0)), "FFAD33");
        assert_eq!(severity_color(Some(11.0)), "F75D63");
    }

    #[test]
    fn test_row_icon_url_wins() {
        let options = MarkerOptions {
            icon_url: Some("http://x/options.png".into()),
            severity_field: None,
        };
        let style = marker_style(&point(&[("iconurl", "http://x/row.png")], options));
        assert_eq!(style.icon, Icon::Url("http://x/row.png".into()));
        assert!(style.shadow.is_none());
    }

    #[test]
    fn test_options_icon_url_second() {
        let options = MarkerOptions {
            icon_url: Some("http://x/options.png".into()),
            severity_field: None,
        };
        let style = marker_style(&point(&[("iconurl", "")], options));
        assert_eq!(icon_url(&style), "http://x/options.png");
    }

    #[test]
    fn test_hexcolor_pin() {
        let style = marker_style(&point(&[("hexcolor", "#00FF00")], MarkerOptions::default()));
        assert!(icon_url(&style).ends_with("chld=|00FF00"));
        assert_eq!(style.shadow, Some(pin_shadow()));

        let style = marker_style(&point(&[], MarkerOptions::default()));
        assert!(icon_url(&style).ends_with("chld=|FE7569"));
    }

    #[test]
    fn test_severity_field_overrides_icons() {
        let options = MarkerOptions {
            icon_url: Some("http://x/options.png".into()),
            severity_field: Some("IBA".into()),
        };
        let style = marker_style(&point(&[("iba", "50"), ("iconurl", "http://x/row.png")], options.clone()));
        assert!(icon_url(&style).ends_with("chld=|94FF70"));
        match &style.icon {
            Icon::Image(image) => assert_eq!(image.scaled_size, Some(Size::new(31.5, 51.0))),
            Icon::Url(_) => panic!("expected a pin image"),
        }

        let style = marker_style(&point(&[], options.clone()));
        assert!(icon_url(&style).ends_with("chld=|F75D63"));

        let style = marker_style(&point(&[("iba", "n/a")], options));
        assert!(icon_url(&style).ends_with("chld=|F75D63"));
    }
}
