//! Map, marker and popup window model
//!
//! Mirrors the slice of the Google Maps object model the provider draws
//! with: one map per element, markers with icons and event listeners, and a
//! single popup window that is rewritten for whichever marker asks for it.

use mapsheet_common::{MarkerId, Point};
use serde::{Deserialize, Serialize};

use super::geo::{project, unproject, LatLng, LatLngBounds, PixelPoint};
use super::icons::{Icon, MarkerImage};

/// Highest zoom `fit_bounds` will pick
pub const MAX_FIT_ZOOM: u8 = 21;

const DEFAULT_POPUP_CONTENT: &str = "loading...";
const DEFAULT_POPUP_MAX_WIDTH: u32 = 300;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapTypeId {
    Roadmap,
    #[default]
    Satellite,
    Hybrid,
    Terrain,
}

/// Options forwarded to the map. Unknown keys are passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    #[serde(default, rename = "mapTypeId", alias = "map_type_id")]
    pub map_type_id: MapTypeId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u8>,

    /// `[lat, lng]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<[f64; 2]>,

    /// Viewport size in pixels, used when fitting bounds
    #[serde(default = "default_width", skip_serializing)]
    pub width: u32,

    #[serde(default = "default_height", skip_serializing)]
    pub height: u32,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            map_type_id: MapTypeId::default(),
            zoom: None,
            center: None,
            width: default_width(),
            height: default_height(),
            extra: serde_json::Map::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    MouseOver,
    MouseOut,
}

/// A user interaction dispatched by the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerEvent {
    Click(MarkerId),
    MouseOver(MarkerId),
    MouseOut(MarkerId),
}

impl MarkerEvent {
    pub fn marker(&self) -> MarkerId {
        match self {
            MarkerEvent::Click(id) | MarkerEvent::MouseOver(id) | MarkerEvent::MouseOut(id) => *id,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            MarkerEvent::Click(_) => EventKind::Click,
            MarkerEvent::MouseOver(_) => EventKind::MouseOver,
            MarkerEvent::MouseOut(_) => EventKind::MouseOut,
        }
    }
}

/// Handlers a marker can have registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listener {
    /// Show the point's content in the popup window
    OpenPopup,
    /// Forward the click to the caller's click handler
    ClickHandler,
    /// Start the hover timer for the "multiple measurements" hint
    HoverHint,
    /// Cancel the hover timer and close the hint
    HoverOut,
}

impl Listener {
    pub fn kind(&self) -> EventKind {
        match self {
            Listener::OpenPopup | Listener::ClickHandler => EventKind::Click,
            Listener::HoverHint => EventKind::MouseOver,
            Listener::HoverOut => EventKind::MouseOut,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Marker {
    id: MarkerId,
    pub position: LatLng,
    pub title: Option<String>,
    pub icon: Option<Icon>,
    pub shadow: Option<MarkerImage>,
    /// Set while the marker overlaps other markers at the current zoom
    pub multiple: bool,
    point: Point,
    listeners: Vec<Listener>,
}

impl Marker {
    pub fn new(id: MarkerId, position: LatLng, point: Point) -> Self {
        Self {
            id,
            position,
            title: point.title().map(str::to_string),
            icon: None,
            shadow: None,
            multiple: false,
            point,
            listeners: Vec::new(),
        }
    }

    pub fn id(&self) -> MarkerId {
        self.id
    }

    pub fn point(&self) -> &Point {
        &self.point
    }

    pub fn add_listener(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn listeners(&self) -> &[Listener] {
        &self.listeners
    }

    /// Handlers registered for an event, in registration order
    pub fn listeners_for(&self, kind: EventKind) -> impl Iterator<Item = Listener> + '_ {
        self.listeners.iter().copied().filter(move |l| l.kind() == kind)
    }
}

/// The one popup window of a map.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoWindow {
    content: String,
    max_width: u32,
    anchor: Option<MarkerId>,
    /// Sticky "has been opened" flag; closing the window does not reset it
    opened: bool,
}

impl Default for InfoWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl InfoWindow {
    pub fn new() -> Self {
        Self {
            content: DEFAULT_POPUP_CONTENT.to_string(),
            max_width: DEFAULT_POPUP_MAX_WIDTH,
            anchor: None,
            opened: false,
        }
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn max_width(&self) -> u32 {
        self.max_width
    }

    pub fn open(&mut self, anchor: MarkerId) {
        self.anchor = Some(anchor);
        self.opened = true;
    }

    pub fn close(&mut self) {
        self.anchor = None;
    }

    pub fn anchor(&self) -> Option<MarkerId> {
        self.anchor
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }

    pub fn is_visible(&self) -> bool {
        self.anchor.is_some()
    }

    /// Open on `marker` with its content already shown
    pub fn is_showing(&self, marker: MarkerId) -> bool {
        self.anchor == Some(marker) && self.opened
    }
}

/// A map instance bound to one page element.
#[derive(Debug, Clone)]
pub struct GoogleMap {
    element: String,
    options: MapOptions,
    zoom: u8,
    center: Option<LatLng>,
    markers: Vec<Marker>,
}

impl GoogleMap {
    pub fn new(element: impl Into<String>, options: MapOptions) -> Self {
        Self {
            element: element.into(),
            zoom: options.zoom.unwrap_or(0),
            center: options.center.map(LatLng::from),
            options,
            markers: Vec::new(),
        }
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.min(MAX_FIT_ZOOM);
    }

    pub fn center(&self) -> Option<LatLng> {
        self.center
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.get(id.0)
    }

    pub fn marker_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.get_mut(id.0)
    }

    /// Id the next added marker will get
    pub fn next_marker_id(&self) -> MarkerId {
        MarkerId(self.markers.len())
    }

    /// Put a marker on the map.
    pub fn add_marker(&mut self, mut marker: Marker) -> MarkerId {
        let id = self.next_marker_id();
        marker.id = id;
        self.markers.push(marker);
        id
    }

    /// Centre on `bounds` at the largest zoom that keeps them in the viewport.
    /// Empty bounds leave the view untouched.
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds) {
        let (Some(sw), Some(ne)) = (bounds.south_west(), bounds.north_east()) else {
            return;
        };

        let width = f64::from(self.options.width);
        let height = f64::from(self.options.height);
        let zoom = (0..=MAX_FIT_ZOOM)
            .rev()
            .find(|&z| {
                let (a, b) = (project(sw, z), project(ne, z));
                (b.x - a.x).abs() <= width && (a.y - b.y).abs() <= height
            })
            .unwrap_or(0);

        let (a, b) = (project(sw, 0), project(ne, 0));
        let mid = PixelPoint {
            x: (a.x + b.x) / 2.0,
            y: (a.y + b.y) / 2.0,
        };

        self.zoom = zoom;
        self.center = Some(unproject(mid, 0));
        tracing::debug!("Fitted map '{}' to bounds: zoom {}", self.element, zoom);
    }
}
