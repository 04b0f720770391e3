//! Google Maps rendering adapter
//!
//! Draws points as markers, keeps the single shared popup window, and
//! dispatches marker clicks and hovers. Time only moves through
//! [`GoogleProvider::advance`], which fires pending hover timers.

use std::collections::BTreeMap;
use std::time::Duration;

use mapsheet_common::{MarkerId, Point};

use super::geo::{LatLng, LatLngBounds};
use super::icons::marker_style;
use super::map::{GoogleMap, InfoWindow, Listener, MapOptions, Marker, MarkerEvent};
use super::spiderfier::Spiderfier;
use crate::provider::Renderer;

/// Delay between hovering a marker and showing the overlap hint
pub const HOVER_DELAY: Duration = Duration::from_millis(100);
/// The overlap hint is only shown at or below this zoom
pub const HINT_MAX_ZOOM: u8 = 14;
pub const MULTIPLE_HINT: &str = "Multiple measurements here. <br> Zoom in to see. ";

pub struct GoogleProvider {
    map_options: MapOptions,
    map: Option<GoogleMap>,
    bounds: LatLngBounds,
    info_window: InfoWindow,
    spiderfier: Spiderfier,
    clock: Duration,
    /// Due time of each marker's pending hover timer
    hover_timers: BTreeMap<MarkerId, Duration>,
}

impl GoogleProvider {
    /// `map` is an externally created map to draw on instead of a new one.
    pub fn new(map_options: MapOptions, map: Option<GoogleMap>) -> Self {
        Self {
            map_options,
            map,
            bounds: LatLngBounds::new(),
            info_window: InfoWindow::new(),
            spiderfier: Spiderfier::new(),
            clock: Duration::ZERO,
            hover_timers: BTreeMap::new(),
        }
    }

    pub fn map_options(&self) -> &MapOptions {
        &self.map_options
    }

    pub fn bounds(&self) -> &LatLngBounds {
        &self.bounds
    }

    pub fn info_window(&self) -> &InfoWindow {
        &self.info_window
    }

    pub fn spiderfier(&self) -> &Spiderfier {
        &self.spiderfier
    }

    pub fn pending_hovers(&self) -> usize {
        self.hover_timers.len()
    }

    /// Change the zoom; fanned-out markers collapse and overlaps are re-flagged.
    pub fn set_zoom(&mut self, zoom: u8) {
        let Some(map) = self.map.as_mut() else {
            return;
        };
        map.set_zoom(zoom);
        self.spiderfier.unspiderfy(map);
        self.spiderfier.flag_overlaps(map);
    }

    fn build_marker(id: MarkerId, point: &Point) -> Marker {
        let position = LatLng::new(point.latitude(), point.longitude());
        let mut marker = Marker::new(id, position, point.clone());

        let style = marker_style(point);
        marker.icon = Some(style.icon);
        marker.shadow = style.shadow;

        marker.add_listener(Listener::OpenPopup);
        marker.add_listener(Listener::HoverHint);
        marker.add_listener(Listener::HoverOut);
        if point.options().click.is_some() {
            marker.add_listener(Listener::ClickHandler);
        }
        marker
    }

    /// Dispatch a user interaction to the marker's listeners.
    pub fn handle_event(&mut self, event: MarkerEvent) {
        let id = event.marker();
        let Self {
            map,
            info_window,
            spiderfier,
            hover_timers,
            clock,
            ..
        } = self;
        let Some(map) = map.as_mut() else {
            tracing::warn!("Ignoring {:?}: map not initialized", event);
            return;
        };
        let Some(marker) = map.marker(id) else {
            tracing::warn!("Ignoring {:?}: no such marker", event);
            return;
        };
        let listeners: Vec<Listener> = marker.listeners_for(event.kind()).collect();

        if matches!(event, MarkerEvent::Click(_)) && spiderfier.markers().contains(&id) {
            spiderfier.handle_click(map, id);
        }

        for listener in listeners {
            match listener {
                Listener::OpenPopup => {
                    if info_window.is_showing(id) {
                        continue;
                    }
                    if let Some(marker) = map.marker(id) {
                        info_window.set_content(marker.point().content());
                        info_window.open(id);
                    }
                }
                Listener::ClickHandler => {
                    if let Some(marker) = map.marker(id) {
                        if let Some(click) = &marker.point().options().click {
                            click(marker.point());
                        }
                    }
                }
                Listener::HoverHint => {
                    hover_timers.insert(id, *clock + HOVER_DELAY);
                }
                Listener::HoverOut => {
                    hover_timers.remove(&id);
                    if let Some(marker) = map.marker_mut(id) {
                        if marker.multiple {
                            marker.multiple = false;
                            info_window.close();
                        }
                    }
                }
            }
        }
    }

    /// Move the clock forward and fire every hover timer that came due.
    pub fn advance(&mut self, elapsed: Duration) {
        self.clock += elapsed;

        let mut due: Vec<(Duration, MarkerId)> = self
            .hover_timers
            .iter()
            .filter(|(_, at)| **at <= self.clock)
            .map(|(id, at)| (*at, *id))
            .collect();
        due.sort();

        for (_, id) in due {
            self.hover_timers.remove(&id);
            self.show_hover_hint(id);
        }
    }

    fn show_hover_hint(&mut self, id: MarkerId) {
        if self.info_window.is_showing(id) {
            return;
        }
        let Some(map) = self.map.as_ref() else {
            return;
        };
        let Some(marker) = map.marker(id) else {
            return;
        };
        if marker.multiple && map.zoom() <= HINT_MAX_ZOOM {
            self.info_window.set_content(MULTIPLE_HINT);
            self.info_window.open(id);
        }
    }
}

impl Renderer for GoogleProvider {
    type Map = GoogleMap;

    fn initialize(&mut self, element: &str) {
        if self.map.is_none() {
            tracing::debug!("Creating map on element '{}'", element);
            self.map = Some(GoogleMap::new(element, self.map_options.clone()));
        }

        self.bounds = LatLngBounds::new();
        self.info_window = InfoWindow::new();
    }

    fn draw_points(&mut self, points: &mut [Point]) {
        let Some(map) = self.map.as_mut() else {
            tracing::warn!("draw_points called before initialize, nothing drawn");
            return;
        };

        let mut spiderfier = Spiderfier::new();
        let mut drawn = 0;

        for point in points.iter_mut() {
            if !point.is_valid() {
                tracing::debug!("Skipping row {}: no usable coordinates", point.index());
                continue;
            }

            let id = map.next_marker_id();
            point.set_marker(id);
            let marker = Self::build_marker(id, point);
            let position = marker.position;

            map.add_marker(marker);
            spiderfier.add_marker(id);
            self.bounds.extend(position);
            drawn += 1;
        }

        // zoom 0 counts as unset
        let zoom_configured = self.map_options.zoom.is_some_and(|zoom| zoom != 0);
        if !zoom_configured && self.map_options.center.is_none() {
            map.fit_bounds(&self.bounds);
        }

        spiderfier.flag_overlaps(map);
        self.spiderfier = spiderfier;

        tracing::info!(
            "Drew {} of {} points on '{}'",
            drawn,
            points.len(),
            map.element()
        );
    }

    fn map(&self) -> Option<&GoogleMap> {
        self.map.as_ref()
    }
}
