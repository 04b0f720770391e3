//! Overlapping marker spiderfier
//!
//! Markers drawn on (nearly) the same spot hide each other. The spiderfier
//! flags such markers as `multiple` and, when one of them is clicked, fans
//! the whole group out around their common centre: on a circle for small
//! groups, on a spiral for larger ones. Distances are in screen pixels at
//! the map's current zoom.

use std::f64::consts::PI;

use mapsheet_common::MarkerId;
use serde::Serialize;

use super::geo::{project, unproject, LatLng, PixelPoint};
use super::map::GoogleMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpiderfierOptions {
    /// Markers closer than this many pixels overlap
    pub nearby_distance: f64,
    /// Groups at least this large are laid out on a spiral
    pub circle_spiral_switchover: usize,
    pub circle_foot_separation: f64,
    pub circle_start_angle: f64,
    pub spiral_foot_separation: f64,
    pub spiral_length_start: f64,
    pub spiral_length_factor: f64,
}

impl Default for SpiderfierOptions {
    fn default() -> Self {
        Self {
            nearby_distance: 20.0,
            circle_spiral_switchover: 9,
            circle_foot_separation: 23.0,
            circle_start_angle: PI / 6.0,
            spiral_foot_separation: 26.0,
            spiral_length_start: 11.0,
            spiral_length_factor: 4.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Spiderfier {
    options: SpiderfierOptions,
    markers: Vec<MarkerId>,
    /// Original positions of the currently fanned-out group
    spiderfied: Vec<(MarkerId, LatLng)>,
}

impl Spiderfier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: SpiderfierOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn add_marker(&mut self, marker: MarkerId) {
        self.markers.push(marker);
    }

    pub fn markers(&self) -> &[MarkerId] {
        &self.markers
    }

    pub fn is_spiderfied(&self) -> bool {
        !self.spiderfied.is_empty()
    }

    pub fn is_spiderfied_marker(&self, marker: MarkerId) -> bool {
        self.spiderfied.iter().any(|(id, _)| *id == marker)
    }

    fn pixel(&self, map: &GoogleMap, marker: MarkerId) -> Option<PixelPoint> {
        map.marker(marker).map(|m| project(m.position, map.zoom()))
    }

    /// Other registered markers overlapping `marker` at the current zoom.
    pub fn markers_near(&self, map: &GoogleMap, marker: MarkerId) -> Vec<MarkerId> {
        let Some(origin) = self.pixel(map, marker) else {
            return Vec::new();
        };
        self.markers
            .iter()
            .copied()
            .filter(|&other| other != marker)
            .filter(|&other| {
                self.pixel(map, other)
                    .is_some_and(|p| p.distance(&origin) < self.options.nearby_distance)
            })
            .collect()
    }

    /// Recompute the `multiple` flag of every registered marker.
    pub fn flag_overlaps(&self, map: &mut GoogleMap) {
        let flags: Vec<(MarkerId, bool)> = self
            .markers
            .iter()
            .map(|&id| (id, !self.markers_near(map, id).is_empty()))
            .collect();

        let mut overlapping = 0;
        for (id, multiple) in flags {
            if let Some(marker) = map.marker_mut(id) {
                marker.multiple = multiple;
                overlapping += usize::from(multiple);
            }
        }
        tracing::debug!(
            "{} of {} markers overlap at zoom {}",
            overlapping,
            self.markers.len(),
            map.zoom()
        );
    }

    /// React to a marker click: collapse the open group when it is clicked,
    /// otherwise fan out the clicked marker's group.
    pub fn handle_click(&mut self, map: &mut GoogleMap, marker: MarkerId) -> Vec<MarkerId> {
        if self.is_spiderfied_marker(marker) {
            self.unspiderfy(map);
            return Vec::new();
        }
        self.spiderfy(map, marker)
    }

    /// Fan out `marker` and its overlapping neighbours. Returns the group,
    /// empty when the marker overlaps nothing.
    pub fn spiderfy(&mut self, map: &mut GoogleMap, marker: MarkerId) -> Vec<MarkerId> {
        self.unspiderfy(map);

        let mut group = self.markers_near(map, marker);
        if group.is_empty() {
            return group;
        }
        group.insert(0, marker);

        let zoom = map.zoom();
        let pixels: Vec<PixelPoint> = group.iter().filter_map(|&id| self.pixel(map, id)).collect();
        let count = pixels.len() as f64;
        let centre = PixelPoint {
            x: pixels.iter().map(|p| p.x).sum::<f64>() / count,
            y: pixels.iter().map(|p| p.y).sum::<f64>() / count,
        };

        let feet = if group.len() >= self.options.circle_spiral_switchover {
            self.spiral_layout(group.len(), centre)
        } else {
            self.circle_layout(group.len(), centre)
        };

        for (&id, foot) in group.iter().zip(feet) {
            if let Some(m) = map.marker_mut(id) {
                self.spiderfied.push((id, m.position));
                m.position = unproject(foot, zoom);
            }
        }

        tracing::debug!("Spiderfied {} markers around {}", group.len(), marker);
        group
    }

    /// Put fanned-out markers back where they were.
    pub fn unspiderfy(&mut self, map: &mut GoogleMap) {
        for (id, position) in self.spiderfied.drain(..) {
            if let Some(m) = map.marker_mut(id) {
                m.position = position;
            }
        }
    }

    fn circle_layout(&self, count: usize, centre: PixelPoint) -> Vec<PixelPoint> {
        let circumference = self.options.circle_foot_separation * (2 + count) as f64;
        let leg = circumference / (2.0 * PI);
        let step = 2.0 * PI / count as f64;
        (0..count)
            .map(|i| {
                let angle = self.options.circle_start_angle + i as f64 * step;
                PixelPoint {
                    x: centre.x + leg * angle.cos(),
                    y: centre.y + leg * angle.sin(),
                }
            })
            .collect()
    }

    fn spiral_layout(&self, count: usize, centre: PixelPoint) -> Vec<PixelPoint> {
        let mut leg = self.options.spiral_length_start;
        let mut angle = 0.0_f64;
        (0..count)
            .map(|i| {
                angle += self.options.spiral_foot_separation / leg + i as f64 * 0.0005;
                let foot = PixelPoint {
                    x: centre.x + leg * angle.cos(),
                    y: centre.y + leg * angle.sin(),
                };
                leg += 2.0 * PI * self.options.spiral_length_factor / angle;
                foot
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use mapsheet_common::{Point, PointOptions, Row};

    use super::super::map::{MapOptions, Marker};
    use super::*;

    fn map_with(positions: &[(f64, f64)], zoom: u8) -> (GoogleMap, Spiderfier) {
        let options = MapOptions {
            zoom: Some(zoom),
            ..Default::default()
        };
        let mut map = GoogleMap::new("map", options);
        let mut spiderfier = Spiderfier::new();
        for (i, &(lat, lng)) in positions.iter().enumerate() {
            let point = Point::new(Row::new(), i, Arc::new(PointOptions::default()));
            let id = map.add_marker(Marker::new(map.next_marker_id(), LatLng::new(lat, lng), point));
            spiderfier.add_marker(id);
        }
        (map, spiderfier)
    }

    #[test]
    fn test_flag_overlaps_depends_on_zoom() {
        let (mut map, spiderfier) = map_with(&[(10.0, 20.0), (10.0001, 20.0001), (30.0, 40.0)], 10);
        spiderfier.flag_overlaps(&mut map);
        let flags: Vec<bool> = map.markers().iter().map(|m| m.multiple).collect();
        assert_eq!(flags, vec![true, true, false]);

        map.set_zoom(21);
        spiderfier.flag_overlaps(&mut map);
        assert!(map.markers().iter().all(|m| !m.multiple));
    }

    #[test]
    fn test_spiderfy_circle_and_restore() {
        let (mut map, mut spiderfier) = map_with(&[(10.0, 20.0), (10.0, 20.0), (10.0, 20.0)], 10);
        let group = spiderfier.spiderfy(&mut map, MarkerId(1));
        assert_eq!(group.len(), 3);
        assert_eq!(group[0], MarkerId(1));
        assert!(spiderfier.is_spiderfied());

        let zoom = map.zoom();
        let pixels: Vec<PixelPoint> = map.markers().iter().map(|m| project(m.position, zoom)).collect();
        // circumference 23 * 5 -> leg ~18.3px from the shared centre
        let centre = project(LatLng::new(10.0, 20.0), zoom);
        for p in &pixels {
            assert!((p.distance(&centre) - 115.0 / (2.0 * PI)).abs() < 1e-3);
        }
        assert!(pixels[0].distance(&pixels[1]) > 20.0);

        spiderfier.handle_click(&mut map, MarkerId(0));
        assert!(!spiderfier.is_spiderfied());
        assert!(map.markers().iter().all(|m| m.position == LatLng::new(10.0, 20.0)));
    }

    #[test]
    fn test_spiderfy_spiral_for_large_groups() {
        let positions = vec![(0.0, 0.0); 10];
        let (mut map, mut spiderfier) = map_with(&positions, 5);
        let group = spiderfier.spiderfy(&mut map, MarkerId(0));
        assert_eq!(group.len(), 10);

        let zoom = map.zoom();
        let centre = project(LatLng::new(0.0, 0.0), zoom);
        let first = project(map.markers()[0].position, zoom);
        let last = project(map.markers()[9].position, zoom);
        assert!((first.distance(&centre) - 11.0).abs() < 1e-3);
        assert!(last.distance(&centre) > first.distance(&centre));
    }

    #[test]
    fn test_lonely_marker_does_not_spiderfy() {
        let (mut map, mut spiderfier) = map_with(&[(10.0, 20.0), (-10.0, -20.0)], 3);
        assert!(spiderfier.handle_click(&mut map, MarkerId(0)).is_empty());
        assert!(!spiderfier.is_spiderfied());
    }
}
