//! Coordinates, bounds and the Web Mercator projection used by Google Maps

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// World width in pixels at zoom 0
pub const TILE_SIZE: f64 = 256.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

/// Pixel position in world coordinates at a given zoom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

impl PixelPoint {
    pub fn distance(&self, other: &PixelPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

fn world_size(zoom: u8) -> f64 {
    TILE_SIZE * f64::from(1u32 << zoom.min(30))
}

/// Project a coordinate onto the world pixel plane.
pub fn project(position: LatLng, zoom: u8) -> PixelPoint {
    let scale = world_size(zoom);
    let siny = position.lat.to_radians().sin().clamp(-0.9999, 0.9999);
    PixelPoint {
        x: (position.lng + 180.0) / 360.0 * scale,
        y: (0.5 - ((1.0 + siny) / (1.0 - siny)).ln() / (4.0 * PI)) * scale,
    }
}

/// Inverse of [`project`].
pub fn unproject(point: PixelPoint, zoom: u8) -> LatLng {
    let scale = world_size(zoom);
    let lng = point.x / scale * 360.0 - 180.0;
    let n = PI * (1.0 - 2.0 * point.y / scale);
    LatLng {
        lat: n.sinh().atan().to_degrees(),
        lng,
    }
}

/// Minimal rectangle covering every extended position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    south_west: Option<LatLng>,
    north_east: Option<LatLng>,
}

impl LatLngBounds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, position: LatLng) {
        match (self.south_west.as_mut(), self.north_east.as_mut()) {
            (Some(sw), Some(ne)) => {
                sw.lat = sw.lat.min(position.lat);
                sw.lng = sw.lng.min(position.lng);
                ne.lat = ne.lat.max(position.lat);
                ne.lng = ne.lng.max(position.lng);
            }
            _ => {
                self.south_west = Some(position);
                self.north_east = Some(position);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.south_west.is_none()
    }

    pub fn south_west(&self) -> Option<LatLng> {
        self.south_west
    }

    pub fn north_east(&self) -> Option<LatLng> {
        self.north_east
    }

    pub fn contains(&self, position: LatLng) -> bool {
        match (self.south_west, self.north_east) {
            (Some(sw), Some(ne)) => {
                (sw.lat..=ne.lat).contains(&position.lat) && (sw.lng..=ne.lng).contains(&position.lng)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_project_origin_is_world_centre() {
        let p = project(LatLng::new(0.0, 0.0), 0);
        assert!(close(p.x, 128.0));
        assert!(close(p.y, 128.0));

        let p = project(LatLng::new(0.0, 0.0), 1);
        assert!(close(p.x, 256.0));
    }

    #[test]
    fn test_unproject_inverts_project() {
        let position = LatLng::new(48.8584, 2.2945);
        let back = unproject(project(position, 12), 12);
        assert!(close(back.lat, position.lat));
        assert!(close(back.lng, position.lng));
    }

    #[test]
    fn test_bounds_extend() {
        let mut bounds = LatLngBounds::new();
        assert!(bounds.is_empty());

        bounds.extend(LatLng::new(10.0, 20.0));
        bounds.extend(LatLng::new(-5.0, 30.0));
        assert!(!bounds.is_empty());
        assert_eq!(bounds.south_west(), Some(LatLng::new(-5.0, 20.0)));
        assert_eq!(bounds.north_east(), Some(LatLng::new(10.0, 30.0)));
        assert!(bounds.contains(LatLng::new(0.0, 25.0)));
        assert!(!bounds.contains(LatLng::new(11.0, 25.0)));
    }
}
