//! Map providers
//!
//! A provider only has to know how to get ready on a page element and how to
//! draw a list of points. New map backends implement [`Renderer`].

pub mod google;

use mapsheet_common::Point;

pub use google::GoogleProvider;

pub trait Renderer {
    /// The backend's map instance
    type Map;

    /// Prepare drawing into `element`. Creates a map unless one was supplied.
    fn initialize(&mut self, element: &str);

    /// Draw every valid point and record its marker on the point.
    fn draw_points(&mut self, points: &mut [Point]);

    /// The map drawn on, once there is one.
    fn map(&self) -> Option<&Self::Map>;
}
