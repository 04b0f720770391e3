//! Shared data model for mapsheet: rows, points and popup content.

pub mod point;
pub mod popup;
pub mod row;

pub use point::{
    ClickHandler, MarkerId, MarkerOptions, Point, PointOptions, normalize_field, parse_float,
};
pub use popup::{ContentFn, PopupTemplate, TemplateError};
pub use row::Row;
