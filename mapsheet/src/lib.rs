//! Spreadsheet rows as markers on a map.
//!
//! A [`Mapsheet`] loads a sheet through a [`source::DataSource`], wraps every
//! row in a [`Point`] and lets a [`provider::Renderer`] draw them. The Google
//! provider keeps a full model of the drawn map which [`PageRenderer`] turns
//! into a standalone HTML page.

pub mod config;
pub mod logging;
pub mod provider;
pub mod sheet;
pub mod source;

pub use mapsheet_common::{MarkerId, MarkerOptions, Point, PointOptions, PopupTemplate, Row};
pub use provider::google::PageRenderer;
pub use sheet::{Mapsheet, MapsheetOptions};
