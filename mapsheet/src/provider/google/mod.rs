//! Google Maps provider

pub mod geo;
pub mod icons;
pub mod map;
pub mod page;
pub mod provider;
pub mod spiderfier;

pub use geo::{LatLng, LatLngBounds};
pub use map::{GoogleMap, InfoWindow, MapOptions, MapTypeId, Marker, MarkerEvent};
pub use page::PageRenderer;
pub use provider::GoogleProvider;
pub use spiderfier::{Spiderfier, SpiderfierOptions};
