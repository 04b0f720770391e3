//! Mapsheet: spreadsheet rows on a map
//!
//! Loads one sheet from a data source, turns each row into a [`Point`], and
//! hands the points to a [`Renderer`]. Every completed load redraws.

use std::fmt;
use std::sync::Arc;

use mapsheet_common::{Point, PointOptions};

use crate::provider::google::{GoogleMap, MapOptions};
use crate::provider::{GoogleProvider, Renderer};
use crate::source::{DataSource, SourceError, Workbook};

/// Called after every draw with the sheet and the workbook it came from.
pub type Callback<R> = Box<dyn FnMut(&Mapsheet<R>, &Workbook) + Send>;

/// Construction options.
pub struct MapsheetOptions<R: Renderer = GoogleProvider> {
    /// Spreadsheet key (or path) of the data source
    pub key: String,
    /// Id of the page element the map is drawn into
    pub element: String,
    /// Sheet to show; the first sheet when `None`
    pub sheet_name: Option<String>,
    pub point_options: PointOptions,
    pub callback: Option<Callback<R>>,
}

impl<R: Renderer> MapsheetOptions<R> {
    pub fn new(key: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            element: element.into(),
            sheet_name: None,
            point_options: PointOptions::default(),
            callback: None,
        }
    }
}

pub struct Mapsheet<R: Renderer = GoogleProvider> {
    key: String,
    element: String,
    sheet_name: Option<String>,
    point_options: Arc<PointOptions>,
    renderer: R,
    points: Vec<Point>,
    workbook: Option<Workbook>,
    callback: Option<Callback<R>>,
}

impl Mapsheet<GoogleProvider> {
    /// Mapsheet drawing with the Google provider. `map` is drawn on instead of
    /// a freshly created map when given.
    pub fn google(options: MapsheetOptions, map_options: MapOptions, map: Option<GoogleMap>) -> Self {
        Self::with_renderer(options, GoogleProvider::new(map_options, map))
    }
}

impl<R: Renderer> Mapsheet<R> {
    pub fn with_renderer(options: MapsheetOptions<R>, renderer: R) -> Self {
        Self {
            key: options.key,
            element: options.element,
            sheet_name: options.sheet_name,
            point_options: Arc::new(options.point_options),
            renderer,
            points: Vec::new(),
            workbook: None,
            callback: options.callback,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn element(&self) -> &str {
        &self.element
    }

    /// Name of the sheet shown, resolved on first load when not configured
    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Data-source handle of the last load
    pub fn workbook(&self) -> Option<&Workbook> {
        self.workbook.as_ref()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// The map drawn on: the supplied one, otherwise the renderer's own.
    pub fn map(&self) -> Option<&R::Map> {
        self.renderer.map()
    }

    /// Fetch from `source` once and draw the result.
    pub async fn load(&mut self, source: &dyn DataSource) -> Result<(), SourceError> {
        let workbook = source.fetch().await?;
        self.load_points(workbook)
    }

    /// Build points from the selected sheet of `workbook`, then draw.
    pub fn load_points(&mut self, workbook: Workbook) -> Result<(), SourceError> {
        let sheet_name = match &self.sheet_name {
            Some(name) => name.clone(),
            None => workbook
                .model_names()
                .first()
                .map(|name| name.to_string())
                .ok_or(SourceError::NoSheets)?,
        };

        let sheet = workbook
            .sheet(&sheet_name)
            .ok_or_else(|| SourceError::SheetNotFound(sheet_name.clone()))?;

        self.points = sheet
            .elements
            .iter()
            .enumerate()
            .map(|(i, row)| Point::new(row.clone(), i, self.point_options.clone()))
            .collect();

        tracing::info!(
            "Loaded {} rows from sheet '{}' of {}",
            self.points.len(),
            sheet_name,
            workbook.key
        );

        self.sheet_name = Some(sheet_name);
        self.workbook = Some(workbook);
        self.draw();
        Ok(())
    }

    /// Draw the current points and run the callback.
    pub fn draw(&mut self) {
        self.renderer.initialize(&self.element);
        self.renderer.draw_points(&mut self.points);

        if let Some(mut callback) = self.callback.take() {
            if let Some(workbook) = &self.workbook {
                callback(self, workbook);
            }
            self.callback = Some(callback);
        }
    }
}

impl<R: Renderer> fmt::Debug for Mapsheet<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapsheet")
            .field("key", &self.key)
            .field("element", &self.element)
            .field("sheet_name", &self.sheet_name)
            .field("points", &self.points.len())
            .finish()
    }
}
