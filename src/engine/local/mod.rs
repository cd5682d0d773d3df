/// Local imagery platform backed by an in-memory scene catalog.
///
/// Used when `platform.kind = "local"` (scenes read from a directory of
/// JSON files) and by tests, which build catalogs in code. All scenes
/// share one EPSG:4326 grid so collection reductions are pixel-aligned.
///
/// Scene file layout:
///
/// ```text
/// {
///   "collection": "COPERNICUS/S2_HARMONIZED",
///   "id": "20240123T083251_20240123T083250_T36RUU",
///   "acquired": "2024-01-23T08:32:51Z",
///   "grid": { "origin_x": 30.0, "origin_y": 32.0, "pixel_width": 0.01,
///             "pixel_height": -0.01, "width": 100, "height": 100 },
///   "bands": { "B2": [...], "B3": [...], "B4": [...], "B11": [...] }
/// }
/// ```
///
/// `null` band values are masked pixels.

mod eval;
pub mod render;

use super::expr::{CollectionExpr, ImageExpr};
use super::{EngineError, LayerSource, Platform, VisParams};
use crate::raster::{Band, GridSpec, Raster};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// One acquisition in the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub collection: String,
    pub id: String,
    pub acquired: DateTime<Utc>,
    pub raster: Raster,
}

#[derive(Deserialize)]
struct SceneFile {
    collection: String,
    id: String,
    acquired: DateTime<Utc>,
    grid: GridSpec,
    bands: BTreeMap<String, Vec<Option<f64>>>,
}

impl TryFrom<SceneFile> for Scene {
    type Error = EngineError;

    fn try_from(file: SceneFile) -> Result<Self, Self::Error> {
        let bands = file
            .bands
            .into_iter()
            .map(|(name, data)| Band { name, data })
            .collect();
        Ok(Scene {
            collection: file.collection,
            id: file.id,
            acquired: file.acquired,
            raster: Raster::new(file.grid, bands)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct LocalCatalog {
    scenes: Vec<Scene>,
}

impl LocalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scene; every scene must sit on the grid of the first one.
    pub fn add_scene(&mut self, scene: Scene) -> Result<(), EngineError> {
        if let Some(first) = self.scenes.first() {
            if first.raster.grid() != scene.raster.grid() {
                return Err(EngineError::Catalog(format!(
                    "scene {} is not on the catalog grid {:?}",
                    scene.id,
                    first.raster.grid()
                )));
            }
        }
        debug!("catalog: added {} ({}) acquired {}", scene.id, scene.collection, scene.acquired);
        self.scenes.push(scene);
        Ok(())
    }

    /// Loads every `*.json` scene file in `dir`, in file name order.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, EngineError> {
        let dir = dir.as_ref();
        let io_err = |e: std::io::Error| EngineError::Catalog(format!("{}: {}", dir.display(), e));

        let mut paths = fs::read_dir(dir)
            .map_err(io_err)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;
        paths.retain(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")));
        paths.sort();

        let mut catalog = Self::new();
        for path in paths {
            let contents = fs::read_to_string(&path).map_err(io_err)?;
            let file: SceneFile = serde_json::from_str(&contents)
                .map_err(|e| EngineError::Catalog(format!("{}: {}", path.display(), e)))?;
            catalog.add_scene(Scene::try_from(file)?)?;
        }

        info!("Loaded {} scenes from {}", catalog.len(), dir.display());
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn has_collection(&self, id: &str) -> bool {
        self.scenes.iter().any(|s| s.collection == id)
    }

    pub fn scenes_in<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Scene> + 'a {
        self.scenes.iter().filter(move |s| s.collection == id)
    }
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

pub struct LocalPlatform {
    catalog: LocalCatalog,
}

impl LocalPlatform {
    pub fn new(catalog: LocalCatalog) -> Self {
        Self { catalog }
    }

    /// Evaluates an image expression to pixels.
    pub fn evaluate(&self, image: &ImageExpr) -> Result<Raster, EngineError> {
        eval::image(&self.catalog, image)
    }
}

impl Platform for LocalPlatform {
    fn name(&self) -> &str {
        "local"
    }

    fn collection_size(&self, collection: &CollectionExpr) -> Result<usize, EngineError> {
        Ok(eval::collection(&self.catalog, collection)?.len())
    }

    fn render_layer(&self, image: &ImageExpr, vis: &VisParams) -> Result<LayerSource, EngineError> {
        let raster = self.evaluate(image)?;
        let (min_x, min_y, max_x, max_y) = raster.grid().bounds();
        let data_url = render::to_data_url(&render::colorize(&raster, vis)?)?;
        Ok(LayerSource::Image {
            data_url,
            bounds: [[min_y, min_x], [max_y, max_x]],
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
