/// Imagery platform seam.
///
/// Everything substantive (catalog search, clipping, band math, mean
/// reduction, tile rendering) happens behind the `Platform` trait. The
/// rest of the service only builds expressions and asks for two things:
/// how many images a collection holds, and a renderable layer for an
/// image.
///
/// Submodules:
/// - `expr`        - the declarative expression tree
/// - `earthengine` - remote REST platform
/// - `local`       - in-memory catalog (offline mode and tests)
/// - `fixtures` (test only) - representative platform payloads

pub mod earthengine;
pub mod expr;
#[cfg(test)]
pub(crate) mod fixtures;
pub mod local;

use crate::raster::RasterError;
use expr::{CollectionExpr, ImageExpr};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("platform returned {status}: {message}")]
    Remote { status: String, message: String },

    #[error("unexpected platform response: {0}")]
    Parse(String),

    #[error("platform session not configured: environment variable {0} is not set")]
    MissingToken(String),

    #[error("collection '{0}' is not in the local catalog")]
    UnknownCollection(String),

    #[error("cannot reduce an empty collection")]
    EmptyCollection,

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("failed to render layer: {0}")]
    Render(String),

    #[error("catalog error: {0}")]
    Catalog(String),
}

/// How an image is coloured for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisParams {
    /// Bands to display; empty means all bands of the image.
    #[serde(default)]
    pub bands: Vec<String>,
    pub min: f64,
    pub max: f64,
    /// Colour ramp for single-band images, as `#rrggbb` strings.
    #[serde(default)]
    pub palette: Vec<String>,
}

/// Where the browser fetches a layer from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerSource {
    /// XYZ tile template with `{z}`, `{x}`, `{y}` placeholders.
    Tiles { url_template: String },
    /// A single image stretched over `[[south, west], [north, east]]`.
    Image { data_url: String, bounds: [[f64; 2]; 2] },
    /// Vector outline drawn client-side.
    GeoJson { geometry: geojson::Geometry, color: String },
}

/// An imagery platform able to evaluate expressions.
pub trait Platform {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Number of images in `collection`. One attempt, no retry.
    fn collection_size(&self, collection: &CollectionExpr) -> Result<usize, EngineError>;

    /// Visualizes `image` and returns where the browser can load it.
    fn render_layer(&self, image: &ImageExpr, vis: &VisParams) -> Result<LayerSource, EngineError>;
}
