/// floodmap_service: Sentinel-2 flood extent mapping service.
///
/// # Module structure
///
/// ```text
/// floodmap_service
/// ├── model       — shared data types (DateRange, Message, LayerKind)
/// ├── config      — service configuration loader (floodmap.toml)
/// ├── raster      — masked in-memory rasters for the local platform
/// ├── boundary
/// │   ├── archive — scoped ZIP extraction into a temporary directory
/// │   ├── shapes  — shapefile polygons → MultiPolygon features
/// │   └── crs     — .prj WKT parsing and reprojection to EPSG:4326
/// ├── region      — AOI as a platform geometry (bounds, GeoJSON, predicates)
/// ├── engine
/// │   ├── expr        — declarative image/collection expressions
/// │   ├── earthengine — Earth Engine REST: graph encoding + response parsing
/// │   ├── local       — in-memory catalog, evaluator and PNG renderer
/// │   └── fixtures (test only) — representative API response payloads
/// ├── imagery     — date-filtered, AOI-clipped composites
/// ├── analysis
/// │   ├── water   — MNDWI-style index and water masks
/// │   └── flood   — pre/post composition into the flood extent
/// ├── presenter   — ordered map layers, legend, and the single-page UI
/// ├── pipeline    — one render pass: archive + dates → map view
/// └── endpoint    — HTTP page and API (tiny_http)
/// ```

/// Public modules
pub mod analysis;
pub mod boundary;
pub mod config;
pub mod endpoint;
pub mod engine;
pub mod imagery;
pub mod model;
pub mod pipeline;
pub mod presenter;
pub mod raster;
pub mod region;
