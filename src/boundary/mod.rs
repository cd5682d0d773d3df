/// Boundary loader: uploaded ZIP archive → AOI polygons in EPSG:4326.
///
/// Submodules:
/// - `archive` - scoped extraction into a temporary directory
/// - `shapes`  - `.shp` records → `MultiPolygon` features
/// - `crs`     - `.prj` WKT parsing and reprojection

pub mod archive;
pub mod crs;
pub mod shapes;

use archive::ExtractedArchive;
use crs::{Crs, Reprojector};
use geo::{Centroid, MapCoords};
use geo_types::{Coord, MultiPolygon};
use std::fs;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BoundaryError {
    /// The upload had no `.shp` component. Reported to the user; the run
    /// stops without further processing.
    #[error("Shapefile (.shp) not found in the uploaded ZIP file.")]
    MissingShapefile,

    #[error("failed to read ZIP archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("I/O error while extracting boundary: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("shapefile contains unsupported shape type {0}")]
    UnsupportedShape(String),

    #[error("shapefile contains no polygon features")]
    NoPolygons,

    #[error("invalid projection file: {0}")]
    Wkt(String),

    #[error("reprojection failed: {0}")]
    Projection(String),
}

impl BoundaryError {
    /// Errors the user can fix by uploading a different archive, as
    /// opposed to failures of the render pass itself.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, BoundaryError::MissingShapefile)
    }
}

// ---------------------------------------------------------------------------
// Boundary
// ---------------------------------------------------------------------------

/// AOI polygons (one entry per shapefile record) and their CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    features: Vec<MultiPolygon<f64>>,
    crs: Crs,
}

impl Boundary {
    pub fn new(features: Vec<MultiPolygon<f64>>, crs: Crs) -> Self {
        Self { features, crs }
    }

    pub fn features(&self) -> &[MultiPolygon<f64>] {
        &self.features
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    /// Reprojects to WGS84 longitude/latitude.
    ///
    /// A boundary that is already geographic is returned unchanged, so
    /// calling this twice is the same as calling it once.
    pub fn to_wgs84(&self) -> Result<Boundary, BoundaryError> {
        let Some(reprojector) = Reprojector::for_crs(&self.crs)? else {
            return Ok(self.clone());
        };

        let features = self
            .features
            .iter()
            .map(|feature| {
                feature.try_map_coords(|c| {
                    reprojector
                        .to_lonlat(c.x, c.y)
                        .map(|(x, y)| Coord { x, y })
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(from = self.crs.name(), features = features.len(), "reprojected boundary to EPSG:4326");
        Ok(Boundary { features, crs: Crs::wgs84() })
    }

    /// Map center as `(lat, lon)`: the mean of the per-feature centroids.
    pub fn center(&self) -> Option<(f64, f64)> {
        let centroids: Vec<_> = self.features.iter().filter_map(|f| f.centroid()).collect();
        if centroids.is_empty() {
            return None;
        }
        let n = centroids.len() as f64;
        let lat = centroids.iter().map(|p| p.y()).sum::<f64>() / n;
        let lon = centroids.iter().map(|p| p.x()).sum::<f64>() / n;
        Some((lat, lon))
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Loads the AOI from an uploaded ZIP archive.
///
/// The archive is extracted into a temporary directory that is removed
/// before this function returns, on success and on every error path.
/// The boundary keeps the CRS declared by its `.prj`; a missing `.prj`
/// is taken to mean EPSG:4326.
///
/// # Errors
/// - `BoundaryError::MissingShapefile` - no `.shp` entry in the archive.
/// - any other variant - unreadable archive, shapefile or projection.
pub fn load_from_zip(bytes: &[u8]) -> Result<Boundary, BoundaryError> {
    let archive = ExtractedArchive::extract(bytes)?;

    let Some(shp_path) = archive.find_with_extension("shp") else {
        warn!(entries = archive.entries().len(), "uploaded archive has no .shp component");
        return Err(BoundaryError::MissingShapefile);
    };

    let features = shapes::read_features(&shp_path)?;

    let crs = if let Some(prj_path) = archive.find_sibling(&shp_path, "prj") {
        Crs::from_wkt(&fs::read_to_string(&prj_path)?)?
    } else {
        warn!("boundary has no .prj component, assuming EPSG:4326");
        Crs::wgs84()
    };

    info!(features = features.len(), crs = crs.name(), "loaded boundary");
    Ok(Boundary::new(features, crs))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
