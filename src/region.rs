/// Region converter: the platform-side mirror of a `Boundary`.
///
/// A `Region` is the merged AOI in EPSG:4326. Queries use it as a spatial
/// filter (`filterBounds`) and as a clip geometry; the map uses its
/// GeoJSON form for the AOI outline.

use crate::boundary::Boundary;
use crate::boundary::crs::Crs;
use geo::{BoundingRect, Contains, Intersects};
use geo_types::{MultiPolygon, Point, Rect};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("boundary must be in EPSG:4326 before conversion, got {0}")]
    NotGeographic(String),

    #[error("boundary has no polygons")]
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    geometry: MultiPolygon<f64>,
    bounds: Rect<f64>,
}

impl Region {
    /// Merges every boundary feature into a single multipolygon.
    pub fn from_boundary(boundary: &Boundary) -> Result<Self, RegionError> {
        if !matches!(boundary.crs(), Crs::Geographic { .. }) {
            return Err(RegionError::NotGeographic(boundary.crs().name().to_string()));
        }

        let polygons = boundary
            .features()
            .iter()
            .flat_map(|f| f.0.iter().cloned())
            .collect::<Vec<_>>();
        Self::from_geometry(MultiPolygon::new(polygons))
    }

    pub fn from_geometry(geometry: MultiPolygon<f64>) -> Result<Self, RegionError> {
        let bounds = geometry.bounding_rect().ok_or(RegionError::Empty)?;
        Ok(Self { geometry, bounds })
    }

    pub fn geometry(&self) -> &MultiPolygon<f64> {
        &self.geometry
    }

    pub fn bounds(&self) -> Rect<f64> {
        self.bounds
    }

    /// Polygons as nested `[lon, lat]` rings (exterior first), the layout
    /// used by GeoJSON and by the platform's geometry constructors.
    pub fn rings(&self) -> Vec<Vec<Vec<[f64; 2]>>> {
        self.geometry
            .0
            .iter()
            .map(|polygon| {
                std::iter::once(polygon.exterior())
                    .chain(polygon.interiors())
                    .map(|ring| ring.coords().map(|c| [c.x, c.y]).collect())
                    .collect()
            })
            .collect()
    }

    pub fn to_geojson(&self) -> geojson::Geometry {
        geojson::Geometry::new(geojson::Value::from(&self.geometry))
    }

    /// Whether the region overlaps a scene footprint.
    pub fn intersects_rect(&self, rect: &Rect<f64>) -> bool {
        self.bounds.intersects(rect) && self.geometry.intersects(&rect.to_polygon())
    }

    /// Whether a point lies strictly inside the region.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        self.geometry.contains(&Point::new(x, y))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
