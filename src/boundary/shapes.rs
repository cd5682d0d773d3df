/// Reads polygon features from the `.shp` component of a boundary.
///
/// Every shapefile record becomes one `MultiPolygon`: an outer ring
/// starts a new polygon and the inner rings that follow are its holes.

use super::BoundaryError;
use geo_types::{Coord, LineString, MultiPolygon, Polygon};
use shapefile::{PolygonRing, Shape, ShapeReader};
use std::path::Path;
use tracing::debug;

/// Ring as stored in the file, before assembly into polygons.
struct RawRing {
    outer: bool,
    coords: Vec<Coord<f64>>,
}

/// Reads every record of `shp_path` into a polygon feature.
///
/// # Errors
/// - `BoundaryError::Shapefile` - unreadable or corrupt file.
/// - `BoundaryError::UnsupportedShape` - a non-polygon record.
/// - `BoundaryError::NoPolygons` - the file only held null shapes.
pub fn read_features(shp_path: &Path) -> Result<Vec<MultiPolygon<f64>>, BoundaryError> {
    let reader = ShapeReader::from_path(shp_path)?;
    let shapes = reader.read()?;

    let mut features = Vec::with_capacity(shapes.len());

    for shape in shapes {
        let rings = match shape {
            Shape::NullShape => continue,
            Shape::Polygon(polygon) => raw_rings(polygon.rings(), |p| Coord { x: p.x, y: p.y }),
            Shape::PolygonM(polygon) => raw_rings(polygon.rings(), |p| Coord { x: p.x, y: p.y }),
            Shape::PolygonZ(polygon) => raw_rings(polygon.rings(), |p| Coord { x: p.x, y: p.y }),
            other => {
                return Err(BoundaryError::UnsupportedShape(format!("{:?}", other.shapetype())));
            }
        };

        let feature = assemble(rings);
        if !feature.0.is_empty() {
            features.push(feature);
        }
    }

    if features.is_empty() {
        return Err(BoundaryError::NoPolygons);
    }

    debug!(features = features.len(), path = %shp_path.display(), "read boundary features");
    Ok(features)
}

fn raw_rings<P, F>(rings: &[PolygonRing<P>], to_coord: F) -> Vec<RawRing>
where
    F: Fn(&P) -> Coord<f64>,
{
    rings
        .iter()
        .map(|ring| match ring {
            PolygonRing::Outer(points) => RawRing {
                outer: true,
                coords: points.iter().map(&to_coord).collect(),
            },
            PolygonRing::Inner(points) => RawRing {
                outer: false,
                coords: points.iter().map(&to_coord).collect(),
            },
        })
        .collect()
}

/// Groups rings into polygons. A hole that appears before any outer ring
/// is promoted to an exterior rather than dropped.
fn assemble(rings: Vec<RawRing>) -> MultiPolygon<f64> {
    let mut parts: Vec<(LineString<f64>, Vec<LineString<f64>>)> = Vec::new();

    for ring in rings {
        if ring.coords.len() < 3 {
            continue;
        }
        let line = LineString::from(ring.coords);
        match parts.last_mut() {
            Some((_, holes)) if !ring.outer => holes.push(line),
            _ => parts.push((line, Vec::new())),
        }
    }

    MultiPolygon::new(
        parts
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
