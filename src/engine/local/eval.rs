/// In-memory evaluation of platform expressions.
///
/// Semantics follow the remote query engine: date filters are
/// start-inclusive/end-exclusive, clipping masks pixels whose center lies
/// outside the region, means ignore masked members, comparisons are
/// strict and never unmask a pixel.

use super::{LocalCatalog, Scene};
use crate::engine::EngineError;
use crate::engine::expr::{CollectionExpr, ImageExpr, ImageOp};
use crate::raster::{Band, Raster};
use crate::region::Region;
use chrono::{DateTime, Utc};

/// A collection member: acquisition time plus the (possibly modified) pixels.
#[derive(Debug, Clone)]
pub(crate) struct Member {
    pub acquired: DateTime<Utc>,
    pub raster: Raster,
}

impl From<&Scene> for Member {
    fn from(scene: &Scene) -> Self {
        Member { acquired: scene.acquired, raster: scene.raster.clone() }
    }
}

pub(crate) fn collection(catalog: &LocalCatalog, expr: &CollectionExpr) -> Result<Vec<Member>, EngineError> {
    match expr {
        CollectionExpr::Load { id } => {
            if !catalog.has_collection(id) {
                return Err(EngineError::UnknownCollection(id.clone()));
            }
            Ok(catalog.scenes_in(id).map(Member::from).collect())
        }
        CollectionExpr::FilterDate { source, range } => Ok(collection(catalog, source)?
            .into_iter()
            .filter(|m| range.contains(m.acquired))
            .collect()),
        CollectionExpr::FilterBounds { source, region } => Ok(collection(catalog, source)?
            .into_iter()
            .filter(|m| footprint_intersects(&m.raster, region))
            .collect()),
        CollectionExpr::Map { source, op } => collection(catalog, source)?
            .into_iter()
            .map(|m| {
                Ok(Member {
                    acquired: m.acquired,
                    raster: apply(op, &m.raster)?,
                })
            })
            .collect(),
    }
}

pub(crate) fn image(catalog: &LocalCatalog, expr: &ImageExpr) -> Result<Raster, EngineError> {
    match expr {
        ImageExpr::Mean(source) => mean(&collection(catalog, source)?),
        ImageExpr::Compare { source, op, threshold } => Ok(image(catalog, source)?
            .map_pixels(|v| v.map(|x| if op.holds(x, *threshold) { 1.0 } else { 0.0 }))),
        ImageExpr::SelfMask(source) => Ok(image(catalog, source)?.map_pixels(|v| v.filter(|x| *x != 0.0))),
        ImageExpr::UpdateMask { source, mask } => {
            let source = image(catalog, source)?;
            let mask = image(catalog, mask)?;
            source.ensure_same_grid(&mask)?;
            let Some(mask_band) = mask.first() else {
                return Ok(source);
            };
            Ok(source.mask_where(|i| mask_band.data[i].is_some_and(|m| m != 0.0)))
        }
    }
}

fn footprint_intersects(raster: &Raster, region: &Region) -> bool {
    let (min_x, min_y, max_x, max_y) = raster.grid().bounds();
    let rect = geo_types::Rect::new(
        geo_types::coord! { x: min_x, y: min_y },
        geo_types::coord! { x: max_x, y: max_y },
    );
    region.intersects_rect(&rect)
}

fn apply(op: &ImageOp, raster: &Raster) -> Result<Raster, EngineError> {
    match op {
        ImageOp::Clip(region) => {
            let grid = *raster.grid();
            Ok(raster.mask_where(|i| {
                let (x, y) = grid.pixel_center(i % grid.width, i / grid.width);
                region.contains_point(x, y)
            }))
        }
        ImageOp::NormalizedDifference { bands, name } => {
            let a = raster.band(&bands[0])?;
            let b = raster.band(&bands[1])?;
            let data = a
                .data
                .iter()
                .zip(&b.data)
                .map(|(a, b)| normalized_difference(*a, *b))
                .collect();
            Ok(Raster::single(*raster.grid(), name, data)?)
        }
    }
}

/// `(a - b) / (a + b)`, masked when either input is masked or the sum is 0.
pub(crate) fn normalized_difference(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    let (a, b) = (a?, b?);
    let sum = a + b;
    if sum.abs() < 1e-10 {
        return None;
    }
    Some((a - b) / sum)
}

/// Band-wise mean over members, ignoring masked pixels.
fn mean(members: &[Member]) -> Result<Raster, EngineError> {
    let first = members.first().ok_or(EngineError::EmptyCollection)?;
    for m in &members[1..] {
        first.raster.ensure_same_grid(&m.raster)?;
    }

    let grid = *first.raster.grid();
    let mut bands = Vec::with_capacity(first.raster.bands().len());

    for name in first.raster.band_names() {
        let sources = members
            .iter()
            .map(|m| m.raster.band(name))
            .collect::<Result<Vec<_>, _>>()?;

        let data = (0..grid.len())
            .map(|i| {
                let (sum, count) = sources
                    .iter()
                    .filter_map(|band| band.data[i])
                    .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
                (count > 0).then(|| sum / count as f64)
            })
            .collect();

        bands.push(Band { name: name.to_string(), data });
    }

    Ok(Raster::new(grid, bands)?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
