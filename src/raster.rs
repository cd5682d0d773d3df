/// Masked in-memory raster used by the local imagery platform.
///
/// A raster is a north-up grid in geographic coordinates with one or more
/// named bands. Each pixel is an `Option<f64>`: `None` means masked
/// (no data), which is how the platform represents pixels removed by
/// `clip`, `selfMask` or `updateMask`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RasterError {
    #[error("band '{0}' not found")]
    MissingBand(String),

    #[error("raster grids differ: {0:?} vs {1:?}")]
    GridMismatch(GridSpec, GridSpec),

    #[error("band '{name}' has {actual} pixels, grid needs {expected}")]
    BadBandLength { name: String, expected: usize, actual: usize },
}

// ---------------------------------------------------------------------------
// Grid
// ---------------------------------------------------------------------------

/// Georeferencing of a north-up grid.
///
/// `origin_x`/`origin_y` are the upper-left corner; `pixel_height` is
/// negative for north-up data, like a GDAL geotransform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_width: f64,
    pub pixel_height: f64,
    pub width: usize,
    pub height: usize,
}

impl GridSpec {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates of the center of pixel (col, row).
    pub fn pixel_center(&self, col: usize, row: usize) -> (f64, f64) {
        (
            self.origin_x + (col as f64 + 0.5) * self.pixel_width,
            self.origin_y + (row as f64 + 0.5) * self.pixel_height,
        )
    }

    /// Bounding box as `(min_x, min_y, max_x, max_y)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let x2 = self.origin_x + self.width as f64 * self.pixel_width;
        let y2 = self.origin_y + self.height as f64 * self.pixel_height;
        (
            self.origin_x.min(x2),
            self.origin_y.min(y2),
            self.origin_x.max(x2),
            self.origin_y.max(y2),
        )
    }
}

// ---------------------------------------------------------------------------
// Raster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub name: String,
    pub data: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    grid: GridSpec,
    bands: Vec<Band>,
}

impl Raster {
    /// Builds a raster, checking every band covers the grid.
    pub fn new(grid: GridSpec, bands: Vec<Band>) -> Result<Self, RasterError> {
        for band in &bands {
            if band.data.len() != grid.len() {
                return Err(RasterError::BadBandLength {
                    name: band.name.clone(),
                    expected: grid.len(),
                    actual: band.data.len(),
                });
            }
        }
        Ok(Self { grid, bands })
    }

    /// Single-band raster.
    pub fn single(grid: GridSpec, name: &str, data: Vec<Option<f64>>) -> Result<Self, RasterError> {
        Self::new(grid, vec![Band { name: name.to_string(), data }])
    }

    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn band_names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn band(&self, name: &str) -> Result<&Band, RasterError> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| RasterError::MissingBand(name.to_string()))
    }

    /// The first band; single-band results (indices, masks) live here.
    pub fn first(&self) -> Option<&Band> {
        self.bands.first()
    }

    /// Keeps only the named bands, in the requested order.
    pub fn select(&self, names: &[String]) -> Result<Raster, RasterError> {
        let bands = names
            .iter()
            .map(|n| self.band(n).cloned())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Raster { grid: self.grid, bands })
    }

    /// Applies `f` to every pixel of every band, preserving names.
    pub fn map_pixels<F>(&self, f: F) -> Raster
    where
        F: Fn(Option<f64>) -> Option<f64>,
    {
        let bands = self
            .bands
            .iter()
            .map(|b| Band {
                name: b.name.clone(),
                data: b.data.iter().map(|v| f(*v)).collect(),
            })
            .collect();
        Raster { grid: self.grid, bands }
    }

    /// Masks every band at pixels where `keep` is false.
    pub fn mask_where<F>(&self, keep: F) -> Raster
    where
        F: Fn(usize) -> bool,
    {
        let bands = self
            .bands
            .iter()
            .map(|b| Band {
                name: b.name.clone(),
                data: b
                    .data
                    .iter()
                    .enumerate()
                    .map(|(i, v)| if keep(i) { *v } else { None })
                    .collect(),
            })
            .collect();
        Raster { grid: self.grid, bands }
    }

    pub fn ensure_same_grid(&self, other: &Raster) -> Result<(), RasterError> {
        if self.grid != other.grid {
            return Err(RasterError::GridMismatch(self.grid, other.grid));
        }
        Ok(())
    }

    /// Indices of pixels that are unmasked in the first band.
    pub fn valid_pixels(&self) -> Vec<usize> {
        self.first()
            .map(|b| {
                b.data
                    .iter()
                    .enumerate()
                    .filter_map(|(i, v)| v.map(|_| i))
                    .collect()
            })
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_2x2() -> GridSpec {
        GridSpec {
            origin_x: 10.0,
            origin_y: 50.0,
            pixel_width: 0.5,
            pixel_height: -0.5,
            width: 2,
            height: 2,
        }
    }

    #[test]
    fn test_pixel_center_and_bounds() {
        let grid = grid_2x2();
        assert_eq!(grid.pixel_center(0, 0), (10.25, 49.75));
        assert_eq!(grid.pixel_center(1, 1), (10.75, 49.25));
        assert_eq!(grid.bounds(), (10.0, 49.0, 11.0, 50.0));
    }

    #[test]
    fn test_new_rejects_short_band() {
        let result = Raster::single(grid_2x2(), "B3", vec![Some(1.0); 3]);
        assert!(matches!(result, Err(RasterError::BadBandLength { expected: 4, actual: 3, .. })));
    }

    #[test]
    fn test_select_keeps_requested_order() {
        let raster = Raster::new(
            grid_2x2(),
            vec![
                Band { name: "B2".into(), data: vec![Some(2.0); 4] },
                Band { name: "B3".into(), data: vec![Some(3.0); 4] },
            ],
        )
        .unwrap();

        let selected = raster.select(&["B3".to_string(), "B2".to_string()]).unwrap();
        assert_eq!(selected.band_names(), vec!["B3", "B2"]);
        assert!(matches!(
            raster.select(&["B11".to_string()]),
            Err(RasterError::MissingBand(_))
        ));
    }

    #[test]
    fn test_mask_where_and_valid_pixels() {
        let raster = Raster::single(grid_2x2(), "v", vec![Some(1.0), None, Some(3.0), Some(4.0)]).unwrap();
        let masked = raster.mask_where(|i| i != 2);
        assert_eq!(masked.valid_pixels(), vec![0, 3]);
    }
}
