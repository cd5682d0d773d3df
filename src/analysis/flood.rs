/// Flood extent: water after the event that was not water before it.
///
/// ```text
/// permanent_water = pre_index  > t   (selfMasked)
/// flood_water     = post_index > t   (selfMasked)
/// not_permanent   = pre_index  < t   (selfMasked)
/// flooded         = flood_water.updateMask(not_permanent)
/// ```
///
/// `updateMask` only ever removes pixels, so `flooded` is a subset of
/// `flood_water`. A pre-event pixel exactly at `t` is in neither
/// `permanent_water` nor `not_permanent`, and therefore never flooded.
/// Pixels with no pre-event data are masked in `not_permanent` and also
/// excluded.

use super::water::water_mask;
use crate::engine::expr::ImageExpr;

#[derive(Debug, Clone, PartialEq)]
pub struct FloodLayers {
    pub permanent_water: ImageExpr,
    pub flood_water: ImageExpr,
    pub flooded: ImageExpr,
}

/// Pixels that were dry before the event.
pub fn not_permanent_water(pre_index: ImageExpr, threshold: f64) -> ImageExpr {
    pre_index.lt(threshold).self_mask()
}

pub fn flood_extent(pre_index: ImageExpr, post_index: ImageExpr, threshold: f64) -> FloodLayers {
    let permanent_water = water_mask(pre_index.clone(), threshold);
    let flood_water = water_mask(post_index, threshold);
    let flooded = flood_water.clone().update_mask(not_permanent_water(pre_index, threshold));
    FloodLayers { permanent_water, flood_water, flooded }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
