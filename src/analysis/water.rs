/// Water index and water mask.
///
/// The index is the normalized difference between a green and a
/// shortwave-infrared band, computed per image and then averaged over the
/// collection. Open water reflects green and absorbs SWIR, so it scores
/// high; values lie in [-1, 1].

use crate::config::AnalysisConfig;
use crate::engine::VisParams;
use crate::engine::expr::{CollectionExpr, ImageExpr};

/// Mean index composite of a clipped collection.
pub fn mndwi(collection: &CollectionExpr, config: &AnalysisConfig) -> ImageExpr {
    collection
        .clone()
        .normalized_difference(&config.green_band, &config.swir_band, &config.index_name)
        .mean()
}

/// Pixels with index strictly above `threshold`, as 1; everything else masked.
pub fn water_mask(index: ImageExpr, threshold: f64) -> ImageExpr {
    index.gt(threshold).self_mask()
}

/// Visualization shared by the water and flood masks.
pub fn mask_vis(config: &AnalysisConfig) -> VisParams {
    VisParams {
        bands: Vec::new(),
        min: config.flood_vis_min,
        max: config.flood_vis_max,
        palette: config.flood_palette.clone(),
    }
}
