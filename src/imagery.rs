/// Imagery query: date-filtered, AOI-clipped composites.
///
/// For each date range the service needs the clipped collection (for
/// index computation) and its mean composite (for the RGB layer). An
/// empty query is reported as `None` for both.

use crate::config::ImageryConfig;
use crate::engine::expr::{CollectionExpr, ImageExpr};
use crate::engine::{EngineError, Platform, VisParams};
use crate::model::DateRange;
use crate::region::Region;
use tracing::{info, warn};

/// A non-empty, clipped collection and its mean composite.
#[derive(Debug, Clone, PartialEq)]
pub struct Composite {
    pub range: DateRange,
    /// The filtered and clipped collection, before reduction.
    pub collection: CollectionExpr,
    pub scene_count: usize,
    /// Per-pixel mean of the collection.
    pub visual: ImageExpr,
}

/// Builds the filtered collection for `range` without touching the platform.
pub fn build_collection(config: &ImageryConfig, region: &Region, range: &DateRange) -> CollectionExpr {
    CollectionExpr::load(&config.collection)
        .filter_date(*range)
        .filter_bounds(region)
        .clip(region)
}

/// Queries the platform once; `Ok(None)` when no image matches.
pub fn query_composite(
    platform: &dyn Platform,
    config: &ImageryConfig,
    region: &Region,
    range: &DateRange,
) -> Result<Option<Composite>, EngineError> {
    let collection = build_collection(config, region, range);
    let scene_count = platform.collection_size(&collection)?;

    if scene_count == 0 {
        warn!("No {} images for {} on {}", config.collection, range, platform.name());
        return Ok(None);
    }

    info!("{} {} images for {}", scene_count, config.collection, range);
    Ok(Some(Composite {
        range: *range,
        visual: collection.clone().mean(),
        collection,
        scene_count,
    }))
}

/// True-colour visualization of a composite.
pub fn rgb_vis(config: &ImageryConfig) -> VisParams {
    VisParams {
        bands: config.rgb_bands.clone(),
        min: config.rgb_min,
        max: config.rgb_max,
        palette: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::local::{LocalCatalog, LocalPlatform, Scene};
    use crate::raster::{Band, GridSpec, Raster};
    use chrono::{TimeZone, Utc};
    use geo_types::{MultiPolygon, polygon};

    fn region() -> Region {
        Region::from_geometry(MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]))
        .unwrap()
    }

    fn platform() -> LocalPlatform {
        let grid = GridSpec { origin_x: 0.0, origin_y: 1.0, pixel_width: 0.5, pixel_height: -0.5, width: 2, height: 2 };
        let bands = ["B2", "B3", "B4", "B11"]
            .iter()
            .map(|n| Band { name: n.to_string(), data: vec![Some(1000.0); 4] })
            .collect();
        let mut catalog = LocalCatalog::new();
        catalog
            .add_scene(Scene {
                collection: ImageryConfig::default().collection,
                id: "t1".into(),
                acquired: Utc.with_ymd_and_hms(2024, 11, 23, 8, 0, 0).unwrap(),
                raster: Raster::new(grid, bands).unwrap(),
            })
            .unwrap();
        LocalPlatform::new(catalog)
    }

    #[test]
    fn test_empty_range_gives_none() {
        let range = DateRange::parse("2024-01-23", "2024-01-24").unwrap();
        let result = query_composite(&platform(), &ImageryConfig::default(), &region(), &range).unwrap();
        assert!(result.is_none(), "no scene on 2024-01-23 means no composite at all");
    }

    #[test]
    fn test_matching_range_gives_composite() {
        let range = DateRange::parse("2024-11-23", "2024-11-24").unwrap();
        let composite = query_composite(&platform(), &ImageryConfig::default(), &region(), &range)
            .unwrap()
            .expect("one scene should match");
        assert_eq!(composite.scene_count, 1);
        assert_eq!(composite.visual, composite.collection.clone().mean());
    }

    #[test]
    fn test_rgb_vis_uses_configured_bands() {
        let vis = rgb_vis(&ImageryConfig::default());
        assert_eq!(vis.bands, vec!["B4", "B3", "B2"]);
        assert_eq!((vis.min, vis.max), (0.0, 3000.0));
    }
}
