/// One render pass: uploaded archive + two date ranges → map view.
///
/// Steps, in order:
/// 1. load the boundary from the archive (missing `.shp` stops the pass
///    with an error message, not an error)
/// 2. reproject to EPSG:4326 and convert to a platform region
/// 3. add the AOI outline
/// 4. query the pre- and post-event composites independently; an empty
///    query adds a warning and skips that branch
/// 5. when both composites exist, derive the water index and flood layers
///
/// Every request re-runs the whole pass; nothing is cached.

use crate::analysis::flood::flood_extent;
use crate::analysis::water::{mask_vis, mndwi};
use crate::boundary::{self, BoundaryError};
use crate::config::AppConfig;
use crate::engine::{EngineError, LayerSource, Platform};
use crate::imagery::{self, Composite};
use crate::model::{DateRange, Message};
use crate::presenter::{self, LayerSet, MapView};
use crate::region::{Region, RegionError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Boundary(#[from] BoundaryError),

    #[error(transparent)]
    Region(#[from] RegionError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Inputs of one render pass.
#[derive(Debug, Clone)]
pub struct FloodRequest {
    /// Raw bytes of the uploaded ZIP archive.
    pub archive: Vec<u8>,
    pub pre_event: DateRange,
    pub post_event: DateRange,
}

/// Warning shown when a date range matches no imagery.
pub fn no_images_message(range: &DateRange) -> Message {
    Message::warning(format!(
        "No Sentinel-2 images found for the selected date range: {} to {}",
        range.start_str(),
        range.end_str()
    ))
}

pub fn run(platform: &dyn Platform, config: &AppConfig, request: &FloodRequest) -> Result<MapView, PipelineError> {
    let mut messages = Vec::new();
    let mut layers = LayerSet::default();

    let boundary = match boundary::load_from_zip(&request.archive) {
        Ok(boundary) => boundary,
        Err(e) if e.is_recoverable() => {
            warn!("render pass stopped: {}", e);
            messages.push(Message::error(e.to_string()));
            return Ok(presenter::present(config, layers, None, messages));
        }
        Err(e) => return Err(e.into()),
    };

    let boundary = boundary.to_wgs84()?;
    let center = boundary.center();
    let region = Region::from_boundary(&boundary)?;

    layers.aoi = Some(LayerSource::GeoJson {
        geometry: region.to_geojson(),
        color: config.map.aoi_color.clone(),
    });

    let pre = query(platform, config, &region, &request.pre_event, &mut messages)?;
    let post = query(platform, config, &region, &request.post_event, &mut messages)?;

    let rgb_vis = imagery::rgb_vis(&config.imagery);
    if let Some(pre) = &pre {
        layers.pre_rgb = Some(platform.render_layer(&pre.visual, &rgb_vis)?);
    }
    if let Some(post) = &post {
        layers.post_rgb = Some(platform.render_layer(&post.visual, &rgb_vis)?);
    }

    if let (Some(pre), Some(post)) = (&pre, &post) {
        let analysis = &config.analysis;
        let flood = flood_extent(
            mndwi(&pre.collection, analysis),
            mndwi(&post.collection, analysis),
            analysis.water_threshold,
        );
        let vis = mask_vis(analysis);

        if config.map.show_permanent_water {
            layers.permanent_water = Some(platform.render_layer(&flood.permanent_water, &vis)?);
        }
        layers.flood = Some(platform.render_layer(&flood.flooded, &vis)?);
    }

    info!(
        pre_scenes = pre.as_ref().map_or(0, |c| c.scene_count),
        post_scenes = post.as_ref().map_or(0, |c| c.scene_count),
        warnings = messages.len(),
        "render pass complete on {}",
        platform.name()
    );
    Ok(presenter::present(config, layers, center, messages))
}

fn query(
    platform: &dyn Platform,
    config: &AppConfig,
    region: &Region,
    range: &DateRange,
    messages: &mut Vec<Message>,
) -> Result<Option<Composite>, EngineError> {
    let composite = imagery::query_composite(platform, &config.imagery, region, range)?;
    if composite.is_none() {
        messages.push(no_images_message(range));
    }
    Ok(composite)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::expr::{CollectionExpr, ImageExpr};
    use crate::engine::VisParams;
    use std::cell::RefCell;
    use std::io::Write;

    /// Platform stub that counts calls and reports a fixed collection size.
    struct CountingPlatform {
        size: usize,
        renders: RefCell<usize>,
    }

    impl Platform for CountingPlatform {
        fn name(&self) -> &str {
            "counting"
        }

        fn collection_size(&self, _: &CollectionExpr) -> Result<usize, EngineError> {
            Ok(self.size)
        }

        fn render_layer(&self, _: &ImageExpr, _: &VisParams) -> Result<LayerSource, EngineError> {
            *self.renders.borrow_mut() += 1;
            Ok(LayerSource::Tiles { url_template: "https://tiles/{z}/{x}/{y}".into() })
        }
    }

    fn request(archive: Vec<u8>) -> FloodRequest {
        FloodRequest {
            archive,
            pre_event: DateRange::parse("2024-01-23", "2024-01-24").unwrap(),
            post_event: DateRange::parse("2024-11-23", "2024-11-24").unwrap(),
        }
    }

    fn zip_without_shp() -> Vec<u8> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            writer.start_file("boundary.dbf", zip::write::FileOptions::default()).unwrap();
            writer.write_all(b"not a shapefile").unwrap();
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn test_missing_shapefile_is_message_not_error() {
        let platform = CountingPlatform { size: 3, renders: RefCell::new(0) };
        let view = run(&platform, &AppConfig::default(), &request(zip_without_shp())).unwrap();

        assert!(view.layers.is_empty(), "no processing after a missing .shp");
        assert_eq!(view.messages, vec![Message::error("Shapefile (.shp) not found in the uploaded ZIP file.")]);
        assert_eq!(*platform.renders.borrow(), 0);
        assert_eq!(view.zoom, 2, "view stays on the world");
    }

    #[test]
    fn test_corrupt_archive_is_error() {
        let platform = CountingPlatform { size: 3, renders: RefCell::new(0) };
        let result = run(&platform, &AppConfig::default(), &request(b"PK\x03\x04garbage".to_vec()));
        assert!(matches!(result, Err(PipelineError::Boundary(_))));
    }

    #[test]
    fn test_no_images_message_text() {
        let range = DateRange::parse("2024-01-23", "2024-01-24").unwrap();
        assert_eq!(
            no_images_message(&range).text,
            "No Sentinel-2 images found for the selected date range: 2024-01-23 to 2024-01-24"
        );
    }
}
