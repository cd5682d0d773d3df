//! End-to-end render passes against the local platform: real shapefile
//! archives in, map views out.

mod common;

use common::*;
use floodmap_service::analysis::flood::flood_extent;
use floodmap_service::analysis::water::mndwi;
use floodmap_service::boundary;
use floodmap_service::config::AppConfig;
use floodmap_service::engine::LayerSource;
use floodmap_service::imagery::query_composite;
use floodmap_service::model::{DateRange, LayerKind, Message, MessageLevel};
use floodmap_service::pipeline::{self, FloodRequest};
use floodmap_service::region::Region;

// pixel: 0 dry→wet, 1 wet→wet, 2 dry→dry, 3 wet→dry
const PRE_INDEX: [f64; 4] = [-0.3, 0.4, -0.2, 0.5];
const POST_INDEX: [f64; 4] = [0.6, 0.5, -0.1, -0.4];

fn range(start: &str, end: &str) -> DateRange {
    DateRange::parse(start, end).unwrap()
}

fn request(archive: Vec<u8>) -> FloodRequest {
    FloodRequest {
        archive,
        pre_event: range("2024-01-23", "2024-01-24"),
        post_event: range("2024-11-23", "2024-11-24"),
    }
}

fn aoi_zip() -> Vec<u8> {
    boundary_zip(&[box_ring(10.0, 50.0, 11.0, 51.0)], Some(WGS84_PRJ))
}

fn two_event_platform() -> floodmap_service::engine::local::LocalPlatform {
    platform(vec![
        index_scene("pre", 2024, 1, 23, PRE_INDEX),
        index_scene("post", 2024, 11, 23, POST_INDEX),
    ])
}

#[test]
fn test_full_pass_produces_ordered_layers_and_legend() {
    let view = pipeline::run(&two_event_platform(), &AppConfig::default(), &request(aoi_zip())).unwrap();

    assert_eq!(view.layer_titles(), vec!["AOI", "Pre-flood RGB", "Post-flood RGB", "Flood Extent"]);
    assert!(view.messages.is_empty(), "unexpected messages: {:?}", view.messages);
    assert_eq!(view.zoom, 9);
    assert!((view.center[0] - 50.5).abs() < 1e-9 && (view.center[1] - 10.5).abs() < 1e-9);

    let legend = view.legend.as_ref().expect("flood layer brings the legend");
    assert_eq!(legend.entries[0].label, "Flooded Areas");
    assert_eq!(legend.entries[0].color, "#1452d9");

    match &view.layer(LayerKind::Aoi).unwrap().source {
        LayerSource::GeoJson { color, .. } => assert_eq!(color, "red"),
        other => panic!("AOI should be a vector outline, got {:?}", other),
    }
}

#[test]
fn test_rendered_flood_layer_matches_new_water_only() {
    let view = pipeline::run(&two_event_platform(), &AppConfig::default(), &request(aoi_zip())).unwrap();

    let LayerSource::Image { data_url, bounds } = &view.layer(LayerKind::FloodExtent).unwrap().source else {
        panic!("local platform renders image overlays");
    };
    assert_eq!(*bounds, [[50.0, 10.0], [51.0, 11.0]]);

    let img = decode_data_url(data_url);
    let opaque: Vec<(u32, u32)> = img
        .enumerate_pixels()
        .filter(|(_, _, p)| p[3] > 0)
        .map(|(x, y, _)| (x, y))
        .collect();
    assert_eq!(opaque, vec![(0, 0)], "only the dry-to-wet pixel is drawn");
}

#[test]
fn test_flood_mask_equals_set_difference() {
    let platform = two_event_platform();
    let config = AppConfig::default();
    let boundary = boundary::load_from_zip(&aoi_zip()).unwrap().to_wgs84().unwrap();
    let region = Region::from_boundary(&boundary).unwrap();

    let pre = query_composite(&platform, &config.imagery, &region, &range("2024-01-23", "2024-01-24"))
        .unwrap()
        .unwrap();
    let post = query_composite(&platform, &config.imagery, &region, &range("2024-11-23", "2024-11-24"))
        .unwrap()
        .unwrap();

    let t = config.analysis.water_threshold;
    let layers = flood_extent(mndwi(&pre.collection, &config.analysis), mndwi(&post.collection, &config.analysis), t);

    let expected: Vec<usize> = (0..4).filter(|&i| POST_INDEX[i] > t && PRE_INDEX[i] < t).collect();
    let flooded = platform.evaluate(&layers.flooded).unwrap().valid_pixels();
    let post_water = platform.evaluate(&layers.flood_water).unwrap().valid_pixels();

    assert_eq!(flooded, expected);
    assert!(flooded.iter().all(|i| post_water.contains(i)), "flood mask must be within post-event water");
    assert!(flooded.iter().all(|&i| PRE_INDEX[i] <= t), "pre-event water never floods");
}

#[test]
fn test_empty_pre_range_warns_and_skips_flood() {
    let platform = platform(vec![index_scene("post", 2024, 11, 23, POST_INDEX)]);
    let view = pipeline::run(&platform, &AppConfig::default(), &request(aoi_zip())).unwrap();

    assert_eq!(view.layer_titles(), vec!["AOI", "Post-flood RGB"]);
    assert!(view.legend.is_none());
    assert_eq!(
        view.messages,
        vec![Message::warning("No Sentinel-2 images found for the selected date range: 2024-01-23 to 2024-01-24")]
    );
}

#[test]
fn test_both_ranges_empty_keeps_aoi() {
    let platform = platform(vec![index_scene("other", 2023, 6, 1, PRE_INDEX)]);
    let view = pipeline::run(&platform, &AppConfig::default(), &request(aoi_zip())).unwrap();

    assert_eq!(view.layer_titles(), vec!["AOI"]);
    assert_eq!(view.messages.len(), 2);
    assert!(view.messages.iter().all(|m| m.level == MessageLevel::Warning));
}

#[test]
fn test_archive_without_shp_reports_error() {
    let (_, shx) = polygon_shapefile(&[vec![box_ring(10.0, 50.0, 11.0, 51.0)]]);
    let archive = zip_of(&[("aoi/boundary.shx", &shx[..]), ("aoi/boundary.prj", WGS84_PRJ.as_bytes())]);

    let view = pipeline::run(&two_event_platform(), &AppConfig::default(), &request(archive)).unwrap();
    assert!(view.layers.is_empty());
    assert_eq!(view.messages, vec![Message::error("Shapefile (.shp) not found in the uploaded ZIP file.")]);
}

#[test]
fn test_boundary_outside_catalog_finds_no_images() {
    let far_away = boundary_zip(&[box_ring(-80.0, 30.0, -79.0, 31.0)], None);
    let view = pipeline::run(&two_event_platform(), &AppConfig::default(), &request(far_away)).unwrap();
    assert_eq!(view.layer_titles(), vec!["AOI"]);
    assert_eq!(view.messages.len(), 2);
}

#[test]
fn test_projected_boundary_is_reprojected() {
    // 20 km box symmetric about the zone's central meridian, with a notch
    // vertex at a northing that lies on 52°N
    let ring = vec![
        (490_000.0, 5_751_038.0),
        (490_000.0, 5_771_038.0),
        (510_000.0, 5_771_038.0),
        (510_000.0, 5_751_038.0),
        (500_000.0, 5_761_038.0),
        (490_000.0, 5_751_038.0),
    ];
    let archive = boundary_zip(&[ring], Some(UTM_33N_PRJ));
    let boundary = boundary::load_from_zip(&archive).unwrap();
    assert!(!boundary.crs().is_geographic());

    let wgs84 = boundary.to_wgs84().unwrap();
    let exterior = wgs84.features()[0].0[0].exterior();
    assert!(
        exterior.coords().any(|c| (c.x - 15.0).abs() < 1e-6 && (c.y - 52.0).abs() < 1e-4),
        "notch vertex should land on 15E 52N: {:?}",
        exterior
    );

    let (_, lon) = wgs84.center().unwrap();
    assert!((lon - 15.0).abs() < 1e-6, "lon {} should be on the central meridian", lon);

    let region = Region::from_boundary(&wgs84).unwrap();
    let bounds = region.bounds();
    assert!(bounds.width() > 0.2 && bounds.width() < 0.4, "20 km is ~0.29° of longitude at 52°N");
}

#[test]
fn test_uppercase_archive_keeps_declared_crs() {
    let (shp, shx) = polygon_shapefile(&[vec![box_ring(490_000.0, 5_750_000.0, 510_000.0, 5_770_000.0)]]);
    let archive = zip_of(&[("AOI.SHP", &shp[..]), ("AOI.SHX", &shx[..]), ("AOI.PRJ", UTM_33N_PRJ.as_bytes())]);

    let boundary = boundary::load_from_zip(&archive).unwrap();
    assert!(!boundary.crs().is_geographic(), "upper-case .PRJ must be read");

    let (lat, lon) = boundary.to_wgs84().unwrap().center().unwrap();
    assert!((lon - 15.0).abs() < 1e-6 && (lat - 52.0).abs() < 0.05, "got ({}, {})", lat, lon);
}

#[test]
fn test_multiple_features_merge_into_one_aoi() {
    let archive = boundary_zip(
        &[box_ring(10.0, 50.0, 10.4, 50.4), box_ring(10.6, 50.6, 11.0, 51.0)],
        Some(WGS84_PRJ),
    );
    let view = pipeline::run(&two_event_platform(), &AppConfig::default(), &request(archive)).unwrap();

    match &view.layer(LayerKind::Aoi).unwrap().source {
        LayerSource::GeoJson { geometry, .. } => match &geometry.value {
            geojson::Value::MultiPolygon(polygons) => assert_eq!(polygons.len(), 2),
            other => panic!("expected MultiPolygon, got {:?}", other),
        },
        other => panic!("AOI should be GeoJSON, got {:?}", other),
    }
}
