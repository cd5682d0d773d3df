//! Shared fixtures for integration tests: shapefile bytes, ZIP archives,
//! and synthetic Sentinel-2 scenes.

#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use floodmap_service::engine::local::{LocalCatalog, LocalPlatform, Scene};
use floodmap_service::raster::{Band, GridSpec, Raster};
use std::io::{Cursor, Write};

pub const S2: &str = "COPERNICUS/S2_HARMONIZED";

pub const WGS84_PRJ: &str = r#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

pub const UTM_33N_PRJ: &str = r#"PROJCS["WGS_1984_UTM_Zone_33N",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Transverse_Mercator"],PARAMETER["False_Easting",500000.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",15.0],PARAMETER["Scale_Factor",0.9996],PARAMETER["Latitude_Of_Origin",0.0],UNIT["Meter",1.0]]"#;

// ---------------------------------------------------------------------------
// Shapefile bytes
// ---------------------------------------------------------------------------

const SHAPE_POLYGON: i32 = 5;

/// Closed clockwise ring (shapefile outer ring) around an axis-aligned box.
pub fn box_ring(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<(f64, f64)> {
    vec![(min_x, min_y), (min_x, max_y), (max_x, max_y), (max_x, min_y), (min_x, min_y)]
}

fn bbox(rings: &[Vec<(f64, f64)>]) -> [f64; 4] {
    let points = rings.iter().flatten();
    let min_x = points.clone().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let min_y = points.clone().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let max_x = points.clone().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let max_y = points.map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
    [min_x, min_y, max_x, max_y]
}

fn header(file_length_bytes: usize, bounds: [f64; 4]) -> Vec<u8> {
    let mut out = Vec::with_capacity(100);
    out.extend_from_slice(&9994i32.to_be_bytes());
    out.extend_from_slice(&[0u8; 20]);
    out.extend_from_slice(&((file_length_bytes / 2) as i32).to_be_bytes());
    out.extend_from_slice(&1000i32.to_le_bytes());
    out.extend_from_slice(&SHAPE_POLYGON.to_le_bytes());
    for v in bounds {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out.extend_from_slice(&[0u8; 32]);
    out
}

fn polygon_content(rings: &[Vec<(f64, f64)>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&SHAPE_POLYGON.to_le_bytes());
    for v in bbox(rings) {
        out.extend_from_slice(&v.to_le_bytes());
    }
    let num_points: usize = rings.iter().map(Vec::len).sum();
    out.extend_from_slice(&(rings.len() as i32).to_le_bytes());
    out.extend_from_slice(&(num_points as i32).to_le_bytes());
    let mut start = 0i32;
    for ring in rings {
        out.extend_from_slice(&start.to_le_bytes());
        start += ring.len() as i32;
    }
    for (x, y) in rings.iter().flatten() {
        out.extend_from_slice(&x.to_le_bytes());
        out.extend_from_slice(&y.to_le_bytes());
    }
    out
}

/// `.shp` and `.shx` bytes for polygon records, one record per entry.
pub fn polygon_shapefile(records: &[Vec<Vec<(f64, f64)>>]) -> (Vec<u8>, Vec<u8>) {
    let all_rings: Vec<_> = records.iter().flatten().cloned().collect();
    let bounds = bbox(&all_rings);
    let contents: Vec<Vec<u8>> = records.iter().map(|r| polygon_content(r)).collect();

    let shp_len = 100 + contents.iter().map(|c| 8 + c.len()).sum::<usize>();
    let shx_len = 100 + 8 * contents.len();

    let mut shp = header(shp_len, bounds);
    let mut shx = header(shx_len, bounds);
    for (i, content) in contents.iter().enumerate() {
        shx.extend_from_slice(&((shp.len() / 2) as i32).to_be_bytes());
        shx.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());

        shp.extend_from_slice(&(i as i32 + 1).to_be_bytes());
        shp.extend_from_slice(&((content.len() / 2) as i32).to_be_bytes());
        shp.extend_from_slice(content);
    }
    (shp, shx)
}

// ---------------------------------------------------------------------------
// Archives
// ---------------------------------------------------------------------------

pub fn zip_of(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in files {
        writer.start_file(*name, zip::write::FileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A complete boundary upload: one polygon record per ring, optional `.prj`.
pub fn boundary_zip(rings: &[Vec<(f64, f64)>], prj: Option<&str>) -> Vec<u8> {
    let records: Vec<_> = rings.iter().map(|r| vec![r.clone()]).collect();
    let (shp, shx) = polygon_shapefile(&records);
    let mut files: Vec<(&str, &[u8])> = vec![("aoi/boundary.shp", &shp[..]), ("aoi/boundary.shx", &shx[..])];
    if let Some(prj) = prj {
        files.push(("aoi/boundary.prj", prj.as_bytes()));
    }
    zip_of(&files)
}

// ---------------------------------------------------------------------------
// Scenes
// ---------------------------------------------------------------------------

/// 2x2 grid covering lon 10..11, lat 50..51.
pub fn grid() -> GridSpec {
    GridSpec { origin_x: 10.0, origin_y: 51.0, pixel_width: 0.5, pixel_height: -0.5, width: 2, height: 2 }
}

/// Scene whose water index is exactly `index` per pixel (B3 = 1000 (1 + i),
/// B11 = 1000 (1 - i)); RGB bands are flat.
pub fn index_scene(id: &str, year: i32, month: u32, day: u32, index: [f64; 4]) -> Scene {
    let green = index.iter().map(|i| Some(1000.0 * (1.0 + i))).collect();
    let swir = index.iter().map(|i| Some(1000.0 * (1.0 - i))).collect();
    let flat = |v: f64| vec![Some(v); 4];
    Scene {
        collection: S2.to_string(),
        id: id.to_string(),
        acquired: Utc.with_ymd_and_hms(year, month, day, 9, 30, 0).unwrap(),
        raster: Raster::new(
            grid(),
            vec![
                Band { name: "B2".into(), data: flat(800.0) },
                Band { name: "B3".into(), data: green },
                Band { name: "B4".into(), data: flat(1200.0) },
                Band { name: "B11".into(), data: swir },
            ],
        )
        .unwrap(),
    }
}

pub fn platform(scenes: Vec<Scene>) -> LocalPlatform {
    let mut catalog = LocalCatalog::new();
    for scene in scenes {
        catalog.add_scene(scene).unwrap();
    }
    LocalPlatform::new(catalog)
}

/// Decodes a PNG data URL into RGBA pixels.
pub fn decode_data_url(data_url: &str) -> image::RgbaImage {
    use base64::Engine as _;
    let encoded = data_url.strip_prefix("data:image/png;base64,").expect("PNG data URL");
    let bytes = base64::engine::general_purpose::STANDARD.decode(encoded).unwrap();
    image::load_from_memory(&bytes).unwrap().to_rgba8()
}
