/// Raster → RGBA → PNG data URL, for local platform layers.
///
/// Three-band images get a linear min/max stretch per channel; single-band
/// images are coloured along the palette ramp. Masked pixels are fully
/// transparent so overlays only draw where there is data.

use crate::engine::{EngineError, VisParams};
use crate::raster::Raster;
use base64::Engine as _;
use image::{ImageOutputFormat, Rgba, RgbaImage};
use std::io::Cursor;

type Rgb = [u8; 3];

/// Colours `raster` according to `vis`.
pub fn colorize(raster: &Raster, vis: &VisParams) -> Result<RgbaImage, EngineError> {
    let raster = if vis.bands.is_empty() { raster.clone() } else { raster.select(&vis.bands)? };
    let grid = *raster.grid();
    let bands = raster.bands();

    let width = u32::try_from(grid.width).map_err(|_| EngineError::Render("raster too wide".into()))?;
    let height = u32::try_from(grid.height).map_err(|_| EngineError::Render("raster too tall".into()))?;

    let palette = vis
        .palette
        .iter()
        .map(|c| parse_hex_color(c))
        .collect::<Result<Vec<_>, _>>()?;

    let mut img = RgbaImage::new(width, height);
    for (i, pixel) in img.pixels_mut().enumerate() {
        *pixel = match bands {
            [r, g, b] => match (r.data[i], g.data[i], b.data[i]) {
                (Some(r), Some(g), Some(b)) => {
                    Rgba([stretch(r, vis), stretch(g, vis), stretch(b, vis), 255])
                }
                _ => Rgba([0, 0, 0, 0]),
            },
            [band, ..] => match band.data[i] {
                Some(v) => {
                    let [r, g, b] = ramp(&palette, normalize(v, vis));
                    Rgba([r, g, b, 255])
                }
                None => Rgba([0, 0, 0, 0]),
            },
            [] => Rgba([0, 0, 0, 0]),
        };
    }
    Ok(img)
}

/// Encodes an image as a `data:image/png;base64,...` URL.
pub fn to_data_url(img: &RgbaImage) -> Result<String, EngineError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| EngineError::Render(format!("PNG encoding failed: {}", e)))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(buffer.into_inner());
    Ok(format!("data:image/png;base64,{}", encoded))
}

fn normalize(v: f64, vis: &VisParams) -> f64 {
    let span = vis.max - vis.min;
    if span <= 0.0 {
        return 1.0;
    }
    ((v - vis.min) / span).clamp(0.0, 1.0)
}

fn stretch(v: f64, vis: &VisParams) -> u8 {
    (normalize(v, vis) * 255.0).round() as u8
}

/// Linear interpolation along the palette; grayscale without one.
fn ramp(palette: &[Rgb], t: f64) -> Rgb {
    match palette {
        [] => {
            let g = (t * 255.0).round() as u8;
            [g, g, g]
        }
        [only] => *only,
        _ => {
            let scaled = t * (palette.len() - 1) as f64;
            let lo = (scaled.floor() as usize).min(palette.len() - 2);
            let frac = scaled - lo as f64;
            let (a, b) = (palette[lo], palette[lo + 1]);
            let mix = |x: u8, y: u8| (x as f64 + (y as f64 - x as f64) * frac).round() as u8;
            [mix(a[0], b[0]), mix(a[1], b[1]), mix(a[2], b[2])]
        }
    }
}

/// Parses `#rrggbb` or `rrggbb`.
pub fn parse_hex_color(color: &str) -> Result<Rgb, EngineError> {
    let hex = color.trim_start_matches('#');
    let channel = |i: usize| {
        hex.get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(|| EngineError::Render(format!("invalid palette colour '{}'", color)))
    };
    if hex.len() != 6 {
        return Err(EngineError::Render(format!("invalid palette colour '{}'", color)));
    }
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::{Band, GridSpec};

    fn grid(width: usize, height: usize) -> GridSpec {
        GridSpec { origin_x: 0.0, origin_y: 1.0, pixel_width: 0.1, pixel_height: -0.1, width, height }
    }

    fn flood_vis() -> VisParams {
        VisParams {
            bands: vec![],
            min: 0.0,
            max: 0.9,
            palette: vec!["#f7fbff".into(), "#1452d9".into()],
        }
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#1452d9").unwrap(), [0x14, 0x52, 0xd9]);
        assert_eq!(parse_hex_color("f7fbff").unwrap(), [0xf7, 0xfb, 0xff]);
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#zzzzzz").is_err());
    }

    #[test]
    fn test_mask_value_one_renders_top_of_ramp() {
        let raster = Raster::single(grid(2, 1), "water_mask", vec![Some(1.0), None]).unwrap();
        let img = colorize(&raster, &flood_vis()).unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgba([0x14, 0x52, 0xd9, 255]), "1.0 clamps to the deep blue end");
        assert_eq!(img.get_pixel(1, 0)[3], 0, "masked pixels are transparent");
    }

    #[test]
    fn test_rgb_stretch_uses_min_max() {
        let bands = ["B4", "B3", "B2"]
            .iter()
            .map(|n| Band { name: n.to_string(), data: vec![Some(0.0), Some(1500.0), Some(9000.0)] })
            .collect();
        let raster = Raster::new(grid(3, 1), bands).unwrap();
        let vis = VisParams {
            bands: vec!["B4".into(), "B3".into(), "B2".into()],
            min: 0.0,
            max: 3000.0,
            palette: vec![],
        };
        let img = colorize(&raster, &vis).unwrap();
        assert_eq!(*img.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(1, 0), Rgba([128, 128, 128, 255]));
        assert_eq!(*img.get_pixel(2, 0), Rgba([255, 255, 255, 255]), "values above max clamp");
    }

    #[test]
    fn test_data_url_is_png() {
        let raster = Raster::single(grid(1, 1), "v", vec![Some(0.5)]).unwrap();
        let url = to_data_url(&colorize(&raster, &flood_vis()).unwrap()).unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"), "PNG signature expected, got {}", &url[..40]);
    }
}
