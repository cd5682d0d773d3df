/// Coordinate reference systems for uploaded boundaries.
///
/// Shapefiles carry their CRS as OGC/ESRI WKT in the `.prj` component.
/// This module parses that WKT, recognises the projections boundaries are
/// commonly delivered in, and converts coordinates to geographic
/// longitude/latitude (EPSG:4326) with `proj4rs`.
///
/// Geographic systems on any datum are treated as longitude/latitude
/// already; datum shifts are not applied.

use super::BoundaryError;
use proj4rs::proj::Proj;
use proj4rs::transform::transform;

/// Target of every reprojection: WGS84 longitude/latitude.
const WGS84_LONLAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

const WGS84_A: f64 = 6_378_137.0;
const WGS84_RF: f64 = 298.257_223_563;

// ---------------------------------------------------------------------------
// CRS model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipsoid {
    pub a: f64,
    pub rf: f64,
}

impl Ellipsoid {
    pub fn wgs84() -> Self {
        Self { a: WGS84_A, rf: WGS84_RF }
    }

    fn proj_params(&self) -> String {
        if self.rf == 0.0 {
            // Spheres are written with an inverse flattening of 0 in WKT.
            format!("+a={} +b={}", self.a, self.a)
        } else {
            format!("+a={} +rf={}", self.a, self.rf)
        }
    }
}

/// Projection methods the loader can invert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    TransverseMercator,
    Mercator,
    /// Spherical Web Mercator (ESRI "auxiliary sphere", EPSG:3857).
    PseudoMercator,
    LambertConformalConic,
    AlbersEqualArea,
}

/// Projection parameters in degrees (angles) and metres (offsets).
#[derive(Debug, Clone, PartialEq)]
pub struct ProjParams {
    pub lat_0: f64,
    pub lon_0: f64,
    pub lat_1: Option<f64>,
    pub lat_2: Option<f64>,
    pub scale: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Default for ProjParams {
    fn default() -> Self {
        Self {
            lat_0: 0.0,
            lon_0: 0.0,
            lat_1: None,
            lat_2: None,
            scale: 1.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Crs {
    /// Longitude/latitude in degrees.
    Geographic { name: String },
    Projected {
        name: String,
        method: Method,
        ellipsoid: Ellipsoid,
        params: ProjParams,
        /// Metres per linear unit of the stored coordinates.
        unit_to_meter: f64,
    },
}

impl Crs {
    /// EPSG:4326, also assumed when a boundary has no `.prj`.
    pub fn wgs84() -> Self {
        Crs::Geographic { name: "GCS_WGS_1984".to_string() }
    }

    pub fn is_geographic(&self) -> bool {
        matches!(self, Crs::Geographic { .. })
    }

    pub fn name(&self) -> &str {
        match self {
            Crs::Geographic { name } | Crs::Projected { name, .. } => name,
        }
    }

    /// Parses the contents of a `.prj` file.
    pub fn from_wkt(wkt: &str) -> Result<Self, BoundaryError> {
        let root = parse_wkt(wkt)?;
        match root.keyword.as_str() {
            "GEOGCS" | "GEOGCRS" | "GEODCRS" => Ok(Crs::Geographic {
                name: root.name().unwrap_or("unnamed").to_string(),
            }),
            "PROJCS" => projected_from_wkt1(&root),
            other => Err(BoundaryError::Projection(format!(
                "unsupported coordinate system type {}",
                other
            ))),
        }
    }

    /// proj4 definition of this CRS, in metres. `None` for geographic.
    pub fn proj_string(&self) -> Option<String> {
        let Crs::Projected { method, ellipsoid, params, .. } = self else {
            return None;
        };

        let offsets = format!("+x_0={} +y_0={}", params.false_easting, params.false_northing);
        let def = match method {
            Method::TransverseMercator => format!(
                "+proj=tmerc +lat_0={} +lon_0={} +k={} {} {}",
                params.lat_0, params.lon_0, params.scale, offsets, ellipsoid.proj_params()
            ),
            Method::Mercator => match params.lat_1 {
                Some(lat_ts) => format!(
                    "+proj=merc +lat_ts={} +lon_0={} {} {}",
                    lat_ts, params.lon_0, offsets, ellipsoid.proj_params()
                ),
                None => format!(
                    "+proj=merc +lon_0={} +k={} {} {}",
                    params.lon_0, params.scale, offsets, ellipsoid.proj_params()
                ),
            },
            Method::PseudoMercator => format!(
                "+proj=merc +lon_0={} {} +a={} +b={}",
                params.lon_0, offsets, WGS84_A, WGS84_A
            ),
            Method::LambertConformalConic => {
                let lat_1 = params.lat_1.unwrap_or(params.lat_0);
                format!(
                    "+proj=lcc +lat_1={} +lat_2={} +lat_0={} +lon_0={} +k={} {} {}",
                    lat_1,
                    params.lat_2.unwrap_or(lat_1),
                    params.lat_0,
                    params.lon_0,
                    params.scale,
                    offsets,
                    ellipsoid.proj_params()
                )
            }
            Method::AlbersEqualArea => format!(
                "+proj=aea +lat_1={} +lat_2={} +lat_0={} +lon_0={} {} {}",
                params.lat_1.unwrap_or(params.lat_0),
                params.lat_2.unwrap_or(params.lat_0),
                params.lat_0,
                params.lon_0,
                offsets,
                ellipsoid.proj_params()
            ),
        };
        Some(format!("{} +units=m +no_defs", def))
    }
}

// ---------------------------------------------------------------------------
// Reprojection
// ---------------------------------------------------------------------------

/// Converts projected coordinates to WGS84 longitude/latitude degrees.
pub struct Reprojector {
    source: Proj,
    target: Proj,
    unit_to_meter: f64,
}

impl std::fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reprojector")
            .field("unit_to_meter", &self.unit_to_meter)
            .finish_non_exhaustive()
    }
}

impl Reprojector {
    /// Builds a transformer for `crs`, or `None` when no transform is
    /// needed (geographic input).
    pub fn for_crs(crs: &Crs) -> Result<Option<Self>, BoundaryError> {
        let (Some(def), Crs::Projected { unit_to_meter, .. }) = (crs.proj_string(), crs) else {
            return Ok(None);
        };

        let source = Proj::from_proj_string(&def)
            .map_err(|e| BoundaryError::Projection(format!("invalid projection '{}': {:?}", def, e)))?;
        let target = Proj::from_proj_string(WGS84_LONLAT)
            .map_err(|e| BoundaryError::Projection(format!("invalid target projection: {:?}", e)))?;

        Ok(Some(Self { source, target, unit_to_meter: *unit_to_meter }))
    }

    /// Transforms one coordinate to `(lon, lat)` in degrees.
    pub fn to_lonlat(&self, x: f64, y: f64) -> Result<(f64, f64), BoundaryError> {
        let mut point = (x * self.unit_to_meter, y * self.unit_to_meter, 0.0);
        transform(&self.source, &self.target, &mut point)
            .map_err(|e| BoundaryError::Projection(format!("transform of ({}, {}) failed: {:?}", x, y, e)))?;
        Ok((point.0.to_degrees(), point.1.to_degrees()))
    }
}

// ---------------------------------------------------------------------------
// WKT1 interpretation
// ---------------------------------------------------------------------------

fn projected_from_wkt1(root: &WktNode) -> Result<Crs, BoundaryError> {
    let name = root.name().unwrap_or("unnamed").to_string();

    let projection = root
        .child("PROJECTION")
        .and_then(|p| p.name())
        .ok_or_else(|| BoundaryError::Wkt("PROJCS without PROJECTION".to_string()))?;

    let method = method_for(projection, &name).ok_or_else(|| {
        BoundaryError::Projection(format!("unsupported projection method {}", projection))
    })?;

    let ellipsoid = root
        .find("SPHEROID")
        .or_else(|| root.find("ELLIPSOID"))
        .and_then(|s| Some(Ellipsoid { a: s.number(0)?, rf: s.number(1)? }))
        .unwrap_or_else(Ellipsoid::wgs84);

    // The PROJCS-level UNIT is the linear unit; the GEOGCS one is angular.
    let unit_to_meter = root
        .children("UNIT")
        .last()
        .and_then(|u| u.number(0))
        .unwrap_or(1.0);

    let mut params = ProjParams::default();
    for param in root.children("PARAMETER") {
        let (Some(key), Some(value)) = (param.name(), param.number(0)) else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "latitude_of_origin" | "latitude_of_center" | "latitude of natural origin" => {
                params.lat_0 = value
            }
            "central_meridian" | "longitude_of_center" | "longitude_of_origin" => params.lon_0 = value,
            "standard_parallel_1" => params.lat_1 = Some(value),
            "standard_parallel_2" => params.lat_2 = Some(value),
            "scale_factor" => params.scale = value,
            "false_easting" => params.false_easting = value * unit_to_meter,
            "false_northing" => params.false_northing = value * unit_to_meter,
            _ => {}
        }
    }

    Ok(Crs::Projected { name, method, ellipsoid, params, unit_to_meter })
}

fn method_for(projection: &str, crs_name: &str) -> Option<Method> {
    let p = projection.to_ascii_lowercase();
    let n = crs_name.to_ascii_lowercase();
    if p.contains("transverse_mercator") || p == "gauss_kruger" {
        Some(Method::TransverseMercator)
    } else if p.contains("auxiliary_sphere") || p.contains("pseudo_mercator") || n.contains("pseudo-mercator") {
        Some(Method::PseudoMercator)
    } else if p.starts_with("mercator") {
        Some(Method::Mercator)
    } else if p.starts_with("lambert_conformal_conic") {
        Some(Method::LambertConformalConic)
    } else if p.starts_with("albers") {
        Some(Method::AlbersEqualArea)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// WKT tokenizer / parser
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum WktValue {
    Node(WktNode),
    Text(String),
    Number(f64),
}

#[derive(Debug, Clone, PartialEq)]
struct WktNode {
    keyword: String,
    args: Vec<WktValue>,
}

impl WktNode {
    /// First quoted string argument.
    fn name(&self) -> Option<&str> {
        self.args.iter().find_map(|a| match a {
            WktValue::Text(s) => Some(s.as_str()),
            _ => None,
        })
    }

    /// The n-th numeric argument.
    fn number(&self, n: usize) -> Option<f64> {
        self.args
            .iter()
            .filter_map(|a| match a {
                WktValue::Number(v) => Some(*v),
                _ => None,
            })
            .nth(n)
    }

    fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a WktNode> + 'a {
        self.args.iter().filter_map(move |a| match a {
            WktValue::Node(n) if n.keyword == keyword => Some(n),
            _ => None,
        })
    }

    fn child<'a>(&'a self, keyword: &'a str) -> Option<&'a WktNode> {
        self.children(keyword).next()
    }

    /// Depth-first search for a node anywhere below this one.
    fn find(&self, keyword: &str) -> Option<&WktNode> {
        for arg in &self.args {
            if let WktValue::Node(n) = arg {
                if n.keyword == keyword {
                    return Some(n);
                }
                if let Some(found) = n.find(keyword) {
                    return Some(found);
                }
            }
        }
        None
    }
}

struct WktParser<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
}

fn parse_wkt(input: &str) -> Result<WktNode, BoundaryError> {
    let mut parser = WktParser { chars: input.chars().peekable() };
    let node = parser.node()?;
    parser.skip_ws();
    if parser.chars.peek().is_some() {
        return Err(BoundaryError::Wkt("trailing characters after root node".to_string()));
    }
    Ok(node)
}

impl WktParser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn word(&mut self) -> String {
        let mut word = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                word.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        word
    }

    /// Consumes an opening bracket; WKT allows `[` or `(`.
    fn open(&mut self) -> bool {
        if matches!(self.chars.peek(), Some('[') | Some('(')) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn node(&mut self) -> Result<WktNode, BoundaryError> {
        self.skip_ws();
        let keyword = self.word();
        if keyword.is_empty() {
            return Err(BoundaryError::Wkt("expected keyword".to_string()));
        }
        self.skip_ws();
        if !self.open() {
            return Err(BoundaryError::Wkt(format!("expected '[' after {}", keyword)));
        }
        self.body(keyword)
    }

    fn body(&mut self, keyword: String) -> Result<WktNode, BoundaryError> {
        let keyword = keyword.to_ascii_uppercase();
        let mut args = Vec::new();
        loop {
            self.skip_ws();
            match self.chars.peek() {
                Some(']') | Some(')') => {
                    self.chars.next();
                    break;
                }
                Some(',') => {
                    self.chars.next();
                }
                Some('"') => {
                    self.chars.next();
                    args.push(WktValue::Text(self.quoted()?));
                }
                Some(c) if *c == '-' || *c == '+' || *c == '.' || c.is_ascii_digit() => {
                    args.push(WktValue::Number(self.number()?));
                }
                Some(c) if c.is_ascii_alphabetic() => {
                    let word = self.word();
                    self.skip_ws();
                    if self.open() {
                        args.push(WktValue::Node(self.body(word)?));
                    } else {
                        // Enumerated values such as AXIS["Easting",EAST].
                        args.push(WktValue::Text(word));
                    }
                }
                Some(c) => return Err(BoundaryError::Wkt(format!("unexpected character '{}'", c))),
                None => return Err(BoundaryError::Wkt(format!("unterminated {} node", keyword))),
            }
        }
        Ok(WktNode { keyword, args })
    }

    fn quoted(&mut self) -> Result<String, BoundaryError> {
        let mut out = String::new();
        while let Some(c) = self.chars.next() {
            if c == '"' {
                // WKT escapes a quote by doubling it.
                if self.chars.peek() == Some(&'"') {
                    self.chars.next();
                    out.push('"');
                    continue;
                }
                return Ok(out);
            }
            out.push(c);
        }
        Err(BoundaryError::Wkt("unterminated string".to_string()))
    }

    fn number(&mut self) -> Result<f64, BoundaryError> {
        let mut text = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E') {
                text.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        text.parse()
            .map_err(|_| BoundaryError::Wkt(format!("invalid number '{}'", text)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
