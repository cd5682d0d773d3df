/// Earth Engine REST API client.
///
/// Handles expression encoding, URL construction and JSON response parsing
/// for the two endpoints the service needs:
///   POST {base}/v1/projects/{project}/value:compute   (collection sizes)
///   POST {base}/v1/projects/{project}/maps            (tile layers)
///
/// Expressions travel as value graphs: a `values` table of nodes plus the
/// key of the `result` node. See `fixtures.rs` for annotated response
/// examples.

use super::expr::{CollectionExpr, Comparison, ImageExpr, ImageOp};
use super::{EngineError, LayerSource, Platform, VisParams};
use crate::config::PlatformConfig;
use crate::region::Region;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{debug, info};

/// Argument name bound inside `Collection.map` bodies.
const MAPPING_VAR: &str = "_MAPPING_VAR_0_0";

// ---------------------------------------------------------------------------
// Serde structures for API responses
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ComputeResponse {
    result: Value,
}

#[derive(Deserialize)]
struct MapResponse {
    name: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ---------------------------------------------------------------------------
// Expression encoding
// ---------------------------------------------------------------------------

/// Accumulates the `values` table of an expression graph.
///
/// Most nodes are inlined into their parent's arguments; only the bodies
/// of mapped functions live in the table, because `functionDefinitionValue`
/// refers to its body by key.
#[derive(Default)]
struct GraphBuilder {
    values: Map<String, Value>,
}

impl GraphBuilder {
    fn register(&mut self, node: Value) -> String {
        let key = self.values.len().to_string();
        self.values.insert(key.clone(), node);
        key
    }

    fn finish(mut self, root: Value) -> Value {
        let result = self.register(root);
        json!({ "result": result, "values": self.values })
    }

    fn collection(&mut self, expr: &CollectionExpr) -> Value {
        match expr {
            CollectionExpr::Load { id } => invoke("ImageCollection.load", [("id", constant(id))]),
            CollectionExpr::FilterDate { source, range } => {
                let date_range = invoke(
                    "DateRange",
                    [
                        ("start", invoke("Date", [("value", constant(range.start_str()))])),
                        ("end", invoke("Date", [("value", constant(range.end_str()))])),
                    ],
                );
                let filter = invoke(
                    "Filter.dateRangeContains",
                    [("leftValue", date_range), ("rightField", constant("system:time_start"))],
                );
                invoke("Collection.filter", [("collection", self.collection(source)), ("filter", filter)])
            }
            CollectionExpr::FilterBounds { source, region } => {
                let filter = invoke(
                    "Filter.intersects",
                    [("leftField", constant(".all")), ("rightValue", geometry(region))],
                );
                invoke("Collection.filter", [("collection", self.collection(source)), ("filter", filter)])
            }
            CollectionExpr::Map { source, op } => {
                let input = json!({ "argumentReference": MAPPING_VAR });
                let body = self.register(image_op(op, input));
                let function = json!({
                    "functionDefinitionValue": {
                        "argumentNames": [MAPPING_VAR],
                        "body": body,
                    }
                });
                invoke("Collection.map", [("collection", self.collection(source)), ("baseAlgorithm", function)])
            }
        }
    }

    fn image(&mut self, expr: &ImageExpr) -> Value {
        match expr {
            ImageExpr::Mean(source) => invoke("reduce.mean", [("collection", self.collection(source))]),
            ImageExpr::Compare { source, op, threshold } => {
                let name = match op {
                    Comparison::Gt => "Image.gt",
                    Comparison::Lt => "Image.lt",
                };
                let rhs = invoke("Image.constant", [("value", constant(threshold))]);
                invoke(name, [("image1", self.image(source)), ("image2", rhs)])
            }
            ImageExpr::SelfMask(source) => invoke("Image.selfMask", [("image", self.image(source))]),
            ImageExpr::UpdateMask { source, mask } => invoke(
                "Image.updateMask",
                [("image", self.image(source)), ("mask", self.image(mask))],
            ),
        }
    }
}

fn invoke<const N: usize>(function: &str, arguments: [(&str, Value); N]) -> Value {
    let arguments = arguments
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect::<Map<_, _>>();
    json!({ "functionInvocationValue": { "functionName": function, "arguments": arguments } })
}

fn constant(value: impl serde::Serialize) -> Value {
    json!({ "constantValue": value })
}

fn geometry(region: &Region) -> Value {
    invoke(
        "GeometryConstructors.MultiPolygon",
        [("coordinates", constant(region.rings())), ("evenOdd", constant(true))],
    )
}

fn image_op(op: &ImageOp, input: Value) -> Value {
    match op {
        ImageOp::Clip(region) => invoke("Image.clip", [("input", input), ("geometry", geometry(region))]),
        ImageOp::NormalizedDifference { bands, name } => {
            let nd = invoke("Image.normalizedDifference", [("input", input), ("bandNames", constant(bands))]);
            invoke("Image.rename", [("input", nd), ("names", constant([name]))])
        }
    }
}

/// Graph computing the number of images in `collection`.
pub fn encode_size(collection: &CollectionExpr) -> Value {
    let mut graph = GraphBuilder::default();
    let root = invoke("Collection.size", [("collection", graph.collection(collection))]);
    graph.finish(root)
}

/// Graph rendering `image` to RGB with the given visualization.
pub fn encode_visualize(image: &ImageExpr, vis: &VisParams) -> Value {
    let mut graph = GraphBuilder::default();
    let input = graph.image(image);

    let mut arguments = Map::new();
    arguments.insert("image".to_string(), input);
    if !vis.bands.is_empty() {
        arguments.insert("bands".to_string(), constant(&vis.bands));
    }
    arguments.insert("min".to_string(), constant([vis.min]));
    arguments.insert("max".to_string(), constant([vis.max]));
    if !vis.palette.is_empty() {
        let palette = vis.palette.iter().map(|c| c.trim_start_matches('#')).collect::<Vec<_>>();
        arguments.insert("palette".to_string(), constant(palette));
    }

    let root = json!({ "functionInvocationValue": { "functionName": "Image.visualize", "arguments": arguments } });
    graph.finish(root)
}

/// Graph evaluating to a constant; used to verify the session.
pub fn encode_constant(value: i64) -> Value {
    GraphBuilder::default().finish(constant(value))
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

pub fn build_compute_url(api_base: &str, project: &str) -> String {
    format!("{}/v1/projects/{}/value:compute", api_base.trim_end_matches('/'), project)
}

pub fn build_maps_url(api_base: &str, project: &str) -> String {
    format!("{}/v1/projects/{}/maps", api_base.trim_end_matches('/'), project)
}

/// XYZ template for a map created by the maps endpoint, e.g.
/// `https://earthengine.googleapis.com/v1/projects/p/maps/abc/tiles/{z}/{x}/{y}`.
pub fn build_tile_template(api_base: &str, map_name: &str) -> String {
    format!("{}/v1/{}/tiles/{{z}}/{{x}}/{{y}}", api_base.trim_end_matches('/'), map_name)
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Extracts the `result` of a `value:compute` call.
pub fn parse_compute_response(body: &str) -> Result<Value, EngineError> {
    let response: ComputeResponse =
        serde_json::from_str(body).map_err(|e| EngineError::Parse(format!("compute response: {}", e)))?;
    Ok(response.result)
}

/// Reads a collection size out of a `value:compute` response.
pub fn parse_size_response(body: &str) -> Result<usize, EngineError> {
    let result = parse_compute_response(body)?;
    result
        .as_u64()
        .map(|n| n as usize)
        .ok_or_else(|| EngineError::Parse(format!("expected a non-negative integer size, got {}", result)))
}

/// Extracts the map resource name from a maps response.
pub fn parse_map_response(body: &str) -> Result<String, EngineError> {
    let response: MapResponse =
        serde_json::from_str(body).map_err(|e| EngineError::Parse(format!("maps response: {}", e)))?;
    if response.name.is_empty() {
        return Err(EngineError::Parse("maps response has an empty name".to_string()));
    }
    Ok(response.name)
}

/// Turns a non-2xx response into an error, using the API's error envelope
/// when the body has one.
pub fn parse_error_response(http_status: u16, body: &str) -> EngineError {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(ErrorResponse { error }) => EngineError::Remote {
            status: match (error.code, error.status) {
                (Some(code), Some(status)) => format!("{} {}", code, status),
                (Some(code), None) => code.to_string(),
                (None, Some(status)) => format!("{} {}", http_status, status),
                (None, None) => http_status.to_string(),
            },
            message: error.message,
        },
        Err(_) => EngineError::Remote {
            status: http_status.to_string(),
            message: body.chars().take(200).collect(),
        },
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// An authenticated Earth Engine session bound to one cloud project.
pub struct EarthEngine {
    client: Client,
    api_base: String,
    project: String,
    token: String,
}

impl EarthEngine {
    /// Reads the access token from the configured environment variable
    /// and builds the HTTP client. Makes no requests.
    pub fn connect(config: &PlatformConfig) -> Result<Self, EngineError> {
        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| EngineError::MissingToken(config.token_env.clone()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| EngineError::Http { url: config.api_base.clone(), source })?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            project: config.project.clone(),
            token: token.trim().to_string(),
        })
    }

    /// Verifies the session by computing a constant.
    pub fn initialize(&self) -> Result<(), EngineError> {
        let url = build_compute_url(&self.api_base, &self.project);
        let body = self.post(&url, &json!({ "expression": encode_constant(1) }))?;
        let result = parse_compute_response(&body)?;
        if result != json!(1) {
            return Err(EngineError::Parse(format!("session check returned {}", result)));
        }
        info!("Earth Engine session initialized for project {}", self.project);
        Ok(())
    }

    fn post(&self, url: &str, payload: &Value) -> Result<String, EngineError> {
        debug!("POST {}", url);
        let http = |source| EngineError::Http { url: url.to_string(), source };

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .header("x-goog-user-project", &self.project)
            .json(payload)
            .send()
            .map_err(http)?;

        let status = response.status();
        let body = response.text().map_err(http)?;
        if !status.is_success() {
            return Err(parse_error_response(status.as_u16(), &body));
        }
        Ok(body)
    }
}

impl Platform for EarthEngine {
    fn name(&self) -> &str {
        "earthengine"
    }

    fn collection_size(&self, collection: &CollectionExpr) -> Result<usize, EngineError> {
        let url = build_compute_url(&self.api_base, &self.project);
        let body = self.post(&url, &json!({ "expression": encode_size(collection) }))?;
        parse_size_response(&body)
    }

    fn render_layer(&self, image: &ImageExpr, vis: &VisParams) -> Result<LayerSource, EngineError> {
        let url = build_maps_url(&self.api_base, &self.project);
        let payload = json!({
            "expression": encode_visualize(image, vis),
            "fileFormat": "AUTO_JPEG_PNG",
        });
        let name = parse_map_response(&self.post(&url, &payload)?)?;
        Ok(LayerSource::Tiles { url_template: build_tile_template(&self.api_base, &name) })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
