/// HTTP endpoint for the flood mapping page and API
///
/// Serves the single-page UI and runs one render pass per API call.
/// Requests are handled one at a time on the calling thread.
///
/// Endpoints:
/// - GET /                 - Map page (HTML)
/// - GET /health           - Service health check
/// - POST /api/flood-map   - ZIP archive as body, dates as query parameters:
///   `?pre_start=YYYY-MM-DD&pre_end=...&post_start=...&post_end=...`

use crate::config::AppConfig;
use crate::engine::Platform;
use crate::model::DateRange;
use crate::pipeline::{self, FloodRequest};
use crate::presenter;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tiny_http::{Header, Method, Response, Server, StatusCode};
use tracing::{error, info, warn};

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// A routed response, before it is handed to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json(status: u16, json: serde_json::Value) -> Self {
        let body = serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string());
        Self { status, content_type: "application/json", body: body.into_bytes() }
    }

    fn html(body: String) -> Self {
        Self { status: 200, content_type: "text/html; charset=utf-8", body: body.into_bytes() }
    }

    fn error(status: u16, message: impl Into<String>) -> Self {
        Self::json(status, serde_json::json!({ "error": message.into() }))
    }

    /// Parsed JSON body; `Value::Null` for non-JSON replies.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Routing
// ---------------------------------------------------------------------------

/// Routes one request. `body` is only read for the API route.
pub fn route(
    config: &AppConfig,
    platform: &dyn Platform,
    method: &Method,
    url: &str,
    body: &mut dyn Read,
) -> Reply {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));

    match (method, path) {
        (Method::Get, "/") | (Method::Get, "/index.html") => Reply::html(presenter::index_page(config)),
        (Method::Get, "/health") => handle_health(platform),
        (Method::Post, "/api/flood-map") => handle_flood_map(config, platform, query, body),
        _ => Reply::json(
            404,
            serde_json::json!({
                "error": "Not found",
                "available_endpoints": ["GET /", "GET /health", "POST /api/flood-map"]
            }),
        ),
    }
}

/// Handle /health endpoint
fn handle_health(platform: &dyn Platform) -> Reply {
    Reply::json(
        200,
        serde_json::json!({
            "status": "ok",
            "service": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "platform": platform.name(),
        }),
    )
}

/// Handle /api/flood-map endpoint
fn handle_flood_map(config: &AppConfig, platform: &dyn Platform, query: &str, body: &mut dyn Read) -> Reply {
    let params = parse_query(query);
    let (pre_event, post_event) = match parse_date_ranges(&params) {
        Ok(ranges) => ranges,
        Err(e) => return Reply::error(400, e),
    };

    let archive = match read_body(body, config.server.max_upload_bytes) {
        Ok(archive) => archive,
        Err(reply) => return reply,
    };

    info!("flood map request: pre {} / post {} ({} bytes)", pre_event, post_event, archive.len());
    let request = FloodRequest { archive, pre_event, post_event };

    match pipeline::run(platform, config, &request) {
        Ok(view) => match serde_json::to_value(&view) {
            Ok(json) => Reply::json(200, json),
            Err(e) => Reply::error(500, format!("failed to serialize map view: {}", e)),
        },
        Err(e) => {
            error!("render pass failed: {}", e);
            Reply::error(500, e.to_string())
        }
    }
}

/// Reads at most `limit` bytes; larger bodies are rejected with 413.
fn read_body(body: &mut dyn Read, limit: usize) -> Result<Vec<u8>, Reply> {
    let mut archive = Vec::new();
    body.take(limit as u64 + 1)
        .read_to_end(&mut archive)
        .map_err(|e| Reply::error(400, format!("failed to read request body: {}", e)))?;

    if archive.len() > limit {
        warn!("rejected upload larger than {} bytes", limit);
        return Err(Reply::error(413, format!("Upload exceeds the {} byte limit", limit)));
    }
    if archive.is_empty() {
        return Err(Reply::error(400, "Request body must contain the zipped shapefile"));
    }
    Ok(archive)
}

/// Decodes `a=1&b=2` into a map; later duplicates win.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
            let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

/// Reads the four date parameters into pre- and post-event ranges.
pub fn parse_date_ranges(params: &HashMap<String, String>) -> Result<(DateRange, DateRange), String> {
    let get = |name: &str| {
        params
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("missing query parameter '{}'", name))
    };
    let range = |start: &str, end: &str| -> Result<DateRange, String> {
        let range = DateRange::parse(get(start)?, get(end)?)
            .map_err(|e| format!("invalid date in '{}'/'{}' (expected YYYY-MM-DD): {}", start, end, e))?;
        if range.is_empty() {
            return Err(format!("'{}' must be before '{}' (end date is exclusive): {}", start, end, range));
        }
        Ok(range)
    };
    Ok((range("pre_start", "pre_end")?, range("post_start", "post_end")?))
}

// ---------------------------------------------------------------------------
// HTTP Server
// ---------------------------------------------------------------------------

/// Start HTTP server on the configured address; runs until the process exits.
pub fn start_endpoint_server(config: &AppConfig, platform: &dyn Platform) -> Result<(), String> {
    let address = format!("{}:{}", config.server.bind, config.server.port);
    let server = Server::http(&address).map_err(|e| format!("Failed to start HTTP server on {}: {}", address, e))?;

    info!("HTTP endpoint listening on http://{}", address);
    info!("  GET /  GET /health  POST /api/flood-map");

    for mut request in server.incoming_requests() {
        let method = request.method().clone();
        let url = request.url().to_string();
        let reply = route(config, platform, &method, &url, request.as_reader());
        info!("{} {} -> {}", method, url.split('?').next().unwrap_or(&url), reply.status);

        if let Err(e) = request.respond(create_response(reply)) {
            warn!("Failed to send response: {}", e);
        }
    }

    Ok(())
}

/// Create HTTP response from a routed reply
fn create_response(reply: Reply) -> Response<Cursor<Vec<u8>>> {
    let mut response = Response::from_data(reply.body).with_status_code(StatusCode::from(reply.status));
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response = response.with_header(header);
    }
    response
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
