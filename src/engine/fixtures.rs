/// Test fixtures: representative JSON payloads from the Earth Engine REST API.
///
/// Trimmed to the fields the parsers read. Shapes:
///
///   value:compute  → { "result": <any JSON value> }
///   maps           → { "name": "projects/{project}/maps/{id}", ... }
///   errors         → { "error": { "code", "message", "status" } }
///
/// `Collection.size` comes back as a bare JSON integer.

/// Three scenes matched the filtered collection.
pub(crate) fn fixture_size_response() -> &'static str {
    r#"{ "result": 3 }"#
}

/// No scenes in the date window.
pub(crate) fn fixture_empty_size_response() -> &'static str {
    r#"{ "result": 0 }"#
}

/// Map created for a visualized image; tiles are served under the name.
pub(crate) fn fixture_map_response() -> &'static str {
    r#"{
      "name": "projects/ee-flood-mapping/maps/2f4a0c7e9b1d3e5f-8a6c4b2d0e9f7a1c",
      "expression": { "result": "0", "values": {} },
      "fileFormat": "AUTO_JPEG_PNG"
    }"#
}

/// Band selector that does not exist in the collection.
pub(crate) fn fixture_error_response() -> &'static str {
    r#"{
      "error": {
        "code": 400,
        "message": "Image.select: Pattern 'B12x' did not match any bands.",
        "status": "INVALID_ARGUMENT"
      }
    }"#
}
