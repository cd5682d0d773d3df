/// Map presenter: assembles the layers of a render pass into the view the
/// browser draws, and serves the single page that draws it.
///
/// Layer order is fixed (AOI, Pre-flood RGB, Post-flood RGB, optional
/// Permanent Water, Flood Extent) regardless of which layers a run
/// produced. The legend only appears together with the flood layer.

use crate::config::AppConfig;
use crate::engine::LayerSource;
use crate::model::{LayerKind, Message};
use serde::Serialize;

/// Legend colour used when no flood palette is configured.
pub const FLOODED_COLOR: &str = "#1452d9";

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Layers produced by one render pass; `None` means "not produced".
#[derive(Debug, Clone, Default)]
pub struct LayerSet {
    pub aoi: Option<LayerSource>,
    pub pre_rgb: Option<LayerSource>,
    pub post_rgb: Option<LayerSource>,
    pub permanent_water: Option<LayerSource>,
    pub flood: Option<LayerSource>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapLayer {
    pub kind: LayerKind,
    pub title: String,
    pub source: LayerSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

/// Everything the page needs to redraw the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    /// `[lat, lon]`
    pub center: [f64; 2],
    pub zoom: u8,
    pub layers: Vec<MapLayer>,
    pub legend: Option<Legend>,
    pub messages: Vec<Message>,
}

impl MapView {
    /// World view with no layers, shown before an AOI is loaded.
    pub fn initial(config: &AppConfig) -> Self {
        Self {
            center: config.map.default_center,
            zoom: config.map.default_zoom,
            layers: Vec::new(),
            legend: None,
            messages: Vec::new(),
        }
    }

    pub fn layer(&self, kind: LayerKind) -> Option<&MapLayer> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    pub fn layer_titles(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.title.as_str()).collect()
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Builds the view for a completed render pass.
///
/// `center` is the AOI center as `(lat, lon)`; without one the world view
/// is kept.
pub fn present(config: &AppConfig, layers: LayerSet, center: Option<(f64, f64)>, messages: Vec<Message>) -> MapView {
    let mut view = MapView::initial(config);
    if let Some((lat, lon)) = center {
        view.center = [lat, lon];
        view.zoom = config.map.aoi_zoom;
    }

    let permanent_water = layers.permanent_water.filter(|_| config.map.show_permanent_water);
    let ordered = [
        (LayerKind::Aoi, layers.aoi),
        (LayerKind::PreFloodRgb, layers.pre_rgb),
        (LayerKind::PostFloodRgb, layers.post_rgb),
        (LayerKind::PermanentWater, permanent_water),
        (LayerKind::FloodExtent, layers.flood),
    ];

    view.layers = ordered
        .into_iter()
        .filter_map(|(kind, source)| {
            source.map(|source| MapLayer { kind, title: kind.title().to_string(), source })
        })
        .collect();

    if view.layer(LayerKind::FloodExtent).is_some() {
        view.legend = Some(flood_legend(config));
    }

    view.messages = messages;
    view
}

fn flood_legend(config: &AppConfig) -> Legend {
    let color = config
        .analysis
        .flood_palette
        .last()
        .cloned()
        .unwrap_or_else(|| FLOODED_COLOR.to_string());
    Legend {
        title: LayerKind::FloodExtent.title().to_string(),
        entries: vec![LegendEntry { label: "Flooded Areas".to_string(), color }],
    }
}

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// The single-page UI, with date pickers prefilled from config.
pub fn index_page(config: &AppConfig) -> String {
    let defaults = &config.defaults;
    let [lat, lon] = config.map.default_center;
    PAGE_TEMPLATE
        .replace("@PRE_START@", &defaults.pre_event.start_str())
        .replace("@PRE_END@", &defaults.pre_event.end_str())
        .replace("@POST_START@", &defaults.post_event.start_str())
        .replace("@POST_END@", &defaults.post_event.end_str())
        .replace("@CENTER_LAT@", &lat.to_string())
        .replace("@CENTER_LON@", &lon.to_string())
        .replace("@ZOOM@", &config.map.default_zoom.to_string())
}

const PAGE_TEMPLATE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Flood Mapping</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>
<style>
  body { margin: 0; font-family: sans-serif; display: flex; height: 100vh; }
  #sidebar { width: 300px; padding: 16px; box-sizing: border-box; overflow-y: auto; background: #f4f6f8; }
  #sidebar h1 { font-size: 1.3em; margin-top: 0; }
  #sidebar fieldset { margin-bottom: 12px; }
  #sidebar label { display: block; margin: 4px 0; }
  #sidebar .hint { font-size: 12px; color: #555; margin: 2px 0 8px; }
  #map { flex: 1; }
  #messages div { padding: 8px; margin-bottom: 8px; border-radius: 4px; }
  #messages .error { background: #fde2e1; color: #8a1c14; }
  #messages .warning { background: #fff4d6; color: #7a5600; }
  .legend { background: white; padding: 8px 10px; border-radius: 4px; box-shadow: 0 0 6px rgba(0,0,0,0.3); }
  .legend i { display: inline-block; width: 14px; height: 14px; margin-right: 6px; vertical-align: middle; }
</style>
</head>
<body>
<div id="sidebar">
  <h1>Flood Mapping</h1>
  <form id="form">
    <label>Boundary shapefile (.zip)
      <input type="file" id="archive" accept=".zip" required>
    </label>
    <p class="hint">Upload a ZIP containing the shapefile components: .shp, .shx, .prj, .dbf, .cpg</p>
    <fieldset>
      <legend>Pre-event</legend>
      <label>Start <input type="date" id="pre_start" value="@PRE_START@" required></label>
      <label>End <input type="date" id="pre_end" value="@PRE_END@" required></label>
    </fieldset>
    <fieldset>
      <legend>Post-event</legend>
      <label>Start <input type="date" id="post_start" value="@POST_START@" required></label>
      <label>End <input type="date" id="post_end" value="@POST_END@" required></label>
    </fieldset>
    <button type="submit" id="submit">Generate map</button>
  </form>
  <p id="status"></p>
  <div id="messages"></div>
</div>
<div id="map"></div>
<script>
  const map = L.map('map').setView([@CENTER_LAT@, @CENTER_LON@], @ZOOM@);
  const base = L.tileLayer('https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png', {
    attribution: '&copy; OpenStreetMap contributors', maxZoom: 19
  }).addTo(map);
  let control = L.control.layers({ 'OpenStreetMap': base }, {}, { collapsed: false }).addTo(map);
  let overlays = [];
  let legend = null;

  function toLeaflet(source) {
    switch (source.type) {
      case 'tiles': return L.tileLayer(source.url_template, { maxZoom: 19 });
      case 'image': return L.imageOverlay(source.data_url, source.bounds);
      case 'geo_json': return L.geoJSON(source.geometry, { style: { color: source.color, fill: false, weight: 2 } });
      default: return null;
    }
  }

  function showMessages(messages) {
    const box = document.getElementById('messages');
    box.innerHTML = '';
    for (const m of messages) {
      const div = document.createElement('div');
      div.className = m.level;
      div.textContent = m.text;
      box.appendChild(div);
    }
  }

  function render(view) {
    overlays.forEach(layer => { map.removeLayer(layer); control.removeLayer(layer); });
    overlays = [];
    if (legend) { map.removeControl(legend); legend = null; }

    for (const layer of view.layers) {
      const leaflet = toLeaflet(layer.source);
      if (!leaflet) continue;
      leaflet.addTo(map);
      control.addOverlay(leaflet, layer.title);
      overlays.push(leaflet);
    }

    if (view.legend) {
      legend = L.control({ position: 'bottomright' });
      legend.onAdd = () => {
        const div = L.DomUtil.create('div', 'legend');
        const title = document.createElement('strong');
        title.textContent = view.legend.title;
        div.appendChild(title);
        for (const entry of view.legend.entries) {
          const row = document.createElement('div');
          const swatch = document.createElement('i');
          swatch.style.background = entry.color;
          row.appendChild(swatch);
          row.appendChild(document.createTextNode(entry.label));
          div.appendChild(row);
        }
        return div;
      };
      legend.addTo(map);
    }

    map.setView(view.center, view.zoom);
    showMessages(view.messages);
  }

  document.getElementById('form').addEventListener('submit', async (event) => {
    event.preventDefault();
    const file = document.getElementById('archive').files[0];
    if (!file) return;

    const params = new URLSearchParams();
    for (const id of ['pre_start', 'pre_end', 'post_start', 'post_end']) {
      params.set(id, document.getElementById(id).value);
    }

    const status = document.getElementById('status');
    const button = document.getElementById('submit');
    status.textContent = 'Processing...';
    button.disabled = true;
    try {
      const response = await fetch('/api/flood-map?' + params.toString(), {
        method: 'POST',
        headers: { 'Content-Type': 'application/zip' },
        body: file
      });
      const body = await response.json();
      if (!response.ok) {
        showMessages([{ level: 'error', text: body.error || ('Request failed: ' + response.status) }]);
      } else {
        render(body);
      }
    } catch (err) {
      showMessages([{ level: 'error', text: String(err) }]);
    } finally {
      status.textContent = '';
      button.disabled = false;
    }
  });
</script>
</body>
</html>
"##;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
