/// Service configuration loader - parses floodmap.toml
///
/// Keeps deployment knobs (bind address, platform project, collection id,
/// water threshold, map styling, default date ranges) out of the code so
/// they can change without recompiling the service. Every section and
/// field has a default; a missing file means an all-default config.

use crate::model::DateRange;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file looked up in the working directory.
pub const CONFIG_FILE: &str = "floodmap.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure for TOML parsing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub platform: PlatformConfig,
    pub imagery: ImageryConfig,
    pub analysis: AnalysisConfig,
    pub map: MapConfig,
    pub defaults: DefaultsConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Largest accepted upload; bigger request bodies get 413.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8501,
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    EarthEngine,
    Local,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    pub kind: PlatformKind,
    /// Cloud project billed for Earth Engine requests.
    pub project: String,
    pub api_base: String,
    /// Environment variable holding the OAuth access token.
    pub token_env: String,
    pub timeout_secs: u64,
    /// Scene JSON directory for the local platform.
    pub catalog_dir: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            kind: PlatformKind::EarthEngine,
            project: "ee-flood-mapping".to_string(),
            api_base: "https://earthengine.googleapis.com".to_string(),
            token_env: "EE_ACCESS_TOKEN".to_string(),
            timeout_secs: 120,
            catalog_dir: "catalog".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ImageryConfig {
    pub collection: String,
    /// True-colour bands, red/green/blue.
    pub rgb_bands: Vec<String>,
    pub rgb_min: f64,
    pub rgb_max: f64,
}

impl Default for ImageryConfig {
    fn default() -> Self {
        Self {
            collection: "COPERNICUS/S2_HARMONIZED".to_string(),
            rgb_bands: vec!["B4".to_string(), "B3".to_string(), "B2".to_string()],
            rgb_min: 0.0,
            rgb_max: 3000.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub green_band: String,
    pub swir_band: String,
    pub index_name: String,
    /// Index values strictly above this are water.
    pub water_threshold: f64,
    pub flood_palette: Vec<String>,
    pub flood_vis_min: f64,
    pub flood_vis_max: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            green_band: "B3".to_string(),
            swir_band: "B11".to_string(),
            index_name: "MNDWI".to_string(),
            water_threshold: 0.01,
            flood_palette: vec!["#f7fbff".to_string(), "#1452d9".to_string()],
            flood_vis_min: 0.0,
            flood_vis_max: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// `[lat, lon]` shown before an AOI is loaded.
    pub default_center: [f64; 2],
    pub default_zoom: u8,
    pub aoi_zoom: u8,
    pub aoi_color: String,
    /// Adds the pre-event water mask as its own layer.
    pub show_permanent_water: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: [0.0, 0.0],
            default_zoom: 2,
            aoi_zoom: 9,
            aoi_color: "red".to_string(),
            show_permanent_water: false,
        }
    }
}

/// Date ranges prefilled in the page's date pickers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub pre_event: DateRange,
    pub post_event: DateRange,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            pre_event: DateRange::new(ymd(2024, 1, 23), ymd(2024, 1, 24)),
            post_event: DateRange::new(ymd(2024, 11, 23), ymd(2024, 11, 24)),
        }
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml(contents: &str, path: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();

        if !path.exists() {
            return Ok(AppConfig::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        Self::from_toml(&contents, &display)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.imagery.rgb_bands.len() != 3 {
            return Err(ConfigError::Invalid(format!(
                "imagery.rgb_bands needs exactly 3 bands, got {}",
                self.imagery.rgb_bands.len()
            )));
        }
        if self.analysis.green_band == self.analysis.swir_band {
            return Err(ConfigError::Invalid(
                "analysis.green_band and analysis.swir_band must differ".to_string(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.analysis.water_threshold) {
            return Err(ConfigError::Invalid(format!(
                "analysis.water_threshold {} is outside the index range [-1, 1]",
                self.analysis.water_threshold
            )));
        }
        if self.platform.kind == PlatformKind::EarthEngine && self.platform.project.trim().is_empty() {
            return Err(ConfigError::Invalid("platform.project must be set".to_string()));
        }
        Ok(())
    }
}
