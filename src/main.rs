//! Flood Mapping Service - Main Server
//!
//! Serves a map page where a user uploads a zipped boundary shapefile and
//! picks pre- and post-event date ranges; each submission is turned into
//! true-colour composites and a flood extent layer by the configured
//! imagery platform.
//!
//! Usage:
//!   cargo run --release
//!
//! Configuration:
//!   floodmap.toml in the working directory (defaults apply when absent)
//!
//! Environment:
//!   EE_ACCESS_TOKEN - OAuth access token for Earth Engine (name set by
//!                     platform.token_env; may come from a .env file)

use floodmap_service::config::{AppConfig, CONFIG_FILE, PlatformKind};
use floodmap_service::endpoint;
use floodmap_service::engine::Platform;
use floodmap_service::engine::earthengine::EarthEngine;
use floodmap_service::engine::local::{LocalCatalog, LocalPlatform};
use std::error::Error;
use std::process;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() {
    dotenv::dotenv().ok();

    let config = match AppConfig::load(CONFIG_FILE) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            process::exit(1);
        }
    };

    init_logging(&config.logging.level);

    println!("🌊 Flood Mapping Service");
    println!("========================\n");

    let platform = match connect_platform(&config) {
        Ok(platform) => platform,
        Err(e) => {
            error!("Platform initialization failed: {}", e);
            eprintln!("\n❌ Platform initialization failed: {}\n", e);
            process::exit(1);
        }
    };
    println!("✓ Imagery platform ready ({})\n", platform.name());

    if let Err(e) = endpoint::start_endpoint_server(&config, platform.as_ref()) {
        error!("{}", e);
        eprintln!("❌ {}", e);
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(level).with_target(false).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to install log subscriber: {}", e);
    }
}

/// Opens the configured platform. Earth Engine sessions are verified
/// before the server starts accepting requests.
fn connect_platform(config: &AppConfig) -> Result<Box<dyn Platform>, Box<dyn Error>> {
    match config.platform.kind {
        PlatformKind::EarthEngine => {
            info!("Connecting to Earth Engine project {}", config.platform.project);
            let session = EarthEngine::connect(&config.platform)?;
            session.initialize()?;
            Ok(Box::new(session))
        }
        PlatformKind::Local => {
            let catalog = LocalCatalog::load_dir(&config.platform.catalog_dir)?;
            if catalog.is_empty() {
                return Err(format!("no scenes found in {}", config.platform.catalog_dir).into());
            }
            Ok(Box::new(LocalPlatform::new(catalog)))
        }
    }
}
