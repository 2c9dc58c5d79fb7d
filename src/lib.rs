pub mod db;
pub mod engine;
pub mod export;
pub mod settings;
pub mod utils;
pub mod viewer;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use db::Database;
use export::ExportCoordinator;
use settings::SettingsStore;

pub const DATABASE_FILE: &str = "uicapture.sqlite3";
pub const SETTINGS_FILE: &str = "settings.json";

/// Long-lived handles shared by every front end.
pub struct AppState {
    pub db: Database,
    pub settings: SettingsStore,
    pub exports: ExportCoordinator,
}

impl AppState {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DATABASE_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;

        Ok(Self {
            exports: ExportCoordinator::new(db.clone()),
            db,
            settings,
        })
    }
}

/// Default data directory when none is given.
pub fn default_data_dir() -> PathBuf {
    PathBuf::from("uicapture-data")
}

/// Reads `RUST_LOG`, defaulting to info.
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
