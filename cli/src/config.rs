use std::path::PathBuf;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing::{info, warn};

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_MEALDB_URL: &str = "https://www.themealdb.com/api/json/v1/1";

pub struct Config {
    /// Store connection string: the SQLite database path.
    pub db_path: PathBuf,
    pub port: u16,
    /// Base URL of the mealbook backend used by client commands.
    pub api_url: String,
    pub mealdb_url: String,
}

impl Config {
    /// Environment first, then platform defaults.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok(), default_db_path)
    }

    fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        default_db: impl FnOnce() -> Result<PathBuf>,
    ) -> Result<Self> {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let db_path = match var("MEALBOOK_DB") {
            Some(path) => PathBuf::from(path),
            None => default_db()?,
        };

        let port = match var("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Invalid PORT value '{raw}': {e}, using default {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let api_url = var("MEALBOOK_API_URL")
            .unwrap_or_else(|| format!("http://127.0.0.1:{port}"))
            .trim_end_matches('/')
            .to_string();

        let mealdb_url = var("MEALDB_URL")
            .unwrap_or_else(|| DEFAULT_MEALDB_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        info!(db = %db_path.display(), port, api_url = %api_url, mealdb_url = %mealdb_url, "configuration loaded");

        Ok(Config {
            db_path,
            port,
            api_url,
            mealdb_url,
        })
    }
}

fn default_db_path() -> Result<PathBuf> {
    let proj_dirs =
        ProjectDirs::from("", "", "mealbook").context("Could not determine home directory")?;

    let data_dir = proj_dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

    Ok(data_dir.join("mealbook.db"))
}
