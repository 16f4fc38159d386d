use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "https://api.youaredoinggreat.app";

pub struct Config {
    pub db_path: PathBuf,
    pub base_url: String,
    pub app_token: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "great").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let db_path = data_dir.join("great.db");

        let base_url = std::env::var("GREAT_API_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let app_token = std::env::var("GREAT_APP_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());

        Ok(Config {
            db_path,
            base_url,
            app_token,
        })
    }
}
