use crate::filter::FileFilter;
use crate::mode::ModeOptions;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_DIR_NAME: &str = "Processed_Files";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Extension filter text, e.g. `"*.jpg, *.png"`. Empty accepts all files.
    pub filter: String,
    /// Output folder created inside the source when no output is given.
    pub output_dir_name: String,
    pub scope: String,
    pub strategy: String,
    pub start_number: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mode = ModeOptions::default();
        Self {
            filter: String::new(),
            output_dir_name: DEFAULT_OUTPUT_DIR_NAME.to_string(),
            scope: mode.scope,
            strategy: mode.strategy,
            start_number: mode.start_number,
            log_level: "warn".to_string(),
        }
    }
}

impl AppConfig {
    pub fn file_filter(&self) -> FileFilter {
        FileFilter::parse(&self.filter)
    }

    pub fn default_output_dir(&self, source_dir: &Path) -> PathBuf {
        source_dir.join(&self.output_dir_name)
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "batch-renamer", "batch-renamer")
        .context("cannot determine the OS configuration directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(config, &paths.config_path)
}

fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("cannot parse config file: {}", path.display()))?;
    Ok(config)
}

fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("cannot serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("cannot write config file: {}", path.display()))?;
    Ok(())
}
