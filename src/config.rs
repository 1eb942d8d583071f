use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::loader::ResponseShape;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub listings: ListingsConfig,

    #[serde(default)]
    pub response: ResponseShapeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Page sizes for each kind of listing view. These belong to the views that
/// construct loaders; loaders themselves carry no defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingsConfig {
    #[serde(default = "default_slider_page_size")]
    pub slider: usize,

    #[serde(default = "default_grid_page_size")]
    pub grid: usize,

    #[serde(default = "default_lazy_scroll_page_size")]
    pub lazy_scroll: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseShapeConfig {
    #[serde(default = "default_results_field")]
    pub results_field: String,

    #[serde(default = "default_count_field")]
    pub count_field: String,
}

/// The listing views that construct loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListingKind {
    Slider,
    Grid,
    #[value(alias = "lazy")]
    LazyScroll,
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            info!("No config file found, using defaults");
            let config = Config::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", path);
        let contents = fs::read_to_string(path).context("Failed to read config file")?;
        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
        info!("Config loaded successfully");
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, contents).context("Failed to write config file")?;

        debug!("Config saved to {:?}", path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Failed to get config directory")?;
        Ok(config_dir.join("item-loader").join("config.toml"))
    }
}

impl ListingsConfig {
    pub fn page_size(&self, kind: ListingKind) -> Result<NonZeroUsize> {
        let size = match kind {
            ListingKind::Slider => self.slider,
            ListingKind::Grid => self.grid,
            ListingKind::LazyScroll => self.lazy_scroll,
        };
        NonZeroUsize::new(size).with_context(|| format!("Page size for {:?} must be positive", kind))
    }

    pub fn max_items(&self) -> Option<NonZeroUsize> {
        self.max_items.and_then(NonZeroUsize::new)
    }
}

impl ResponseShapeConfig {
    pub fn shape(&self) -> ResponseShape {
        ResponseShape::new(&self.results_field, &self.count_field)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ListingsConfig {
    fn default() -> Self {
        Self {
            slider: default_slider_page_size(),
            grid: default_grid_page_size(),
            lazy_scroll: default_lazy_scroll_page_size(),
            max_items: None,
        }
    }
}

impl Default for ResponseShapeConfig {
    fn default() -> Self {
        Self {
            results_field: default_results_field(),
            count_field: default_count_field(),
        }
    }
}

// Default value functions
fn default_timeout() -> u64 { 30 }
fn default_user_agent() -> String { format!("item-loader/{}", env!("CARGO_PKG_VERSION")) }
fn default_slider_page_size() -> usize { 12 }
fn default_grid_page_size() -> usize { 24 }
fn default_lazy_scroll_page_size() -> usize { 2 }
fn default_results_field() -> String { "results".to_string() }
fn default_count_field() -> String { "count".to_string() }
