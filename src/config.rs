//! Site configuration module.
//!
//! Handles loading, validating, and merging `folio.toml`. Stock defaults are
//! the base layer and the user's file overrides them key by key.
//!
//! ## Config File Location
//!
//! ```text
//! site/
//! ├── folio.toml      # Optional, overrides stock defaults
//! ├── folio.json      # Data file (categories, articles, photos)
//! └── media/          # Uploaded originals and derivatives
//!     ├── articles/
//!     └── gallery/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! media_root = "media"       # Directory holding stored files
//! media_url = "/media/"      # Public URL prefix for stored files
//! data_file = "folio.json"   # Snapshot of all rows
//!
//! [articles]
//! thumbnail_width = 600
//! upload_dir = "articles"
//! allowed_extensions = ["png", "jpg", "jpeg", "webp"]
//! per_page = 5
//!
//! [gallery]
//! compressed_width = 700
//! upload_dir = "gallery"
//! allowed_extensions = ["png", "jpg", "jpeg"]
//! per_page = 9
//!
//! [derivatives]
//! format = "webp"            # "webp" (lossless) or "avif"
//! quality = 100              # 1-100, used by AVIF
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{DerivativeFormat, DerivativeSpec, Quality, supported_input_extensions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the site root.
pub const CONFIG_FILE: &str = "folio.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `folio.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Directory holding stored media, relative to the site root.
    pub media_root: String,
    /// URL prefix under which stored media is served.
    pub media_url: String,
    /// JSON snapshot of all rows, relative to the site root.
    pub data_file: String,
    pub articles: ArticlesConfig,
    pub gallery: GalleryConfig,
    pub derivatives: DerivativesConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            media_root: "media".to_string(),
            media_url: "/media/".to_string(),
            data_file: "folio.json".to_string(),
            articles: ArticlesConfig::default(),
            gallery: GalleryConfig::default(),
            derivatives: DerivativesConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.articles.thumbnail_width == 0 {
            return Err(ConfigError::Validation(
                "articles.thumbnail_width must be non-zero".into(),
            ));
        }
        if self.gallery.compressed_width == 0 {
            return Err(ConfigError::Validation(
                "gallery.compressed_width must be non-zero".into(),
            ));
        }
        if self.articles.per_page == 0 || self.gallery.per_page == 0 {
            return Err(ConfigError::Validation(
                "per_page values must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.derivatives.quality) {
            return Err(ConfigError::Validation(
                "derivatives.quality must be 1-100".into(),
            ));
        }
        for (section, dir) in [
            ("articles", &self.articles.upload_dir),
            ("gallery", &self.gallery.upload_dir),
        ] {
            if dir.is_empty() || dir.starts_with('/') || dir.split('/').any(|s| s == "..") {
                return Err(ConfigError::Validation(format!(
                    "{section}.upload_dir must be a relative path inside media_root"
                )));
            }
        }
        for (section, exts) in [
            ("articles", &self.articles.allowed_extensions),
            ("gallery", &self.gallery.allowed_extensions),
        ] {
            if exts.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{section}.allowed_extensions must not be empty"
                )));
            }
            let decodable = supported_input_extensions();
            if let Some(ext) = exts
                .iter()
                .find(|e| !decodable.contains(&e.to_ascii_lowercase().as_str()))
            {
                return Err(ConfigError::Validation(format!(
                    "{section}.allowed_extensions: no decoder for {ext:?}"
                )));
            }
        }
        Ok(())
    }

    /// Derivative settings for article thumbnails.
    pub fn article_spec(&self) -> DerivativeSpec {
        self.derivatives.spec(self.articles.thumbnail_width)
    }

    /// Derivative settings for gallery photos.
    pub fn gallery_spec(&self) -> DerivativeSpec {
        self.derivatives.spec(self.gallery.compressed_width)
    }
}

/// Article thumbnail settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArticlesConfig {
    /// Width in pixels of the stored thumbnail derivative.
    pub thumbnail_width: u32,
    /// Directory under `media_root` for thumbnails.
    pub upload_dir: String,
    pub allowed_extensions: Vec<String>,
    /// Articles per listing page.
    pub per_page: usize,
}

impl Default for ArticlesConfig {
    fn default() -> Self {
        Self {
            thumbnail_width: 600,
            upload_dir: "articles".to_string(),
            allowed_extensions: ["png", "jpg", "jpeg", "webp"].map(String::from).to_vec(),
            per_page: 5,
        }
    }
}

/// Gallery settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    pub compressed_width: u32,
    pub upload_dir: String,
    pub allowed_extensions: Vec<String>,
    pub per_page: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            compressed_width: 700,
            upload_dir: "gallery".to_string(),
            allowed_extensions: ["png", "jpg", "jpeg"].map(String::from).to_vec(),
            per_page: 9,
        }
    }
}

/// Encoding settings shared by every derivative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivativesConfig {
    pub format: DerivativeFormat,
    pub quality: u32,
}

impl Default for DerivativesConfig {
    fn default() -> Self {
        Self {
            format: DerivativeFormat::WebP,
            quality: 100,
        }
    }
}

impl DerivativesConfig {
    pub fn spec(&self, width: u32) -> DerivativeSpec {
        DerivativeSpec {
            width,
            format: self.format,
            quality: Quality::new(self.quality),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// Tables merge key by key; any other overlay value replaces the base value.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `folio.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no config file.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `folio.toml` in the given site root.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(root)?)
}

/// Returns a fully-commented stock `folio.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Folio Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory (relative to the site root) where uploads and derivatives live.
media_root = "media"

# URL prefix under which stored media is served.
media_url = "/media/"

# JSON file (relative to the site root) holding categories, articles and photos.
data_file = "folio.json"

# ---------------------------------------------------------------------------
# Articles
# ---------------------------------------------------------------------------
[articles]
# Width in pixels of the compressed thumbnail; height keeps the aspect ratio.
thumbnail_width = 600

# Directory under media_root for thumbnails.
upload_dir = "articles"

# Upload extensions accepted for thumbnails.
allowed_extensions = ["png", "jpg", "jpeg", "webp"]

# Articles per listing page.
per_page = 5

# ---------------------------------------------------------------------------
# Gallery
# ---------------------------------------------------------------------------
[gallery]
# Width in pixels of the compressed copy shown in the gallery grid.
compressed_width = 700

# Directory under media_root for full images and their compressed copies.
upload_dir = "gallery"

# Upload extensions accepted for gallery photos.
allowed_extensions = ["png", "jpg", "jpeg"]

# Photos per gallery page.
per_page = 9

# ---------------------------------------------------------------------------
# Derivative encoding
# ---------------------------------------------------------------------------
[derivatives]
# "webp" is encoded losslessly; "avif" honours the quality setting.
format = "webp"

# Encoding quality (1 = worst, 100 = best).
quality = 100
"##
}
