//! Viewer configuration.
//!
//! Every field has a default, so a configuration file only needs the keys it
//! overrides. Values can also be overridden from the environment.

use crate::layout::PageAspect;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::time::Duration;

/// Environment variable overriding [`ViewerConfig::default_width_px`].
pub const ENV_DEFAULT_WIDTH_PX: &str = "FOLIO_DEFAULT_WIDTH_PX";
/// Environment variable overriding [`ViewerConfig::debounce_ms`].
pub const ENV_DEBOUNCE_MS: &str = "FOLIO_DEBOUNCE_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Container width assumed until the first resize observation settles.
    pub default_width_px: f32,
    /// Quiet period before a resize burst is applied.
    pub debounce_ms: u64,
    pub page_aspect: PageAspect,
    /// Character map resources handed to the document backend.
    pub cmap_url: String,
    /// Standard font resources handed to the document backend.
    pub standard_font_url: String,
    /// Script location of the backend's parsing worker.
    pub worker_src: String,
    pub canvas_background: String,
    pub page_border: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_width_px: 400.0,
            debounce_ms: 100,
            page_aspect: PageAspect::US_LETTER,
            cmap_url: "/cmaps/".to_owned(),
            standard_font_url: "/standard_fonts/".to_owned(),
            worker_src: "/static/js/pdf.worker.min.js".to_owned(),
            canvas_background: "#ffffff".to_owned(),
            page_border: "#14b8a6".to_owned(),
        }
    }
}

/// Resource locations a document backend needs to parse the resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentOptions {
    pub cmap_url: String,
    pub standard_font_url: String,
    pub worker_src: String,
}

impl ViewerConfig {
    pub fn document_options(&self) -> DocumentOptions {
        DocumentOptions {
            cmap_url: self.cmap_url.clone(),
            standard_font_url: self.standard_font_url.clone(),
            worker_src: self.worker_src.clone(),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn with_default_width(mut self, width_px: f32) -> Self {
        self.default_width_px = width_px;
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }

    /// Loads and validates a JSON configuration file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`ViewerConfig::validate`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Applies `FOLIO_DEFAULT_WIDTH_PX` and `FOLIO_DEBOUNCE_MS` on top of `self`.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_DEFAULT_WIDTH_PX) {
            self.default_width_px = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_DEFAULT_WIDTH_PX.to_owned()))?;
        }

        if let Some(value) = lookup(ENV_DEBOUNCE_MS) {
            self.debounce_ms = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(ENV_DEBOUNCE_MS.to_owned()))?;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.default_width_px.is_finite() || self.default_width_px <= 0.0 {
            return Err(ConfigError::InvalidValue("default_width_px".to_owned()));
        }

        if !self.page_aspect.is_valid() {
            return Err(ConfigError::InvalidValue("page_aspect".to_owned()));
        }

        // Base URLs name directories.
        for (key, value) in
            [("cmap_url", &self.cmap_url), ("standard_font_url", &self.standard_font_url)]
        {
            if !value.ends_with('/') {
                return Err(ConfigError::InvalidValue(key.to_owned()));
            }
        }

        if self.worker_src.trim().is_empty() {
            return Err(ConfigError::InvalidValue("worker_src".to_owned()));
        }

        for (key, value) in
            [("canvas_background", &self.canvas_background), ("page_border", &self.page_border)]
        {
            if !is_hex_color(value) {
                return Err(ConfigError::InvalidValue(key.to_owned()));
            }
        }

        Ok(())
    }
}

fn is_hex_color(value: &str) -> bool {
    value
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for configuration key: {0}")]
    InvalidValue(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}
