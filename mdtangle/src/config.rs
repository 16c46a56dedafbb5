//! Invocation configuration
//!
//! Engine and highlighter selection, verbosity, and rendering defaults are
//! resolved once per invocation into a single [`Config`] value that is
//! passed into the pipeline entry point. An optional `mdtangle.toml` file
//! supplies defaults; command-line flags override it.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine;
use crate::highlight;

/// Name of the optional settings file looked up next to the invocation.
pub const CONFIG_FILE: &str = "mdtangle.toml";

/// Table-of-contents settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TocConfig {
    /// Deepest heading level that is listed
    pub max_level: u32,
    /// Display text of the ToC heading
    pub header: String,
    /// Label of the per-heading jump link back to the ToC
    pub top: String,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            max_level: 2,
            header: "Contents".to_string(),
            top: "^".to_string(),
        }
    }
}

/// Merged per-invocation configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Engine preference order; the first compiled-in engine wins
    pub engines: Vec<String>,
    /// Highlighter preference order
    pub highlighters: Vec<String>,
    /// Table-of-contents settings
    pub toc: TocConfig,
    /// Class prefix for code-block languages
    pub lang_prefix: String,
    /// Convert fatal pipeline errors into an HTML error notice
    pub lenient: bool,
    /// Write the full document state as JSON next to the other outputs
    pub dump_state: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engines: engine::SUPPORTED.iter().map(|s| s.to_string()).collect(),
            highlighters: highlight::SUPPORTED.iter().map(|s| s.to_string()).collect(),
            toc: TocConfig::default(),
            lang_prefix: "lang-".to_string(),
            lenient: false,
            dump_state: false,
        }
    }
}

/// Shape of the optional `mdtangle.toml` settings file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub engines: Option<Vec<String>>,
    pub highlighters: Option<Vec<String>>,
    pub lang_prefix: Option<String>,
    pub toc: Option<TocConfig>,
}

/// Errors resolving the invocation configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("error reading {path}: {source}", path = .0.display(), source = .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("error parsing {path}: {source}", path = .0.display(), source = .1)]
    Parse(PathBuf, #[source] Box<toml::de::Error>),

    #[error("the \"{name}\" engine is not supported (supported: {supported})")]
    UnsupportedEngine { name: String, supported: String },

    #[error(
        "the \"{name}\" engine is not compiled into this build; rebuild with the \"{feature}\" feature"
    )]
    EngineNotInstalled { name: String, feature: String },

    #[error("no usable engine among the preferred ones (installed: {installed})")]
    NoEngine { installed: String },

    #[error("the \"{name}\" syntax highlighter is not supported (supported: {supported})")]
    UnsupportedHighlighter { name: String, supported: String },

    #[error("no usable syntax highlighter among the preferred ones")]
    NoHighlighter,
}

impl Config {
    /// Load the optional settings file.
    ///
    /// # Returns
    /// * `Ok(Some(ConfigFile))` - The file exists and parsed
    /// * `Ok(None)` - No settings file present
    /// * `Err(ConfigError)` - The file exists but could not be read/parsed
    pub fn load_file(path: &Path) -> Result<Option<ConfigFile>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let file = toml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), Box::new(e)))?;
        Ok(Some(file))
    }

    /// Fold settings-file values into the defaults. CLI flags are applied
    /// on top by the caller.
    pub fn apply_file(&mut self, file: ConfigFile) {
        if let Some(engines) = file.engines {
            self.engines = engines;
        }
        if let Some(highlighters) = file.highlighters {
            self.highlighters = highlighters;
        }
        if let Some(lang_prefix) = file.lang_prefix {
            self.lang_prefix = lang_prefix;
        }
        if let Some(toc) = file.toc {
            self.toc = toc;
        }
    }

    /// Select the first preferred engine that is compiled into this build.
    ///
    /// # Returns
    /// * `Ok(Box<dyn Engine>)` - The selected engine
    /// * `Err(ConfigError)` - A preferred name is unknown, or every
    ///   preferred engine is compiled out
    pub fn select_engine(&self) -> Result<Box<dyn engine::Engine>, ConfigError> {
        for name in &self.engines {
            if !engine::SUPPORTED.contains(&name.as_str()) {
                return Err(ConfigError::UnsupportedEngine {
                    name: name.clone(),
                    supported: engine::SUPPORTED.join(", "),
                });
            }
            if let Some(selected) = engine::by_name(name) {
                return Ok(selected);
            }
        }

        // every preferred name was valid but compiled out; point at the
        // feature for the first one
        if let Some(name) = self.engines.first() {
            if let Some(feature) = engine::feature(name) {
                return Err(ConfigError::EngineNotInstalled {
                    name: name.clone(),
                    feature: feature.to_string(),
                });
            }
        }

        Err(ConfigError::NoEngine {
            installed: engine::installed().join(", "),
        })
    }

    /// Select the first preferred highlighter.
    pub fn select_highlighter(&self) -> Result<Box<dyn highlight::Highlighter>, ConfigError> {
        for name in &self.highlighters {
            if !highlight::SUPPORTED.contains(&name.as_str()) {
                return Err(ConfigError::UnsupportedHighlighter {
                    name: name.clone(),
                    supported: highlight::SUPPORTED.join(", "),
                });
            }
            if let Some(selected) = highlight::by_name(name) {
                return Ok(selected);
            }
        }
        Err(ConfigError::NoHighlighter)
    }
}
