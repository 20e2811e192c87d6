// crates/core/src/config.rs
//! Engine configuration loaded from TOML.
//!
//! Every field has a serde default, so an empty file (or no file at all) is a
//! valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::parser::ParseOptions;
use crate::pricing::{ModelPricing, PricingCatalog};
use crate::scanner::DEFAULT_MAX_LINE_BYTES;
use crate::subagent::FallbackPolicy;

/// Environment variable naming a config file to load.
pub const CONFIG_ENV_VAR: &str = "AGENT_TALLY_CONFIG";

/// Model priced when a transcript's model has no catalog entry.
pub const DEFAULT_PRICING_MODEL: &str = "claude-sonnet-4-6";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub scanner: ScannerConfig,
    pub correlation: CorrelationConfig,
    pub pricing: PricingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub max_line_bytes: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Fallback entry for unknown models. `None` disables the fallback.
    pub default_model: Option<String>,
    /// Seed the catalog with the built-in Anthropic table.
    pub use_builtin_catalog: bool,
    /// Extra entries; an id already in the built-in table replaces it.
    pub models: Vec<ModelPricing>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_model: Some(DEFAULT_PRICING_MODEL.to_string()),
            use_builtin_catalog: true,
            models: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document. `path` only labels errors.
    pub fn from_toml_str(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file. The file must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&contents, path)
    }

    /// Load with precedence: explicit path, then `AGENT_TALLY_CONFIG`, then
    /// `<config dir>/agent-tally/config.toml`.
    ///
    /// Only a missing *default* file falls back to [`EngineConfig::default`];
    /// an explicitly named file that does not exist is an error.
    pub fn load_with_precedence(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        if let Some(env_path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
            return Self::load(Path::new(&env_path));
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scanner.max_line_bytes == 0 {
            return Err(ConfigError::Invalid(
                "scanner.max_line_bytes must be greater than zero".into(),
            ));
        }
        for model in &self.pricing.models {
            model.validate().map_err(ConfigError::Invalid)?;
        }
        if let Some(default_model) = &self.pricing.default_model {
            let in_builtin = self.pricing.use_builtin_catalog
                && crate::pricing::default_pricing().contains_key(default_model);
            let configured = self.pricing.models.iter().any(|m| &m.id == default_model);
            if !in_builtin && !configured {
                return Err(ConfigError::Invalid(format!(
                    "pricing.default_model '{}' has no pricing entry",
                    default_model
                )));
            }
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_line_bytes: self.scanner.max_line_bytes,
            fallback: self.correlation.fallback,
        }
    }

    /// Build the pricing catalog: built-in table (if enabled), configured
    /// entries on top, default model set.
    pub fn catalog(&self) -> PricingCatalog {
        let mut catalog = if self.pricing.use_builtin_catalog {
            PricingCatalog::builtin()
        } else {
            PricingCatalog::new()
        };
        for model in &self.pricing.models {
            catalog.insert(model.clone());
        }
        catalog.set_default_model(self.pricing.default_model.clone());
        catalog
    }
}

/// `~/.config/agent-tally/config.toml` on Linux, the platform equivalent
/// elsewhere. `None` if no config directory can be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("agent-tally").join("config.toml"))
}
