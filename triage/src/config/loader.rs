//! Configuration file loading (TOML, YAML, JSON).

use super::Configuration;
use crate::error::{TriageError, TriageResult};
use crate::resilience::DegradedResponse;
use std::path::Path;
use tracing::{info, warn};

/// On-disk configuration formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Detect the format from a file extension.
    pub fn from_path(path: &Path) -> TriageResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "toml" => Ok(Self::Toml),
            "yml" | "yaml" => Ok(Self::Yaml),
            "json" => Ok(Self::Json),
            _ => Err(TriageError::UnsupportedFormat { extension: ext }),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Toml => "toml",
            Self::Yaml => "yaml",
            Self::Json => "json",
        }
    }
}

/// Parse and validate a configuration document.
pub fn parse_config(content: &str, format: ConfigFormat) -> TriageResult<Configuration> {
    let config: Configuration = match format {
        ConfigFormat::Toml => {
            toml::from_str(content).map_err(|e| TriageError::config_parse("toml", e.to_string()))?
        }
        ConfigFormat::Yaml => serde_yaml::from_str(content)
            .map_err(|e| TriageError::config_parse("yaml", e.to_string()))?,
        ConfigFormat::Json => serde_json::from_str(content)
            .map_err(|e| TriageError::config_parse("json", e.to_string()))?,
    };
    config.validate()?;
    Ok(config)
}

/// Load, parse and validate a configuration file.
pub fn load_config(path: &Path) -> TriageResult<Configuration> {
    let format = ConfigFormat::from_path(path)?;
    let content = std::fs::read_to_string(path).map_err(|source| TriageError::ConfigIo {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&content, format)?;
    info!(
        path = %path.display(),
        format = format.name(),
        rules = config.rules.len(),
        custom_rules = config.custom_rules.len(),
        "Loaded triage configuration"
    );
    Ok(config)
}

/// Load a configuration file, falling back to [`Configuration::minimal`]
/// when it cannot be read, parsed or validated.
pub fn load_config_or_minimal(path: &Path) -> DegradedResponse<Configuration> {
    match load_config(path) {
        Ok(config) => DegradedResponse::full(config, &path.display().to_string()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Falling back to minimal configuration");
            DegradedResponse::unavailable(
                Configuration::minimal(),
                &format!("{}: {}", path.display(), e),
            )
        }
    }
}
