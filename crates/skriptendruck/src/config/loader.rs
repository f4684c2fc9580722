use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SUPPORTED_VERSION: &str = "1.0";

/// Source format of a config document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    /// `.yaml`/`.yml` files are YAML, everything else is read as JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content, ConfigFormat::from_path(path))
}

pub fn load_config_from_str(content: &str, format: ConfigFormat) -> Result<Config, ConfigError> {
    let config: Config = match format {
        ConfigFormat::Json => serde_json::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    };

    validate_config(&config)?;

    Ok(config)
}

pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != SUPPORTED_VERSION {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.base_directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "base_directory must not be empty".to_string(),
        });
    }

    if config.pages.min == 0 {
        return Err(ConfigError::Validation {
            message: "pages.min must be at least 1".to_string(),
        });
    }

    if config.pages.min > config.pages.max {
        return Err(ConfigError::Validation {
            message: format!(
                "pages.min ({}) must not exceed pages.max ({})",
                config.pages.min, config.pages.max
            ),
        });
    }

    if config.processing.worker_count == 0 {
        return Err(ConfigError::Validation {
            message: "processing.worker_count must be greater than 0".to_string(),
        });
    }

    if config.coversheet.thumbnails && config.coversheet.thumbnail_command.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "coversheet.thumbnail_command must not be empty".to_string(),
        });
    }

    if config.coversheet.thumbnail_dpi == 0 {
        return Err(ConfigError::Validation {
            message: "coversheet.thumbnail_dpi must be greater than 0".to_string(),
        });
    }

    if config.coversheet.thumbnail_timeout_secs == 0 {
        return Err(ConfigError::Validation {
            message: "coversheet.thumbnail_timeout_secs must be greater than 0".to_string(),
        });
    }

    Ok(())
}
