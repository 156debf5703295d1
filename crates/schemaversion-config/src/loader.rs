use std::path::Path;

use schemaversion_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

/// Environment variable that overrides `database.password` from the file.
pub const PASSWORD_ENV: &str = "SCHEMAVERSION_DB_PASSWORD";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a config file. The format is picked from the file
    /// extension (`yml`, `yaml` or `toml`).
    pub fn load(path: &Path) -> Result<AppConfig> {
        info!("loading config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        let config = Self::parse(&contents, ext)?;
        let config = Self::apply_password_override(config, std::env::var(PASSWORD_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn parse(contents: &str, ext: &str) -> Result<AppConfig> {
        match ext {
            "yml" | "yaml" => serde_yaml::from_str(contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}"))),
            "toml" => {
                toml::from_str(contents).map_err(|e| Error::Config(format!("TOML parse error: {e}")))
            }
            other => Err(Error::Config(format!(
                "unsupported config extension: {other}"
            ))),
        }
    }

    pub fn apply_password_override(mut config: AppConfig, password: Option<String>) -> AppConfig {
        if let Some(password) = password.filter(|p| !p.is_empty()) {
            debug!("database password taken from {PASSWORD_ENV}");
            config.database.password = password;
        }
        config
    }
}
