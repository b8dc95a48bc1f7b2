use std::env;
use std::fs;
use std::path::PathBuf;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub quoting: QuotingConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotingConfig {
    /// Tax applied on quote subtotals, in whole percent (reference: 16).
    pub tax_rate_pct: u32,
    /// Days a sent quote stays valid before it expires (reference: 30).
    pub validity_days: i64,
    /// Folio attempts before a code collision becomes a conflict error.
    pub code_attempts: u32,
}

impl QuotingConfig {
    pub fn tax_rate(&self) -> Decimal {
        Decimal::from(self.tax_rate_pct) / Decimal::ONE_HUNDRED
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

#[derive(Clone, Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    database: FileDatabase,
    #[serde(default)]
    quoting: FileQuoting,
    #[serde(default)]
    logging: FileLogging,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct FileDatabase {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct FileQuoting {
    tax_rate_pct: Option<u32>,
    validity_days: Option<i64>,
    code_attempts: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
struct FileLogging {
    level: Option<String>,
    format: Option<LogFormat>,
}

const DEFAULT_DATABASE_URL: &str = "sqlite://cotiza.db";
const DEFAULT_TAX_RATE_PCT: u32 = 16;
const DEFAULT_VALIDITY_DAYS: i64 = 30;
const DEFAULT_CODE_ATTEMPTS: u32 = 5;

impl AppConfig {
    /// Layered load: defaults, then the TOML file, then `COTIZA_*`
    /// environment variables, then explicit overrides.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let env_pairs = env::vars().collect::<Vec<_>>();
        Self::load_with_env(options, env_pairs.into_iter())
    }

    fn load_with_env(
        options: LoadOptions,
        env_pairs: impl Iterator<Item = (String, String)>,
    ) -> Result<Self, ConfigError> {
        let mut file = FileConfig::default();
        if let Some(path) = &options.config_path {
            if path.exists() {
                let raw = fs::read_to_string(path)
                    .map_err(|source| ConfigError::ReadFile { path: path.clone(), source })?;
                file = toml::from_str(&raw)
                    .map_err(|source| ConfigError::ParseFile { path: path.clone(), source })?;
            } else if options.require_file {
                return Err(ConfigError::MissingConfigFile(path.clone()));
            }
        }

        let mut config = AppConfig {
            database: DatabaseConfig {
                url: file.database.url.unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
                max_connections: file.database.max_connections.unwrap_or(5),
                timeout_secs: file.database.timeout_secs.unwrap_or(30),
            },
            quoting: QuotingConfig {
                tax_rate_pct: file.quoting.tax_rate_pct.unwrap_or(DEFAULT_TAX_RATE_PCT),
                validity_days: file.quoting.validity_days.unwrap_or(DEFAULT_VALIDITY_DAYS),
                code_attempts: file.quoting.code_attempts.unwrap_or(DEFAULT_CODE_ATTEMPTS),
            },
            logging: LoggingConfig {
                level: file.logging.level.unwrap_or_else(|| "info".to_string()),
                format: file.logging.format.unwrap_or(LogFormat::Compact),
            },
        };

        for (key, value) in env_pairs {
            match key.as_str() {
                "COTIZA_DATABASE_URL" => config.database.url = value,
                "COTIZA_LOG_LEVEL" => config.logging.level = value,
                "COTIZA_TAX_RATE_PCT" => {
                    config.quoting.tax_rate_pct = value.parse().map_err(|_| {
                        ConfigError::InvalidEnvOverride { key: key.clone(), value }
                    })?;
                }
                "COTIZA_VALIDITY_DAYS" => {
                    config.quoting.validity_days = value.parse().map_err(|_| {
                        ConfigError::InvalidEnvOverride { key: key.clone(), value }
                    })?;
                }
                _ => {}
            }
        }

        if let Some(url) = options.overrides.database_url {
            config.database.url = url;
        }
        if let Some(level) = options.overrides.log_level {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation("database url must not be empty".to_string()));
        }
        if self.quoting.tax_rate_pct > 100 {
            return Err(ConfigError::Validation(format!(
                "tax_rate_pct {} exceeds 100",
                self.quoting.tax_rate_pct
            )));
        }
        if self.quoting.validity_days < 1 {
            return Err(ConfigError::Validation(format!(
                "validity_days {} must be at least 1",
                self.quoting.validity_days
            )));
        }
        if self.quoting.code_attempts < 1 {
            return Err(ConfigError::Validation("code_attempts must be at least 1".to_string()));
        }
        Ok(())
    }
}
