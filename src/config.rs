use crate::constants;
use crate::error::{Result, RetrieverError};
use crate::export::plot::PlotFormat;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const EMAIL_ENV: &str = "NCBI_EMAIL";
pub const API_KEY_ENV: &str = "NCBI_API_KEY";
pub const CONFIG_PATH_ENV: &str = "SEQ_RETRIEVER_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub entrez: EntrezConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EntrezConfig {
    pub base_url: String,
    pub tool: String,
    pub email: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: u64,
    pub max_tries: u32,
    pub retry_delay_ms: u64,
}

impl Default for EntrezConfig {
    fn default() -> Self {
        Self {
            base_url: constants::EUTILS_BASE_URL.to_string(),
            tool: constants::DEFAULT_TOOL.to_string(),
            email: None,
            api_key: None,
            timeout_seconds: constants::DEFAULT_TIMEOUT_SECONDS,
            max_tries: constants::DEFAULT_MAX_TRIES,
            retry_delay_ms: constants::DEFAULT_RETRY_DELAY_MS,
        }
    }
}

impl EntrezConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Request budget granted by NCBI for this identity
    pub fn requests_per_sec(&self) -> u32 {
        if self.api_key.is_some() {
            constants::REQUESTS_PER_SEC_WITH_KEY
        } else {
            constants::REQUESTS_PER_SEC_ANONYMOUS
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub batch_size: usize,
    pub max_records: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: constants::DEFAULT_BATCH_SIZE,
            max_records: constants::DEFAULT_MAX_RECORDS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub plot_format: PlotFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            plot_format: PlotFormat::Png,
        }
    }
}

impl Config {
    /// Load from `path` if given (must exist), otherwise from the default file if present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (config_path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(constants::DEFAULT_CONFIG_FILE), false),
        };

        if !config_path.exists() {
            if required {
                return Err(RetrieverError::Config(format!(
                    "config file '{}' does not exist",
                    config_path.display()
                )));
            }
            debug!("No config file at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            RetrieverError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&config_content)?;
        info!("Loaded config from {}", config_path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(email) = non_blank(lookup(EMAIL_ENV)) {
            self.entrez.email = Some(email);
        }
        if let Some(key) = non_blank(lookup(API_KEY_ENV)) {
            self.entrez.api_key = Some(key);
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.entrez.email.as_deref() {
            Some(email) if !email.trim().is_empty() => {}
            _ => return Err(RetrieverError::Config("an email address is required by NCBI".into())),
        }
        if self.entrez.tool.trim().is_empty() {
            return Err(RetrieverError::Config("tool name must not be empty".into()));
        }
        if self.entrez.max_tries == 0 {
            return Err(RetrieverError::Config("max_tries must be at least 1".into()));
        }
        if self.fetch.batch_size == 0 {
            return Err(RetrieverError::Config("batch_size must be greater than zero".into()));
        }
        if self.fetch.max_records == 0 {
            return Err(RetrieverError::Config("max_records must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Treat empty or whitespace-only values as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
