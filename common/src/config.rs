use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_PATH: &str = "database.db";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// runtime configuration, assembled once at startup and passed down explicitly
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub tracing: TracingConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_PATH),
        }
    }
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// keep the api key out of debug logs
impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// export spans over otlp when an endpoint is also set
    pub enabled: bool,
    pub endpoint: Option<String>,
}

impl TracingConfig {
    /// accepts the usual truthy spellings: 1, true, yes
    pub fn parse_enabled(value: &str) -> bool {
        let v = value.to_lowercase();
        v == "1" || v == "true" || v == "yes"
    }
}
