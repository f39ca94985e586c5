use crate::error::{Result, TabletalkError};
use once_cell::sync::Lazy;
use regex::Regex;
use std::env;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_DEPLOYMENT: &str = "gpt-4.1";
pub const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_DB_PATH: &str = "temp_data.db";
pub const DEFAULT_TABLE_NAME: &str = "uploaded_data";
pub const DEFAULT_ROW_LIMIT: usize = 10;

static TABLE_NAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// connection settings for the chat completion service
#[derive(Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub deployment: String,
    pub api_version: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// both credentials are required; empty strings count as missing
    pub fn new(endpoint: Option<String>, api_key: Option<String>) -> Result<Self> {
        let endpoint = endpoint.filter(|s| !s.trim().is_empty());
        let api_key = api_key.filter(|s| !s.trim().is_empty());

        match (endpoint, api_key) {
            (Some(endpoint), Some(api_key)) => Ok(Self {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key,
                deployment: DEFAULT_DEPLOYMENT.to_string(),
                api_version: DEFAULT_API_VERSION.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
            }),
            (None, _) => Err(TabletalkError::Configuration(
                "model endpoint is missing (set AZURE_OPENAI_ENDPOINT_TEXT)".to_string(),
            )),
            (_, None) => Err(TabletalkError::Configuration(
                "model api key is missing (set AZURE_OPENAI_API_KEY)".to_string(),
            )),
        }
    }

    pub fn from_env() -> Result<Self> {
        let config = Self::new(
            env::var("AZURE_OPENAI_ENDPOINT_TEXT").ok(),
            env::var("AZURE_OPENAI_API_KEY").ok(),
        )?;

        let config = match env::var("TABLETALK_DEPLOYMENT").ok().filter(|s| !s.is_empty()) {
            Some(deployment) => config.with_deployment(deployment),
            None => config,
        };

        Ok(config)
    }

    pub fn with_deployment(mut self, deployment: impl Into<String>) -> Self {
        self.deployment = deployment.into();
        self
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// knobs for ingestion and the question pipeline
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub db_path: PathBuf,
    pub table: String,
    /// bound appended to statements that carry no LIMIT
    pub row_limit: usize,
    /// rows forwarded to the summarizer and printed per turn
    pub preview_rows: usize,
    /// rows printed after ingestion
    pub verify_rows: usize,
    /// ddl synthesis attempts before giving up on materialization
    pub max_attempts: usize,
    pub synthesis_temperature: f32,
    pub summary_temperature: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            table: DEFAULT_TABLE_NAME.to_string(),
            row_limit: DEFAULT_ROW_LIMIT,
            preview_rows: 10,
            verify_rows: 20,
            max_attempts: 1,
            synthesis_temperature: 0.0,
            summary_temperature: 0.2,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if !TABLE_NAME_REGEX.is_match(&self.table) {
            return Err(TabletalkError::Configuration(format!(
                "table name '{}' must be a plain identifier",
                self.table
            )));
        }
        if self.row_limit == 0 {
            return Err(TabletalkError::Configuration(
                "row limit must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(TabletalkError::Configuration(
                "max attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// immutable configuration built once at startup
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub pipeline: PipelineSettings,
}

impl AppConfig {
    pub fn new(llm: LlmConfig, pipeline: PipelineSettings) -> Result<Self> {
        pipeline.validate()?;
        Ok(Self { llm, pipeline })
    }
}
