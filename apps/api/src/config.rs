use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::llm_client::LlmSettings;
use crate::screening::batch::{DEFAULT_FILE_TIMEOUT, DEFAULT_MAX_CONCURRENT_FILES};
use crate::screening::scoring::{
    DEFAULT_JUDGMENT_TIMEOUT, DEFAULT_MAX_JD_CHARS, DEFAULT_MAX_RESUME_CHARS,
};
use crate::screening::{BatchOptions, ScoringLimits};

const DEFAULT_OLLAMA_HOST: &str = "https://ollama.com";
const DEFAULT_OLLAMA_MODEL: &str = "gpt-oss:120b";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://127.0.0.1:3000";
const DEFAULT_MAX_UPLOAD_FILES: usize = 20;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every variable has a default; malformed numbers fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub ollama_host: String,
    pub ollama_model: String,
    pub ollama_api_key: Option<String>,
    pub cors_origins: Vec<String>,
    pub upload_dir: PathBuf,
    pub max_upload_files: usize,
    pub max_upload_bytes: usize,
    pub max_jd_chars: usize,
    pub max_resume_chars: usize,
    pub judgment_timeout: Duration,
    pub file_timeout: Duration,
    pub max_concurrent_files: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        // Serverless deployments only have a writable /tmp.
        let default_upload_dir = if std::env::var_os("VERCEL").is_some() {
            "/tmp/uploads"
        } else {
            "uploads"
        };

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("LOG_LEVEL")
                .or_else(|| optional_env("RUST_LOG"))
                .unwrap_or_else(|| "info".to_string())
                .to_lowercase(),
            ollama_host: env_or("OLLAMA_HOST", DEFAULT_OLLAMA_HOST),
            ollama_model: env_or("OLLAMA_MODEL", DEFAULT_OLLAMA_MODEL),
            ollama_api_key: optional_env("OLLAMA_API_KEY"),
            cors_origins: split_origins(&env_or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
            upload_dir: PathBuf::from(env_or("UPLOAD_DIR", default_upload_dir)),
            max_upload_files: parse_env("MAX_UPLOAD_FILES", DEFAULT_MAX_UPLOAD_FILES)?,
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            max_jd_chars: parse_env("MAX_JD_CHARS", DEFAULT_MAX_JD_CHARS)?,
            max_resume_chars: parse_env("MAX_RESUME_CHARS", DEFAULT_MAX_RESUME_CHARS)?,
            judgment_timeout: Duration::from_secs(parse_env(
                "JUDGMENT_TIMEOUT_SECS",
                DEFAULT_JUDGMENT_TIMEOUT.as_secs(),
            )?),
            file_timeout: Duration::from_secs(parse_env(
                "FILE_TIMEOUT_SECS",
                DEFAULT_FILE_TIMEOUT.as_secs(),
            )?),
            max_concurrent_files: parse_env("MAX_CONCURRENT_FILES", DEFAULT_MAX_CONCURRENT_FILES)?
                .max(1),
        })
    }

    pub fn llm_settings(&self) -> LlmSettings {
        LlmSettings {
            host: self.ollama_host.clone(),
            model: self.ollama_model.clone(),
            api_key: self.ollama_api_key.clone(),
            request_timeout: self.judgment_timeout,
        }
    }

    pub fn scoring_limits(&self) -> ScoringLimits {
        ScoringLimits {
            max_jd_chars: self.max_jd_chars,
            max_resume_chars: self.max_resume_chars,
            judgment_timeout: self.judgment_timeout,
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            max_concurrent_files: self.max_concurrent_files,
            file_timeout: Some(self.file_timeout),
        }
    }
}

/// Set and non-blank, trimmed.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    optional_env(key).unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has invalid value '{raw}'")),
        None => Ok(default),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
