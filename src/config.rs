use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::errors::AppError;
use crate::prompt::Persona;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "qwen3:32b";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 300;

/// Sampling parameters sent with every generation request.
/// Fixed per deployment; `seed` stays `None` so replies are not reproducible.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOptions {
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    pub seed: Option<u64>,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 1.2,
            top_p: 0.95,
            top_k: 50,
            repeat_penalty: 1.1,
            seed: None,
        }
    }
}

/// Everything the server needs, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub ollama_base_url: String,
    pub model: String,
    pub assets_dir: PathBuf,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub generation: GenerationOptions,
    pub persona: Persona,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            assets_dir: PathBuf::from("."),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            idle_timeout: Duration::from_secs(DEFAULT_IDLE_TIMEOUT_SECS),
            generation: GenerationOptions::default(),
            persona: Persona::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let defaults = Self::default();

        let ollama_base_url = lookup("OLLAMA_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.ollama_base_url);
        reqwest::Url::parse(&ollama_base_url)
            .map_err(|_| AppError::invalid_config("OLLAMA_API_BASE_URL", &ollama_base_url))?;

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,
            ollama_base_url,
            model: lookup("OLLAMA_MODEL").unwrap_or(defaults.model),
            assets_dir: lookup("ASSETS_DIR").map(PathBuf::from).unwrap_or(defaults.assets_dir),
            connect_timeout: Duration::from_secs(parse_or(
                &lookup,
                "UPSTREAM_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )?),
            idle_timeout: Duration::from_secs(parse_or(
                &lookup,
                "UPSTREAM_IDLE_TIMEOUT_SECS",
                DEFAULT_IDLE_TIMEOUT_SECS,
            )?),
            generation: defaults.generation,
            persona: defaults.persona,
        })
    }

    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.ollama_base_url)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T, AppError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| AppError::invalid_config(key, raw)),
    }
}
