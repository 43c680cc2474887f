use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::chat::pipeline::Pacing;
use crate::llm::Provider;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime configuration, read once at startup from the environment
/// (a `.env` file is honored through dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub database_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
    pub provider: Provider,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr =
            env::var("LEXDRAFT_BIND").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let database_path = env::var("LEXDRAFT_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("lexdraft.db"));
        let chunk_size = parse_var("LEXDRAFT_CHUNK_SIZE", 120)?;
        let chunk_delay_ms = parse_var("LEXDRAFT_CHUNK_DELAY_MS", 50)?;
        let model =
            env::var("LEXDRAFT_MODEL").unwrap_or_else(|_| "openai/gpt-4o-mini".to_string());
        let provider = resolve_provider(&model)?;

        Ok(Config {
            bind_addr,
            database_path,
            chunk_size,
            chunk_delay_ms,
            provider,
        })
    }

    pub fn pacing(&self) -> Pacing {
        Pacing {
            chunk_size: self.chunk_size,
            delay: Duration::from_millis(self.chunk_delay_ms),
        }
    }
}

/// Resolves an LLM provider from a model string like "openai/gpt-4o-mini",
/// "claude/claude-sonnet-4-5", "ollama/llama3".
fn resolve_provider(model: &str) -> Result<Provider, ConfigError> {
    if let Some(model_id) = model.strip_prefix("ollama/") {
        let host =
            env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost:11434".to_string());
        Ok(Provider::ollama(host, model_id.to_string()))
    } else if let Some(model_id) = model.strip_prefix("claude/") {
        let api_key = env::var("CLAUDE_API_KEY").map_err(|_| ConfigError::Missing("CLAUDE_API_KEY"))?;
        let base_url = env::var("CLAUDE_BASE_URL")
            .unwrap_or_else(|_| "https://api.anthropic.com".to_string());
        Ok(Provider::claude(api_key, base_url, model_id.to_string()))
    } else {
        let model_id = model.strip_prefix("openai/").unwrap_or(model);
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| ConfigError::Missing("OPENAI_API_KEY"))?;
        let base_url = env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        Ok(Provider::openai(api_key, base_url, model_id.to_string()))
    }
}

fn parse_var<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}
