pub mod claude;
pub mod openai;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Single-shot text generation: one prompt in, the full response text out.
/// The pipeline depends on this seam so tests can script responses.
#[async_trait]
pub trait GenerateText: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Unified LLM provider enum — dispatches to OpenAI-compatible or Claude backends.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAi(openai::OpenAiConfig),
    Claude(claude::ClaudeConfig),
    Ollama(openai::OpenAiConfig),
}

impl Provider {
    pub fn openai(api_key: String, base_url: String, model: String) -> Self {
        Provider::OpenAi(openai::OpenAiConfig {
            api_key,
            base_url,
            model,
        })
    }

    pub fn claude(api_key: String, base_url: String, model: String) -> Self {
        Provider::Claude(claude::ClaudeConfig {
            api_key,
            base_url,
            model,
        })
    }

    pub fn ollama(host: String, model: String) -> Self {
        Provider::Ollama(openai::OpenAiConfig {
            api_key: String::new(),
            base_url: format!("{}/v1", host),
            model,
        })
    }
}

#[async_trait]
impl GenerateText for Provider {
    async fn generate_text(&self, prompt: &str) -> Result<String, LlmError> {
        match self {
            Provider::OpenAi(config) | Provider::Ollama(config) => {
                openai::generate(config, prompt).await
            }
            Provider::Claude(config) => claude::generate(config, prompt).await,
        }
    }
}
