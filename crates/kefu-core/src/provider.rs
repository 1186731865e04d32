use anyhow::Result;

use crate::ai::{ClaudeClient, EchoClient, GeminiClient, OllamaClient, OpenAIClient};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::prompt::CompletionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    Ollama,
    Claude,
    OpenAI,
    Echo,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini",
            Provider::Ollama => "ollama",
            Provider::Claude => "claude",
            Provider::OpenAI => "openai",
            Provider::Echo => "echo",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "gemini" => Some(Provider::Gemini),
            "ollama" => Some(Provider::Ollama),
            "claude" => Some(Provider::Claude),
            "openai" => Some(Provider::OpenAI),
            "echo" => Some(Provider::Echo),
            _ => None,
        }
    }

    pub fn all() -> Vec<Provider> {
        vec![
            Provider::Gemini,
            Provider::Ollama,
            Provider::Claude,
            Provider::OpenAI,
            Provider::Echo,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini (Google)",
            Provider::Ollama => "Ollama (Local)",
            Provider::Claude => "Claude (Anthropic)",
            Provider::OpenAI => "ChatGPT (OpenAI)",
            Provider::Echo => "Echo (Offline)",
        }
    }

    /// Environment variable holding the API key, if the provider needs one
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::Gemini => Some("GEMINI_API_KEY"),
            Provider::Claude => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAI => Some("OPENAI_API_KEY"),
            Provider::Ollama | Provider::Echo => None,
        }
    }

    /// Models known without asking the server. Empty for Ollama, whose
    /// models are listed at runtime.
    pub fn static_models(&self) -> Vec<String> {
        match self {
            Provider::Gemini => GeminiClient::list_models(),
            Provider::Ollama => Vec::new(),
            Provider::Claude => ClaudeClient::list_models(),
            Provider::OpenAI => OpenAIClient::list_models(),
            Provider::Echo => EchoClient::list_models(),
        }
    }

    pub fn default_model(&self) -> String {
        match self {
            Provider::Ollama => "gemma3:latest".to_string(),
            _ => self.static_models().into_iter().next().unwrap_or_default(),
        }
    }
}

/// A ready-to-use client for one provider
#[derive(Clone)]
pub enum ReplyClient {
    Gemini(GeminiClient),
    Ollama(OllamaClient),
    Claude(ClaudeClient),
    OpenAI(OpenAIClient),
    Echo(EchoClient),
}

impl ReplyClient {
    pub fn from_config(provider: Provider, config: &Config) -> CoreResult<Self> {
        let key = || config.api_key(provider).ok_or(CoreError::MissingApiKey(provider));

        Ok(match provider {
            Provider::Gemini => ReplyClient::Gemini(GeminiClient::new(&key()?)),
            Provider::Claude => ReplyClient::Claude(ClaudeClient::new(&key()?)),
            Provider::OpenAI => ReplyClient::OpenAI(OpenAIClient::new(&key()?)),
            Provider::Ollama => ReplyClient::Ollama(OllamaClient::new(config.ollama_url())),
            Provider::Echo => ReplyClient::Echo(EchoClient::default()),
        })
    }

    pub fn provider(&self) -> Provider {
        match self {
            ReplyClient::Gemini(_) => Provider::Gemini,
            ReplyClient::Ollama(_) => Provider::Ollama,
            ReplyClient::Claude(_) => Provider::Claude,
            ReplyClient::OpenAI(_) => Provider::OpenAI,
            ReplyClient::Echo(_) => Provider::Echo,
        }
    }

    pub async fn complete(&self, model: &str, request: &CompletionRequest) -> Result<String> {
        match self {
            ReplyClient::Gemini(c) => c.complete(model, request).await,
            ReplyClient::Ollama(c) => c.complete(model, request).await,
            ReplyClient::Claude(c) => c.complete(model, request).await,
            ReplyClient::OpenAI(c) => c.complete(model, request).await,
            ReplyClient::Echo(c) => c.complete(model, request).await,
        }
    }

    /// Models available for this client's provider
    pub async fn list_models(&self) -> Vec<String> {
        match self {
            ReplyClient::Ollama(c) => c.list_models().await.unwrap_or_default(),
            other => other.provider().static_models(),
        }
    }
}
