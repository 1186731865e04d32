use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

use crate::ai::ollama::DEFAULT_OLLAMA_URL;
use crate::prompt::DEFAULT_HISTORY_WINDOW;
use crate::provider::Provider;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub provider: Option<String>,
    pub default_model: Option<String>,
    pub gemini_api_key: Option<String>,
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub ollama_url: Option<String>,
    /// Replaces the built-in persona prompt
    pub system_prompt: Option<String>,
    pub history_window: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            provider: Some(Provider::Gemini.as_str().to_string()),
            ..Self::default()
        }
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    pub fn provider(&self) -> Provider {
        self.provider
            .as_deref()
            .and_then(Provider::from_str)
            .unwrap_or(Provider::Gemini)
    }

    pub fn history_window(&self) -> usize {
        self.history_window.unwrap_or(DEFAULT_HISTORY_WINDOW)
    }

    pub fn ollama_url(&self) -> &str {
        self.ollama_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL)
    }

    /// API key for a provider: environment first, then the config file
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let from_config = match provider {
            Provider::Gemini => &self.gemini_api_key,
            Provider::Claude => &self.claude_api_key,
            Provider::OpenAI => &self.openai_api_key,
            Provider::Ollama | Provider::Echo => return None,
        };
        provider
            .api_key_env()
            .and_then(|var| std::env::var(var).ok())
            .filter(|k| !k.is_empty())
            .or_else(|| from_config.clone())
    }

    pub fn set_api_key(&mut self, provider: Provider, key: &str) {
        let slot = match provider {
            Provider::Gemini => &mut self.gemini_api_key,
            Provider::Claude => &mut self.claude_api_key,
            Provider::OpenAI => &mut self.openai_api_key,
            Provider::Ollama | Provider::Echo => return,
        };
        *slot = Some(key.to_string());
    }

    /// Where a provider's credentials come from: "local", "env", "config", or None
    pub fn key_source(&self, provider: Provider) -> Option<&'static str> {
        match provider.api_key_env() {
            None => Some("local"),
            Some(var) if std::env::var(var).map(|v| !v.is_empty()).unwrap_or(false) => Some("env"),
            Some(_) if self.api_key(provider).is_some() => Some("config"),
            Some(_) => None,
        }
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("kefu").join("config.json"))
    }
}
