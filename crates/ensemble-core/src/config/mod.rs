use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::constants::{defaults, endpoints, models};
use crate::error::EnsembleError;
use crate::llm::{ClaudeClient, LlmClient, OpenAIClient};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAI,
    Claude,
    Ollama,
    Groq,
    OpenRouter,
    LmStudio,
}

impl LlmProvider {
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Ollama | Self::LmStudio)
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAI => endpoints::OPENAI_BASE_URL,
            Self::Claude => endpoints::CLAUDE_BASE_URL,
            Self::Ollama => endpoints::OLLAMA_BASE_URL,
            Self::Groq => endpoints::GROQ_BASE_URL,
            Self::OpenRouter => endpoints::OPENROUTER_BASE_URL,
            Self::LmStudio => endpoints::LMSTUDIO_BASE_URL,
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAI => "OPENAI_API_KEY",
            Self::Claude => "ANTHROPIC_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::OpenRouter => "OPENROUTER_API_KEY",
            Self::Ollama | Self::LmStudio => "",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::OpenAI => models::DEFAULT_OPENAI_MODEL,
            Self::Claude => models::DEFAULT_CLAUDE_MODEL,
            Self::Ollama => models::DEFAULT_OLLAMA_MODEL,
            Self::Groq => models::DEFAULT_GROQ_MODEL,
            Self::OpenRouter => models::DEFAULT_OPENROUTER_MODEL,
            Self::LmStudio => models::DEFAULT_LMSTUDIO_MODEL,
        }
    }
}

impl FromStr for LlmProvider {
    type Err = EnsembleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "claude" | "anthropic" => Ok(Self::Claude),
            "ollama" => Ok(Self::Ollama),
            "groq" => Ok(Self::Groq),
            "openrouter" => Ok(Self::OpenRouter),
            "lmstudio" | "lm_studio" => Ok(Self::LmStudio),
            other => Err(EnsembleError::Config(format!("Unknown LLM provider: {other}"))),
        }
    }
}

/// Settings for the built-in capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub search_api_key_env: String,
    pub call_timeout_secs: u64,
    pub url_max_chars: usize,
    pub url_timeout_secs: u64,
    pub sandbox: SandboxSettings,
}

/// The code executor is off unless `enabled` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxSettings {
    pub enabled: bool,
    pub interpreter: String,
    pub timeout_secs: u64,
    pub max_output_chars: usize,
    pub cpu_seconds: u64,
    pub memory_kb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub max_iterations: usize,
    pub max_revisions: u32,
    pub revision_marker: String,
    pub max_parallel: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let provider = LlmProvider::OpenAI;
        Self {
            provider,
            model: provider.default_model().to_string(),
            api_key_env: provider.default_api_key_env().to_string(),
            base_url: None,
            max_tokens: defaults::MAX_TOKENS,
        }
    }
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            search_api_key_env: defaults::SEARCH_API_KEY_ENV.to_string(),
            call_timeout_secs: defaults::CALL_TIMEOUT_SECS,
            url_max_chars: defaults::URL_MAX_CHARS,
            url_timeout_secs: defaults::URL_TIMEOUT_SECS,
            sandbox: SandboxSettings::default(),
        }
    }
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interpreter: defaults::SANDBOX_INTERPRETER.to_string(),
            timeout_secs: defaults::SANDBOX_TIMEOUT_SECS,
            max_output_chars: defaults::SANDBOX_MAX_OUTPUT_CHARS,
            cpu_seconds: defaults::SANDBOX_CPU_SECONDS,
            memory_kb: defaults::SANDBOX_MEMORY_KB,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_iterations: defaults::MAX_ITERATIONS,
            max_revisions: defaults::MAX_REVISIONS,
            revision_marker: defaults::REVISION_MARKER.to_string(),
            max_parallel: defaults::MAX_PARALLEL,
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ensemble")
            .join("config.toml")
    }

    /// Load from the default location, falling back to defaults when the file
    /// is missing or unreadable.
    pub fn load() -> Self {
        let config_path = Self::config_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(settings) => return settings,
                Err(e) => tracing::warn!("Ignoring {}: {}", config_path.display(), e),
            }
        }
        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self, EnsembleError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<(), EnsembleError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), EnsembleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| EnsembleError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Switch provider, resetting model and key variable to that provider's defaults.
    pub fn set_provider(&mut self, provider: LlmProvider) {
        if self.llm.provider != provider {
            self.llm.provider = provider;
            self.llm.model = provider.default_model().to_string();
            self.llm.api_key_env = provider.default_api_key_env().to_string();
            self.llm.base_url = None;
        }
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        if self.llm.api_key_env.is_empty() {
            return None;
        }
        std::env::var(&self.llm.api_key_env).ok()
    }

    /// Build the decision backend described by these settings.
    pub fn build_llm_client(&self) -> Result<Arc<dyn LlmClient>, EnsembleError> {
        let provider = self.llm.provider;
        let base_url = self
            .llm
            .base_url
            .clone()
            .unwrap_or_else(|| provider.default_base_url().to_string());

        if provider.is_local() {
            let client = OpenAIClient::local(base_url)
                .with_model(&self.llm.model)
                .with_max_tokens(self.llm.max_tokens);
            return Ok(Arc::new(client));
        }

        let api_key = self.api_key().ok_or_else(|| {
            EnsembleError::Config(format!(
                "API key not found: set the {} environment variable",
                self.llm.api_key_env
            ))
        })?;

        let client: Arc<dyn LlmClient> = match provider {
            LlmProvider::Claude => Arc::new(
                ClaudeClient::new(api_key)
                    .with_model(&self.llm.model)
                    .with_base_url(base_url)
                    .with_max_tokens(self.llm.max_tokens),
            ),
            _ => Arc::new(
                OpenAIClient::new(api_key)
                    .with_model(&self.llm.model)
                    .with_base_url(base_url)
                    .with_max_tokens(self.llm.max_tokens),
            ),
        };
        Ok(client)
    }
}
