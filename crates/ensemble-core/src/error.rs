use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnsembleError {
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Capability error: {capability}: {message}")]
    CapabilityExecution { capability: String, message: String },

    #[error("Capability already registered: {0}")]
    DuplicateCapability(String),

    #[error("Routing configuration error: {0}")]
    RoutingConfiguration(String),

    #[error("Unknown agent: {0}")]
    UnknownAgent(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl EnsembleError {
    pub fn execution(capability: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CapabilityExecution {
            capability: capability.into(),
            message: message.into(),
        }
    }

    /// Capability-level failures are fed back to the agent as observations;
    /// everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownCapability(_) | Self::CapabilityExecution { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, EnsembleError>;
