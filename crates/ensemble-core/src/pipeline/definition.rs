use crate::agent::AgentConfig;
use crate::error::EnsembleError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A pipeline described in TOML:
///
/// ```toml
/// goal = "Write a post about tide pools"
///
/// [[agents]]
/// name = "Researcher"
/// persona = "You research topics."
/// capabilities = ["web_search", "summarize"]
///
/// [[agents]]
/// name = "Reviewer"
/// persona = "You review drafts."
/// revision_target = "Researcher"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default)]
    pub agents: Vec<AgentConfig>,
}

impl PipelineDefinition {
    pub fn parse(content: &str) -> Result<Self, EnsembleError> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: &Path) -> Result<Self, EnsembleError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            EnsembleError::Toml(inner) => {
                EnsembleError::Config(format!("{}: {}", path.display(), inner))
            }
            other => other,
        })
    }

    pub fn to_toml(&self) -> Result<String, EnsembleError> {
        toml::to_string_pretty(self).map_err(|e| EnsembleError::Config(e.to_string()))
    }
}
