use serde::{Deserialize, Serialize};

/// Static description of one agent in a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Identity, unique within a run.
    pub name: String,
    /// System instruction, sent as the first turn.
    pub persona: String,
    /// Capability names this agent may invoke.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Per-agent iteration budget; the pipeline default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
    /// Set on reviewer agents: where work goes when the review asks for revision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision_target: Option<String>,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>, persona: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            persona: persona.into(),
            capabilities: Vec::new(),
            max_iterations: None,
            revision_target: None,
        }
    }

    pub fn with_capabilities<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.capabilities = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn with_revision_target(mut self, target: impl Into<String>) -> Self {
        self.revision_target = Some(target.into());
        self
    }

    pub fn is_reviewer(&self) -> bool {
        self.revision_target.is_some()
    }
}
