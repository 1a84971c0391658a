use crate::agent::{Agent, AgentConfig, AgentEvent};
use crate::capability::CapabilityRegistry;
use crate::constants::defaults;
use crate::error::EnsembleError;
use crate::llm::LlmClient;
use crate::workspace::Workspace;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Validated agent configurations plus what is needed to instantiate them.
pub(crate) struct Roster {
    agents: Vec<AgentConfig>,
    llm: Arc<dyn LlmClient>,
    registry: Arc<CapabilityRegistry>,
    pub(crate) default_iterations: usize,
    pub(crate) agent_event_tx: Option<UnboundedSender<AgentEvent>>,
}

impl Roster {
    pub(crate) fn new(
        agents: Vec<AgentConfig>,
        llm: Arc<dyn LlmClient>,
        registry: Arc<CapabilityRegistry>,
    ) -> Result<Self, EnsembleError> {
        let mut seen = HashSet::new();
        for config in &agents {
            if config.name.trim().is_empty() {
                return Err(EnsembleError::Config("agent name must not be empty".into()));
            }
            if !seen.insert(config.name.as_str()) {
                return Err(EnsembleError::Config(format!(
                    "agent '{}' is configured twice",
                    config.name
                )));
            }
            if let Some(missing) = config.capabilities.iter().find(|n| !registry.contains(n)) {
                return Err(EnsembleError::Config(format!(
                    "agent '{}' references unregistered capability '{}'",
                    config.name, missing
                )));
            }
        }

        for config in &agents {
            match config.revision_target {
                Some(ref target) if !seen.contains(target.as_str()) => {
                    return Err(EnsembleError::UnknownAgent(format!(
                        "revision target '{}' of '{}'",
                        target, config.name
                    )));
                }
                None if config.name.to_lowercase().contains("review") => {
                    tracing::warn!(
                        agent = %config.name,
                        "agent looks like a reviewer but has no revision_target; it will never send work back"
                    );
                }
                _ => {}
            }
        }

        Ok(Self {
            agents,
            llm,
            registry,
            default_iterations: defaults::MAX_ITERATIONS,
            agent_event_tx: None,
        })
    }

    pub(crate) fn configs(&self) -> &[AgentConfig] {
        &self.agents
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.agents.iter().map(|a| a.name.clone()).collect()
    }

    pub(crate) fn get(&self, name: &str) -> Result<&AgentConfig, EnsembleError> {
        self.agents
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| EnsembleError::UnknownAgent(name.to_string()))
    }

    /// Instantiate `config` against this run's workspace.
    pub(crate) fn build(
        &self,
        config: &AgentConfig,
        workspace: &Arc<Workspace>,
    ) -> Result<Agent, EnsembleError> {
        let mut agent = Agent::new(config.clone(), self.llm.clone(), self.registry.clone())?
            .with_workspace(workspace.clone())
            .with_default_iterations(self.default_iterations);
        if let Some(ref tx) = self.agent_event_tx {
            agent = agent.with_events(tx.clone());
        }
        Ok(agent)
    }
}
