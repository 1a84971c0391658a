use super::outcome::{PipelineOutcome, Termination};
use super::roster::Roster;
use crate::agent::{AgentConfig, AgentEvent, Conversation};
use crate::capability::CapabilityRegistry;
use crate::constants::keys;
use crate::error::EnsembleError;
use crate::llm::LlmClient;
use crate::workspace::Workspace;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Message-passing variant: agents run once each in configured order and the
/// conversation is carried from one to the next. Each agent sees the earlier
/// turns under its own persona, with the previous answer appended as a user
/// turn.
pub struct MessageChain {
    roster: Roster,
}

impl MessageChain {
    pub fn new(
        agents: Vec<AgentConfig>,
        llm: Arc<dyn LlmClient>,
        registry: Arc<CapabilityRegistry>,
    ) -> Result<Self, EnsembleError> {
        Ok(Self {
            roster: Roster::new(agents, llm, registry)?,
        })
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.roster.default_iterations = max;
        self
    }

    pub fn with_agent_events(mut self, tx: UnboundedSender<AgentEvent>) -> Self {
        self.roster.agent_event_tx = Some(tx);
        self
    }

    pub async fn run(&self, goal: &str) -> Result<PipelineOutcome, EnsembleError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let workspace = Arc::new(Workspace::new());
        let order: Vec<Value> = self.roster.names().into_iter().map(Value::from).collect();
        workspace.set(keys::PIPELINE, order);

        let mut conversation: Option<Conversation> = None;
        let mut answer = String::new();
        let mut steps = Vec::new();
        let mut hops = 0;

        for config in self.roster.configs() {
            hops += 1;
            tracing::info!(run_id = %run_id, agent = %config.name, hop = hops, "running agent");
            let agent = self.roster.build(config, &workspace)?;

            let outcome = match conversation.take() {
                None => agent.act(goal).await?,
                Some(mut carried) => {
                    carried.add_user_message(answer.as_str());
                    agent.act_with_conversation(carried).await?
                }
            };

            steps.extend(outcome.steps);
            answer = outcome.answer;
            workspace.set(keys::last_answer(&config.name), answer.clone());
            workspace.append(keys::HISTORY, config.name.clone());
            conversation = Some(outcome.conversation);
        }

        let termination = if hops == 0 {
            Termination::NoAgents
        } else {
            Termination::Completed
        };
        tracing::info!(run_id = %run_id, %termination, hops, "chain finished");

        Ok(PipelineOutcome {
            run_id,
            final_answer: answer,
            termination,
            hops,
            steps,
            workspace: workspace.snapshot(),
        })
    }
}
