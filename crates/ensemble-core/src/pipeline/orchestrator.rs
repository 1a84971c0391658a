use super::critic::{CriticPolicy, RevisionLedger};
use super::outcome::{PipelineOutcome, Termination, Transition};
use super::roster::Roster;
use super::routing::{LinearRouting, RoutingPolicy};
use crate::agent::{AgentConfig, AgentEvent, ReasoningStep, StepKind};
use crate::capability::CapabilityRegistry;
use crate::config::PipelineSettings;
use crate::constants::keys;
use crate::error::EnsembleError;
use crate::llm::LlmClient;
use crate::workspace::Workspace;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Called with an agent's name and answer before routing. Returns true to
/// continue, false to stop the run with that answer.
pub type HumanGateFn =
    Box<dyn Fn(String, String) -> Pin<Box<dyn Future<Output = bool> + Send>> + Send + Sync>;

/// Progress of a pipeline run, for CLIs and UIs.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    AgentStarted { agent: String, hop: usize },
    AgentFinished { agent: String, answer: String, completed: bool },
    RevisionRequested { reviewer: String, target: String, attempt: u32 },
    Terminated { termination: Termination, final_answer: String },
}

/// Runs agents one at a time over a shared workspace:
/// select, run, human gate, critic check, route.
pub struct Pipeline {
    roster: Roster,
    routing: Option<Box<dyn RoutingPolicy>>,
    human_gate: Option<HumanGateFn>,
    critic: CriticPolicy,
    event_tx: Option<UnboundedSender<PipelineEvent>>,
}

impl Pipeline {
    /// Validates the agent list: unique non-empty names, registered
    /// capabilities, and revision targets that name configured agents.
    pub fn new(
        agents: Vec<AgentConfig>,
        llm: Arc<dyn LlmClient>,
        registry: Arc<CapabilityRegistry>,
    ) -> Result<Self, EnsembleError> {
        Ok(Self {
            roster: Roster::new(agents, llm, registry)?,
            routing: None,
            human_gate: None,
            critic: CriticPolicy::default(),
            event_tx: None,
        })
    }

    /// Replace linear routing with a custom policy.
    pub fn with_routing(mut self, policy: impl RoutingPolicy + 'static) -> Self {
        self.routing = Some(Box::new(policy));
        self
    }

    pub fn with_human_gate(mut self, gate: HumanGateFn) -> Self {
        self.human_gate = Some(gate);
        self
    }

    pub fn with_critic(mut self, critic: CriticPolicy) -> Self {
        self.critic = critic;
        self
    }

    /// Iteration budget for agents whose config does not set one.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.roster.default_iterations = max;
        self
    }

    pub fn with_settings(self, settings: &PipelineSettings) -> Self {
        self.with_max_iterations(settings.max_iterations)
            .with_critic(CriticPolicy::from_settings(settings))
    }

    pub fn with_events(mut self, tx: UnboundedSender<PipelineEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_agent_events(mut self, tx: UnboundedSender<AgentEvent>) -> Self {
        self.roster.agent_event_tx = Some(tx);
        self
    }

    pub fn agents(&self) -> &[AgentConfig] {
        self.roster.configs()
    }

    /// Run with a fresh workspace.
    pub async fn run(&self, goal: &str) -> Result<PipelineOutcome, EnsembleError> {
        self.run_with_workspace(goal, Arc::new(Workspace::new()))
            .await
    }

    /// Run against a caller-supplied workspace, e.g. one with messages
    /// already queued.
    pub async fn run_with_workspace(
        &self,
        goal: &str,
        workspace: Arc<Workspace>,
    ) -> Result<PipelineOutcome, EnsembleError> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let order: Vec<Value> = self.roster.names().into_iter().map(Value::from).collect();
        workspace.set(keys::PIPELINE, order);

        let Some(first) = self.roster.configs().first() else {
            tracing::info!(run_id = %run_id, "pipeline has no agents");
            return Ok(self.finish(run_id, String::new(), Termination::NoAgents, 0, Vec::new(), &workspace));
        };

        let mut current = first.name.clone();
        let mut input = goal.to_string();
        let mut steps = Vec::new();
        let mut revisions = RevisionLedger::default();
        let mut hops = 0;

        loop {
            let config = self.roster.get(&current)?;
            hops += 1;
            tracing::info!(run_id = %run_id, agent = %current, hop = hops, "running agent");
            self.emit(PipelineEvent::AgentStarted {
                agent: current.clone(),
                hop: hops,
            });

            let agent = self.roster.build(config, &workspace)?;
            let outcome = agent.act(&input).await?;
            steps.extend(outcome.steps);
            let answer = outcome.answer;

            workspace.set(keys::last_answer(&current), answer.clone());
            workspace.append(keys::HISTORY, current.clone());
            self.emit(PipelineEvent::AgentFinished {
                agent: current.clone(),
                answer: answer.clone(),
                completed: outcome.completed,
            });

            match self
                .transition(config, &answer, &workspace, &mut revisions, &mut steps)
                .await?
            {
                Transition::Continue { next, input: next_input } => {
                    current = next;
                    input = next_input;
                }
                Transition::Revise {
                    target,
                    input: next_input,
                    attempt,
                } => {
                    self.emit(PipelineEvent::RevisionRequested {
                        reviewer: current.clone(),
                        target: target.clone(),
                        attempt,
                    });
                    current = target;
                    input = next_input;
                }
                Transition::Terminate(termination) => {
                    tracing::info!(run_id = %run_id, %termination, hops, "pipeline finished");
                    return Ok(self.finish(run_id, answer, termination, hops, steps, &workspace));
                }
            }
        }
    }

    /// Human gate, then critic check, then routing.
    async fn transition(
        &self,
        config: &AgentConfig,
        answer: &str,
        workspace: &Workspace,
        revisions: &mut RevisionLedger,
        steps: &mut Vec<ReasoningStep>,
    ) -> Result<Transition, EnsembleError> {
        let name = config.name.as_str();

        if let Some(ref gate) = self.human_gate {
            if !gate(name.to_string(), answer.to_string()).await {
                steps.push(ReasoningStep::orchestrator(name, StepKind::HumanStopped));
                return Ok(Transition::Terminate(Termination::HumanRejected));
            }
        }

        if let Some(ref target) = config.revision_target {
            if self.critic.requests_revision(answer) {
                let attempt = revisions.record(name, target);
                let limit = self.critic.max_revisions();
                if attempt > limit {
                    tracing::warn!(reviewer = name, target = %target, limit, "revision limit reached");
                    steps.push(ReasoningStep::orchestrator(
                        name,
                        StepKind::RevisionLimitReached {
                            target: target.clone(),
                            limit,
                        },
                    ));
                    return Ok(Transition::Terminate(Termination::MaxRevisionsExceeded));
                }

                self.roster.get(target)?;
                let input = workspace
                    .get_str(&keys::last_tool_result(target))
                    .unwrap_or_else(|| answer.to_string());
                steps.push(ReasoningStep::orchestrator(
                    name,
                    StepKind::SentBackForRevision {
                        target: target.clone(),
                        attempt,
                    },
                ));
                tracing::info!(reviewer = name, target = %target, attempt, "sending back for revision");
                return Ok(Transition::Revise {
                    target: target.clone(),
                    input,
                    attempt,
                });
            }
        }

        let next = match self.routing {
            Some(ref policy) => policy.next(name, answer, workspace)?,
            None => LinearRouting.next(name, answer, workspace)?,
        };
        match next {
            Some(next) => {
                if self.roster.get(&next).is_err() {
                    return Err(EnsembleError::RoutingConfiguration(format!(
                        "routing from '{name}' selected unknown agent '{next}'"
                    )));
                }
                Ok(Transition::Continue {
                    next,
                    input: answer.to_string(),
                })
            }
            None => Ok(Transition::Terminate(Termination::Completed)),
        }
    }

    fn finish(
        &self,
        run_id: String,
        final_answer: String,
        termination: Termination,
        hops: usize,
        steps: Vec<ReasoningStep>,
        workspace: &Workspace,
    ) -> PipelineOutcome {
        self.emit(PipelineEvent::Terminated {
            termination,
            final_answer: final_answer.clone(),
        });
        PipelineOutcome {
            run_id,
            final_answer,
            termination,
            hops,
            steps,
            workspace: workspace.snapshot(),
        }
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }
}
