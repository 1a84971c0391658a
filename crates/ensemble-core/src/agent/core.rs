use crate::agent::config::AgentConfig;
use crate::agent::conversation::Conversation;
use crate::agent::step::ReasoningStep;
use crate::capability::{CapabilityDescriptor, CapabilityRegistry};
use crate::constants::{defaults, keys, INCOMPLETE_ANSWER};
use crate::error::EnsembleError;
use crate::llm::{CapabilityRequest, Decision, LlmClient};
use crate::workspace::{Envelope, Workspace};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Events emitted while an agent works - the shared CLI/UI interface.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Thinking { agent: String, iteration: usize },
    MessagesReceived { agent: String, count: usize },
    ToolStart { agent: String, name: String },
    ToolResult { agent: String, name: String, success: bool, summary: String },
    Complete { agent: String, iterations: usize },
    Exhausted { agent: String, iterations: usize },
}

/// Result of one `act` call.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub answer: String,
    /// False when the iteration budget ran out; `answer` is then the
    /// incomplete-answer sentinel.
    pub completed: bool,
    pub iterations: usize,
    pub steps: Vec<ReasoningStep>,
    pub conversation: Conversation,
}

pub struct Agent {
    config: AgentConfig,
    capabilities: Vec<CapabilityDescriptor>,
    llm: Arc<dyn LlmClient>,
    registry: Arc<CapabilityRegistry>,
    workspace: Option<Arc<Workspace>>,
    max_iterations: usize,
    event_tx: Option<UnboundedSender<AgentEvent>>,
}

impl Agent {
    /// Build an agent. Every capability the config names must be registered.
    pub fn new(
        config: AgentConfig,
        llm: Arc<dyn LlmClient>,
        registry: Arc<CapabilityRegistry>,
    ) -> Result<Self, EnsembleError> {
        if config.name.trim().is_empty() {
            return Err(EnsembleError::Config("agent name must not be empty".into()));
        }
        if let Some(missing) = config.capabilities.iter().find(|n| !registry.contains(n)) {
            return Err(EnsembleError::Config(format!(
                "agent '{}' references unregistered capability '{}'",
                config.name, missing
            )));
        }

        let capabilities = registry.resolve(&config.capabilities);
        let max_iterations = config.max_iterations.unwrap_or(defaults::MAX_ITERATIONS);

        Ok(Self {
            config,
            capabilities,
            llm,
            registry,
            workspace: None,
            max_iterations,
            event_tx: None,
        })
    }

    pub fn with_workspace(mut self, workspace: Arc<Workspace>) -> Self {
        self.workspace = Some(workspace);
        self
    }

    /// Budget used when the config does not set one.
    pub fn with_default_iterations(mut self, max: usize) -> Self {
        if self.config.max_iterations.is_none() {
            self.max_iterations = max;
        }
        self
    }

    pub fn with_events(mut self, tx: UnboundedSender<AgentEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn capabilities(&self) -> &[CapabilityDescriptor] {
        &self.capabilities
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn send(&self, to: &str, content: impl Into<String>) {
        if let Some(ref ws) = self.workspace {
            ws.send(self.name(), to, content);
        }
    }

    pub fn receive(&self) -> Vec<Envelope> {
        match self.workspace {
            Some(ref ws) => ws.receive(self.name()),
            None => Vec::new(),
        }
    }

    /// Work on `goal` with a fresh conversation: persona, then goal.
    pub async fn act(&self, goal: &str) -> Result<AgentOutcome, EnsembleError> {
        self.act_with_conversation(Conversation::new(&self.config.persona, goal))
            .await
    }

    /// Continue an existing conversation. Its leading system turn is replaced
    /// by this agent's persona.
    pub async fn act_with_conversation(
        &self,
        mut conversation: Conversation,
    ) -> Result<AgentOutcome, EnsembleError> {
        conversation.set_persona(&self.config.persona);
        let mut steps = Vec::new();

        for iteration in 1..=self.max_iterations {
            self.emit(AgentEvent::Thinking {
                agent: self.name().to_string(),
                iteration,
            });

            let inbound = self.receive();
            if !inbound.is_empty() {
                self.emit(AgentEvent::MessagesReceived {
                    agent: self.name().to_string(),
                    count: inbound.len(),
                });
                for envelope in &inbound {
                    conversation.add_inbound(envelope);
                }
            }

            let response = self
                .llm
                .chat(conversation.messages(), &self.capabilities)
                .await?;
            let content = response.message.content.clone();

            match Decision::from_response(response) {
                Decision::Invoke(mut request) => {
                    if request.call.id.is_empty() {
                        request.call.id = format!("call_{}", uuid::Uuid::new_v4().simple());
                    }
                    let (arguments, success, output) = self.run_capability(&request).await;
                    let name = request.capability().to_string();
                    let call_id = request.call.id.clone();
                    steps.push(ReasoningStep::tool_call(
                        self.name(),
                        iteration,
                        &name,
                        arguments,
                        &output,
                        success,
                    ));
                    conversation.add_tool_request(content, request.call);
                    conversation.add_observation(call_id, name, output);
                }
                Decision::Answer(answer) => {
                    tracing::debug!(agent = self.name(), iteration, "final answer");
                    self.emit(AgentEvent::Complete {
                        agent: self.name().to_string(),
                        iterations: iteration,
                    });
                    conversation.add_assistant_message(&answer);
                    steps.push(ReasoningStep::final_answer(self.name(), iteration));
                    return Ok(AgentOutcome {
                        answer,
                        completed: true,
                        iterations: iteration,
                        steps,
                        conversation,
                    });
                }
            }
        }

        tracing::warn!(
            agent = self.name(),
            iterations = self.max_iterations,
            "iteration budget exhausted without a final answer"
        );
        self.emit(AgentEvent::Exhausted {
            agent: self.name().to_string(),
            iterations: self.max_iterations,
        });

        Ok(AgentOutcome {
            answer: INCOMPLETE_ANSWER.to_string(),
            completed: false,
            iterations: self.max_iterations,
            steps,
            conversation,
        })
    }

    /// Invoke the requested capability. Failures come back as observation
    /// text; returns the decoded arguments, success flag and observation.
    async fn run_capability(&self, request: &CapabilityRequest) -> (Value, bool, String) {
        let name = request.capability();
        self.emit(AgentEvent::ToolStart {
            agent: self.name().to_string(),
            name: name.to_string(),
        });

        let arguments = request.arguments();
        let recorded_args = match &arguments {
            Ok(args) => args.clone(),
            Err(_) => Value::String(request.call.function.arguments.clone()),
        };

        let result = if !self.can_use(name) {
            Err(EnsembleError::UnknownCapability(name.to_string()))
        } else {
            match arguments {
                Ok(args) => self.registry.invoke(name, args).await,
                Err(e) => Err(e),
            }
        };

        let (success, output) = match result {
            Ok(output) => {
                if let Some(ref ws) = self.workspace {
                    ws.set(keys::last_tool_result(self.name()), output.clone());
                }
                (true, output)
            }
            Err(e) => {
                tracing::warn!(agent = self.name(), capability = name, "capability failed: {}", e);
                (false, format!("[Error: {e}]"))
            }
        };

        self.emit(AgentEvent::ToolResult {
            agent: self.name().to_string(),
            name: name.to_string(),
            success,
            summary: truncate_str(&output, 200),
        });

        (recorded_args, success, output)
    }

    fn can_use(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c.name == capability)
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}
