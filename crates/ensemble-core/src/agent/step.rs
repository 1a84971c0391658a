use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Human-readable record of one thing that happened during a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasoningStep {
    pub agent: String,
    /// 1-based iteration within the agent's loop; absent for orchestrator records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub kind: StepKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    ToolCall {
        capability: String,
        arguments: Value,
        output: String,
        success: bool,
    },
    FinalAnswer,
    HumanStopped,
    SentBackForRevision { target: String, attempt: u32 },
    RevisionLimitReached { target: String, limit: u32 },
}

impl ReasoningStep {
    pub fn tool_call(
        agent: &str,
        index: usize,
        capability: impl Into<String>,
        arguments: Value,
        output: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            agent: agent.to_string(),
            index: Some(index),
            kind: StepKind::ToolCall {
                capability: capability.into(),
                arguments,
                output: output.into(),
                success,
            },
        }
    }

    pub fn final_answer(agent: &str, index: usize) -> Self {
        Self {
            agent: agent.to_string(),
            index: Some(index),
            kind: StepKind::FinalAnswer,
        }
    }

    pub fn orchestrator(agent: &str, kind: StepKind) -> Self {
        Self {
            agent: agent.to_string(),
            index: None,
            kind,
        }
    }
}

impl fmt::Display for ReasoningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(i) => writeln!(f, "**{} Step {}:**", self.agent, i)?,
            None => write!(f, "**{}:** ", self.agent)?,
        }
        match &self.kind {
            StepKind::ToolCall {
                capability,
                arguments,
                output,
                ..
            } => {
                writeln!(f, "Agent called tool: `{capability}` with args: {arguments}")?;
                write!(f, "Tool output: {output}")
            }
            StepKind::FinalAnswer => write!(f, "Agent produced final answer."),
            StepKind::HumanStopped => write!(f, "Human stopped or modified output."),
            StepKind::SentBackForRevision { target, attempt } => {
                write!(f, "Sent back to {target} for revision (attempt {attempt}).")
            }
            StepKind::RevisionLimitReached { target, limit } => {
                write!(f, "Revision limit of {limit} for {target} reached; stopping.")
            }
        }
    }
}
