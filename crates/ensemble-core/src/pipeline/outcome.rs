use crate::agent::ReasoningStep;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Routing returned no next agent.
    Completed,
    /// The human gate rejected an answer.
    HumanRejected,
    /// A reviewer kept asking for revisions past the limit.
    MaxRevisionsExceeded,
    /// The pipeline had no agents.
    NoAgents,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Termination::Completed => "completed",
            Termination::HumanRejected => "stopped by human",
            Termination::MaxRevisionsExceeded => "max revisions exceeded",
            Termination::NoAgents => "no agents configured",
        };
        f.write_str(label)
    }
}

/// What the orchestrator does after an agent answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    Continue { next: String, input: String },
    Revise { target: String, input: String, attempt: u32 },
    Terminate(Termination),
}

/// Everything a finished run hands back to its caller.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub run_id: String,
    pub final_answer: String,
    pub termination: Termination,
    /// Agent turns taken, revisions included.
    pub hops: usize,
    pub steps: Vec<ReasoningStep>,
    pub workspace: BTreeMap<String, Value>,
}

impl PipelineOutcome {
    /// Reasoning steps rendered one string per step.
    pub fn step_lines(&self) -> Vec<String> {
        self.steps.iter().map(ToString::to_string).collect()
    }
}
