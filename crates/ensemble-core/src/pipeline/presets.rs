use super::orchestrator::Pipeline;
use super::routing::DebateRouting;
use crate::agent::AgentConfig;
use crate::capability::CapabilityRegistry;
use crate::constants::defaults;
use crate::error::EnsembleError;
use crate::llm::LlmClient;
use std::sync::Arc;

pub const PRESET_NAMES: &[&str] = &["blog", "qa", "debate"];

const DEBATE_ROUNDS: usize = 2;

/// A ready-made pipeline with an example goal.
#[derive(Debug, Clone)]
pub struct Preset {
    pub name: &'static str,
    pub description: &'static str,
    pub example_goal: &'static str,
    pub agents: Vec<AgentConfig>,
    debate: Option<DebateRouting>,
}

impl Preset {
    pub fn get(name: &str) -> Option<Self> {
        match name {
            "blog" => Some(Self::blog()),
            "qa" => Some(Self::qa()),
            "debate" => Some(Self::debate()),
            _ => None,
        }
    }

    pub fn all() -> Vec<Self> {
        PRESET_NAMES.iter().filter_map(|n| Self::get(n)).collect()
    }

    /// Researcher, Writer, Reviewer. The reviewer can send drafts back to
    /// the writer.
    pub fn blog() -> Self {
        Self {
            name: "blog",
            description: "Research a topic, write a post, review it",
            example_goal: "Write a blog post about the latest AI breakthrough, then review it for sentiment and summarize the review.",
            agents: vec![
                AgentConfig::new(
                    "Researcher",
                    "You are a research agent. Use web search, Wikipedia, and summarization to gather and condense information for the topic provided.",
                )
                .with_capabilities(["web_search", "wikipedia_search", "summarize"]),
                AgentConfig::new(
                    "Writer",
                    "You are a blog writer. Use summarization, translation, and entity extraction to write a clear, engaging article from the research notes provided.",
                )
                .with_capabilities(["summarize", "translate", "extract_entities"]),
                AgentConfig::new(
                    "Reviewer",
                    "You are a critical reviewer. Use sentiment analysis and summarization to review and improve the article provided. If the article is not ready, say that it needs revision and explain why.",
                )
                .with_capabilities(["summarize", "sentiment_analysis"])
                .with_revision_target("Writer"),
            ],
            debate: None,
        }
    }

    pub fn qa() -> Self {
        Self {
            name: "qa",
            description: "Answer a question, then review the answer",
            example_goal: "What is the latest in AI research?",
            agents: vec![
                AgentConfig::new(
                    "QA Researcher",
                    "You are a QA agent. Use web search and summarization to answer questions.",
                )
                .with_capabilities(["web_search", "summarize"]),
                AgentConfig::new(
                    "QA Reviewer",
                    "You are a reviewer. Use sentiment analysis to review the answer. If the answer is inadequate, say that it needs revision.",
                )
                .with_capabilities(["sentiment_analysis"])
                .with_revision_target("QA Researcher"),
            ],
            debate: None,
        }
    }

    /// Pro and Con alternate for two rounds, then the moderator sums up.
    pub fn debate() -> Self {
        Self {
            name: "debate",
            description: "Two agents debate, a moderator summarizes",
            example_goal: "Debate: Should there be strict AI safety regulations?",
            agents: vec![
                AgentConfig::new("Pro Agent", "Argue in favor of AI safety regulations.")
                    .with_capabilities(["summarize"]),
                AgentConfig::new("Con Agent", "Argue against AI safety regulations.")
                    .with_capabilities(["summarize"]),
                AgentConfig::new(
                    "Moderator",
                    "Moderate the debate and summarize the arguments.",
                )
                .with_capabilities(["summarize"]),
            ],
            debate: Some(DebateRouting::new(
                "Pro Agent",
                "Con Agent",
                "Moderator",
                DEBATE_ROUNDS,
            )),
        }
    }

    /// True when agents run in configured order, so the preset also works as
    /// a message chain.
    pub fn is_linear(&self) -> bool {
        self.debate.is_none()
    }

    /// Build the pipeline, with the preset's routing policy if it has one.
    pub fn into_pipeline(
        self,
        llm: Arc<dyn LlmClient>,
        registry: Arc<CapabilityRegistry>,
    ) -> Result<Pipeline, EnsembleError> {
        let pipeline = Pipeline::new(self.agents, llm, registry)?;
        Ok(match self.debate {
            Some(routing) => pipeline.with_routing(routing),
            None => pipeline,
        })
    }
}

/// One general-purpose agent allowed to use every registered capability.
pub fn single_agent(registry: &CapabilityRegistry) -> AgentConfig {
    AgentConfig::new(
        "Assistant",
        "You are a helpful, tool-using agent. Use the available functions to solve the user's request. If you have enough information, provide the final answer.",
    )
    .with_capabilities(registry.names())
    .with_max_iterations(defaults::SINGLE_AGENT_MAX_ITERATIONS)
}
