pub mod agent;
pub mod capability;
pub mod config;
pub mod constants;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod workspace;

// Re-export key types
pub use agent::{Agent, AgentConfig, AgentEvent, AgentOutcome, ReasoningStep};
pub use capability::{builtin_registry, Capability, CapabilityDescriptor, CapabilityRegistry};
pub use config::Settings;
pub use error::{EnsembleError, Result};
pub use llm::{Decision, LlmClient, LlmResponse, Message, Role};
pub use pipeline::{
    MessageChain, Pipeline, PipelineDefinition, PipelineEvent, PipelineOutcome, Preset,
    Termination,
};
pub use workspace::{Envelope, Workspace};
