mod config;
mod conversation;
mod core;
mod step;

pub use self::core::{Agent, AgentEvent, AgentOutcome};
pub use config::AgentConfig;
pub use conversation::Conversation;
pub use step::{ReasoningStep, StepKind};
