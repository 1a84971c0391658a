mod chain;
mod critic;
mod definition;
mod orchestrator;
mod outcome;
mod roster;
pub mod parallel;
pub mod presets;
pub mod routing;

pub use chain::MessageChain;
pub use critic::CriticPolicy;
pub use definition::PipelineDefinition;
pub use orchestrator::{HumanGateFn, Pipeline, PipelineEvent};
pub use outcome::{PipelineOutcome, Termination, Transition};
pub use parallel::{fan_out, run_parallel};
pub use presets::{single_agent, Preset, PRESET_NAMES};
pub use routing::{DebateRouting, LinearRouting, RoutingPolicy};
