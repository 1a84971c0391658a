mod traits;
mod claude;
mod openai;
pub mod decision;

pub use traits::*;
pub use claude::ClaudeClient;
pub use openai::OpenAIClient;
pub use decision::{CapabilityRequest, Decision};
