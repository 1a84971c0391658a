mod traits;
mod registry;
mod calculator;
mod clock;
mod code_executor;
mod text;
mod url_reader;
mod web_search;

pub use traits::*;
pub use registry::CapabilityRegistry;
pub use calculator::{evaluate, format_number, CalcError, CalculatorTool};
pub use clock::{GetDateTool, GetTimeTool};
pub use code_executor::CodeExecutorTool;
pub use text::{TextTask, TextTransformTool};
pub use url_reader::{truncate_chars, UrlReaderTool};
pub use web_search::{WebSearchTool, WikipediaSearchTool};

use crate::config::ToolSettings;
use crate::error::EnsembleError;
use crate::llm::LlmClient;
use std::sync::Arc;
use std::time::Duration;

/// The standard capability set. `llm` backs the text-transform capabilities;
/// the code executor is only added when the sandbox is enabled.
pub fn builtin_registry(
    settings: &ToolSettings,
    llm: Arc<dyn LlmClient>,
) -> Result<CapabilityRegistry, EnsembleError> {
    let call_timeout = Duration::from_secs(settings.call_timeout_secs);
    let mut registry = CapabilityRegistry::new().with_call_timeout(call_timeout);

    registry.register(Box::new(
        WebSearchTool::new(&settings.search_api_key_env).with_timeout(call_timeout),
    ))?;
    registry.register(Box::new(CalculatorTool))?;
    for task in TextTask::all() {
        registry.register(Box::new(TextTransformTool::new(task, llm.clone())))?;
    }
    registry.register(Box::new(GetTimeTool))?;
    registry.register(Box::new(GetDateTool))?;
    registry.register(Box::new(WikipediaSearchTool::new()))?;
    registry.register(Box::new(UrlReaderTool::new(
        settings.url_max_chars,
        Duration::from_secs(settings.url_timeout_secs),
    )))?;
    if settings.sandbox.enabled {
        registry.register(Box::new(CodeExecutorTool::new(settings.sandbox.clone())))?;
    }

    tracing::debug!(capabilities = ?registry.names(), "built-in registry ready");
    Ok(registry)
}
