use super::roster::Roster;
use crate::agent::{AgentConfig, AgentOutcome};
use crate::capability::CapabilityRegistry;
use crate::error::EnsembleError;
use crate::llm::LlmClient;
use crate::workspace::Workspace;
use futures::stream::{self, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;

/// Run `tasks` with at most `max_parallel` in flight. Results come back in
/// submission order regardless of completion order.
pub async fn run_parallel<I, F, T>(tasks: I, max_parallel: usize) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = T>,
{
    stream::iter(tasks)
        .buffered(max_parallel.max(1))
        .collect()
        .await
}

/// Invoke several capabilities concurrently.
pub async fn invoke_all(
    registry: &CapabilityRegistry,
    calls: Vec<(String, Value)>,
    max_parallel: usize,
) -> Vec<Result<String, EnsembleError>> {
    let tasks = calls
        .into_iter()
        .map(|(name, args)| async move { registry.invoke(&name, args).await });
    run_parallel(tasks, max_parallel).await
}

/// Run independent agents on their own goals against one shared workspace.
///
/// Configurations are validated before anything runs. Each agent's failure is
/// reported in its own slot.
pub async fn fan_out(
    assignments: Vec<(AgentConfig, String)>,
    llm: Arc<dyn LlmClient>,
    registry: Arc<CapabilityRegistry>,
    workspace: Arc<Workspace>,
    max_parallel: usize,
) -> Result<Vec<Result<AgentOutcome, EnsembleError>>, EnsembleError> {
    let (configs, goals): (Vec<_>, Vec<_>) = assignments.into_iter().unzip();
    let roster = Roster::new(configs, llm, registry)?;
    let agents = roster
        .configs()
        .iter()
        .map(|config| roster.build(config, &workspace))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(agents = agents.len(), max_parallel, "fanning out");
    let tasks = agents
        .iter()
        .zip(goals.iter())
        .map(|(agent, goal)| agent.act(goal));
    Ok(run_parallel(tasks, max_parallel).await)
}
