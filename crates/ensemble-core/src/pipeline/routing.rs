use crate::constants::keys;
use crate::error::EnsembleError;
use crate::workspace::Workspace;

/// Picks the agent that runs after `current`, or `None` to end the run.
///
/// Policies only read the workspace. Closures with the same signature are
/// policies too.
pub trait RoutingPolicy: Send + Sync {
    fn next(
        &self,
        current: &str,
        answer: &str,
        workspace: &Workspace,
    ) -> Result<Option<String>, EnsembleError>;
}

impl<F> RoutingPolicy for F
where
    F: Fn(&str, &str, &Workspace) -> Result<Option<String>, EnsembleError> + Send + Sync,
{
    fn next(
        &self,
        current: &str,
        answer: &str,
        workspace: &Workspace,
    ) -> Result<Option<String>, EnsembleError> {
        self(current, answer, workspace)
    }
}

/// Advance through the order stored under the `pipeline` key.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRouting;

impl RoutingPolicy for LinearRouting {
    fn next(
        &self,
        current: &str,
        _answer: &str,
        workspace: &Workspace,
    ) -> Result<Option<String>, EnsembleError> {
        let order = pipeline_order(workspace)?;
        let position = order.iter().position(|name| name == current).ok_or_else(|| {
            EnsembleError::RoutingConfiguration(format!(
                "agent '{current}' is not in the pipeline order"
            ))
        })?;
        Ok(order.get(position + 1).cloned())
    }
}

/// Read the agent order from the workspace.
pub fn pipeline_order(workspace: &Workspace) -> Result<Vec<String>, EnsembleError> {
    let value = workspace.get(keys::PIPELINE).ok_or_else(|| {
        EnsembleError::RoutingConfiguration(format!(
            "workspace has no '{}' entry",
            keys::PIPELINE
        ))
    })?;
    let entries = value.as_array().ok_or_else(|| {
        EnsembleError::RoutingConfiguration(format!("'{}' is not a list", keys::PIPELINE))
    })?;
    entries
        .iter()
        .map(|entry| {
            entry.as_str().map(str::to_string).ok_or_else(|| {
                EnsembleError::RoutingConfiguration(format!(
                    "'{}' entry {entry} is not an agent name",
                    keys::PIPELINE
                ))
            })
        })
        .collect()
}

/// Two sides argue for a number of rounds, then a moderator closes.
///
/// Rounds are counted from the hop history the orchestrator records, so the
/// policy itself keeps no state.
#[derive(Debug, Clone)]
pub struct DebateRouting {
    pro: String,
    con: String,
    moderator: String,
    rounds: usize,
}

impl DebateRouting {
    pub fn new(
        pro: impl Into<String>,
        con: impl Into<String>,
        moderator: impl Into<String>,
        rounds: usize,
    ) -> Self {
        Self {
            pro: pro.into(),
            con: con.into(),
            moderator: moderator.into(),
            rounds: rounds.max(1),
        }
    }

    fn completed_rounds(&self, workspace: &Workspace) -> usize {
        workspace
            .get(keys::HISTORY)
            .and_then(|v| {
                v.as_array()
                    .map(|hops| hops.iter().filter(|h| h.as_str() == Some(self.con.as_str())).count())
            })
            .unwrap_or(0)
    }
}

impl RoutingPolicy for DebateRouting {
    fn next(
        &self,
        current: &str,
        _answer: &str,
        workspace: &Workspace,
    ) -> Result<Option<String>, EnsembleError> {
        if current == self.pro {
            Ok(Some(self.con.clone()))
        } else if current == self.con {
            if self.completed_rounds(workspace) < self.rounds {
                Ok(Some(self.pro.clone()))
            } else {
                Ok(Some(self.moderator.clone()))
            }
        } else if current == self.moderator {
            Ok(None)
        } else {
            Err(EnsembleError::RoutingConfiguration(format!(
                "agent '{current}' is not part of the debate"
            )))
        }
    }
}
