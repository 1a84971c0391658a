use super::Workspace;
use crate::constants::keys;
use serde::{Deserialize, Serialize};

/// A message waiting in an agent's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: String,
    pub content: String,
}

impl Workspace {
    /// Queue a message for `to`. Inboxes are FIFO per recipient.
    pub fn send(&self, from: &str, to: &str, content: impl Into<String>) {
        let envelope = Envelope {
            from: from.to_string(),
            content: content.into(),
        };
        // Envelope serialization cannot fail: two string fields.
        let value = serde_json::to_value(&envelope).unwrap_or_default();
        self.append(keys::inbox(to), value);
    }

    /// Swap the inbox of `agent` for an empty one and return what was in it.
    /// Each message is returned by exactly one call.
    pub fn receive(&self, agent: &str) -> Vec<Envelope> {
        self.drain(&keys::inbox(agent))
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<Envelope>(v.clone()) {
                Ok(envelope) => Some(envelope),
                Err(_) => {
                    tracing::warn!(agent, "dropping malformed inbox entry: {}", v);
                    None
                }
            })
            .collect()
    }

    /// Number of messages waiting for `agent`.
    pub fn pending(&self, agent: &str) -> usize {
        self.get(&keys::inbox(agent))
            .and_then(|v| v.as_array().map(|a| a.len()))
            .unwrap_or(0)
    }
}
