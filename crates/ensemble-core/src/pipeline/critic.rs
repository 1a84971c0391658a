use crate::config::PipelineSettings;
use crate::constants::defaults;
use std::collections::HashMap;

/// Decides when a reviewer's answer sends work back, and how often.
#[derive(Debug, Clone)]
pub struct CriticPolicy {
    marker: String,
    max_revisions: u32,
}

impl CriticPolicy {
    pub fn new(marker: impl AsRef<str>, max_revisions: u32) -> Self {
        Self {
            marker: marker.as_ref().to_lowercase(),
            max_revisions,
        }
    }

    pub fn from_settings(settings: &PipelineSettings) -> Self {
        Self::new(&settings.revision_marker, settings.max_revisions)
    }

    /// Case-insensitive substring match on the marker phrase.
    pub fn requests_revision(&self, answer: &str) -> bool {
        !self.marker.is_empty() && answer.to_lowercase().contains(&self.marker)
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn max_revisions(&self) -> u32 {
        self.max_revisions
    }
}

impl Default for CriticPolicy {
    fn default() -> Self {
        Self::new(defaults::REVISION_MARKER, defaults::MAX_REVISIONS)
    }
}

/// Revision attempts per (reviewer, target) pair within one run.
#[derive(Debug, Default)]
pub(crate) struct RevisionLedger {
    attempts: HashMap<(String, String), u32>,
}

impl RevisionLedger {
    /// Count one more send-back and return the attempt number, starting at 1.
    pub(crate) fn record(&mut self, reviewer: &str, target: &str) -> u32 {
        let count = self
            .attempts
            .entry((reviewer.to_string(), target.to_string()))
            .or_insert(0);
        *count += 1;
        *count
    }
}
