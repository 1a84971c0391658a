use crate::capability::traits::{required_str, string_params_schema, Capability, CapabilityResult};
use crate::error::EnsembleError;
use crate::llm::LlmClient;
use serde_json::Value;
use std::sync::Arc;

/// Text-to-text capabilities that delegate to a language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextTask {
    Summarize,
    ExtractEntities,
    SentimentAnalysis,
    Translate,
}

impl TextTask {
    pub fn all() -> [TextTask; 4] {
        [
            TextTask::Summarize,
            TextTask::Translate,
            TextTask::ExtractEntities,
            TextTask::SentimentAnalysis,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextTask::Summarize => "summarize",
            TextTask::ExtractEntities => "extract_entities",
            TextTask::SentimentAnalysis => "sentiment_analysis",
            TextTask::Translate => "translate",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            TextTask::Summarize => "Summarize a block of text.",
            TextTask::ExtractEntities => "Extract named entities from text.",
            TextTask::SentimentAnalysis => "Analyze sentiment of text.",
            TextTask::Translate => "Translate text to a target language.",
        }
    }

    fn prompt(&self, text: &str, target_language: Option<&str>) -> String {
        match self {
            TextTask::Summarize => {
                format!("Summarize the following text in 2 sentences:\n{text}")
            }
            TextTask::ExtractEntities => format!(
                "Extract all named entities (people, places, organizations, dates, etc.) \
                 from the following text as a comma-separated list:\n{text}"
            ),
            TextTask::SentimentAnalysis => format!(
                "What is the sentiment of the following text? \
                 Respond with Positive, Negative, or Neutral.\n{text}"
            ),
            TextTask::Translate => format!(
                "Translate the following text to {}:\n{text}",
                target_language.unwrap_or("English")
            ),
        }
    }
}

pub struct TextTransformTool {
    task: TextTask,
    llm: Arc<dyn LlmClient>,
}

impl TextTransformTool {
    pub fn new(task: TextTask, llm: Arc<dyn LlmClient>) -> Self {
        Self { task, llm }
    }
}

#[async_trait::async_trait]
impl Capability for TextTransformTool {
    fn name(&self) -> &str {
        self.task.name()
    }

    fn description(&self) -> &str {
        self.task.description()
    }

    fn parameters_schema(&self) -> Value {
        match self.task {
            TextTask::Translate => string_params_schema(
                &[
                    ("text", "Text to translate"),
                    ("target_language", "Language to translate into"),
                ],
                &["text", "target_language"],
            ),
            _ => string_params_schema(&[("text", "Input text")], &["text"]),
        }
    }

    async fn invoke(&self, args: Value) -> CapabilityResult {
        let text = required_str(&args, self.name(), "text")?;
        let target_language = match self.task {
            TextTask::Translate => Some(required_str(&args, self.name(), "target_language")?),
            _ => None,
        };

        let prompt = self.task.prompt(text, target_language);
        self.llm
            .complete(&prompt)
            .await
            .map_err(|e| EnsembleError::execution(self.name(), e.to_string()))
    }
}
