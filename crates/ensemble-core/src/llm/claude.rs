use crate::capability::CapabilityDescriptor;
use crate::constants::{defaults, endpoints, models};
use crate::error::EnsembleError;
use crate::llm::traits::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
pub struct ClaudeClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: u32,
}

impl ClaudeClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: models::DEFAULT_CLAUDE_MODEL.to_string(),
            base_url: endpoints::CLAUDE_BASE_URL.to_string(),
            max_tokens: defaults::MAX_TOKENS,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    fn request<'a>(
        &'a self,
        messages: &[Message],
        capabilities: &'a [CapabilityDescriptor],
    ) -> MessagesRequest<'a> {
        let personas: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: (!personas.is_empty()).then(|| personas.join("\n\n")),
            messages: messages.iter().filter_map(Turn::from_message).collect(),
            tools: capabilities.iter().map(ToolSpec::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Turn>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolSpec<'a>>,
}

#[derive(Debug, Serialize)]
struct ToolSpec<'a> {
    name: &'a str,
    description: &'a str,
    input_schema: &'a Value,
}

impl<'a> From<&'a CapabilityDescriptor> for ToolSpec<'a> {
    fn from(c: &'a CapabilityDescriptor) -> Self {
        Self {
            name: &c.name,
            description: &c.description,
            input_schema: &c.parameters,
        }
    }
}

#[derive(Debug, Serialize)]
struct Turn {
    role: &'static str,
    content: Vec<Block>,
}

impl Turn {
    /// Persona turns travel in the request's `system` field instead.
    fn from_message(message: &Message) -> Option<Self> {
        if message.is_observation() {
            return Some(Self {
                role: "user",
                content: vec![Block::ToolResult {
                    tool_use_id: message.tool_call_id.clone().unwrap_or_default(),
                    content: message.content.clone(),
                }],
            });
        }

        let role = match message.role {
            Role::System => return None,
            Role::User => "user",
            Role::Assistant => "assistant",
        };

        let mut content = Vec::new();
        if !message.content.is_empty() || message.tool_calls.is_none() {
            content.push(Block::Text {
                text: message.content.clone(),
            });
        }
        for call in message.tool_calls.iter().flatten() {
            content.push(Block::ToolUse {
                id: call.id.clone(),
                name: call.function.name.clone(),
                input: call
                    .parse_arguments()
                    .unwrap_or_else(|_| Value::Object(Default::default())),
            });
        }
        Some(Self { role, content })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<Block>,
    usage: Option<MessagesUsage>,
}

#[derive(Debug, Deserialize)]
struct MessagesUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl MessagesResponse {
    /// Text blocks are joined into one answer; tool_use blocks become calls.
    fn into_response(self) -> LlmResponse {
        let mut text = String::new();
        let mut calls = Vec::new();
        for block in self.content {
            match block {
                Block::Text { text: t } => text.push_str(&t),
                Block::ToolUse { id, name, input } => {
                    calls.push(ToolCall::new(id, name, input.to_string()))
                }
                Block::ToolResult { .. } | Block::Unsupported => {}
            }
        }

        let message = if calls.is_empty() {
            Message::assistant(text)
        } else {
            Message::assistant_with_tools(text, calls)
        };
        LlmResponse {
            message,
            usage: self.usage.map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for ClaudeClient {
    async fn chat(
        &self,
        messages: &[Message],
        capabilities: &[CapabilityDescriptor],
    ) -> Result<LlmResponse, EnsembleError> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request(messages, capabilities))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EnsembleError::Llm(format!("Claude API error ({status}): {body}")));
        }

        let parsed: MessagesResponse = serde_json::from_str(&body)
            .map_err(|e| EnsembleError::Llm(format!("Failed to parse response: {e}")))?;
        Ok(parsed.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn persona_moves_to_system_and_observations_to_tool_results() {
        let client = ClaudeClient::new("key");
        let capabilities = vec![CapabilityDescriptor::new(
            "get_date",
            "Today's date",
            json!({"type": "object"}),
        )];
        let messages = vec![
            Message::system("persona"),
            Message::user("goal"),
            Message::assistant_with_tools("", vec![ToolCall::new("c1", "get_date", "{}")]),
            Message::tool_result("c1", "get_date", "2026-01-01"),
        ];

        let body = serde_json::to_value(client.request(&messages, &capabilities)).unwrap();

        assert_eq!(body["system"], "persona");
        assert_eq!(body["messages"].as_array().map(Vec::len), Some(3));
        assert_eq!(body["messages"][0]["content"][0]["text"], "goal");
        assert_eq!(body["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(body["messages"][1]["content"][0]["input"], json!({}));
        assert_eq!(body["messages"][2]["role"], "user");
        assert_eq!(body["messages"][2]["content"][0]["type"], "tool_result");
        assert_eq!(body["messages"][2]["content"][0]["tool_use_id"], "c1");
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }

    #[test]
    fn no_capabilities_means_no_tools_field() {
        let client = ClaudeClient::new("key");
        let body = serde_json::to_value(client.request(&[Message::user("hi")], &[])).unwrap();
        assert!(body.get("tools").is_none());
        assert!(body.get("system").is_none());
    }

    #[test]
    fn response_blocks_become_a_message() {
        let parsed: MessagesResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "hmm"},
                {"type": "text", "text": "Let me check. "},
                {"type": "tool_use", "id": "t1", "name": "calculator", "input": {"expression": "2+2"}}
            ],
            "usage": {"input_tokens": 10, "output_tokens": 4}
        }))
        .unwrap();

        let response = parsed.into_response();

        assert_eq!(response.message.content, "Let me check. ");
        let calls = response.message.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "calculator");
        assert_eq!(calls[0].parse_arguments().unwrap(), json!({"expression": "2+2"}));
        assert_eq!(response.usage.map(|u| u.output_tokens), Some(4));
    }
}
